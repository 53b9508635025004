//! The node-or-scene handed to the generation pipeline

use crate::layout::OwnerRef;
use smith_core::{Asset, Node, Scene, WikiType};
use std::path::{Path, PathBuf};

/// A loaded owner of declared assets.
///
/// Built once per pipeline run from a node or scene descriptor and shared
/// read-only between the per-asset tasks.
#[derive(Debug, Clone)]
pub struct AssetOwner {
    pub reference: OwnerRef,
    /// File stem used for owner-level outputs (last path segment)
    pub name: String,
    /// Owner directory in the wiki
    pub dir: PathBuf,
    pub assets: Vec<Asset>,
}

impl AssetOwner {
    pub fn from_node(reference: OwnerRef, dir: PathBuf, node: Node) -> Self {
        Self {
            name: reference.name().to_string(),
            reference,
            dir,
            assets: node.assets,
        }
    }

    pub fn from_scene(reference: OwnerRef, dir: PathBuf, scene: Scene) -> Self {
        Self {
            name: reference.name().to_string(),
            reference,
            dir,
            assets: scene.objects,
        }
    }

    /// Root of all generated and supplied files: `<owner>/assets`
    pub fn assets_dir(&self) -> PathBuf {
        self.dir.join("assets")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn wiki_type(&self) -> WikiType {
        self.reference.wiki_type()
    }

    /// Human-readable label for logs and errors
    pub fn label(&self) -> String {
        self.reference.to_string()
    }
}
