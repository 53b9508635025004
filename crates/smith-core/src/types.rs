//! Catalog descriptor types
//!
//! These mirror the JSON documents stored in the wiki. Field order is the
//! serialization order, so saved descriptors keep a stable key order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which catalog subtree a node lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WikiType {
    Character,
    Location,
    Item,
}

impl WikiType {
    /// Directory (and CDN path segment) holding nodes of this type
    pub fn dir_name(&self) -> &'static str {
        match self {
            WikiType::Character => "characters",
            WikiType::Location => "locations",
            WikiType::Item => "items",
        }
    }

    /// Parse from a CLI-style name ("character", "location", "item")
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "character" | "characters" => Some(WikiType::Character),
            "location" | "locations" => Some(WikiType::Location),
            "item" | "items" => Some(WikiType::Item),
            _ => None,
        }
    }
}

impl fmt::Display for WikiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WikiType::Character => write!(f, "character"),
            WikiType::Location => write!(f, "location"),
            WikiType::Item => write!(f, "item"),
        }
    }
}

/// The kind of deliverable an asset asks for.
///
/// Unknown tags are kept as `Unsupported` instead of failing the whole
/// descriptor, so a single bad entry is rejected at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetType {
    Object,
    Texture,
    Audio,
    Unsupported(String),
}

impl From<String> for AssetType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "object" => AssetType::Object,
            "texture" => AssetType::Texture,
            "audio" => AssetType::Audio,
            _ => AssetType::Unsupported(tag),
        }
    }
}

impl From<AssetType> for String {
    fn from(kind: AssetType) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::Object => write!(f, "object"),
            AssetType::Texture => write!(f, "texture"),
            AssetType::Audio => write!(f, "audio"),
            AssetType::Unsupported(tag) => write!(f, "{}", tag),
        }
    }
}

/// A single requested deliverable declared on a node or scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique within the owning node/scene; also the output file stem
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    /// Prompt sent as-is to the generation service
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_notes: Option<String>,
}

/// Scene descriptors call their assets "objects"; the shape is identical.
pub type GameObject = Asset;

/// A location or character entry in the catalog (`map.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub description: String,
    pub style: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A sub-area of a location (`scene_wiki.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub objects: Vec<GameObject>,
}
