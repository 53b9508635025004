//! Wiki file-tree layout
//!
//! ```text
//! <root>/<characters|locations|items>/<node-path>/map.json
//! <root>/locations/<location>/scenes/<scene>/scene_wiki.json
//! <owner>/assets/arts/*.png          concept art (read-only input)
//! ```

use smith_core::WikiType;
use std::fmt;
use std::path::{Path, PathBuf};

const NODE_DESCRIPTOR: &str = "map.json";
const SCENE_DESCRIPTOR: &str = "scene_wiki.json";
const SCENES_DIR: &str = "scenes";
const ASSETS_DIR: &str = "assets";
const ARTS_DIR: &str = "arts";

/// Addresses one owner of assets in the wiki: a node or a scene
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerRef {
    /// A node such as `caladyn/aroth-kai` under its wiki-type subtree
    Node { wiki_type: WikiType, path: String },
    /// A scene under a location
    Scene { location: String, scene: String },
}

impl OwnerRef {
    pub fn node(wiki_type: WikiType, path: impl Into<String>) -> Self {
        OwnerRef::Node {
            wiki_type,
            path: path.into(),
        }
    }

    pub fn scene(location: impl Into<String>, scene: impl Into<String>) -> Self {
        OwnerRef::Scene {
            location: location.into(),
            scene: scene.into(),
        }
    }

    /// Path of the owner directory relative to the wiki root, `/`-separated
    pub fn relative_path(&self) -> String {
        match self {
            OwnerRef::Node { wiki_type, path } => {
                format!("{}/{}", wiki_type.dir_name(), path.trim_matches('/'))
            }
            OwnerRef::Scene { location, scene } => format!(
                "{}/{}/{}/{}",
                WikiType::Location.dir_name(),
                location.trim_matches('/'),
                SCENES_DIR,
                scene.trim_matches('/')
            ),
        }
    }

    /// Short name used as a file stem: the last path segment
    pub fn name(&self) -> &str {
        let full = match self {
            OwnerRef::Node { path, .. } => path.as_str(),
            OwnerRef::Scene { scene, .. } => scene.as_str(),
        };
        full.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(full)
    }

    /// The wiki type that selects prompt wording for this owner
    pub fn wiki_type(&self) -> WikiType {
        match self {
            OwnerRef::Node { wiki_type, .. } => *wiki_type,
            OwnerRef::Scene { .. } => WikiType::Location,
        }
    }

    fn descriptor_file(&self) -> &'static str {
        match self {
            OwnerRef::Node { .. } => NODE_DESCRIPTOR,
            OwnerRef::Scene { .. } => SCENE_DESCRIPTOR,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerRef::Node { wiki_type, path } => write!(f, "{} '{}'", wiki_type, path),
            OwnerRef::Scene { location, scene } => write!(f, "scene '{}/{}'", location, scene),
        }
    }
}

/// Resolves owners to directories on disk and to URLs on the wiki CDN
#[derive(Debug, Clone)]
pub struct WikiLayout {
    root: PathBuf,
    cdn_url: String,
}

impl WikiLayout {
    pub fn new(root: impl Into<PathBuf>, cdn_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            cdn_url: cdn_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cdn_url(&self) -> &str {
        &self.cdn_url
    }

    /// Directory holding the owner's descriptor and `assets/` tree
    pub fn owner_dir(&self, owner: &OwnerRef) -> PathBuf {
        owner
            .relative_path()
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    /// `map.json` for nodes, `scene_wiki.json` for scenes
    pub fn descriptor_path(&self, owner: &OwnerRef) -> PathBuf {
        self.owner_dir(owner).join(owner.descriptor_file())
    }

    /// Externally supplied concept art for the owner
    pub fn arts_dir(&self, owner: &OwnerRef) -> PathBuf {
        self.owner_dir(owner).join(ASSETS_DIR).join(ARTS_DIR)
    }

    /// Public URL of one concept-art file
    pub fn art_url(&self, owner: &OwnerRef, art_name: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.cdn_url,
            owner.relative_path(),
            ASSETS_DIR,
            ARTS_DIR,
            art_name
        )
    }
}
