//! Descriptor store for nodes and scenes

use crate::layout::{OwnerRef, WikiLayout};
use crate::owner::AssetOwner;
use serde::de::DeserializeOwned;
use serde::Serialize;
use smith_core::{Node, Result, Scene, SmithError, WikiType};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads and saves catalog descriptors as UTF-8 JSON
#[derive(Debug, Clone)]
pub struct CatalogStore {
    layout: WikiLayout,
}

impl CatalogStore {
    pub fn new(layout: WikiLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &WikiLayout {
        &self.layout
    }

    /// Read a JSON descriptor.
    ///
    /// Missing files yield `None`. Malformed JSON is discarded with a warning
    /// and also yields `None`, so callers treat it as absent.
    pub fn read_descriptor<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let err = SmithError::MalformedCacheMetadata {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                };
                tracing::warn!("{}; treating it as absent", err);
                Ok(None)
            }
        }
    }

    /// Write a descriptor as pretty-printed JSON, creating parent directories
    pub fn write_descriptor<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_node(&self, wiki_type: WikiType, path: &str) -> Result<Node> {
        let descriptor = self
            .layout
            .descriptor_path(&OwnerRef::node(wiki_type, path));
        Self::read_descriptor(&descriptor)?.ok_or(SmithError::DescriptorNotFound(descriptor))
    }

    pub fn save_node(&self, wiki_type: WikiType, path: &str, node: &Node) -> Result<PathBuf> {
        let descriptor = self
            .layout
            .descriptor_path(&OwnerRef::node(wiki_type, path));
        Self::write_descriptor(&descriptor, node)?;
        tracing::info!(path = %descriptor.display(), "node descriptor saved");
        Ok(descriptor)
    }

    pub fn load_scene(&self, location: &str, scene: &str) -> Result<Scene> {
        let descriptor = self
            .layout
            .descriptor_path(&OwnerRef::scene(location, scene));
        Self::read_descriptor(&descriptor)?.ok_or(SmithError::DescriptorNotFound(descriptor))
    }

    pub fn save_scene(&self, location: &str, scene_name: &str, scene: &Scene) -> Result<PathBuf> {
        let descriptor = self
            .layout
            .descriptor_path(&OwnerRef::scene(location, scene_name));
        Self::write_descriptor(&descriptor, scene)?;
        tracing::info!(path = %descriptor.display(), "scene descriptor saved");
        Ok(descriptor)
    }

    /// Load the descriptor behind `reference` as a pipeline owner
    pub fn load_owner(&self, reference: &OwnerRef) -> Result<AssetOwner> {
        let dir = self.layout.owner_dir(reference);
        let owner = match reference {
            OwnerRef::Node { wiki_type, path } => {
                let node = self.load_node(*wiki_type, path)?;
                AssetOwner::from_node(reference.clone(), dir, node)
            }
            OwnerRef::Scene { location, scene } => {
                let scene = self.load_scene(location, scene)?;
                AssetOwner::from_scene(reference.clone(), dir, scene)
            }
        };
        Ok(owner)
    }

    /// File names of the owner's concept art (`assets/arts/*.png`), sorted
    pub fn list_arts(&self, reference: &OwnerRef) -> Result<Vec<String>> {
        let dir = self.layout.arts_dir(reference);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("png"))
                .unwrap_or(false);
            if path.is_file() && is_png {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// CDN URLs of the owner's concept art, in `list_arts` order
    pub fn art_urls(&self, reference: &OwnerRef) -> Result<Vec<String>> {
        Ok(self
            .list_arts(reference)?
            .iter()
            .map(|name| self.layout.art_url(reference, name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smith_core::{Asset, AssetType};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CatalogStore {
        CatalogStore::new(WikiLayout::new(dir.path(), "https://cdn.example.com"))
    }

    fn sample_node() -> Node {
        Node {
            name: "forest_clearing".to_string(),
            description: "A quiet glade".to_string(),
            style: "hand-painted".to_string(),
            assets: vec![Asset {
                name: "mossy_rock".to_string(),
                description: "moss-covered boulder surface".to_string(),
                kind: AssetType::Texture,
                prompt: "seamless mossy rock".to_string(),
                quantity: None,
                placement_notes: None,
            }],
        }
    }

    #[test]
    fn test_save_then_load_node() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let path = store
            .save_node(WikiType::Location, "forest_clearing", &sample_node())
            .unwrap();
        assert!(path.ends_with("locations/forest_clearing/map.json"));

        let loaded = store.load_node(WikiType::Location, "forest_clearing").unwrap();
        assert_eq!(loaded, sample_node());
    }

    #[test]
    fn test_missing_node_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = store(&dir).load_node(WikiType::Character, "nobody");
        assert!(matches!(result, Err(SmithError::DescriptorNotFound(_))));
    }

    #[test]
    fn test_malformed_descriptor_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.json");
        fs::write(&path, "{ not json").unwrap();

        let value: Option<Node> = CatalogStore::read_descriptor(&path).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_load_scene_owner_uses_objects() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let scene = Scene {
            name: "market".to_string(),
            description: "busy".to_string(),
            location: "caladyn".to_string(),
            objects: sample_node().assets,
        };
        store.save_scene("caladyn", "market", &scene).unwrap();

        let owner = store.load_owner(&OwnerRef::scene("caladyn", "market")).unwrap();
        assert_eq!(owner.name, "market");
        assert_eq!(owner.assets.len(), 1);
        assert!(owner.dir.ends_with("locations/caladyn/scenes/market"));
    }

    #[test]
    fn test_list_arts_only_png_sorted() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let owner = OwnerRef::node(WikiType::Character, "dustmother");
        let arts = store.layout().arts_dir(&owner);
        fs::create_dir_all(&arts).unwrap();
        fs::write(arts.join("b.png"), b"x").unwrap();
        fs::write(arts.join("a.PNG"), b"x").unwrap();
        fs::write(arts.join("notes.txt"), b"x").unwrap();

        assert_eq!(store.list_arts(&owner).unwrap(), vec!["a.PNG", "b.png"]);
        assert_eq!(
            store.art_urls(&owner).unwrap()[1],
            "https://cdn.example.com/characters/dustmother/assets/arts/b.png"
        );
    }

    #[test]
    fn test_no_arts_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let owner = OwnerRef::node(WikiType::Item, "lantern");
        assert!(store(&dir).list_arts(&owner).unwrap().is_empty());
    }
}
