//! Single-prop object building
//!
//! A lighter variant of the mesh builder for props declared as `object`
//! assets: one transparent reference image is generated from the asset's
//! own prompt and reconstructed with the cheaper parameter preset. No
//! concept art is needed. Existing `.glb` files are reused.
//! Props are saved under `<owner>/models/`, apart from the owner mesh.

use crate::cache::{prop_path, write_atomic, Artifact, CachePolicy, GenerationState, StageTracker};
use crate::config::{ConversionConfig, SmithConfig};
use crate::mesh::convert_secondary;
use crate::provider::{ImageRequest, ReconstructionParams, ReconstructionRequest};
use crate::services::Services;
use smith_catalog::AssetOwner;
use smith_core::{Asset, Result, SmithError};
use std::path::Path;

pub struct ObjectBuilder {
    services: Services,
    params: ReconstructionParams,
    conversion: ConversionConfig,
}

impl ObjectBuilder {
    pub fn new(services: Services, config: &SmithConfig) -> Self {
        Self {
            services,
            params: config.reconstruction.single_prop.clone(),
            conversion: config.conversion.clone(),
        }
    }

    /// Build `<owner>/models/<asset>.glb`, or return the existing file
    pub fn build(&self, owner: &AssetOwner, asset: &Asset) -> Result<Artifact> {
        let path = prop_path(owner, &asset.name);
        let mut tracker = StageTracker::new(format!("{}/{}", owner.name, asset.name));

        if CachePolicy::SkipExisting.is_cached(&path) {
            tracker.transition(GenerationState::Skipped)?;
            tracing::info!(owner = %owner.label(), asset = %asset.name, "object exists, skipping");
            return Ok(Artifact::skipped(path));
        }

        if let Err(e) = self.generate(asset, &path, &mut tracker) {
            return Err(tracker.fail(e));
        }
        tracing::info!(owner = %owner.label(), asset = %asset.name, path = %path.display(), "object saved");

        let mut artifact = Artifact::saved(path);
        artifact.secondary = convert_secondary(&self.services, &self.conversion, &artifact.path)?;
        Ok(artifact)
    }

    fn generate(&self, asset: &Asset, path: &Path, tracker: &mut StageTracker) -> Result<()> {
        tracker.transition(GenerationState::Generating)?;

        let request = ImageRequest {
            transparent: true,
            ..ImageRequest::new(asset.prompt.clone())
        };
        let image = self.services.images.generate(&request)?;
        let reference_url = image.url().ok_or_else(|| {
            SmithError::remote(
                self.services.images.name(),
                "object references must be hosted; the service returned inline bytes",
            )
        })?;
        tracing::debug!(asset = %asset.name, url = reference_url, "reference image ready");

        let mesh_url = self.services.reconstructor.reconstruct(&ReconstructionRequest {
            images: vec![reference_url.to_string()],
            params: self.params.clone(),
        })?;

        tracker.transition(GenerationState::Downloading)?;
        let bytes = self.services.fetcher.fetch(&mesh_url)?;
        write_atomic(path, &bytes)?;

        tracker.transition(GenerationState::Saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockCall, MockServices};
    use smith_catalog::OwnerRef;
    use smith_core::{AssetType, Scene};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn market(dir: &Path) -> AssetOwner {
        let scene = Scene {
            name: "Market".to_string(),
            description: String::new(),
            location: "caladyn".to_string(),
            objects: vec![],
        };
        AssetOwner::from_scene(OwnerRef::scene("caladyn", "market"), dir.to_path_buf(), scene)
    }

    fn fruit_stall() -> Asset {
        Asset {
            name: "fruit_stall".to_string(),
            description: "A wooden stall".to_string(),
            kind: AssetType::Object,
            prompt: "a wooden fruit stall".to_string(),
            quantity: Some(2),
            placement_notes: Some("along the north wall".to_string()),
        }
    }

    #[test]
    fn test_builds_from_single_reference() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let builder = ObjectBuilder::new(Services::mock(mock.clone()), &SmithConfig::default());

        let artifact = builder.build(&market(dir.path()), &fruit_stall()).unwrap();

        assert_eq!(artifact.path, dir.path().join("models/fruit_stall.glb"));
        assert!(artifact.path.is_file());
        assert_eq!(mock.calls(MockCall::Image), 1);
        assert_eq!(mock.calls(MockCall::Reconstruct), 1);

        let request = &mock.reconstruction_requests()[0];
        assert_eq!(request.images, vec!["mock://images/0.png".to_string()]);
        assert_eq!(request.params, ReconstructionParams::single_prop());
        assert!(mock.image_requests()[0].transparent);
    }

    #[test]
    fn test_existing_object_makes_no_calls() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let builder = ObjectBuilder::new(Services::mock(mock.clone()), &SmithConfig::default());
        let owner = market(dir.path());

        let path = dir.path().join("models/fruit_stall.glb");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"existing").unwrap();

        let artifact = builder.build(&owner, &fruit_stall()).unwrap();
        assert_eq!(artifact.state, GenerationState::Skipped);
        assert_eq!(artifact.path, path);
        assert_eq!(mock.total_calls(), 0);
        assert_eq!(std::fs::read(&path).unwrap(), b"existing");
    }

    #[test]
    fn test_reconstruction_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new().with_failure(MockCall::Reconstruct));
        let builder = ObjectBuilder::new(Services::mock(mock.clone()), &SmithConfig::default());

        let result = builder.build(&market(dir.path()), &fruit_stall());
        assert!(matches!(result, Err(SmithError::RemoteServiceFailure { .. })));
        assert_eq!(mock.calls(MockCall::Fetch), 0);
    }
}
