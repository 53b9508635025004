//! Multi-view mesh building
//!
//! Concept art is normalized into three reference views, reconstructed
//! into a binary mesh, downloaded to `<owner>/assets/models/<owner>.glb`
//! and optionally converted into a secondary format.

use crate::cache::{model_path, write_atomic, Artifact, CachePolicy, GenerationState, StageTracker};
use crate::config::{ConversionConfig, SmithConfig};
use crate::provider::{ReconstructionParams, ReconstructionRequest};
use crate::reference::ReferencePreparer;
use crate::services::Services;
use smith_catalog::AssetOwner;
use smith_core::{Result, SmithError};
use std::path::{Path, PathBuf};

/// Builds an owner's mesh from its concept art
pub struct MeshBuilder {
    services: Services,
    preparer: ReferencePreparer,
    params: ReconstructionParams,
    conversion: ConversionConfig,
    policy: CachePolicy,
}

impl MeshBuilder {
    pub fn new(services: Services, config: &SmithConfig) -> Self {
        Self {
            preparer: ReferencePreparer::new(services.clone()),
            services,
            params: config.reconstruction.multi_view.clone(),
            conversion: config.conversion.clone(),
            policy: CachePolicy::from_refresh_flag(config.generation.refresh_multiview_meshes),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the mesh for `owner` from its concept-art URLs
    pub fn build(&self, owner: &AssetOwner, source_urls: &[String]) -> Result<Artifact> {
        if source_urls.is_empty() {
            return Err(SmithError::NoReferenceImages(owner.label()));
        }

        let path = model_path(owner, &owner.name);
        let mut tracker = StageTracker::new(format!("{} mesh", owner.name));

        if self.policy.is_cached(&path) {
            tracker.transition(GenerationState::Skipped)?;
            tracing::info!(owner = %owner.label(), path = %path.display(), "mesh exists, skipping");
            return Ok(Artifact::skipped(path));
        }

        if let Err(e) = self.generate(owner, source_urls, &path, &mut tracker) {
            return Err(tracker.fail(e));
        }
        tracing::info!(owner = %owner.label(), path = %path.display(), "mesh saved");

        let mut artifact = Artifact::saved(path);
        artifact.secondary = convert_secondary(&self.services, &self.conversion, &artifact.path)?;
        Ok(artifact)
    }

    fn generate(
        &self,
        owner: &AssetOwner,
        source_urls: &[String],
        path: &Path,
        tracker: &mut StageTracker,
    ) -> Result<()> {
        tracker.transition(GenerationState::Generating)?;
        let views = self.preparer.prepare(owner, source_urls)?;

        let request = ReconstructionRequest {
            images: views.into_iter().map(|v| v.url).collect(),
            params: self.params.clone(),
        };
        tracing::info!(owner = %owner.label(), views = request.images.len(), "reconstructing mesh");
        let mesh_url = self.services.reconstructor.reconstruct(&request)?;

        tracker.transition(GenerationState::Downloading)?;
        let bytes = self.services.fetcher.fetch(&mesh_url)?;
        write_atomic(path, &bytes)?;

        tracker.transition(GenerationState::Saved)
    }
}

/// Convert a saved `.glb` into the configured secondary format.
///
/// Returns `Ok(None)` when no converter is set up, or when conversion
/// failed and failures are not fatal.
pub(crate) fn convert_secondary(
    services: &Services,
    conversion: &ConversionConfig,
    glb: &Path,
) -> Result<Option<PathBuf>> {
    let Some(converter) = services.converter.as_ref() else {
        return Ok(None);
    };

    match converter.convert(glb, &conversion.format) {
        Ok(converted) => {
            tracing::info!(path = %converted.display(), "converted mesh");
            Ok(Some(converted))
        }
        Err(e) if !conversion.fatal => {
            tracing::warn!(path = %glb.display(), error = %e, "mesh conversion failed, keeping .glb only");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockCall, MockServices};
    use smith_catalog::OwnerRef;
    use smith_core::{Node, WikiType};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn character(dir: &Path) -> AssetOwner {
        let node = Node {
            name: "Dustmother".to_string(),
            description: String::new(),
            style: String::new(),
            assets: vec![],
        };
        AssetOwner::from_node(
            OwnerRef::node(WikiType::Character, "dustmother"),
            dir.to_path_buf(),
            node,
        )
    }

    fn arts() -> Vec<String> {
        vec!["https://cdn.example/characters/dustmother/assets/arts/a.png".to_string()]
    }

    #[test]
    fn test_no_reference_images_fails_before_any_call() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let builder = MeshBuilder::new(Services::mock(mock.clone()), &SmithConfig::default());

        let result = builder.build(&character(dir.path()), &[]);
        assert!(matches!(result, Err(SmithError::NoReferenceImages(_))));
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn test_full_build() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let builder = MeshBuilder::new(Services::mock(mock.clone()), &SmithConfig::default());

        let artifact = builder.build(&character(dir.path()), &arts()).unwrap();

        assert_eq!(artifact.state, GenerationState::Saved);
        assert_eq!(artifact.path, dir.path().join("assets/models/dustmother.glb"));
        assert_eq!(&std::fs::read(&artifact.path).unwrap()[0..4], b"glTF");
        assert_eq!(artifact.secondary, None);
        assert_eq!(mock.calls(MockCall::Image), 3);
        assert_eq!(mock.calls(MockCall::Reconstruct), 1);

        let request = &mock.reconstruction_requests()[0];
        assert_eq!(request.images.len(), 3);
        assert_eq!(request.params, ReconstructionParams::multi_view());
    }

    #[test]
    fn test_existing_mesh_is_reused_by_default() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let builder = MeshBuilder::new(Services::mock(mock.clone()), &SmithConfig::default());
        let owner = character(dir.path());

        builder.build(&owner, &arts()).unwrap();
        let calls = mock.total_calls();
        let second = builder.build(&owner, &arts()).unwrap();

        assert_eq!(second.state, GenerationState::Skipped);
        assert_eq!(mock.total_calls(), calls);
    }

    #[test]
    fn test_refresh_flag_always_regenerates() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let mut config = SmithConfig::default();
        config.generation.refresh_multiview_meshes = true;
        let builder = MeshBuilder::new(Services::mock(mock.clone()), &config);
        let owner = character(dir.path());

        builder.build(&owner, &arts()).unwrap();
        let second = builder.build(&owner, &arts()).unwrap();

        assert_eq!(second.state, GenerationState::Saved);
        assert_eq!(mock.calls(MockCall::Reconstruct), 2);
    }

    #[test]
    fn test_mesh_download_failure_names_mesh_url() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new().with_failing_url(".glb"));
        let builder = MeshBuilder::new(Services::mock(mock.clone()), &SmithConfig::default());

        let result = builder.build(&character(dir.path()), &arts());

        match result {
            Err(SmithError::DownloadFailure { url, .. }) => assert_eq!(url, "mock://meshes/0.glb"),
            other => panic!("expected DownloadFailure, got {:?}", other),
        }
        assert_eq!(mock.calls(MockCall::Reconstruct), 1);
        assert!(dir.path().join("assets/mesh_references").is_dir());
        assert!(!dir.path().join("assets/models").exists());
    }

    #[test]
    fn test_conversion_writes_secondary_file() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let services = Services::mock(mock.clone()).with_converter(mock.clone());
        let builder = MeshBuilder::new(services, &SmithConfig::default());

        let artifact = builder.build(&character(dir.path()), &arts()).unwrap();
        assert_eq!(
            artifact.secondary,
            Some(dir.path().join("assets/models/dustmother.fbx"))
        );
    }

    #[test]
    fn test_conversion_failure_is_not_fatal_by_default() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new().with_failure(MockCall::Convert));
        let services = Services::mock(mock.clone()).with_converter(mock.clone());
        let builder = MeshBuilder::new(services.clone(), &SmithConfig::default());

        let artifact = builder.build(&character(dir.path()), &arts()).unwrap();
        assert!(artifact.path.is_file());
        assert_eq!(artifact.secondary, None);

        let mut config = SmithConfig::default();
        config.conversion.fatal = true;
        let strict = MeshBuilder::new(services, &config).with_policy(CachePolicy::AlwaysRegenerate);
        let result = strict.build(&character(dir.path()), &arts());
        assert!(matches!(result, Err(SmithError::ConversionFailure(_))));
        // The primary mesh stays on disk
        assert!(dir.path().join("assets/models/dustmother.glb").is_file());
    }
}
