//! Texture generation
//!
//! One asset prompt becomes one raster image at
//! `<owner>/assets/textures/<name>.png`. Existing files are reused.

use crate::cache::{texture_path, write_atomic, Artifact, CachePolicy, GenerationState, StageTracker};
use crate::config::GenerationConfig;
use crate::provider::{AspectRatio, ImageRequest};
use crate::services::Services;
use smith_catalog::AssetOwner;
use smith_core::{Asset, Result};
use std::path::Path;

pub struct TextureGenerator {
    services: Services,
    size: String,
    style: Option<String>,
}

impl TextureGenerator {
    pub fn new(services: Services, config: &GenerationConfig) -> Self {
        Self {
            services,
            size: config.texture_size.clone(),
            style: config.style.clone(),
        }
    }

    /// Generate the texture for `asset`, or return the existing file
    pub fn build(&self, owner: &AssetOwner, asset: &Asset) -> Result<Artifact> {
        let path = texture_path(owner, &asset.name);
        let mut tracker = StageTracker::new(format!("{}/{}", owner.name, asset.name));

        if CachePolicy::SkipExisting.is_cached(&path) {
            tracker.transition(GenerationState::Skipped)?;
            tracing::info!(owner = %owner.label(), asset = %asset.name, "texture exists, skipping");
            return Ok(Artifact::skipped(path));
        }

        if let Err(e) = self.generate(asset, &path, &mut tracker) {
            return Err(tracker.fail(e));
        }
        tracing::info!(owner = %owner.label(), asset = %asset.name, path = %path.display(), "texture saved");
        Ok(Artifact::saved(path))
    }

    fn generate(&self, asset: &Asset, path: &Path, tracker: &mut StageTracker) -> Result<()> {
        let request = ImageRequest {
            aspect_ratio: aspect_for_size(&self.size),
            size: Some(self.size.clone()),
            ..ImageRequest::new(self.prompt_for(asset))
        };

        tracker.transition(GenerationState::Generating)?;
        let image = self.services.images.generate(&request)?;

        tracker.transition(GenerationState::Downloading)?;
        let bytes = self.services.image_bytes(&image)?;
        write_atomic(path, &bytes)?;

        tracker.transition(GenerationState::Saved)
    }

    fn prompt_for(&self, asset: &Asset) -> String {
        match &self.style {
            Some(style) => format!("{} Style: {}", asset.prompt, style),
            None => asset.prompt.clone(),
        }
    }
}

/// Aspect ratio of a `"<width>x<height>"` size, square when unparseable
fn aspect_for_size(size: &str) -> AspectRatio {
    size.split_once('x')
        .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
        .map(|(w, h)| AspectRatio::from_dimensions(w, h))
        .unwrap_or(AspectRatio::Square)
}
