//! Reference-image preparation
//!
//! Turns an owner's concept art into three standardized views (front,
//! back, side) suitable as input for 3-D reconstruction. Each view is an
//! independent image-service call; the three run concurrently on scoped
//! threads. Views are always regenerated.

use crate::cache::{mesh_reference_path, write_atomic};
use crate::provider::{AspectRatio, Fetcher, ImageRequest};
use crate::services::Services;
use smith_catalog::AssetOwner;
use smith_core::{Result, SmithError, WikiType};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;

/// A fixed camera angle for a reference view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewAngle {
    Front,
    Back,
    Side,
}

/// The views produced for every reconstruction, in this order
pub const ANGLES: [ViewAngle; 3] = [ViewAngle::Front, ViewAngle::Back, ViewAngle::Side];

impl ViewAngle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewAngle::Front => "front",
            ViewAngle::Back => "back",
            ViewAngle::Side => "side",
        }
    }
}

impl fmt::Display for ViewAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prepared view: where it is hosted and where it was saved
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedView {
    pub angle: ViewAngle,
    pub url: String,
    pub path: PathBuf,
}

/// Produces the three orthographic reference views for an owner
pub struct ReferencePreparer {
    services: Services,
}

impl ReferencePreparer {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Generate, download and save the front/back/side views.
    ///
    /// Returns an empty list without contacting any service when
    /// `source_urls` is empty. Views are returned in [`ANGLES`] order.
    pub fn prepare(&self, owner: &AssetOwner, source_urls: &[String]) -> Result<Vec<PreparedView>> {
        if source_urls.is_empty() {
            return Ok(Vec::new());
        }

        let aspect = probe_aspect_ratio(self.services.fetcher.as_ref(), source_urls);
        tracing::info!(owner = %owner.label(), sources = source_urls.len(), aspect = %aspect, "preparing reference views");

        let results: Vec<Result<PreparedView>> = std::thread::scope(|scope| {
            let handles: Vec<_> = ANGLES
                .iter()
                .map(|&angle| {
                    let handle =
                        scope.spawn(move || self.prepare_view(owner, angle, aspect, source_urls));
                    (angle, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(angle, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(SmithError::TaskFailed {
                            asset: format!("{} {} view", owner.name, angle),
                            message: "reference worker panicked".to_string(),
                        })
                    })
                })
                .collect()
        });

        results.into_iter().collect()
    }

    fn prepare_view(
        &self,
        owner: &AssetOwner,
        angle: ViewAngle,
        aspect: AspectRatio,
        source_urls: &[String],
    ) -> Result<PreparedView> {
        let request = ImageRequest {
            aspect_ratio: aspect,
            transparent: true,
            reference_images: source_urls.to_vec(),
            ..ImageRequest::new(reference_prompt(&owner.name, owner.wiki_type(), angle))
        };

        let image = self.services.images.generate(&request)?;
        let url = image
            .url()
            .ok_or_else(|| {
                SmithError::remote(
                    self.services.images.name(),
                    "reference views must be hosted; the service returned inline bytes",
                )
            })?
            .to_string();

        let bytes = self.services.image_bytes(&image)?;
        let path = mesh_reference_path(owner, angle.as_str());
        write_atomic(&path, &bytes)?;
        tracing::info!(owner = %owner.label(), angle = %angle, path = %path.display(), "reference view saved");

        Ok(PreparedView { angle, url, path })
    }
}

/// Build the prompt for one reference view
pub fn reference_prompt(subject: &str, wiki_type: WikiType, angle: ViewAngle) -> String {
    let pose = match wiki_type {
        WikiType::Character => format!(
            "Draw {} full-body in a neutral T-pose with arms extended horizontally, hands empty. ",
            subject
        ),
        WikiType::Location | WikiType::Item => {
            format!("Draw {} as a single free-standing object in a neutral pose. ", subject)
        }
    };

    format!(
        "{pose}Show the {kind} from the {angle} view. \
         Keep the style of the attached reference images and their size and aspect ratio. \
         Use a fully transparent background with alpha; never draw floors, walls or scenery. \
         Center the {kind} in the frame and position it symmetrically. \
         Light it evenly with no shadows, reflections, particles or extra objects. \
         Keep edges and distinctive features crisp and consistent with the references. \
         The image will be used to reconstruct a 3D model.",
        pose = pose,
        kind = wiki_type,
        angle = angle
    )
}

/// Aspect ratio of the first source image, or square when it cannot be
/// fetched or decoded
pub fn probe_aspect_ratio(fetcher: &dyn Fetcher, source_urls: &[String]) -> AspectRatio {
    let Some(first) = source_urls.first() else {
        return AspectRatio::Square;
    };

    let dimensions = fetcher.fetch(first).and_then(|bytes| {
        image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| SmithError::download(first.as_str(), e))
    });

    match dimensions {
        Ok((width, height)) => AspectRatio::from_dimensions(width, height),
        Err(e) => {
            tracing::warn!(url = %first, error = %e, "could not read source image size, assuming 1:1");
            AspectRatio::Square
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockCall, MockServices};
    use smith_catalog::OwnerRef;
    use smith_core::Node;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn character(dir: &std::path::Path) -> AssetOwner {
        let node = Node {
            name: "Aroth-Kai".to_string(),
            description: "A wandering smith".to_string(),
            style: "painterly".to_string(),
            assets: vec![],
        };
        AssetOwner::from_node(
            OwnerRef::node(WikiType::Character, "caladyn/aroth-kai"),
            dir.to_path_buf(),
            node,
        )
    }

    fn arts(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://cdn.example/characters/caladyn/aroth-kai/assets/arts/{}.png", i))
            .collect()
    }

    #[test]
    fn test_empty_sources_make_no_calls() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let preparer = ReferencePreparer::new(Services::mock(mock.clone()));

        let views = preparer.prepare(&character(dir.path()), &[]).unwrap();
        assert!(views.is_empty());
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn test_three_views_regardless_of_source_count() {
        for sources in [1, 4] {
            let dir = TempDir::new().unwrap();
            let mock = Arc::new(MockServices::new());
            let preparer = ReferencePreparer::new(Services::mock(mock.clone()));
            let owner = character(dir.path());

            let views = preparer.prepare(&owner, &arts(sources)).unwrap();

            assert_eq!(views.len(), 3);
            assert_eq!(mock.calls(MockCall::Image), 3);
            let angles: Vec<_> = views.iter().map(|v| v.angle).collect();
            assert_eq!(angles, ANGLES.to_vec());
            for angle in ["front", "back", "side"] {
                let path = dir
                    .path()
                    .join("assets/mesh_references")
                    .join(format!("aroth-kai_{}.png", angle));
                assert!(path.is_file(), "missing {}", path.display());
            }
            for request in mock.image_requests() {
                assert_eq!(request.reference_images.len(), sources);
                assert!(request.transparent);
            }
        }
    }

    #[test]
    fn test_always_regenerates() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let preparer = ReferencePreparer::new(Services::mock(mock.clone()));
        let owner = character(dir.path());

        preparer.prepare(&owner, &arts(1)).unwrap();
        preparer.prepare(&owner, &arts(1)).unwrap();
        assert_eq!(mock.calls(MockCall::Image), 6);
    }

    #[test]
    fn test_aspect_ratio_follows_first_source() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new().with_art_size(1536, 1024));
        let preparer = ReferencePreparer::new(Services::mock(mock.clone()));

        preparer.prepare(&character(dir.path()), &arts(2)).unwrap();
        for request in mock.image_requests() {
            assert_eq!(request.aspect_ratio, AspectRatio::Landscape);
        }
    }

    #[test]
    fn test_unreadable_source_defaults_to_square() {
        let mock = MockServices::new().with_failure(MockCall::Fetch);
        assert_eq!(probe_aspect_ratio(&mock, &arts(1)), AspectRatio::Square);
        assert_eq!(probe_aspect_ratio(&mock, &[]), AspectRatio::Square);
    }

    #[test]
    fn test_inline_images_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new().with_inline_images());
        let preparer = ReferencePreparer::new(Services::mock(mock));

        let result = preparer.prepare(&character(dir.path()), &arts(1));
        assert!(matches!(result, Err(SmithError::RemoteServiceFailure { .. })));
    }

    #[test]
    fn test_prompt_mentions_angle_and_pose() {
        let prompt = reference_prompt("aroth-kai", WikiType::Character, ViewAngle::Back);
        assert!(prompt.contains("T-pose"));
        assert!(prompt.contains("from the back view"));
        assert!(prompt.contains("transparent background"));

        let prop = reference_prompt("well", WikiType::Location, ViewAngle::Side);
        assert!(!prop.contains("T-pose"));
        assert!(prop.contains("Show the location from the side view"));
    }
}
