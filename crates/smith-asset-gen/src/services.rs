//! The bundle of external services handed to every pipeline component

use crate::config::SmithConfig;
use crate::provider::*;
use crate::providers::{self, blender::BlenderConverter, http, mock::MockServices, replicate};
use smith_core::{Result, SmithError};
use std::sync::Arc;

/// Service clients, constructed once by the entry point.
///
/// Cloning is cheap; all handles are shared.
#[derive(Clone)]
pub struct Services {
    pub images: Arc<dyn ImageGenerator>,
    pub reconstructor: Arc<dyn MeshReconstructor>,
    pub fetcher: Arc<dyn Fetcher>,
    /// Present only when secondary-format conversion is enabled
    pub converter: Option<Arc<dyn MeshConverter>>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
}

impl Services {
    /// Build the real clients from configuration
    pub fn from_config(config: &SmithConfig) -> Result<Self> {
        let replicate = Arc::new(replicate::ReplicateProvider::from_config(config)?);

        let images: Arc<dyn ImageGenerator> = if config.generation.image_provider == "replicate" {
            replicate.clone()
        } else {
            providers::create_image_generator(&config.generation.image_provider, config)?
        };

        let converter: Option<Arc<dyn MeshConverter>> = if config.conversion.enabled {
            Some(Arc::new(BlenderConverter::from_config(&config.conversion)))
        } else {
            None
        };

        tracing::debug!(
            images = images.name(),
            conversion = config.conversion.enabled,
            "services ready"
        );

        Ok(Self {
            images,
            reconstructor: replicate.clone(),
            fetcher: Arc::new(http::HttpFetcher::new(http::HttpSettings::from_config(config))),
            converter,
            speech: Some(replicate),
        })
    }

    /// Route every service to one mock
    pub fn mock(mock: Arc<MockServices>) -> Self {
        Self {
            images: mock.clone(),
            reconstructor: mock.clone(),
            fetcher: mock.clone(),
            converter: None,
            speech: Some(mock),
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn MeshConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Bytes of a generated image, downloading it when hosted
    pub fn image_bytes(&self, image: &GeneratedImage) -> Result<Vec<u8>> {
        match image {
            GeneratedImage::Url(url) => self.fetcher.fetch(url),
            GeneratedImage::Inline(bytes) => Ok(bytes.clone()),
        }
    }

    /// The speech service, or a configuration error when none is set up
    pub fn speech(&self) -> Result<&Arc<dyn SpeechSynthesizer>> {
        self.speech
            .as_ref()
            .ok_or_else(|| SmithError::ConfigError("No speech service configured".to_string()))
    }
}
