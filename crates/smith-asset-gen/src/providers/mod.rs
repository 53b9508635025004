//! Provider registry
//!
//! Maps image-provider names to concrete implementations.

pub mod blender;
pub mod http;
pub mod mock;
pub mod openai;
pub mod replicate;

use crate::config::SmithConfig;
use crate::provider::ImageGenerator;
use smith_core::{Result, SmithError};
use std::sync::Arc;

/// Create an image generator by name with configuration
pub fn create_image_generator(name: &str, config: &SmithConfig) -> Result<Arc<dyn ImageGenerator>> {
    if !config.is_enabled(name) {
        return Err(SmithError::ConfigError(format!(
            "Provider '{}' is disabled in config",
            name
        )));
    }

    match name {
        "mock" => Ok(Arc::new(mock::MockServices::new())),
        "replicate" => Ok(Arc::new(replicate::ReplicateProvider::from_config(config)?)),
        "openai" => Ok(Arc::new(openai::OpenAiProvider::from_config(config)?)),
        _ => Err(SmithError::ConfigError(format!(
            "Unknown image provider '{}'. Available: {}",
            name,
            available_image_providers().join(", ")
        ))),
    }
}

/// List all available image provider names
pub fn available_image_providers() -> Vec<&'static str> {
    vec!["mock", "replicate", "openai"]
}
