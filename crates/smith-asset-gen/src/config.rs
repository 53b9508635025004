//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `REPLICATE_API_TOKEN`, `OPENAI_API_KEY`, `SMITH_*`
//! 2. Project-local: `.smith/config.toml`
//! 3. Global: `~/.smith/config.toml`

use crate::provider::ReconstructionParams;
use serde::{Deserialize, Serialize};
use smith_core::{Result, SmithError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variables that carry provider secrets
const PROVIDER_ENV_KEYS: [(&str, &str); 2] = [
    ("replicate", "REPLICATE_API_TOKEN"),
    ("openai", "OPENAI_API_KEY"),
];

/// Where the wiki lives locally and on the CDN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    #[serde(default = "default_wiki_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub cdn_url: String,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            path: default_wiki_path(),
            cdn_url: String::new(),
        }
    }
}

fn default_wiki_path() -> PathBuf {
    PathBuf::from("wiki")
}

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Concurrency gates toward the external services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Texture tasks allowed to call the image service at once
    #[serde(default = "default_texture_tasks")]
    pub texture_tasks: usize,
    /// Object tasks allowed to run reconstruction at once
    #[serde(default = "default_object_tasks")]
    pub object_tasks: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            texture_tasks: default_texture_tasks(),
            object_tasks: default_object_tasks(),
        }
    }
}

fn default_texture_tasks() -> usize {
    4
}
fn default_object_tasks() -> usize {
    2
}

/// Generation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_image_provider")]
    pub image_provider: String,
    #[serde(default = "default_texture_size")]
    pub texture_size: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Regenerate multi-view meshes even when the `.glb` already exists
    #[serde(default)]
    pub refresh_multiview_meshes: bool,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            image_provider: default_image_provider(),
            texture_size: default_texture_size(),
            style: None,
            request_timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            refresh_multiview_meshes: false,
            limits: LimitsConfig::default(),
        }
    }
}

fn default_image_provider() -> String {
    "replicate".to_string()
}
fn default_texture_size() -> String {
    "1024x1024".to_string()
}
fn default_timeout_secs() -> u64 {
    1200
}
fn default_max_retries() -> usize {
    3
}

/// Parameter presets for the reconstruction model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    #[serde(default = "ReconstructionParams::multi_view")]
    pub multi_view: ReconstructionParams,
    #[serde(default = "ReconstructionParams::single_prop")]
    pub single_prop: ReconstructionParams,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            multi_view: ReconstructionParams::multi_view(),
            single_prop: ReconstructionParams::single_prop(),
        }
    }
}

/// Optional secondary mesh export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_blender_path")]
    pub blender_path: PathBuf,
    #[serde(default = "default_conversion_format")]
    pub format: String,
    /// Fail the build when conversion fails, instead of keeping the `.glb`
    #[serde(default)]
    pub fatal: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            blender_path: default_blender_path(),
            format: default_conversion_format(),
            fatal: false,
        }
    }
}

fn default_blender_path() -> PathBuf {
    PathBuf::from("blender")
}
fn default_conversion_format() -> String {
    "fbx".to_string()
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmithConfigFile {
    #[serde(default)]
    pub wiki: Option<WikiConfig>,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub generation: Option<GenerationConfig>,
    #[serde(default)]
    pub reconstruction: Option<ReconstructionConfig>,
    #[serde(default)]
    pub conversion: Option<ConversionConfig>,
}

/// Resolved configuration with environment variable overrides applied
#[derive(Debug, Clone, Default)]
pub struct SmithConfig {
    pub wiki: WikiConfig,
    pub providers: HashMap<String, ProviderConfig>,
    pub generation: GenerationConfig,
    pub reconstruction: ReconstructionConfig,
    pub conversion: ConversionConfig,
}

impl SmithConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = SmithConfig::default();

        // Layer 1: Global config (~/.smith/config.toml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 2: Project-local config (.smith/config.toml)
        let local_path = PathBuf::from(".smith/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            config.merge(local);
        }

        // Layer 3: Environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Load config from a specific file path only (for testing)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = SmithConfig::default();
        config.merge(Self::load_file(path)?);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Get API key for a provider
    pub fn api_key(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_key.as_deref())
            .filter(|k| !k.is_empty())
    }

    /// Get API URL override for a provider
    pub fn api_url(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_url.as_deref())
    }

    /// Check if a provider is enabled
    pub fn is_enabled(&self, provider_name: &str) -> bool {
        self.providers
            .get(provider_name)
            .map(|p| p.enabled)
            .unwrap_or(true)
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".smith").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<SmithConfigFile> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            SmithError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Overlay a config file onto this config; sections present in the
    /// overlay replace ours, provider entries merge field by field
    fn merge(&mut self, overlay: SmithConfigFile) {
        if let Some(wiki) = overlay.wiki {
            self.wiki = wiki;
        }

        for (name, provider) in overlay.providers {
            let entry = self.providers.entry(name).or_default();
            if provider.api_key.is_some() {
                entry.api_key = provider.api_key;
            }
            if provider.api_url.is_some() {
                entry.api_url = provider.api_url;
            }
            entry.enabled = provider.enabled;
        }

        if let Some(generation) = overlay.generation {
            self.generation = generation;
        }
        if let Some(reconstruction) = overlay.reconstruction {
            self.reconstruction = reconstruction;
        }
        if let Some(conversion) = overlay.conversion {
            self.conversion = conversion;
        }
    }

    fn apply_env_overrides(&mut self) {
        for (name, env_key) in PROVIDER_ENV_KEYS {
            if let Ok(key) = std::env::var(env_key) {
                let entry = self.providers.entry(name.to_string()).or_default();
                entry.api_key = Some(key);
            }
        }

        if let Ok(path) = std::env::var("SMITH_WIKI_PATH") {
            self.wiki.path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("SMITH_WIKI_CDN_URL") {
            self.wiki.cdn_url = url;
        }
        if let Ok(blender) = std::env::var("SMITH_BLENDER_PATH") {
            self.conversion.blender_path = PathBuf::from(blender);
        }
    }
}
