//! Error types for smith

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for smith operations
#[derive(Debug, Error)]
pub enum SmithError {
    #[error("No assets declared for {0}")]
    NoAssetsDeclared(String),

    #[error("No concept-art images found for {0}")]
    NoReferenceImages(String),

    #[error("Unsupported asset type '{kind}' for asset {asset}")]
    UnsupportedAssetType { asset: String, kind: String },

    #[error("Duplicate asset name '{asset}' in {owner}")]
    DuplicateAssetName { owner: String, asset: String },

    #[error("Invalid output name '{name}' in {owner}: must be a single path segment")]
    InvalidAssetName { owner: String, name: String },

    #[error("{service} request failed: {message}")]
    RemoteServiceFailure { service: String, message: String },

    #[error("Failed to download {url}: {source}")]
    DownloadFailure {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Malformed metadata in {}: {message}", .path.display())]
    MalformedCacheMetadata { path: PathBuf, message: String },

    #[error("Descriptor not found: {}", .0.display())]
    DescriptorNotFound(PathBuf),

    #[error("Mesh conversion failed: {0}")]
    ConversionFailure(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{} of {total} assets failed for {owner}: {}", .failures.len(), FailureList(.failures))]
    BatchFailed {
        owner: String,
        total: usize,
        failures: Vec<AssetFailure>,
    },

    #[error("Task for asset {asset} did not complete: {message}")]
    TaskFailed { asset: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),
}

/// Result type alias for smith operations
pub type Result<T> = std::result::Result<T, SmithError>;

impl SmithError {
    /// Shorthand for a failed call to an external service
    pub fn remote(service: impl Into<String>, message: impl fmt::Display) -> Self {
        SmithError::RemoteServiceFailure {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a transport error with the URL that was being fetched
    pub fn download<E>(url: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        SmithError::DownloadFailure {
            url: url.into(),
            source: source.into(),
        }
    }
}

/// One failed asset inside a batch
#[derive(Debug)]
pub struct AssetFailure {
    pub asset: String,
    pub error: SmithError,
}

struct FailureList<'a>(&'a [AssetFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} ({})", failure.asset, failure.error)?;
        }
        Ok(())
    }
}

impl From<serde_json::Error> for SmithError {
    fn from(err: serde_json::Error) -> Self {
        SmithError::JsonError(err.to_string())
    }
}

impl From<toml::de::Error> for SmithError {
    fn from(err: toml::de::Error) -> Self {
        SmithError::TomlParseError(err.to_string())
    }
}
