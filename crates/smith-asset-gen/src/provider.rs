//! Service contracts and request/result types
//!
//! Every external collaborator sits behind one of these traits. Calls are
//! blocking; the dispatcher moves them onto worker threads.

use serde::{Deserialize, Serialize};
use smith_core::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// Aspect ratio requested from the image service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:2")]
    Landscape,
    #[serde(rename = "2:3")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "3:2",
            AspectRatio::Portrait => "2:3",
        }
    }

    /// Classify a width/height ratio: [0.9, 1.1] is square, wider is
    /// landscape, narrower is portrait
    pub fn from_ratio(ratio: f64) -> Self {
        if (0.9..=1.1).contains(&ratio) {
            AspectRatio::Square
        } else if ratio > 1.1 {
            AspectRatio::Landscape
        } else {
            AspectRatio::Portrait
        }
    }

    /// Classify pixel dimensions; a zero height counts as square
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height == 0 {
            return AspectRatio::Square;
        }
        Self::from_ratio(width as f64 / height as f64)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to the generative-image service
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    /// Explicit pixel size (`"1024x1024"`), for services that take one
    pub size: Option<String>,
    /// Ask for an alpha background
    pub transparent: bool,
    /// Style/context reference images, by URL
    pub reference_images: Vec<String>,
    pub output_format: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::Square,
            size: None,
            transparent: false,
            reference_images: Vec::new(),
            output_format: "png".to_string(),
        }
    }
}

/// The image the service produced
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedImage {
    /// Hosted by the service; must be downloaded
    Url(String),
    /// Returned inline, already decoded
    Inline(Vec<u8>),
}

impl GeneratedImage {
    /// The hosted URL, if the service returned one
    pub fn url(&self) -> Option<&str> {
        match self {
            GeneratedImage::Url(url) => Some(url),
            GeneratedImage::Inline(_) => None,
        }
    }
}

/// Fixed parameter set for the 3-D reconstruction model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionParams {
    pub seed: u64,
    pub texture_size: u32,
    pub mesh_simplify: f64,
    pub generate_color: bool,
    pub generate_model: bool,
    pub randomize_seed: bool,
    pub generate_normal: bool,
    pub save_gaussian_ply: bool,
    pub return_no_background: bool,
    pub ss_sampling_steps: u32,
    pub slat_sampling_steps: u32,
    pub ss_guidance_strength: f64,
    pub slat_guidance_strength: f64,
}

impl ReconstructionParams {
    /// Preset for meshes built from three prepared views
    pub fn multi_view() -> Self {
        Self {
            seed: 0,
            texture_size: 2048,
            mesh_simplify: 0.9,
            generate_color: true,
            generate_model: true,
            randomize_seed: true,
            generate_normal: false,
            save_gaussian_ply: true,
            return_no_background: false,
            ss_sampling_steps: 50,
            slat_sampling_steps: 50,
            ss_guidance_strength: 10.0,
            slat_guidance_strength: 10.0,
        }
    }

    /// Cheaper preset for single-image props
    pub fn single_prop() -> Self {
        Self {
            ss_sampling_steps: 38,
            slat_sampling_steps: 12,
            ss_guidance_strength: 7.5,
            slat_guidance_strength: 3.0,
            ..Self::multi_view()
        }
    }
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self::multi_view()
    }
}

/// A request to the 3-D reconstruction service
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionRequest {
    pub images: Vec<String>,
    pub params: ReconstructionParams,
}

/// A request to the text-to-speech service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub emotion: String,
    pub voice_id: String,
}

/// Generative-image service
pub trait ImageGenerator: Send + Sync {
    /// Service name for logs and errors
    fn name(&self) -> &str;

    fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage>;
}

/// 3-D reconstruction service
pub trait MeshReconstructor: Send + Sync {
    fn name(&self) -> &str;

    /// Run reconstruction and return the URL of the binary mesh
    fn reconstruct(&self, request: &ReconstructionRequest) -> Result<String>;
}

/// Binary download; failures are reported as `DownloadFailure`
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Local mesh-format conversion tool
pub trait MeshConverter: Send + Sync {
    /// Convert `input` and return the sibling file written in `format`
    fn convert(&self, input: &Path, format: &str) -> Result<PathBuf>;
}

/// Text-to-speech service
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Synthesize speech and return the URL of the audio file
    fn synthesize(&self, request: &SpeechRequest) -> Result<String>;
}
