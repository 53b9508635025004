//! Smith Asset Gen - AI-powered asset generation pipeline
//!
//! Generates textures, 3-D props, reference views and voice lines for
//! catalog nodes and scenes by driving external image, reconstruction and
//! speech services, and saves the results to a deterministic file tree.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod mesh;
pub mod object;
pub mod provider;
pub mod providers;
pub mod reference;
pub mod services;
pub mod texture;
pub mod voice;

pub use cache::{Artifact, CachePolicy, GenerationState};
pub use config::SmithConfig;
pub use dispatch::{AssetDispatcher, AssetOutcome, AssetReport, DispatchReport};
pub use mesh::MeshBuilder;
pub use object::ObjectBuilder;
pub use provider::{
    AspectRatio, Fetcher, GeneratedImage, ImageGenerator, ImageRequest, MeshConverter,
    MeshReconstructor, ReconstructionParams, ReconstructionRequest, SpeechRequest,
    SpeechSynthesizer,
};
pub use reference::{PreparedView, ReferencePreparer, ViewAngle};
pub use services::Services;
pub use texture::TextureGenerator;
pub use voice::{VoiceGenerator, VoiceLine};
