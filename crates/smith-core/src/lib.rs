//! Smith Core - Foundational types for the smith asset pipeline
//!
//! This crate provides the types every other smith crate depends on:
//! - `Node`, `Scene`, `Asset` - Catalog descriptors as stored on disk
//! - `AssetType`, `WikiType` - Closed tags used for dispatch and path layout
//! - Error types and Result alias

mod error;
mod types;

pub use error::{AssetFailure, Result, SmithError};
pub use types::{Asset, AssetType, GameObject, Node, Scene, WikiType};
