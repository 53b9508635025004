//! Smith Catalog - Wiki layout and descriptor storage
//!
//! This crate resolves where catalog nodes and scenes live on disk, loads
//! and saves their JSON descriptors, and discovers the concept art the
//! generation pipeline uses as reference material.

mod layout;
mod owner;
mod store;

pub use layout::{OwnerRef, WikiLayout};
pub use owner::AssetOwner;
pub use store::CatalogStore;
