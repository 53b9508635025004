//! `smith mesh` - build a node's mesh from its concept art

use super::Context;
use anyhow::{Context as _, Result};
use smith_asset_gen::{CachePolicy, GenerationState, MeshBuilder};
use smith_catalog::OwnerRef;
use smith_core::WikiType;

pub async fn run(ctx: &Context, kind: WikiType, node: &str, refresh: bool) -> Result<()> {
    let reference = OwnerRef::node(kind, node);
    let owner = ctx.store.load_owner(&reference)?;
    let arts = ctx.store.art_urls(&reference)?;
    tracing::info!(owner = %reference, arts = arts.len(), "building mesh");

    let mut builder = MeshBuilder::new(ctx.services.clone(), &ctx.config);
    if refresh {
        builder = builder.with_policy(CachePolicy::AlwaysRegenerate);
    }

    let artifact = tokio::task::spawn_blocking(move || builder.build(&owner, &arts))
        .await
        .context("mesh task panicked")??;

    match artifact.state {
        GenerationState::Skipped => println!("Mesh exists: {}", artifact.path.display()),
        _ => println!("Mesh saved: {}", artifact.path.display()),
    }
    if let Some(secondary) = artifact.secondary {
        println!("  Converted: {}", secondary.display());
    }
    Ok(())
}
