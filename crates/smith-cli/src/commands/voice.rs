//! `smith voice` - synthesize a voice line for a node

use super::Context;
use anyhow::{Context as _, Result};
use smith_asset_gen::{GenerationState, VoiceGenerator, VoiceLine};
use smith_catalog::OwnerRef;
use smith_core::WikiType;

pub async fn run(ctx: &Context, kind: WikiType, node: &str, line: VoiceLine) -> Result<()> {
    let owner = ctx.store.load_owner(&OwnerRef::node(kind, node))?;
    let generator = VoiceGenerator::new(ctx.services.clone());

    let artifact = tokio::task::spawn_blocking(move || generator.build(&owner, &line))
        .await
        .context("voice task panicked")??;

    match artifact.state {
        GenerationState::Skipped => println!("Voice line exists: {}", artifact.path.display()),
        _ => println!("Voice line saved: {}", artifact.path.display()),
    }
    Ok(())
}
