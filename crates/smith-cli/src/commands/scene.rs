//! `smith scene` - generate a scene's declared objects

use super::Context;
use anyhow::Result;
use smith_catalog::OwnerRef;

pub async fn run(ctx: &Context, location: &str, scene: &str) -> Result<()> {
    let reference = OwnerRef::scene(location, scene);
    super::assets::dispatch(ctx, &reference).await
}
