//! `smith assets` - generate a node's declared assets

use super::{print_report, Context};
use anyhow::Result;
use smith_asset_gen::AssetDispatcher;
use smith_catalog::OwnerRef;
use smith_core::WikiType;
use std::sync::Arc;

pub async fn run(ctx: &Context, kind: WikiType, node: &str) -> Result<()> {
    let reference = OwnerRef::node(kind, node);
    dispatch(ctx, &reference).await
}

/// Dispatch an owner's assets, print the summary and fail if any asset did
pub(crate) async fn dispatch(ctx: &Context, reference: &OwnerRef) -> Result<()> {
    let owner = ctx.store.load_owner(reference)?;
    let dispatcher = AssetDispatcher::new(ctx.services.clone(), &ctx.config);

    let report = dispatcher.dispatch(Arc::new(owner)).await?;
    print_report(&report);
    report.into_result()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smith_asset_gen::providers::mock::{MockCall, MockServices};
    use smith_asset_gen::{Services, SmithConfig};
    use smith_catalog::{CatalogStore, WikiLayout};
    use smith_core::{Asset, AssetType, Node};
    use tempfile::TempDir;

    fn context(root: &std::path::Path, mock: Arc<MockServices>) -> Context {
        Context {
            config: SmithConfig::default(),
            store: CatalogStore::new(WikiLayout::new(root, "https://cdn.example")),
            services: Services::mock(mock),
        }
    }

    fn texture(name: &str, kind: &str) -> Asset {
        Asset {
            name: name.to_string(),
            description: String::new(),
            kind: AssetType::from(kind.to_string()),
            prompt: format!("{} texture", name),
            quantity: None,
            placement_notes: None,
        }
    }

    fn save_clearing(ctx: &Context, assets: Vec<Asset>) {
        let node = Node {
            name: "Forest Clearing".to_string(),
            description: "A quiet glade".to_string(),
            style: "painterly".to_string(),
            assets,
        };
        ctx.store
            .save_node(WikiType::Location, "forest_clearing", &node)
            .unwrap();
    }

    #[tokio::test]
    async fn test_generates_declared_textures() {
        let wiki = TempDir::new().unwrap();
        let mock = Arc::new(MockServices::new());
        let ctx = context(wiki.path(), mock.clone());
        save_clearing(&ctx, vec![texture("mossy_rock", "texture")]);

        run(&ctx, WikiType::Location, "forest_clearing").await.unwrap();

        assert!(wiki
            .path()
            .join("locations/forest_clearing/assets/textures/mossy_rock.png")
            .is_file());
        assert_eq!(mock.calls(MockCall::Image), 1);
    }

    #[tokio::test]
    async fn test_failed_asset_fails_command() {
        let wiki = TempDir::new().unwrap();
        let ctx = context(wiki.path(), Arc::new(MockServices::new()));
        save_clearing(
            &ctx,
            vec![texture("mossy_rock", "texture"), texture("chime", "unknown")],
        );

        let err = run(&ctx, WikiType::Location, "forest_clearing")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 of 2 assets failed"));
    }

    #[tokio::test]
    async fn test_missing_descriptor() {
        let wiki = TempDir::new().unwrap();
        let ctx = context(wiki.path(), Arc::new(MockServices::new()));

        assert!(run(&ctx, WikiType::Location, "nowhere").await.is_err());
    }
}
