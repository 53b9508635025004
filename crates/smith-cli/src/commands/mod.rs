//! CLI command implementations

pub mod assets;
pub mod mesh;
pub mod scene;
pub mod voice;

use anyhow::{Context as _, Result};
use smith_asset_gen::providers::mock::MockServices;
use smith_asset_gen::{AssetOutcome, DispatchReport, Services, SmithConfig};
use smith_catalog::{CatalogStore, WikiLayout};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs, built once at startup
pub struct Context {
    pub config: SmithConfig,
    pub store: CatalogStore,
    pub services: Services,
}

impl Context {
    pub fn new(wiki: Option<PathBuf>, mock: bool) -> Result<Self> {
        let mut config = SmithConfig::load().context("failed to load configuration")?;
        if let Some(path) = wiki {
            config.wiki.path = path;
        }

        let services = if mock {
            tracing::info!("using mock services");
            Services::mock(Arc::new(MockServices::new()))
        } else {
            Services::from_config(&config)?
        };

        let store = CatalogStore::new(WikiLayout::new(
            config.wiki.path.clone(),
            config.wiki.cdn_url.clone(),
        ));

        Ok(Self {
            config,
            store,
            services,
        })
    }
}

/// Print one line per asset plus a totals line
pub fn print_report(report: &DispatchReport) {
    println!("{}:", report.owner);
    for entry in &report.assets {
        match &entry.outcome {
            AssetOutcome::Saved { path, secondary } => {
                println!("  saved    {} ({}) -> {}", entry.asset, entry.kind, path.display());
                if let Some(secondary) = secondary {
                    println!("           + {}", secondary.display());
                }
            }
            AssetOutcome::Skipped { path } => {
                println!("  exists   {} ({}) -> {}", entry.asset, entry.kind, path.display());
            }
            AssetOutcome::Ignored => {
                println!("  ignored  {} ({})", entry.asset, entry.kind);
            }
            AssetOutcome::Failed(e) => {
                println!("  FAILED   {} ({}): {}", entry.asset, entry.kind, e);
            }
        }
    }
    println!(
        "\n{} saved, {} existing, {} ignored, {} failed",
        report.saved(),
        report.skipped(),
        report.ignored(),
        report.failed()
    );
}
