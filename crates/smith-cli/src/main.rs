//! Smith CLI - Command-line interface for the asset generation pipeline

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{assets, mesh, scene, voice, Context};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "smith")]
#[command(about = "Generate game assets for wiki nodes and scenes", long_about = None)]
#[command(version)]
struct Cli {
    /// Wiki root directory (overrides config)
    #[arg(long, global = true)]
    wiki: Option<PathBuf>,

    /// Use offline mock services instead of the real providers
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every declared asset of a node
    Assets {
        /// Node path (e.g., "forest_clearing" or "caladyn/aroth-kai")
        node: String,

        /// Node kind (location, character, item)
        #[arg(long, default_value = "location", value_parser = parse_kind)]
        kind: smith_core::WikiType,
    },

    /// Generate every declared object of a scene
    Scene {
        /// Location the scene belongs to
        location: String,

        /// Scene path under the location
        scene: String,
    },

    /// Build a node's mesh from its concept art
    Mesh {
        /// Node path
        node: String,

        /// Node kind (location, character, item)
        #[arg(long, default_value = "character", value_parser = parse_kind)]
        kind: smith_core::WikiType,

        /// Regenerate even if the mesh already exists
        #[arg(long)]
        refresh: bool,
    },

    /// Synthesize a voice line for a node
    Voice {
        /// Node path
        node: String,

        /// Node kind (location, character, item)
        #[arg(long, default_value = "character", value_parser = parse_kind)]
        kind: smith_core::WikiType,

        /// Output file stem
        #[arg(long)]
        name: String,

        /// Line to speak
        #[arg(long)]
        text: String,

        /// Delivery emotion
        #[arg(long, default_value = "neutral")]
        emotion: String,

        /// Speech-service voice identifier
        #[arg(long)]
        voice_id: String,
    },
}

fn parse_kind(s: &str) -> Result<smith_core::WikiType, String> {
    smith_core::WikiType::parse(s).ok_or_else(|| {
        format!(
            "unknown node kind '{}'; valid values: location, character, item",
            s
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smith=info,smith_asset_gen=info,smith_catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = Context::new(cli.wiki, cli.mock)?;

    match cli.command {
        Commands::Assets { node, kind } => assets::run(&ctx, kind, &node).await,
        Commands::Scene { location, scene } => scene::run(&ctx, &location, &scene).await,
        Commands::Mesh {
            node,
            kind,
            refresh,
        } => mesh::run(&ctx, kind, &node, refresh).await,
        Commands::Voice {
            node,
            kind,
            name,
            text,
            emotion,
            voice_id,
        } => {
            let line = smith_asset_gen::VoiceLine {
                name,
                text,
                emotion,
                voice_id,
            };
            voice::run(&ctx, kind, &node, line).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assets_command() {
        let cli = Cli::try_parse_from([
            "smith",
            "--mock",
            "assets",
            "caladyn/aroth-kai",
            "--kind",
            "character",
        ])
        .unwrap();

        assert!(cli.mock);
        match cli.command {
            Commands::Assets { node, kind } => {
                assert_eq!(node, "caladyn/aroth-kai");
                assert_eq!(kind, smith_core::WikiType::Character);
            }
            _ => panic!("expected assets command"),
        }
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["smith", "mesh", "well", "--kind", "planet"]).is_err());
    }
}
