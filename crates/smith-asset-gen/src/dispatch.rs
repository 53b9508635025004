//! Asset dispatch
//!
//! Fans out one task per declared asset of a node or scene and routes it
//! by type: textures to [`TextureGenerator`], objects to [`ObjectBuilder`],
//! audio to a no-op. Blocking work runs on the blocking pool behind a
//! per-route semaphore.
//!
//! Every launched task runs to completion; nothing is cancelled when a
//! sibling fails. The caller gets one outcome per declared asset.

use crate::cache::{check_file_stem, Artifact, GenerationState};
use crate::config::SmithConfig;
use crate::object::ObjectBuilder;
use crate::services::Services;
use crate::texture::TextureGenerator;
use smith_catalog::AssetOwner;
use smith_core::{Asset, AssetFailure, AssetType, Result, SmithError};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// What happened to one declared asset
#[derive(Debug)]
pub enum AssetOutcome {
    Saved {
        path: PathBuf,
        secondary: Option<PathBuf>,
    },
    Skipped {
        path: PathBuf,
    },
    /// Audio assets are accepted but not generated
    Ignored,
    Failed(SmithError),
}

impl AssetOutcome {
    fn from_result(result: Result<Artifact>) -> Self {
        match result {
            Ok(artifact) if artifact.state == GenerationState::Skipped => AssetOutcome::Skipped {
                path: artifact.path,
            },
            Ok(artifact) => AssetOutcome::Saved {
                path: artifact.path,
                secondary: artifact.secondary,
            },
            Err(e) => AssetOutcome::Failed(e),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AssetOutcome::Failed(_))
    }
}

/// Outcome of one declared asset
#[derive(Debug)]
pub struct AssetReport {
    pub asset: String,
    pub kind: AssetType,
    pub outcome: AssetOutcome,
}

/// Outcomes for every declared asset, in declaration order
#[derive(Debug)]
pub struct DispatchReport {
    pub owner: String,
    pub assets: Vec<AssetReport>,
}

impl DispatchReport {
    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Saved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Skipped { .. }))
    }

    pub fn ignored(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Ignored))
    }

    pub fn failed(&self) -> usize {
        self.count(AssetOutcome::is_failure)
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&AssetOutcome) -> bool) -> usize {
        self.assets.iter().filter(|a| pred(&a.outcome)).count()
    }

    /// The report itself when nothing failed, `BatchFailed` otherwise
    pub fn into_result(self) -> Result<DispatchReport> {
        if self.is_success() {
            return Ok(self);
        }

        let total = self.assets.len();
        let failures = self
            .assets
            .into_iter()
            .filter_map(|report| match report.outcome {
                AssetOutcome::Failed(error) => Some(AssetFailure {
                    asset: report.asset,
                    error,
                }),
                _ => None,
            })
            .collect();

        Err(SmithError::BatchFailed {
            owner: self.owner,
            total,
            failures,
        })
    }
}

/// Routes an owner's declared assets to their builders
pub struct AssetDispatcher {
    textures: Arc<TextureGenerator>,
    objects: Arc<ObjectBuilder>,
    texture_gate: Arc<Semaphore>,
    object_gate: Arc<Semaphore>,
}

impl AssetDispatcher {
    pub fn new(services: Services, config: &SmithConfig) -> Self {
        let limits = &config.generation.limits;
        Self {
            textures: Arc::new(TextureGenerator::new(services.clone(), &config.generation)),
            objects: Arc::new(ObjectBuilder::new(services, config)),
            texture_gate: Arc::new(Semaphore::new(limits.texture_tasks.max(1))),
            object_gate: Arc::new(Semaphore::new(limits.object_tasks.max(1))),
        }
    }

    /// Dispatch every declared asset and wait for all of them.
    ///
    /// Fails up front, before any service call, when the owner declares
    /// no assets or declares two assets with the same name. Per-asset
    /// failures are reported in the returned [`DispatchReport`].
    pub async fn dispatch(&self, owner: Arc<AssetOwner>) -> Result<DispatchReport> {
        if owner.assets.is_empty() {
            return Err(SmithError::NoAssetsDeclared(owner.label()));
        }
        check_asset_names(&owner)?;

        tracing::info!(owner = %owner.label(), assets = owner.assets.len(), "dispatching assets");

        let mut outcomes: Vec<Option<AssetOutcome>> = Vec::with_capacity(owner.assets.len());
        let mut tasks = JoinSet::new();

        for (index, asset) in owner.assets.iter().enumerate() {
            let outcome = match &asset.kind {
                AssetType::Audio => {
                    tracing::debug!(asset = %asset.name, "audio assets are not generated");
                    Some(AssetOutcome::Ignored)
                }
                AssetType::Unsupported(kind) => {
                    tracing::warn!(asset = %asset.name, kind = %kind, "unsupported asset type");
                    Some(AssetOutcome::Failed(SmithError::UnsupportedAssetType {
                        asset: asset.name.clone(),
                        kind: kind.clone(),
                    }))
                }
                AssetType::Texture => {
                    let builder = self.textures.clone();
                    let gate = self.texture_gate.clone();
                    let owner = owner.clone();
                    tasks.spawn(async move {
                        let result = run_gated(gate, &owner, index, move |owner, asset| {
                            builder.build(owner, asset)
                        })
                        .await;
                        (index, result)
                    });
                    None
                }
                AssetType::Object => {
                    let builder = self.objects.clone();
                    let gate = self.object_gate.clone();
                    let owner = owner.clone();
                    tasks.spawn(async move {
                        let result = run_gated(gate, &owner, index, move |owner, asset| {
                            builder.build(owner, asset)
                        })
                        .await;
                        (index, result)
                    });
                    None
                }
            };
            outcomes.push(outcome);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => outcomes[index] = Some(AssetOutcome::from_result(result)),
                Err(e) => tracing::error!(owner = %owner.label(), error = %e, "asset task aborted"),
            }
        }

        let assets: Vec<AssetReport> = owner
            .assets
            .iter()
            .zip(outcomes)
            .map(|(asset, outcome)| {
                let outcome = outcome.unwrap_or_else(|| {
                    AssetOutcome::Failed(SmithError::TaskFailed {
                        asset: asset.name.clone(),
                        message: "task aborted before reporting".to_string(),
                    })
                });
                if let AssetOutcome::Failed(ref e) = outcome {
                    tracing::warn!(owner = %owner.label(), asset = %asset.name, error = %e, "asset failed");
                }
                AssetReport {
                    asset: asset.name.clone(),
                    kind: asset.kind.clone(),
                    outcome,
                }
            })
            .collect();

        let report = DispatchReport {
            owner: owner.label(),
            assets,
        };
        tracing::info!(
            owner = %report.owner,
            saved = report.saved(),
            skipped = report.skipped(),
            ignored = report.ignored(),
            failed = report.failed(),
            "dispatch finished"
        );
        Ok(report)
    }

    /// Dispatch and fail with `BatchFailed` if any asset failed
    pub async fn run(&self, owner: Arc<AssetOwner>) -> Result<DispatchReport> {
        self.dispatch(owner).await?.into_result()
    }
}

/// Wait for a permit, then run `build` on the blocking pool
async fn run_gated<F>(
    gate: Arc<Semaphore>,
    owner: &Arc<AssetOwner>,
    index: usize,
    build: F,
) -> Result<Artifact>
where
    F: FnOnce(&AssetOwner, &Asset) -> Result<Artifact> + Send + 'static,
{
    let asset_name = owner.assets[index].name.clone();
    let _permit = gate.acquire_owned().await.map_err(|e| SmithError::TaskFailed {
        asset: asset_name.clone(),
        message: e.to_string(),
    })?;

    let owner = owner.clone();
    tokio::task::spawn_blocking(move || build(&owner, &owner.assets[index]))
        .await
        .map_err(|e| SmithError::TaskFailed {
            asset: asset_name,
            message: e.to_string(),
        })?
}

fn check_asset_names(owner: &AssetOwner) -> Result<()> {
    let mut seen = HashSet::new();
    for asset in &owner.assets {
        check_file_stem(owner, &asset.name)?;
        if !seen.insert(asset.name.as_str()) {
            return Err(SmithError::DuplicateAssetName {
                owner: owner.label(),
                asset: asset.name.clone(),
            });
        }
    }
    Ok(())
}
