//! Output paths, idempotency policy and per-asset generation state
//!
//! Every generated file has one deterministic path derived from its owner
//! and a name. The existence of that file is the cache signal: builders
//! consult a [`CachePolicy`] before contacting any service.

use serde::{Deserialize, Serialize};
use smith_catalog::AssetOwner;
use smith_core::{Result, SmithError};
use std::fmt;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Whether an existing output file may be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Return the existing file without any service call
    SkipExisting,
    /// Always regenerate and overwrite
    AlwaysRegenerate,
}

impl CachePolicy {
    pub fn from_refresh_flag(refresh: bool) -> Self {
        if refresh {
            CachePolicy::AlwaysRegenerate
        } else {
            CachePolicy::SkipExisting
        }
    }

    /// True when `path` can be returned as-is
    pub fn is_cached(&self, path: &Path) -> bool {
        match self {
            CachePolicy::SkipExisting => path.is_file(),
            CachePolicy::AlwaysRegenerate => false,
        }
    }
}

/// `<owner>/assets/textures/<name>.png`
pub fn texture_path(owner: &AssetOwner, name: &str) -> PathBuf {
    owner
        .assets_dir()
        .join("textures")
        .join(format!("{}.png", name))
}

/// `<owner>/assets/models/<name>.glb`, the owner's multi-view mesh
pub fn model_path(owner: &AssetOwner, name: &str) -> PathBuf {
    owner.assets_dir().join("models").join(format!("{}.glb", name))
}

/// `<owner>/models/<name>.glb`, a single-prop object.
///
/// Kept outside `assets/models` so a prop never shares a path with the
/// owner's own mesh.
pub fn prop_path(owner: &AssetOwner, name: &str) -> PathBuf {
    owner.dir.join("models").join(format!("{}.glb", name))
}

/// `<owner>/assets/mesh_references/<owner>_<angle>.png`
pub fn mesh_reference_path(owner: &AssetOwner, angle: &str) -> PathBuf {
    owner
        .assets_dir()
        .join("mesh_references")
        .join(format!("{}_{}.png", owner.name, angle))
}

/// `<owner>/assets/voices/<name>.mp3`
pub fn voice_path(owner: &AssetOwner, name: &str) -> PathBuf {
    owner.assets_dir().join("voices").join(format!("{}.mp3", name))
}

/// Reject names that would not stay inside their output directory
pub fn check_file_stem(owner: &AssetOwner, name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single && !name.contains(['/', '\\']) {
        return Ok(());
    }
    Err(SmithError::InvalidAssetName {
        owner: owner.label(),
        name: name.to_string(),
    })
}

/// Write `bytes` to `path` via a temp file in the same directory, so the
/// final path only ever holds a complete file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        SmithError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        ))
    })?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SmithError::IoError(e.error))?;
    Ok(())
}

/// Where a single asset is in its generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    Pending,
    Skipped,
    Generating,
    Downloading,
    Saved,
    Failed,
}

impl GenerationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationState::Skipped | GenerationState::Saved | GenerationState::Failed
        )
    }

    pub fn can_transition_to(&self, next: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, next),
            (Pending, Skipped)
                | (Pending, Generating)
                | (Generating, Downloading)
                | (Downloading, Saved)
                | (Pending | Generating | Downloading, Failed)
        )
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationState::Pending => "pending",
            GenerationState::Skipped => "skipped",
            GenerationState::Generating => "generating",
            GenerationState::Downloading => "downloading",
            GenerationState::Saved => "saved",
            GenerationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Tracks one subject through the generation states, rejecting invalid
/// transitions
#[derive(Debug)]
pub struct StageTracker {
    subject: String,
    state: GenerationState,
}

impl StageTracker {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            state: GenerationState::Pending,
        }
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn transition(&mut self, next: GenerationState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SmithError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(subject = %self.subject, from = %self.state, to = %next, "state");
        self.state = next;
        Ok(())
    }

    /// Record a failure, passing the error through
    pub fn fail(&mut self, error: SmithError) -> SmithError {
        if !self.state.is_terminal() {
            tracing::debug!(subject = %self.subject, from = %self.state, "state -> failed");
            self.state = GenerationState::Failed;
        }
        error
    }
}

/// A file a builder produced or found
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    /// `Saved` or `Skipped`
    pub state: GenerationState,
    /// Converted sibling file, when conversion ran and succeeded
    pub secondary: Option<PathBuf>,
}

impl Artifact {
    pub fn saved(path: PathBuf) -> Self {
        Self {
            path,
            state: GenerationState::Saved,
            secondary: None,
        }
    }

    pub fn skipped(path: PathBuf) -> Self {
        Self {
            path,
            state: GenerationState::Skipped,
            secondary: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smith_catalog::OwnerRef;
    use smith_core::{Node, WikiType};
    use tempfile::TempDir;

    fn owner(dir: &Path) -> AssetOwner {
        let node = Node {
            name: "Forest Clearing".to_string(),
            description: String::new(),
            style: String::new(),
            assets: vec![],
        };
        AssetOwner::from_node(
            OwnerRef::node(WikiType::Location, "forest_clearing"),
            dir.to_path_buf(),
            node,
        )
    }

    #[test]
    fn test_output_paths() {
        let owner = owner(Path::new("/wiki/locations/forest_clearing"));
        assert_eq!(
            texture_path(&owner, "mossy_rock"),
            PathBuf::from("/wiki/locations/forest_clearing/assets/textures/mossy_rock.png")
        );
        assert_eq!(
            model_path(&owner, "stump"),
            PathBuf::from("/wiki/locations/forest_clearing/assets/models/stump.glb")
        );
        assert_eq!(
            prop_path(&owner, "stump"),
            PathBuf::from("/wiki/locations/forest_clearing/models/stump.glb")
        );
        assert_ne!(
            prop_path(&owner, "forest_clearing"),
            model_path(&owner, &owner.name)
        );
        assert_eq!(
            mesh_reference_path(&owner, "side"),
            PathBuf::from(
                "/wiki/locations/forest_clearing/assets/mesh_references/forest_clearing_side.png"
            )
        );
        assert_eq!(
            voice_path(&owner, "greeting"),
            PathBuf::from("/wiki/locations/forest_clearing/assets/voices/greeting.mp3")
        );
    }

    #[test]
    fn test_file_stems_stay_in_their_directory() {
        let owner = owner(Path::new("/wiki/locations/forest_clearing"));
        assert!(check_file_stem(&owner, "mossy_rock").is_ok());
        assert!(check_file_stem(&owner, "rock.v2").is_ok());

        for name in ["", ".", "..", "../escape", "a/b", "/etc/passwd", "rock/", "a\\b"] {
            assert!(
                matches!(
                    check_file_stem(&owner, name),
                    Err(SmithError::InvalidAssetName { .. })
                ),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_cache_policy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");

        assert!(!CachePolicy::SkipExisting.is_cached(&path));
        std::fs::write(&path, b"png").unwrap();
        assert!(CachePolicy::SkipExisting.is_cached(&path));
        assert!(!CachePolicy::AlwaysRegenerate.is_cached(&path));
        assert_eq!(CachePolicy::from_refresh_flag(true), CachePolicy::AlwaysRegenerate);
    }

    #[test]
    fn test_write_atomic_creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assets").join("textures").join("moss.png");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1, "temp file left behind");
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut tracker = StageTracker::new("mossy_rock");
        tracker.transition(GenerationState::Generating).unwrap();
        tracker.transition(GenerationState::Downloading).unwrap();
        tracker.transition(GenerationState::Saved).unwrap();
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut tracker = StageTracker::new("mossy_rock");
        let err = tracker.transition(GenerationState::Saved).unwrap_err();
        assert!(matches!(err, SmithError::InvalidTransition { .. }));

        tracker.transition(GenerationState::Skipped).unwrap();
        assert!(tracker.transition(GenerationState::Generating).is_err());
    }

    #[test]
    fn test_fail_from_any_stage() {
        let mut tracker = StageTracker::new("statue");
        tracker.transition(GenerationState::Generating).unwrap();
        let err = tracker.fail(SmithError::remote("mock", "boom"));
        assert_eq!(tracker.state(), GenerationState::Failed);
        assert!(matches!(err, SmithError::RemoteServiceFailure { .. }));
    }
}
