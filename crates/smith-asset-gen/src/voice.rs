//! Voice-line generation
//!
//! Speech is synthesized remotely and saved to
//! `<owner>/assets/voices/<name>.mp3`. Existing files are reused.

use crate::cache::{check_file_stem, voice_path, write_atomic, Artifact, CachePolicy, GenerationState, StageTracker};
use crate::provider::SpeechRequest;
use crate::services::Services;
use serde::{Deserialize, Serialize};
use smith_catalog::AssetOwner;
use smith_core::Result;
use std::path::Path;

/// A line of dialogue to voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLine {
    /// Output file stem
    pub name: String,
    pub text: String,
    pub emotion: String,
    pub voice_id: String,
}

impl VoiceLine {
    fn request(&self) -> SpeechRequest {
        SpeechRequest {
            text: self.text.clone(),
            emotion: self.emotion.clone(),
            voice_id: self.voice_id.clone(),
        }
    }
}

pub struct VoiceGenerator {
    services: Services,
}

impl VoiceGenerator {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn build(&self, owner: &AssetOwner, line: &VoiceLine) -> Result<Artifact> {
        check_file_stem(owner, &line.name)?;
        let path = voice_path(owner, &line.name);
        let mut tracker = StageTracker::new(format!("{}/{}", owner.name, line.name));

        if CachePolicy::SkipExisting.is_cached(&path) {
            tracker.transition(GenerationState::Skipped)?;
            tracing::info!(owner = %owner.label(), line = %line.name, "voice line exists, skipping");
            return Ok(Artifact::skipped(path));
        }

        if let Err(e) = self.generate(line, &path, &mut tracker) {
            return Err(tracker.fail(e));
        }
        tracing::info!(owner = %owner.label(), line = %line.name, path = %path.display(), "voice line saved");
        Ok(Artifact::saved(path))
    }

    fn generate(&self, line: &VoiceLine, path: &Path, tracker: &mut StageTracker) -> Result<()> {
        let speech = self.services.speech()?;

        tracker.transition(GenerationState::Generating)?;
        let audio_url = speech.synthesize(&line.request())?;

        tracker.transition(GenerationState::Downloading)?;
        let bytes = self.services.fetcher.fetch(&audio_url)?;
        write_atomic(path, &bytes)?;

        tracker.transition(GenerationState::Saved)
    }
}
