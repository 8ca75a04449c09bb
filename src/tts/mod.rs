//! Narration synthesis boundary.
//!
//! The TTS engines themselves are external collaborators behind the
//! [`SpeechSynthesizer`] trait. This module resolves the run's voice
//! specification into a concrete selection once, and applies the
//! fallback chain: cloned voice, then catalog voice, then a silent
//! placeholder track.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::warn;

use crate::config::{Gender, VoiceCatalog, VoiceSpec};
use crate::error::{PipelineError, Result};
use crate::media::MediaEngine;

/// Duration of the silent placeholder when narration fails entirely.
pub const SILENT_FALLBACK_SECONDS: f64 = 3.0;

/// A voice selection resolved against the catalog, fixed for the run.
#[derive(Debug, Clone)]
pub enum VoiceSelection {
    /// A catalog voice. `voice_id` is `None` when the catalog has no
    /// entry for the language/gender pair; the synthesizer then uses
    /// its own default for the language.
    BuiltIn {
        language: String,
        gender: Gender,
        voice_id: Option<String>,
    },
    /// A cloned voice driven by a reference recording.
    Cloned {
        reference_wav: PathBuf,
        language: String,
    },
}

/// External speech synthesizer: maps narration text to an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceSelection) -> Result<PathBuf>;
}

/// Resolve the run's voice specification against the catalog.
///
/// Returns the primary selection and, for cloned voices, the catalog
/// selection to fall back to when cloning fails.
pub fn resolve_voice(
    spec: &VoiceSpec,
    catalog: &VoiceCatalog,
    default_language: &str,
) -> (VoiceSelection, Option<VoiceSelection>) {
    match spec {
        VoiceSpec::BuiltIn {
            language,
            gender,
            voice_id,
        } => {
            let resolved = voice_id
                .clone()
                .or_else(|| catalog.lookup(language, *gender).map(str::to_string));
            (
                VoiceSelection::BuiltIn {
                    language: language.clone(),
                    gender: *gender,
                    voice_id: resolved,
                },
                None,
            )
        }
        VoiceSpec::Cloned {
            reference_wav,
            language,
        } => {
            let language = language.clone().unwrap_or_else(|| default_language.to_string());
            let fallback_gender = Gender::default();
            let fallback = VoiceSelection::BuiltIn {
                language: language.clone(),
                gender: fallback_gender,
                voice_id: catalog
                    .lookup(&language, fallback_gender)
                    .map(str::to_string),
            };
            (
                VoiceSelection::Cloned {
                    reference_wav: reference_wav.clone(),
                    language,
                },
                Some(fallback),
            )
        }
    }
}

/// Synthesize narration with the full fallback chain.
///
/// On total TTS failure a silent track is written to `silent_output`;
/// only the silent track itself failing is an error (which skips the
/// slide upstream).
pub async fn synthesize_with_fallback(
    synthesizer: &dyn SpeechSynthesizer,
    media: &dyn MediaEngine,
    text: &str,
    primary: &VoiceSelection,
    fallback: Option<&VoiceSelection>,
    silent_output: &Path,
) -> Result<PathBuf> {
    match synthesizer.synthesize(text, primary).await {
        Ok(path) if path.exists() => return Ok(path),
        Ok(path) => {
            warn!("synthesizer reported success but wrote nothing: {}", path.display());
        }
        Err(e) => {
            warn!("narration synthesis failed: {e}");
        }
    }

    if let Some(fallback) = fallback {
        match synthesizer.synthesize(text, fallback).await {
            Ok(path) if path.exists() => return Ok(path),
            Ok(_) => warn!("fallback synthesizer wrote nothing"),
            Err(e) => warn!("fallback narration synthesis failed: {e}"),
        }
    }

    warn!("all narration paths failed, inserting {SILENT_FALLBACK_SECONDS}s of silence");
    media
        .silent_track(SILENT_FALLBACK_SECONDS, silent_output)
        .map_err(|e| PipelineError::TtsGeneration(format!("silent fallback failed: {e}")))?;
    Ok(silent_output.to_path_buf())
}
