//! ASR Collaborator
//!
//! Produces word-level speech timings from extracted audio.

mod whisper;

pub use whisper::{parse_whisper_json, WhisperCliEngine};

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CoreError;
use crate::process::install_hint;
use crate::types::AsrWord;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during transcription
#[derive(Error, Debug)]
pub enum AsrError {
    /// ASR binary is not installed
    #[error("ASR binary not found: {0}")]
    NotFound(String),

    /// Audio file not found
    #[error("Audio file not found: {0}")]
    AudioNotFound(String),

    /// Transcription run failed
    #[error("Transcription failed: {0}")]
    TranscriptionError(String),

    /// Transcript JSON could not be parsed
    #[error("Failed to parse transcript: {0}")]
    ParseError(String),

    #[error("ASR process error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AsrResult<T> = Result<T, AsrError>;

impl From<AsrError> for CoreError {
    fn from(error: AsrError) -> Self {
        match error {
            AsrError::NotFound(binary) => CoreError::DependencyMissing {
                hint: install_hint(&binary),
                binary,
            },
            AsrError::ParseError(message) => CoreError::ValidationError(message),
            other => CoreError::sync_rating("transcribing audio", other),
        }
    }
}

// =============================================================================
// Model Types
// =============================================================================

/// Whisper model sizes offered to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsrModel {
    /// Fastest, lowest accuracy
    Tiny,
    /// Good balance
    #[default]
    Base,
    /// Better accuracy
    Small,
    /// High accuracy, slow
    Medium,
}

impl AsrModel {
    /// Model name as passed to the engine
    pub fn name(&self) -> &'static str {
        match self {
            AsrModel::Tiny => "tiny",
            AsrModel::Base => "base",
            AsrModel::Small => "small",
            AsrModel::Medium => "medium",
        }
    }
}

impl std::str::FromStr for AsrModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiny" => Ok(AsrModel::Tiny),
            "base" => Ok(AsrModel::Base),
            "small" => Ok(AsrModel::Small),
            "medium" => Ok(AsrModel::Medium),
            other => Err(format!(
                "unknown ASR model '{other}' (expected tiny, base, small or medium)"
            )),
        }
    }
}

/// Word timings for a whole audio file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsrTranscript {
    pub words: Vec<AsrWord>,
    pub engine_name: String,
}

/// Trait for speech recognition engines
#[async_trait]
pub trait AsrEngine: Send + Sync {
    /// Engine name recorded in reports
    fn name(&self) -> String;

    /// Transcribes a 16 kHz mono WAV file into word timings
    async fn transcribe(&self, audio: &Path) -> AsrResult<AsrTranscript>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names_round_trip() {
        for model in [AsrModel::Tiny, AsrModel::Base, AsrModel::Small, AsrModel::Medium] {
            assert_eq!(model.name().parse::<AsrModel>().unwrap(), model);
        }
        assert!("large".parse::<AsrModel>().is_err());
        assert_eq!(AsrModel::default(), AsrModel::Base);
    }

    #[test]
    fn test_error_conversion() {
        let missing: CoreError = AsrError::NotFound("whisper".into()).into();
        assert_eq!(missing.code(), "DEPENDENCY_MISSING");

        let parse: CoreError = AsrError::ParseError("bad".into()).into();
        assert_eq!(parse.code(), "VALIDATION_ERROR");

        let failed: CoreError = AsrError::TranscriptionError("oom".into()).into();
        assert_eq!(failed.code(), "SYNC_RATING_ERROR");
    }
}
