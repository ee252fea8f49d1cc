//! Whisper Transcription Engine
//!
//! Runs the `whisper` CLI with word timestamps and reads its JSON output.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{AsrEngine, AsrError, AsrModel, AsrResult, AsrTranscript};
use crate::process::{command, is_missing_binary, run, stderr_tail};
use crate::types::AsrWord;

// =============================================================================
// Transcript JSON
// =============================================================================

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// Parses whisper's JSON transcript into word timings.
///
/// Words are trimmed; empty words are dropped.
pub fn parse_whisper_json(json: &str) -> AsrResult<Vec<AsrWord>> {
    let output: WhisperOutput =
        serde_json::from_str(json).map_err(|e| AsrError::ParseError(e.to_string()))?;

    Ok(output
        .segments
        .into_iter()
        .flat_map(|segment| segment.words)
        .filter_map(|word| {
            let text = word.word.trim();
            (!text.is_empty()).then(|| AsrWord::new(text, word.start, word.end))
        })
        .collect())
}

// =============================================================================
// Engine
// =============================================================================

/// `whisper` command-line engine
#[derive(Debug, Clone)]
pub struct WhisperCliEngine {
    binary: PathBuf,
    model: AsrModel,
    language: Option<String>,
}

impl WhisperCliEngine {
    pub fn new(binary: impl Into<PathBuf>, model: AsrModel, language: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            model,
            language,
        }
    }
}

#[async_trait]
impl AsrEngine for WhisperCliEngine {
    fn name(&self) -> String {
        format!("whisper-{}", self.model.name())
    }

    async fn transcribe(&self, audio: &Path) -> AsrResult<AsrTranscript> {
        if !audio.exists() {
            return Err(AsrError::AudioNotFound(audio.display().to_string()));
        }
        let output_dir = audio.parent().unwrap_or_else(|| Path::new("."));

        let mut cmd = command(&self.binary);
        cmd.arg(audio)
            .args(["--model", self.model.name()])
            .args(["--word_timestamps", "True"])
            .args(["--output_format", "json"])
            .args(["--fp16", "False"])
            .arg("--output_dir")
            .arg(output_dir);
        if let Some(language) = &self.language {
            cmd.args(["--language", language.as_str()]);
        }

        info!(model = self.model.name(), "transcribing audio");
        let output = run(cmd).await.map_err(|e| {
            if is_missing_binary(&e) {
                AsrError::NotFound(self.binary.display().to_string())
            } else {
                AsrError::Io(e)
            }
        })?;

        if !output.status.success() {
            return Err(AsrError::TranscriptionError(stderr_tail(&output)));
        }

        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let transcript_path = output_dir.join(format!("{stem}.json"));
        let json = tokio::fs::read_to_string(&transcript_path).await.map_err(|e| {
            AsrError::TranscriptionError(format!(
                "missing transcript {}: {}",
                transcript_path.display(),
                e
            ))
        })?;

        let words = parse_whisper_json(&json)?;
        debug!(words = words.len(), "parsed whisper transcript");

        Ok(AsrTranscript {
            words,
            engine_name: self.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments_and_words() {
        let json = r#"{
            "text": " Hello there. General Kenobi.",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.2, "text": " Hello there.",
                 "words": [
                    {"word": " Hello", "start": 0.0, "end": 0.42, "probability": 0.98},
                    {"word": " there.", "start": 0.42, "end": 1.2, "probability": 0.91}
                 ]},
                {"id": 1, "start": 1.4, "end": 2.6, "text": " General Kenobi.",
                 "words": [
                    {"word": " General", "start": 1.4, "end": 1.9},
                    {"word": "  ", "start": 1.9, "end": 1.9},
                    {"word": " Kenobi.", "start": 1.9, "end": 2.6}
                 ]}
            ],
            "language": "en"
        }"#;

        let words = parse_whisper_json(json).unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(words[0], AsrWord::new("Hello", 0.0, 0.42));
        assert_eq!(words[3].word, "Kenobi.");
        assert_eq!(words[3].start_seconds, 1.9);
    }

    #[test]
    fn test_segments_without_words() {
        let words = parse_whisper_json(r#"{"segments": [{"text": "hi"}]}"#).unwrap();
        assert!(words.is_empty());
    }

    #[test]
    fn test_malformed_transcript() {
        assert!(matches!(
            parse_whisper_json("{\"segments\": 3}"),
            Err(AsrError::ParseError(_))
        ));
    }

    #[test]
    fn test_engine_name_includes_model() {
        let engine = WhisperCliEngine::new("whisper", AsrModel::Small, None);
        assert_eq!(engine.name(), "whisper-small");
    }

    #[tokio::test]
    async fn test_missing_audio() {
        let engine = WhisperCliEngine::new("whisper", AsrModel::Tiny, None);
        let result = engine.transcribe(Path::new("/no/such/audio.wav")).await;
        assert!(matches!(result, Err(AsrError::AudioNotFound(_))));
    }
}
