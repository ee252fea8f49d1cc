//! OCR Collaborator
//!
//! Reads caption text from sampled frames. The engine sits behind the
//! [`OcrEngine`] trait; [`ocr_all_frames`] fans frames out over a bounded
//! number of concurrent recognitions and returns them in frame order.

mod appearances;
mod tesseract;

pub use appearances::extract_word_appearances;
pub use tesseract::{parse_tesseract_tsv, TesseractEngine};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::process::install_hint;
use crate::types::{BoundingBox, OcrFrame};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during OCR
#[derive(Error, Debug)]
pub enum OcrError {
    /// OCR binary is not installed
    #[error("OCR binary not found: {0}")]
    NotFound(String),

    /// The engine ran but failed on this image
    #[error("OCR failed: {0}")]
    RecognitionFailed(String),

    /// Engine output could not be parsed
    #[error("Failed to parse OCR output: {0}")]
    ParseError(String),

    /// Requested engine is not supported
    #[error("OCR engine '{0}' is not supported; use 'tesseract'")]
    UnsupportedEngine(String),

    #[error("OCR process error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OcrResult<T> = Result<T, OcrError>;

impl From<OcrError> for CoreError {
    fn from(error: OcrError) -> Self {
        match error {
            OcrError::NotFound(binary) => CoreError::DependencyMissing {
                hint: install_hint(&binary),
                binary,
            },
            OcrError::UnsupportedEngine(engine) => {
                CoreError::InvalidArgument(format!("unsupported OCR engine: {engine}"))
            }
            OcrError::ParseError(message) => CoreError::ValidationError(message),
            other => CoreError::sync_rating("running OCR", other),
        }
    }
}

// =============================================================================
// Engine Types
// =============================================================================

/// Selectable OCR engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    #[default]
    Tesseract,
    /// Accepted by the options schema but not supported
    EasyOcr,
}

impl OcrEngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrEngineKind::Tesseract => "tesseract",
            OcrEngineKind::EasyOcr => "easyocr",
        }
    }
}

impl std::str::FromStr for OcrEngineKind {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(OcrEngineKind::Tesseract),
            "easyocr" => Ok(OcrEngineKind::EasyOcr),
            other => Err(OcrError::UnsupportedEngine(other.to_string())),
        }
    }
}

/// One recognized word, in the coordinates of the OCR'd image
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    pub text: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Recognition result for one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    /// Lines joined with `\n`
    pub text: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub words: Vec<RecognizedWord>,
}

impl Recognition {
    /// Union of the word boxes
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::union_all(self.words.iter().map(|word| &word.bbox))
    }
}

/// Trait for OCR engines
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name for reports
    fn name(&self) -> &str;

    /// Recognizes text in one image
    async fn recognize(&self, image: &Path) -> OcrResult<Recognition>;
}

// =============================================================================
// Batch Recognition
// =============================================================================

fn to_frame(index: usize, fps: f64, crop_offset_y: u32, recognition: Recognition) -> OcrFrame {
    let frame_number = u32::try_from(index).unwrap_or(u32::MAX);
    OcrFrame {
        frame_number,
        timestamp_seconds: index as f64 / fps,
        bbox: recognition
            .bbox()
            .map(|bbox| bbox.offset_y(f64::from(crop_offset_y))),
        text: recognition.text,
        confidence: recognition.confidence.clamp(0.0, 1.0),
    }
}

/// Runs OCR over every frame, at most `max_concurrency` at a time.
///
/// A frame that fails to recognize is logged and becomes an empty,
/// zero-confidence frame. A missing OCR binary aborts the batch.
pub async fn ocr_all_frames(
    engine: Arc<dyn OcrEngine>,
    frame_paths: &[PathBuf],
    fps: f64,
    crop_offset_y: u32,
    max_concurrency: usize,
) -> OcrResult<Vec<OcrFrame>> {
    let fps = if fps > 0.0 { fps } else { 2.0 };
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, path) in frame_paths.iter().cloned().enumerate() {
        let engine = Arc::clone(&engine);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (index, path.clone(), engine.recognize(&path).await)
        });
    }

    let mut frames: Vec<Option<OcrFrame>> = vec![None; frame_paths.len()];
    let mut degraded = 0usize;

    while let Some(joined) = tasks.join_next().await {
        let (index, path, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                // index is lost with the task; the frame is backfilled as empty below
                warn!(panicked = e.is_panic(), "OCR task did not complete: {}", e);
                degraded += 1;
                continue;
            }
        };

        let recognition = match result {
            Ok(recognition) => recognition,
            Err(OcrError::NotFound(binary)) => {
                tasks.abort_all();
                return Err(OcrError::NotFound(binary));
            }
            Err(e) => {
                warn!(frame = %path.display(), "OCR failed, treating frame as empty: {}", e);
                degraded += 1;
                Recognition::default()
            }
        };
        frames[index] = Some(to_frame(index, fps, crop_offset_y, recognition));
    }

    let frames: Vec<OcrFrame> = frames
        .into_iter()
        .enumerate()
        .map(|(index, frame)| {
            frame.unwrap_or_else(|| {
                OcrFrame::empty(u32::try_from(index).unwrap_or(u32::MAX), index as f64 / fps)
            })
        })
        .collect();

    info!(
        frames = frames.len(),
        with_text = frames.iter().filter(|f| f.has_text()).count(),
        degraded = degraded,
        engine = engine.name(),
        "OCR complete"
    );

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Engine keyed on file name: `fail*` errors, `missing*` reports a missing
    /// binary, `crash*` panics inside the task
    struct ScriptedEngine;

    #[async_trait]
    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn recognize(&self, image: &Path) -> OcrResult<Recognition> {
            let stem = image
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            if stem.starts_with("fail") {
                return Err(OcrError::RecognitionFailed("unreadable".into()));
            }
            if stem.starts_with("missing") {
                return Err(OcrError::NotFound("tesseract".into()));
            }
            if stem.starts_with("crash") {
                panic!("engine crashed on {stem}");
            }
            Ok(Recognition {
                text: stem.clone(),
                confidence: 0.9,
                words: vec![RecognizedWord {
                    text: stem,
                    confidence: 0.9,
                    bbox: BoundingBox::new(100.0, 10.0, 300.0, 60.0),
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_frames_are_ordered_and_shifted() {
        let paths: Vec<PathBuf> = ["alpha", "beta", "gamma", "delta"]
            .iter()
            .map(|name| PathBuf::from(format!("{name}.png")))
            .collect();

        let frames = ocr_all_frames(Arc::new(ScriptedEngine), &paths, 2.0, 1248, 2)
            .await
            .unwrap();

        let texts: Vec<&str> = frames.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma", "delta"]);
        assert_eq!(frames[3].timestamp_seconds, 1.5);
        assert_eq!(frames[0].bbox, Some(BoundingBox::new(100.0, 1258.0, 300.0, 1308.0)));
    }

    #[tokio::test]
    async fn test_failed_frame_degrades_to_empty() {
        let paths = vec![PathBuf::from("ok.png"), PathBuf::from("fail.png")];
        let frames = ocr_all_frames(Arc::new(ScriptedEngine), &paths, 2.0, 0, 4)
            .await
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].text, "");
        assert_eq!(frames[1].confidence, 0.0);
        assert_eq!(frames[1].timestamp_seconds, 0.5);
    }

    #[tokio::test]
    async fn test_panicked_task_degrades_to_empty() {
        let paths = vec![
            PathBuf::from("one.png"),
            PathBuf::from("crash.png"),
            PathBuf::from("three.png"),
        ];
        let frames = ocr_all_frames(Arc::new(ScriptedEngine), &paths, 2.0, 0, 2)
            .await
            .unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].text, "one");
        assert_eq!(frames[1].text, "");
        assert_eq!(frames[1].frame_number, 1);
        assert_eq!(frames[1].timestamp_seconds, 0.5);
        assert_eq!(frames[2].text, "three");
    }

    #[tokio::test]
    async fn test_missing_binary_aborts() {
        let paths = vec![PathBuf::from("missing.png")];
        let result = ocr_all_frames(Arc::new(ScriptedEngine), &paths, 2.0, 0, 1).await;
        assert!(matches!(result, Err(OcrError::NotFound(_))));
    }

    #[test]
    fn test_engine_kind_parsing() {
        assert_eq!("Tesseract".parse::<OcrEngineKind>().unwrap(), OcrEngineKind::Tesseract);
        assert_eq!("easyocr".parse::<OcrEngineKind>().unwrap(), OcrEngineKind::EasyOcr);
        assert!("paddle".parse::<OcrEngineKind>().is_err());
        assert_eq!(
            serde_json::to_string(&OcrEngineKind::EasyOcr).unwrap(),
            "\"easyocr\""
        );
    }

    #[test]
    fn test_unsupported_engine_maps_to_invalid_argument() {
        let err: CoreError = OcrError::UnsupportedEngine("easyocr".into()).into();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}
