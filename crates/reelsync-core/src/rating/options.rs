//! Rating Options
//!
//! Configuration for both rating entry points. Every field has a default so
//! a partial JSON file (or `{}`) is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::asr::AsrModel;
use crate::captions::{CaptionQualityThresholds, CaptionQualityWeights};
use crate::error::{CoreError, CoreResult};
use crate::ocr::OcrEngineKind;
use crate::sync::SyncThresholds;
use crate::types::CaptionRegion;

const MIN_FPS: f64 = 0.1;
const MAX_FPS: f64 = 30.0;

fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

/// Clamps `value` in place, logging when it changed
fn clamp_field(field: &str, value: &mut f64, min: f64, max: f64) {
    let clamped = clamp_f64(*value, min, max);
    if clamped != *value {
        warn!(field, from = *value, to = clamped, "option out of range, clamped");
        *value = clamped;
    }
}

fn default_fps() -> f64 {
    2.0
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_min_ocr_confidence() -> f64 {
    0.3
}

fn default_true() -> bool {
    true
}

/// Thresholds and weights of the caption-quality analyzer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionQualityConfig {
    pub thresholds: CaptionQualityThresholds,
    pub weights: CaptionQualityWeights,
}

/// Binary overrides; bare names are looked up on PATH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BinaryPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub tesseract: String,
    pub whisper: String,
}

impl Default for BinaryPaths {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            tesseract: "tesseract".to_string(),
            whisper: "whisper".to_string(),
        }
    }
}

/// Options accepted by `rate_sync_quality` and `rate_caption_quality`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOptions {
    /// Sampling rate of the caption frames
    #[serde(default = "default_fps")]
    pub fps: f64,

    #[serde(default)]
    pub ocr_engine: OcrEngineKind,

    /// Tesseract language code
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    #[serde(default)]
    pub asr_model: AsrModel,

    /// Spoken language hint; auto-detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asr_language: Option<String>,

    #[serde(default)]
    pub caption_region: CaptionRegion,

    /// Only analyze the first N seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_seconds: Option<f64>,

    #[serde(default)]
    pub thresholds: SyncThresholds,

    #[serde(default)]
    pub caption_quality: CaptionQualityConfig,

    /// Frames below this OCR confidence contribute no word appearances
    #[serde(default = "default_min_ocr_confidence")]
    pub min_ocr_confidence: f64,

    /// Attach the caption-quality report to sync ratings
    #[serde(default = "default_true")]
    pub include_caption_quality: bool,

    /// Return deterministic synthetic data without invoking any binary
    #[serde(default)]
    pub mock: bool,

    #[serde(default)]
    pub binaries: BinaryPaths,

    /// Concurrent OCR processes; defaults to the CPU count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_concurrency: Option<usize>,
}

impl Default for RatingOptions {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            ocr_engine: OcrEngineKind::default(),
            ocr_language: default_ocr_language(),
            asr_model: AsrModel::default(),
            asr_language: None,
            caption_region: CaptionRegion::default(),
            max_seconds: None,
            thresholds: SyncThresholds::default(),
            caption_quality: CaptionQualityConfig::default(),
            min_ocr_confidence: default_min_ocr_confidence(),
            include_caption_quality: true,
            mock: false,
            binaries: BinaryPaths::default(),
            ocr_concurrency: None,
        }
    }
}

impl RatingOptions {
    /// Loads options from a JSON file and normalizes them
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut options: RatingOptions = serde_json::from_str(&contents).map_err(|e| {
            CoreError::ValidationError(format!("invalid options file {}: {}", path.display(), e))
        })?;
        options.normalize();
        Ok(options)
    }

    /// Clamps out-of-range values instead of rejecting them
    pub fn normalize(&mut self) {
        clamp_field("fps", &mut self.fps, MIN_FPS, MAX_FPS);

        let region = &mut self.caption_region;
        clamp_field("captionRegion.yRatio", &mut region.y_ratio, 0.0, 1.0);
        clamp_field(
            "captionRegion.heightRatio",
            &mut region.height_ratio,
            0.0,
            1.0 - region.y_ratio,
        );
        if region.height_ratio <= 0.0 {
            warn!("caption region has no height, using the default band");
            *region = CaptionRegion::default();
        }

        if let Some(limit) = self.max_seconds {
            if !limit.is_finite() || limit <= 0.0 {
                warn!(max_seconds = limit, "ignoring non-positive maxSeconds");
                self.max_seconds = None;
            }
        }

        if self.thresholds.min_rating > 100 {
            warn!(from = self.thresholds.min_rating, "thresholds.minRating above 100, clamped");
            self.thresholds.min_rating = 100;
        }
        clamp_field(
            "thresholds.maxMeanDriftMs",
            &mut self.thresholds.max_mean_drift_ms,
            0.0,
            f64::MAX,
        );
        clamp_field(
            "thresholds.maxMaxDriftMs",
            &mut self.thresholds.max_max_drift_ms,
            0.0,
            f64::MAX,
        );
        clamp_field("thresholds.minMatchRatio", &mut self.thresholds.min_match_ratio, 0.0, 1.0);
        clamp_field("minOcrConfidence", &mut self.min_ocr_confidence, 0.0, 1.0);

        let quality = &mut self.caption_quality.thresholds;
        clamp_field("captionQuality.minOverall", &mut quality.min_overall, 0.0, 1.0);
        clamp_field(
            "captionQuality.minCoverageRatio",
            &mut quality.min_coverage_ratio,
            0.0,
            1.0,
        );
        clamp_field("captionQuality.safeMarginRatio", &mut quality.safe_margin_ratio, 0.0, 0.5);

        let weights = &mut self.caption_quality.weights;
        for (name, weight) in [
            ("rhythm", &mut weights.rhythm),
            ("displayTime", &mut weights.display_time),
            ("coverage", &mut weights.coverage),
            ("density", &mut weights.density),
            ("punctuation", &mut weights.punctuation),
            ("capitalization", &mut weights.capitalization),
            ("ocrConfidence", &mut weights.ocr_confidence),
            ("safeArea", &mut weights.safe_area),
            ("flicker", &mut weights.flicker),
            ("alignment", &mut weights.alignment),
            ("placement", &mut weights.placement),
            ("jitter", &mut weights.jitter),
            ("style", &mut weights.style),
            ("redundancy", &mut weights.redundancy),
            ("segmentation", &mut weights.segmentation),
        ] {
            clamp_field(name, weight, 0.0, f64::MAX);
        }

        if self.ocr_concurrency == Some(0) {
            self.ocr_concurrency = None;
        }
    }

    /// Rejects selections that cannot be run
    pub fn validate(&self) -> CoreResult<()> {
        if self.ocr_engine != OcrEngineKind::Tesseract {
            return Err(CoreError::InvalidArgument(format!(
                "OCR engine '{}' is not supported; use 'tesseract'",
                self.ocr_engine.as_str()
            )));
        }
        Ok(())
    }

    /// Permits for concurrent OCR processes
    pub fn effective_ocr_concurrency(&self) -> usize {
        self.ocr_concurrency.unwrap_or_else(num_cpus::get).max(1)
    }
}
