//! Rating Entry Points
//!
//! Options, pipeline orchestration and the versioned report records.

mod mock;
mod options;
mod pipeline;
mod report;

pub use mock::{mock_asr_words, mock_media_info, mock_ocr_frames};
pub use options::{BinaryPaths, CaptionQualityConfig, RatingOptions};
pub use pipeline::{rate_caption_quality, rate_sync_quality};
pub use report::{
    build_drift_timeline, AnalysisMetadata, CaptionQualityRatingOutput, DriftPoint,
    SyncRatingOutput, SCHEMA_VERSION,
};
