//! Caption/Audio Sync Analysis
//!
//! Word matching, drift statistics, rating, and error classification.

pub mod detector;
pub mod errors;
pub mod matcher;
pub mod rating;
pub mod stats;

pub use detector::{caption_quality_errors, detect_sync_errors};
pub use errors::{count_by_severity, Severity, SuggestedFix, SyncError, SyncErrorType, TimeRange};
pub use matcher::{match_words, nearest_timestamp, MatchQuality, WordMatch};
pub use rating::{rate, RatingLabel, SyncRating, SyncThresholds};
pub use stats::{compute_sync_metrics, SyncMetrics};
