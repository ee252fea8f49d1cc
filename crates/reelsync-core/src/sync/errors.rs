//! Sync Error Types
//!
//! Defines classified sync/caption failures, severity levels, and
//! remediation suggestions.

use serde::{Deserialize, Serialize};

use crate::types::TimeSec;

/// Time range for locating an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    /// Start time in seconds
    pub start_sec: TimeSec,
    /// End time in seconds
    pub end_sec: TimeSec,
}

impl TimeRange {
    /// Creates a new time range, swapping inverted bounds
    pub fn new(start_sec: TimeSec, end_sec: TimeSec) -> Self {
        Self {
            start_sec: start_sec.min(end_sec),
            end_sec: start_sec.max(end_sec),
        }
    }

    /// Smallest range covering all given times; `None` when empty
    pub fn spanning(times: impl IntoIterator<Item = TimeSec>) -> Option<Self> {
        times.into_iter().fold(None, |acc, time| match acc {
            Some(TimeRange { start_sec, end_sec }) => {
                Some(TimeRange::new(start_sec.min(time), end_sec.max(time)))
            }
            None => Some(TimeRange::new(time, time)),
        })
    }
}

/// Severity level of a sync error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Potential issue, review recommended
    Warning,
    /// Definite issue that should be fixed
    Error,
    /// Blocking issue, the captions are unusable
    Critical,
}

/// Classified failure pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorType {
    LowMatchRatio,
    GlobalOffset,
    SporadicErrors,
    CaptionQualityLow,
    CaptionFlicker,
    CaptionSafeArea,
    CaptionDensity,
    CaptionPunctuation,
    CaptionCapitalization,
    CaptionLegibility,
}

/// Suggested remediation for an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedFix {
    /// Description of the fix
    pub description: String,
    /// Caption shift to apply, in milliseconds (global offsets only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_ms: Option<f64>,
}

impl SuggestedFix {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            offset_ms: None,
        }
    }

    pub fn with_offset_ms(mut self, offset_ms: f64) -> Self {
        self.offset_ms = Some(offset_ms);
        self
    }
}

/// A classified sync or caption-quality failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncError {
    #[serde(rename = "type")]
    pub error_type: SyncErrorType,
    pub severity: Severity,
    /// Human-readable message explaining the issue
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub affected_words: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<SuggestedFix>,
}

impl SyncError {
    /// Creates a new error
    pub fn new(error_type: SyncErrorType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            error_type,
            severity,
            message: message.into(),
            time_range: None,
            affected_words: Vec::new(),
            suggested_fix: None,
        }
    }

    /// Sets the time range location
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    /// Sets the affected words
    pub fn with_words(mut self, words: Vec<String>) -> Self {
        self.affected_words = words;
        self
    }

    /// Sets the suggested fix
    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.suggested_fix = Some(fix);
        self
    }
}

/// Number of errors at the given severity
pub fn count_by_severity(errors: &[SyncError], severity: Severity) -> usize {
    errors.iter().filter(|e| e.severity == severity).count()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_spanning() {
        let range = TimeRange::spanning([3.0, 1.0, 2.5]).unwrap();
        assert_eq!(range.start_sec, 1.0);
        assert_eq!(range.end_sec, 3.0);
        assert!(TimeRange::spanning(std::iter::empty()).is_none());
    }

    #[test]
    fn test_time_range_inversion() {
        let range = TimeRange::new(10.0, 5.0);
        assert_eq!(range.start_sec, 5.0);
        assert_eq!(range.end_sec, 10.0);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn test_sync_error_builder() {
        let error = SyncError::new(SyncErrorType::GlobalOffset, Severity::Error, "late")
            .with_time_range(TimeRange::new(1.0, 2.0))
            .with_words(vec!["hello".to_string()])
            .with_fix(SuggestedFix::new("shift").with_offset_ms(-120.0));

        assert_eq!(error.affected_words, vec!["hello"]);
        assert_eq!(error.suggested_fix.unwrap().offset_ms, Some(-120.0));
    }

    #[test]
    fn test_sync_error_serializes_type_key() {
        let error = SyncError::new(SyncErrorType::LowMatchRatio, Severity::Critical, "low");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "low_match_ratio");
        assert_eq!(json["severity"], "critical");
        assert!(json.get("timeRange").is_none());
    }

    #[test]
    fn test_count_by_severity() {
        let errors = vec![
            SyncError::new(SyncErrorType::CaptionFlicker, Severity::Warning, "a"),
            SyncError::new(SyncErrorType::CaptionDensity, Severity::Warning, "b"),
            SyncError::new(SyncErrorType::GlobalOffset, Severity::Error, "c"),
        ];
        assert_eq!(count_by_severity(&errors, Severity::Warning), 2);
        assert_eq!(count_by_severity(&errors, Severity::Critical), 0);
    }
}
