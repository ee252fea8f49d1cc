//! FFmpeg Integration Module
//!
//! Wraps the two FFmpeg tools the rating pipeline needs:
//! - `ffprobe` for duration, frame size and stream layout
//! - `ffmpeg` for caption-band frame sampling and 16 kHz mono audio
//!
//! Binaries are resolved from explicit paths or the system PATH.

mod detection;
mod runner;

pub use detection::{find_in_paths, resolve_binary};
pub use runner::{
    frame_filter, parse_probe_output, verify_wav, FFmpegRunner, FrameExtraction, MediaInfo,
    ASR_SAMPLE_RATE,
};

use crate::error::CoreError;
use crate::process::install_hint;

/// FFmpeg-related error types
#[derive(Debug, thiserror::Error)]
pub enum FFmpegError {
    #[error("{0} not found. Please install FFmpeg or pass an explicit binary path.")]
    NotFound(String),

    #[error("FFmpeg execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("FFprobe error: {0}")]
    ProbeError(String),

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unexpected audio format: {0}")]
    AudioFormat(String),
}

pub type FFmpegResult<T> = Result<T, FFmpegError>;

impl FFmpegError {
    /// Classifies a spawn failure for `binary`
    pub(crate) fn spawn(binary: &std::path::Path, error: std::io::Error) -> Self {
        if crate::process::is_missing_binary(&error) {
            FFmpegError::NotFound(binary.display().to_string())
        } else {
            FFmpegError::ProcessError(error)
        }
    }
}

impl From<FFmpegError> for CoreError {
    fn from(error: FFmpegError) -> Self {
        match error {
            FFmpegError::NotFound(binary) => CoreError::DependencyMissing {
                hint: install_hint(&binary),
                binary,
            },
            FFmpegError::InvalidInput(path) => CoreError::FileNotFound(path),
            FFmpegError::ParseError(message) => CoreError::ValidationError(message),
            other => CoreError::sync_rating("running ffmpeg", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_error_display() {
        let err = FFmpegError::NotFound("ffprobe".to_string());
        assert!(err.to_string().contains("ffprobe not found"));

        let err = FFmpegError::ExecutionFailed("exit code 1".to_string());
        assert!(err.to_string().contains("exit code 1"));
    }

    #[test]
    fn test_conversion_into_core_error() {
        let missing: CoreError = FFmpegError::NotFound("ffmpeg".into()).into();
        assert_eq!(missing.code(), "DEPENDENCY_MISSING");

        let parse: CoreError = FFmpegError::ParseError("bad json".into()).into();
        assert_eq!(parse.code(), "VALIDATION_ERROR");

        let input: CoreError = FFmpegError::InvalidInput("a.mp4".into()).into();
        assert_eq!(input.code(), "FILE_NOT_FOUND");

        let failed: CoreError = FFmpegError::ExecutionFailed("boom".into()).into();
        assert_eq!(failed.code(), "SYNC_RATING_ERROR");
    }

    #[test]
    fn test_spawn_not_found_maps_to_missing_binary() {
        let err = FFmpegError::spawn(
            std::path::Path::new("ffmpeg"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, FFmpegError::NotFound(ref name) if name == "ffmpeg"));
    }
}
