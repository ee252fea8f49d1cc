//! FFmpeg Runner Module
//!
//! Executes ffprobe/ffmpeg for the rating pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{FFmpegError, FFmpegResult};
use crate::process::{command, run, stderr_tail};
use crate::types::{CaptionRegion, FrameSize};

/// Sample rate expected by the speech recognizer
pub const ASR_SAMPLE_RATE: u32 = 16_000;

/// Media information extracted by FFprobe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration_sec: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Native frame rate
    pub fps: f64,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// Sampled caption-band frames on disk
#[derive(Debug, Clone, PartialEq)]
pub struct FrameExtraction {
    pub frame_directory: PathBuf,
    /// Frame images in time order
    pub frame_paths: Vec<PathBuf>,
    pub frame_count: usize,
    pub full_frame_size: FrameSize,
    /// Pixel row of the crop in the full frame
    pub crop_offset_y: u32,
    pub video_duration_seconds: f64,
}

/// `fps=F,crop=...` filter that samples the caption band
pub fn frame_filter(fps: f64, region: &CaptionRegion) -> String {
    format!(
        "fps={},crop=iw:ih*{}:0:ih*{}",
        fps, region.height_ratio, region.y_ratio
    )
}

/// FFmpeg runner for executing commands
#[derive(Debug, Clone)]
pub struct FFmpegRunner {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FFmpegRunner {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    fn ensure_input(input: &Path) -> FFmpegResult<()> {
        if !input.exists() {
            return Err(FFmpegError::InvalidInput(input.display().to_string()));
        }
        Ok(())
    }

    async fn run_ffmpeg(&self, args: Vec<String>, stage: &str) -> FFmpegResult<()> {
        let mut cmd = command(&self.ffmpeg_path);
        cmd.args(&args);
        let output = run(cmd)
            .await
            .map_err(|e| FFmpegError::spawn(&self.ffmpeg_path, e))?;

        if !output.status.success() {
            return Err(FFmpegError::ExecutionFailed(format!(
                "{} failed: {}",
                stage,
                stderr_tail(&output)
            )));
        }
        Ok(())
    }

    /// Probe media file to get information
    pub async fn probe(&self, input: &Path) -> FFmpegResult<MediaInfo> {
        Self::ensure_input(input)?;

        let mut cmd = command(&self.ffprobe_path);
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(input);
        let output = run(cmd)
            .await
            .map_err(|e| FFmpegError::spawn(&self.ffprobe_path, e))?;

        if !output.status.success() {
            return Err(FFmpegError::ProbeError(format!(
                "FFprobe failed: {}",
                stderr_tail(&output)
            )));
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            duration = info.duration_sec,
            width = info.width,
            height = info.height,
            "probed media"
        );
        Ok(info)
    }

    /// Samples the caption band at `fps` into `output_dir`
    pub async fn extract_frames(
        &self,
        input: &Path,
        output_dir: &Path,
        fps: f64,
        region: &CaptionRegion,
        max_seconds: Option<f64>,
        media: &MediaInfo,
    ) -> FFmpegResult<FrameExtraction> {
        Self::ensure_input(input)?;
        std::fs::create_dir_all(output_dir)?;

        let mut args = vec!["-v".to_string(), "error".to_string(), "-i".to_string()];
        args.push(input.to_string_lossy().to_string());
        if let Some(limit) = max_seconds {
            args.extend(["-t".to_string(), format!("{:.3}", limit)]);
        }
        args.extend([
            "-vf".to_string(),
            frame_filter(fps, region),
            "-y".to_string(),
            output_dir.join("frame_%06d.png").to_string_lossy().to_string(),
        ]);
        self.run_ffmpeg(args, "Frame extraction").await?;

        let mut frame_paths: Vec<PathBuf> = std::fs::read_dir(output_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        frame_paths.sort();

        let video_duration_seconds = match max_seconds {
            Some(limit) if limit > 0.0 => media.duration_sec.min(limit),
            _ => media.duration_sec,
        };

        info!(frames = frame_paths.len(), fps = fps, "extracted caption frames");

        Ok(FrameExtraction {
            frame_directory: output_dir.to_path_buf(),
            frame_count: frame_paths.len(),
            frame_paths,
            full_frame_size: media.frame_size(),
            crop_offset_y: region.crop_offset_y(media.height),
            video_duration_seconds,
        })
    }

    /// Extracts 16 kHz mono PCM audio and verifies the result
    pub async fn extract_audio(
        &self,
        input: &Path,
        output: &Path,
        max_seconds: Option<f64>,
    ) -> FFmpegResult<PathBuf> {
        Self::ensure_input(input)?;

        let mut args = vec!["-v".to_string(), "error".to_string(), "-i".to_string()];
        args.push(input.to_string_lossy().to_string());
        if let Some(limit) = max_seconds {
            args.extend(["-t".to_string(), format!("{:.3}", limit)]);
        }
        args.extend(
            [
                "-vn",
                "-ac",
                "1",
                "-ar",
                "16000",
                "-c:a",
                "pcm_s16le",
                "-y",
            ]
            .map(String::from),
        );
        args.push(output.to_string_lossy().to_string());
        self.run_ffmpeg(args, "Audio extraction").await?;

        verify_wav(output)?;
        info!(path = %output.display(), "extracted audio");
        Ok(output.to_path_buf())
    }
}

/// Checks that a WAV file is 16 kHz mono 16-bit PCM
pub fn verify_wav(path: &Path) -> FFmpegResult<()> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| FFmpegError::AudioFormat(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();

    if spec.sample_rate != ASR_SAMPLE_RATE
        || spec.channels != 1
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
    {
        return Err(FFmpegError::AudioFormat(format!(
            "expected 16000 Hz mono 16-bit PCM, got {} Hz, {} channel(s), {}-bit",
            spec.sample_rate, spec.channels, spec.bits_per_sample
        )));
    }
    Ok(())
}

fn parse_frame_rate(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => value.parse().ok(),
    }
}

/// Parse FFprobe JSON output
pub fn parse_probe_output(json_str: &str) -> FFmpegResult<MediaInfo> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FFmpegError::ParseError(format!("Failed to parse FFprobe output: {}", e)))?;

    let format = json
        .get("format")
        .ok_or_else(|| FFmpegError::ParseError("Missing format info".to_string()))?;

    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .cloned()
        .unwrap_or_default();

    let video = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(|c| c.as_str()) == Some("video"))
        .ok_or_else(|| FFmpegError::ParseError("No video stream".to_string()))?;
    let has_audio = streams
        .iter()
        .any(|s| s.get("codec_type").and_then(|c| c.as_str()) == Some("audio"));

    let duration_sec = format
        .get("duration")
        .and_then(|d| d.as_str())
        .or_else(|| video.get("duration").and_then(|d| d.as_str()))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let dimension = |key: &str| {
        video
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    };

    let fps = video
        .get("avg_frame_rate")
        .and_then(|f| f.as_str())
        .and_then(parse_frame_rate)
        .filter(|fps| *fps > 0.0)
        .or_else(|| {
            video
                .get("r_frame_rate")
                .and_then(|f| f.as_str())
                .and_then(parse_frame_rate)
        })
        .unwrap_or(30.0);

    Ok(MediaInfo {
        duration_sec,
        width: dimension("width"),
        height: dimension("height"),
        fps,
        has_audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output_portrait_video() {
        let json = r#"{
            "format": {
                "duration": "31.5",
                "size": "1048576",
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1080,
                    "height": 1920,
                    "avg_frame_rate": "30000/1001",
                    "r_frame_rate": "30/1"
                },
                {
                    "codec_type": "audio",
                    "codec_name": "aac",
                    "sample_rate": "48000",
                    "channels": 2
                }
            ]
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration_sec, 31.5);
        assert_eq!(info.frame_size(), FrameSize::new(1080, 1920));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!(info.has_audio);
    }

    #[test]
    fn test_parse_probe_output_without_audio() {
        let json = r#"{
            "format": {"duration": "2.0"},
            "streams": [{"codec_type": "video", "width": 720, "height": 1280, "r_frame_rate": "25/1"}]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(!info.has_audio);
        assert_eq!(info.fps, 25.0);
    }

    #[test]
    fn test_parse_probe_output_rejects_malformed() {
        assert!(matches!(
            parse_probe_output("not json"),
            Err(FFmpegError::ParseError(_))
        ));
        assert!(matches!(
            parse_probe_output(r#"{"format": {}, "streams": []}"#),
            Err(FFmpegError::ParseError(_))
        ));
    }

    #[test]
    fn test_frame_filter_crops_caption_band() {
        let filter = frame_filter(2.0, &CaptionRegion::default());
        assert_eq!(filter, "fps=2,crop=iw:ih*0.35:0:ih*0.65");
    }

    fn write_wav(path: &Path, sample_rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..160 {
            for _ in 0..channels {
                writer.write_sample(0i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_verify_wav_accepts_asr_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");
        write_wav(&path, 16_000, 1);
        assert!(verify_wav(&path).is_ok());
    }

    #[test]
    fn test_verify_wav_rejects_stereo_44k() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");
        write_wav(&path, 44_100, 2);
        assert!(matches!(verify_wav(&path), Err(FFmpegError::AudioFormat(_))));
    }

    #[tokio::test]
    async fn test_probe_missing_input() {
        let runner = FFmpegRunner::new("ffmpeg", "ffprobe");
        let result = runner.probe(Path::new("/definitely/not/here.mp4")).await;
        assert!(matches!(result, Err(FFmpegError::InvalidInput(_))));
    }
}
