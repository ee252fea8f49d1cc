//! Rating Pipeline
//!
//! Runs the collaborators in order (probe, frame extraction, audio
//! extraction, OCR, ASR) and feeds their output through the pure engine.
//! Extracted frames and audio live in a scoped temp directory that is
//! removed on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use super::mock::{mock_asr_words, mock_media_info, mock_ocr_frames};
use super::options::RatingOptions;
use super::report::{
    build_drift_timeline, AnalysisMetadata, CaptionQualityRatingOutput, SyncRatingOutput,
    SCHEMA_VERSION,
};
use crate::asr::{AsrEngine, AsrTranscript, WhisperCliEngine};
use crate::captions::{
    analyze_caption_quality, segment_captions, BurnedInCaptionQualityReport, CaptionQualityInput,
    SegmentOptions,
};
use crate::error::{CoreError, CoreResult};
use crate::ffmpeg::{resolve_binary, FFmpegRunner};
use crate::ocr::{extract_word_appearances, ocr_all_frames, OcrEngine, TesseractEngine};
use crate::process::install_hint;
use crate::sync::{
    caption_quality_errors, compute_sync_metrics, detect_sync_errors, match_words, rate,
};
use crate::types::{frame_step, FrameSize, OcrFrame};

/// Everything the collaborators produced for one video
#[derive(Debug, Clone)]
struct CollectedMedia {
    frames: Vec<OcrFrame>,
    transcript: Option<AsrTranscript>,
    full_frame_size: FrameSize,
    crop_offset_y: u32,
    video_duration_seconds: f64,
}

fn require_binary(configured: &str) -> CoreResult<PathBuf> {
    resolve_binary(configured).ok_or_else(|| CoreError::DependencyMissing {
        binary: configured.to_string(),
        hint: install_hint(configured),
    })
}

fn prepare_options(options: &RatingOptions) -> CoreResult<RatingOptions> {
    let mut options = options.clone();
    options.normalize();
    options.validate()?;
    Ok(options)
}

fn collect_mock(options: &RatingOptions, with_audio: bool) -> CollectedMedia {
    let media = mock_media_info(options.max_seconds);
    debug!("using mock media");
    CollectedMedia {
        frames: mock_ocr_frames(options.fps, options.max_seconds),
        transcript: with_audio.then(|| AsrTranscript {
            words: mock_asr_words(options.max_seconds),
            engine_name: "mock".to_string(),
        }),
        full_frame_size: media.frame_size(),
        crop_offset_y: options.caption_region.crop_offset_y(media.height),
        video_duration_seconds: media.duration_sec,
    }
}

async fn collect_media(
    video_path: &Path,
    options: &RatingOptions,
    with_audio: bool,
) -> CoreResult<CollectedMedia> {
    if !video_path.exists() {
        return Err(CoreError::FileNotFound(video_path.display().to_string()));
    }

    let binaries = &options.binaries;
    let runner = FFmpegRunner::new(
        require_binary(&binaries.ffmpeg)?,
        require_binary(&binaries.ffprobe)?,
    );
    let tesseract = require_binary(&binaries.tesseract)?;
    let whisper = if with_audio {
        Some(require_binary(&binaries.whisper)?)
    } else {
        None
    };

    let workspace = tempfile::Builder::new().prefix("reelsync-").tempdir()?;
    debug!(workspace = %workspace.path().display(), "created scratch directory");

    let media = runner.probe(video_path).await?;
    info!(
        video = %video_path.display(),
        duration = media.duration_sec,
        width = media.width,
        height = media.height,
        "probed video"
    );

    let extraction = runner
        .extract_frames(
            video_path,
            &workspace.path().join("frames"),
            options.fps,
            &options.caption_region,
            options.max_seconds,
            &media,
        )
        .await?;

    let audio_path = match with_audio {
        true if !media.has_audio => {
            return Err(CoreError::sync_rating(
                "extracting audio",
                "video has no audio stream",
            ));
        }
        true => Some(
            runner
                .extract_audio(
                    video_path,
                    &workspace.path().join("audio.wav"),
                    options.max_seconds,
                )
                .await?,
        ),
        false => None,
    };

    let engine: Arc<dyn OcrEngine> =
        Arc::new(TesseractEngine::new(tesseract, options.ocr_language.clone()));
    let frames = ocr_all_frames(
        engine,
        &extraction.frame_paths,
        options.fps,
        extraction.crop_offset_y,
        options.effective_ocr_concurrency(),
    )
    .await?;

    let transcript = match (whisper, audio_path) {
        (Some(binary), Some(audio)) => {
            let engine =
                WhisperCliEngine::new(binary, options.asr_model, options.asr_language.clone());
            let transcript = engine.transcribe(&audio).await?;
            info!(words = transcript.words.len(), engine = %transcript.engine_name, "transcribed audio");
            Some(transcript)
        }
        _ => None,
    };

    Ok(CollectedMedia {
        frames,
        transcript,
        full_frame_size: extraction.full_frame_size,
        crop_offset_y: extraction.crop_offset_y,
        video_duration_seconds: extraction.video_duration_seconds,
    })
}

async fn collect(
    video_path: &Path,
    options: &RatingOptions,
    with_audio: bool,
) -> CoreResult<CollectedMedia> {
    if options.mock {
        Ok(collect_mock(options, with_audio))
    } else {
        collect_media(video_path, options, with_audio).await
    }
}

fn caption_report(collected: &CollectedMedia, options: &RatingOptions) -> BurnedInCaptionQualityReport {
    analyze_caption_quality(
        CaptionQualityInput {
            frames: &collected.frames,
            fps: options.fps,
            frame_size: Some(collected.full_frame_size),
            video_duration_seconds: collected.video_duration_seconds,
        },
        &options.caption_quality.thresholds,
        &options.caption_quality.weights,
    )
}

fn analysis_metadata(
    collected: &CollectedMedia,
    options: &RatingOptions,
    ocr_word_count: usize,
    elapsed: Duration,
) -> AnalysisMetadata {
    AnalysisMetadata {
        fps: options.fps,
        frame_step_seconds: frame_step(options.fps),
        ocr_engine: options.ocr_engine.as_str().to_string(),
        asr_model: collected
            .transcript
            .as_ref()
            .map(|_| options.asr_model.name().to_string()),
        asr_engine: collected.transcript.as_ref().map(|t| t.engine_name.clone()),
        frame_count: collected.frames.len(),
        full_frame_size: collected.full_frame_size,
        caption_region: options.caption_region,
        crop_offset_y: collected.crop_offset_y,
        video_duration_seconds: collected.video_duration_seconds,
        ocr_word_count,
        asr_word_count: collected
            .transcript
            .as_ref()
            .map(|t| t.words.len())
            .unwrap_or(0),
        processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        mock: options.mock,
    }
}

fn assemble_sync_output(
    video_path: &Path,
    options: &RatingOptions,
    collected: CollectedMedia,
    started: Instant,
) -> SyncRatingOutput {
    let asr_words = collected
        .transcript
        .as_ref()
        .map(|t| t.words.as_slice())
        .unwrap_or_default();

    let appearances = extract_word_appearances(&collected.frames, options.min_ocr_confidence);
    let matches = match_words(&appearances, asr_words, frame_step(options.fps));
    let metrics = compute_sync_metrics(&matches, appearances.len(), asr_words.len());
    let verdict = rate(&metrics, &options.thresholds);
    let mut errors = detect_sync_errors(&matches, &metrics);
    debug!(
        appearances = appearances.len(),
        matches = matches.len(),
        mean_drift_ms = metrics.mean_drift_ms,
        "computed drift metrics"
    );

    let caption_quality = options.include_caption_quality.then(|| {
        let report = caption_report(&collected, options);
        errors.extend(caption_quality_errors(&report));
        report
    });

    let analysis = analysis_metadata(&collected, options, appearances.len(), started.elapsed());

    SyncRatingOutput {
        schema_version: SCHEMA_VERSION.to_string(),
        video_path: video_path.display().to_string(),
        created_at: Utc::now(),
        rating: verdict.rating,
        rating_label: verdict.rating_label,
        passed: verdict.passed,
        metrics,
        drift_timeline: build_drift_timeline(&matches),
        word_matches: matches,
        errors,
        analysis,
        caption_quality,
    }
}

fn assemble_caption_output(
    video_path: &Path,
    options: &RatingOptions,
    collected: CollectedMedia,
    started: Instant,
) -> CaptionQualityRatingOutput {
    let report = caption_report(&collected, options);
    let segments = segment_captions(&collected.frames, SegmentOptions::new(options.fps));
    let errors = caption_quality_errors(&report);
    let ocr_word_count =
        extract_word_appearances(&collected.frames, options.min_ocr_confidence).len();
    let analysis = analysis_metadata(&collected, options, ocr_word_count, started.elapsed());

    CaptionQualityRatingOutput {
        schema_version: SCHEMA_VERSION.to_string(),
        video_path: video_path.display().to_string(),
        created_at: Utc::now(),
        passed: report.overall.passed,
        overall_score: report.overall.score,
        caption_quality: report,
        segments,
        errors,
        analysis,
    }
}

/// Rates caption/speech synchronization of a rendered video.
///
/// Runs the full OCR + ASR pipeline, unless `options.mock` is set, in which
/// case deterministic synthetic data is rated and no binary is invoked.
pub async fn rate_sync_quality(
    video_path: &Path,
    options: &RatingOptions,
) -> CoreResult<SyncRatingOutput> {
    let started = Instant::now();
    let options = prepare_options(options)?;
    info!(video = %video_path.display(), mock = options.mock, "rating caption sync");

    let collected = collect(video_path, &options, true).await?;
    let output = assemble_sync_output(video_path, &options, collected, started);

    info!(
        rating = output.rating,
        passed = output.passed,
        errors = output.errors.len(),
        "sync rating complete"
    );
    Ok(output)
}

/// Rates burned-in caption quality only (OCR, no ASR).
pub async fn rate_caption_quality(
    video_path: &Path,
    options: &RatingOptions,
) -> CoreResult<CaptionQualityRatingOutput> {
    let started = Instant::now();
    let options = prepare_options(options)?;
    info!(video = %video_path.display(), mock = options.mock, "rating caption quality");

    let collected = collect(video_path, &options, false).await?;
    let output = assemble_caption_output(video_path, &options, collected, started);

    info!(
        score = output.overall_score,
        passed = output.passed,
        segments = output.segments.len(),
        "caption quality rating complete"
    );
    Ok(output)
}
