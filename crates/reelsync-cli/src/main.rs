//! ReelSync command line.

mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::Parser;
use reelsync_core::fs::atomic_write_json;
use reelsync_core::{rate_caption_quality, rate_sync_quality, RatingOptions};
use serde::Serialize;
use tracing::{error, info};

use crate::cli::{Cli, Commands, RateArgs};

/// Exit status for a rating that completed but did not pass (`--strict`)
const EXIT_RATING_FAILED: u8 = 2;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn init_logging(log_dir: Option<&Path>) {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout carries the JSON report
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let file_appender = tracing_appender::rolling::daily(dir, "reelsync.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn build_options(args: &RateArgs) -> Result<RatingOptions> {
    let mut options = match &args.config {
        Some(path) => RatingOptions::from_json_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => RatingOptions::default(),
    };

    if let Some(fps) = args.fps {
        options.fps = fps;
    }
    if let Some(engine) = args.ocr_engine {
        options.ocr_engine = engine.into();
    }
    if let Some(model) = args.asr_model {
        options.asr_model = model.into();
    }
    if let Some(y_ratio) = args.caption_y_ratio {
        options.caption_region.y_ratio = y_ratio;
    }
    if let Some(height_ratio) = args.caption_height_ratio {
        options.caption_region.height_ratio = height_ratio;
    }
    if args.max_seconds.is_some() {
        options.max_seconds = args.max_seconds;
    }
    if let Some(min_rating) = args.min_rating {
        options.thresholds.min_rating = min_rating;
    }
    if args.mock {
        options.mock = true;
    }

    options.normalize();
    Ok(options)
}

fn emit<T: Serialize>(report: &T, args: &RateArgs) -> Result<()> {
    match &args.output {
        Some(path) => {
            atomic_write_json(path, report, args.pretty)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => {
            let json = if args.pretty {
                serde_json::to_string_pretty(report)?
            } else {
                serde_json::to_string(report)?
            };
            println!("{json}");
        }
    }
    Ok(())
}

/// Runs one subcommand and returns whether the rating passed
async fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Sync(args) => {
            let options = build_options(&args)?;
            let output = rate_sync_quality(&args.video, &options)
                .await
                .with_context(|| format!("rating sync of {}", args.video.display()))?;
            info!("{}", output.summary());
            emit(&output, &args)?;
            Ok(output.passed || !args.strict)
        }
        Commands::Captions(args) => {
            let options = build_options(&args)?;
            let output = rate_caption_quality(&args.video, &options)
                .await
                .with_context(|| format!("rating captions of {}", args.video.display()))?;
            info!("{}", output.summary());
            emit(&output, &args)?;
            Ok(output.passed || !args.strict)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref());

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_RATING_FAILED),
        Err(err) => {
            error!(error = %err, "command failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(video: &str) -> RateArgs {
        match Cli::parse_from(["reelsync", "sync", video]).command {
            Commands::Sync(args) | Commands::Captions(args) => args,
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("options.json");
        std::fs::write(&config, r#"{"fps": 4, "thresholds": {"minRating": 50}}"#).unwrap();

        let mut rate_args = args("v.mp4");
        rate_args.config = Some(config);
        rate_args.min_rating = Some(80);
        rate_args.caption_height_ratio = Some(0.9);

        let options = build_options(&rate_args).unwrap();
        assert_eq!(options.fps, 4.0);
        assert_eq!(options.thresholds.min_rating, 80);
        // clamped so the band stays inside the frame
        assert!((options.caption_region.height_ratio - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bad.json");
        std::fs::write(&config, "[1, 2").unwrap();

        let mut rate_args = args("v.mp4");
        rate_args.config = Some(config);
        let err = build_options(&rate_args).unwrap_err();
        assert!(format!("{err:#}").contains("Validation error"));
    }

    #[tokio::test]
    async fn test_mock_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("out/report.json");

        let mut rate_args = args("mock.mp4");
        rate_args.mock = true;
        rate_args.output = Some(report_path.clone());

        let passed = run(Commands::Captions(rate_args)).await.unwrap();
        assert!(passed);

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["schemaVersion"], "1.0.0");
        assert_eq!(report["videoPath"], "mock.mp4");
        assert_eq!(report["segments"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn test_strict_reports_failed_rating() {
        let mut rate_args = args("mock.mp4");
        rate_args.mock = true;
        rate_args.strict = true;
        rate_args.min_rating = Some(100);
        rate_args.max_seconds = Some(1.0);
        let dir = tempfile::tempdir().unwrap();
        rate_args.output = Some(dir.path().join("r.json"));

        let passed = run(Commands::Sync(rate_args)).await.unwrap();
        assert!(!passed);
    }
}
