//! Command-line arguments for the `reelsync` binary.
//!
//! Both subcommands share [`RateArgs`]; any flag given here overrides the
//! matching field of the `--config` options file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reelsync_core::asr::AsrModel;
use reelsync_core::ocr::OcrEngineKind;

#[derive(Parser, Debug)]
#[command(
    name = "reelsync",
    version,
    about = "Rate caption/audio sync and burned-in caption quality of rendered videos"
)]
pub struct Cli {
    /// Also write daily-rolling log files into this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Full OCR + ASR sync rating
    Sync(RateArgs),
    /// Caption quality only (OCR, no ASR)
    Captions(RateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RateArgs {
    /// Rendered video to analyze
    pub video: PathBuf,

    /// JSON options file; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Caption frame sampling rate
    #[arg(long)]
    pub fps: Option<f64>,

    #[arg(long, value_enum)]
    pub ocr_engine: Option<OcrEngineArg>,

    #[arg(long, value_enum)]
    pub asr_model: Option<AsrModelArg>,

    /// Top of the caption band as a fraction of frame height
    #[arg(long)]
    pub caption_y_ratio: Option<f64>,

    /// Height of the caption band as a fraction of frame height
    #[arg(long)]
    pub caption_height_ratio: Option<f64>,

    /// Only analyze the first N seconds
    #[arg(long)]
    pub max_seconds: Option<f64>,

    /// Minimum sync rating (0-100) required to pass
    #[arg(long)]
    pub min_rating: Option<u32>,

    /// Rate deterministic synthetic data without running any binary
    #[arg(long, default_value_t = false)]
    pub mock: bool,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Exit with status 2 when the rating does not pass
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OcrEngineArg {
    Tesseract,
    Easyocr,
}

impl From<OcrEngineArg> for OcrEngineKind {
    fn from(arg: OcrEngineArg) -> Self {
        match arg {
            OcrEngineArg::Tesseract => OcrEngineKind::Tesseract,
            OcrEngineArg::Easyocr => OcrEngineKind::EasyOcr,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum AsrModelArg {
    Tiny,
    Base,
    Small,
    Medium,
}

impl From<AsrModelArg> for AsrModel {
    fn from(arg: AsrModelArg) -> Self {
        match arg {
            AsrModelArg::Tiny => AsrModel::Tiny,
            AsrModelArg::Base => AsrModel::Base,
            AsrModelArg::Small => AsrModel::Small,
            AsrModelArg::Medium => AsrModel::Medium,
        }
    }
}
