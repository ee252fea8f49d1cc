//! ReelSync Core Engine
//!
//! Rates rendered short-form videos on two axes: how closely the burned-in
//! caption text tracks the spoken audio, and whether the captions meet
//! readability norms (density, placement, flicker, punctuation, casing).
//!
//! The engine itself (`text`, `sync`, `captions`) is pure and synchronous.
//! The collaborator adapters (`ffmpeg`, `ocr`, `asr`) produce its inputs,
//! and `rating` wires them together behind two async entry points.

pub mod asr;
pub mod captions;
pub mod ffmpeg;
pub mod fs;
pub mod ocr;
pub mod process;
pub mod rating;
pub mod sync;
pub mod text;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

pub use rating::{
    rate_caption_quality, rate_sync_quality, CaptionQualityRatingOutput, RatingOptions,
    SyncRatingOutput,
};
