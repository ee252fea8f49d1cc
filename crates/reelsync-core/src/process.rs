//! External process helpers.
//!
//! Every collaborator binary (ffmpeg, ffprobe, tesseract, whisper) is
//! spawned through here so platform flags and "binary missing" detection
//! live in one place.

use std::ffi::OsStr;
use std::io;
use std::process::{Output, Stdio};

use tracing::debug;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Apply platform-specific flags to a tokio process command.
pub fn configure_tokio_command(cmd: &mut tokio::process::Command) {
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

/// A configured command with stdin closed and stdout/stderr captured.
pub fn command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    configure_tokio_command(&mut cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Runs the command to completion and collects its output.
pub async fn run(mut cmd: tokio::process::Command) -> io::Result<Output> {
    debug!(command = ?cmd.as_std(), "spawning external process");
    cmd.output().await
}

/// Whether a spawn error means the binary is not installed
pub fn is_missing_binary(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::NotFound
}

/// Installation hint shown when a collaborator binary is missing
pub fn install_hint(binary: &str) -> String {
    let name = std::path::Path::new(binary)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(binary);
    match name {
        "ffmpeg" | "ffprobe" => {
            "install FFmpeg (https://ffmpeg.org/download.html) and make sure it is on PATH".into()
        }
        "tesseract" => "install Tesseract OCR (e.g. `apt install tesseract-ocr`)".into(),
        "whisper" => "install OpenAI Whisper (`pip install openai-whisper`)".into(),
        other => format!("install `{other}` and make sure it is on PATH"),
    }
}

/// Last non-empty stderr line, for error messages
pub fn stderr_tail(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("no error output")
        .trim()
        .to_string()
}
