//! Binary Detection
//!
//! Resolves collaborator binaries (ffmpeg, ffprobe, tesseract, whisper)
//! from an explicit path or the system PATH, so a missing tool is reported
//! before any work starts.

use std::path::{Path, PathBuf};

/// Platform executable name
fn executable_name(name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        if Path::new(name).extension().is_none() {
            return format!("{name}.exe");
        }
    }
    name.to_string()
}

/// Common install locations searched after PATH
fn common_binary_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/usr/local/bin"),
        ]
    }

    #[cfg(target_os = "linux")]
    {
        vec![PathBuf::from("/usr/bin"), PathBuf::from("/usr/local/bin")]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Vec::new()
    }
}

/// First directory in `dirs` that contains `name`
pub fn find_in_paths(name: &str, dirs: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    let file_name = executable_name(name);
    dirs.into_iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// Resolves a configured binary.
///
/// Values containing a path separator are used as-is when they exist; bare
/// names are looked up on PATH and then in common install locations.
pub fn resolve_binary(configured: &str) -> Option<PathBuf> {
    let path = Path::new(configured);
    if path.components().count() > 1 || path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }

    let path_dirs = std::env::var_os("PATH")
        .map(|value| std::env::split_paths(&value).collect::<Vec<_>>())
        .unwrap_or_default();

    find_in_paths(configured, path_dirs.into_iter().chain(common_binary_paths()))
}
