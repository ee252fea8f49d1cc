//! Report file output.
//!
//! Reports are written to a sibling temp file and renamed into place, so a
//! reader never sees a half-written JSON document.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{CoreError, CoreResult};

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!("{file_name}.{suffix}"))
}

fn atomic_replace(dest: &Path, src_tmp: &Path) -> CoreResult<()> {
    if !dest.exists() {
        std::fs::rename(src_tmp, dest)?;
        return Ok(());
    }

    // Rename-over-existing is not atomic everywhere; swap through a backup.
    let bak = sibling_path(dest, "bak");
    if bak.exists() {
        if let Err(e) = std::fs::remove_file(&bak) {
            warn!(path = %bak.display(), "Failed to remove stale backup: {}", e);
        }
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(src_tmp, dest) {
        Ok(()) => {
            if let Err(e) = std::fs::remove_file(&bak) {
                warn!(path = %bak.display(), "Failed to remove backup after replace: {}", e);
            }
            Ok(())
        }
        Err(e) => {
            if let Err(restore) = std::fs::rename(&bak, dest) {
                warn!(
                    path = %dest.display(),
                    backup = %bak.display(),
                    "Failed to restore previous report: {}",
                    restore
                );
            }
            if let Err(cleanup) = std::fs::remove_file(src_tmp) {
                warn!(path = %src_tmp.display(), "Failed to remove temp file: {}", cleanup);
            }
            Err(CoreError::IoError(e))
        }
    }
}

/// Writes bytes through a temp file and rename
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_path(path, "tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    atomic_replace(path, &tmp_path)
}

/// Serializes `value` as JSON (pretty or compact) and writes it atomically
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> CoreResult<()> {
    let mut bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };
    bytes.push(b'\n');
    atomic_write_bytes(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/nested/out.json");
        atomic_write_json(&path, &serde_json::json!({"rating": 91}), false).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"rating\":91}\n");
        assert!(!sibling_path(&path, "tmp").exists());
    }

    #[test]
    fn test_overwrite_replaces_content_and_cleans_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        atomic_write_json(&path, &serde_json::json!({"v": 1}), true).unwrap();
        atomic_write_json(&path, &serde_json::json!({"v": 2}), true).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["v"], 2);
        assert!(!sibling_path(&path, "bak").exists());
    }

    #[test]
    fn test_stale_backup_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(sibling_path(&path, "bak"), "stale").unwrap();
        std::fs::write(&path, "old").unwrap();

        atomic_write_json(&path, &serde_json::json!({"v": 3}), false).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"v\":3}\n");
        assert!(!sibling_path(&path, "bak").exists());
        assert!(!sibling_path(&path, "tmp").exists());
    }
}
