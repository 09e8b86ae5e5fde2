//! File system helpers.

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a scratch file.
/// Run before scraping so a bad output path fails in the first second
/// instead of after a month of requests.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let scratch_path = path.join("..__write_check__");
    fs::write(&scratch_path, b"").await?;
    let _ = fs::remove_file(&scratch_path).await;
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("csv");
        ensure_writable_dir(&target).await.unwrap();
        assert!(target.is_dir());
        assert!(!target.join("..__write_check__").exists());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();
        assert!(ensure_writable_dir(&file).await.is_err());
    }
}
