// Local staging for uploaded documents
//
// Every upload gets its own file under the staging directory for the
// lifetime of one request. The returned guard deletes it on drop, so cleanup
// happens on success, on error and when the request future is cancelled.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `data` verbatim to a fresh, collision-free path.
    pub async fn stage(&self, data: &[u8]) -> AppResult<StagedDocument> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::Upload(format!(
                "failed to create staging directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self
            .dir
            .join(format!("financial_document_{}.pdf", Uuid::new_v4()));

        // Guard first so a failed or partial write is still cleaned up.
        let staged = StagedDocument { path };
        fs::write(&staged.path, data).await.map_err(|e| {
            AppError::Upload(format!("failed to write {}: {}", staged.path.display(), e))
        })?;

        debug!(path = %staged.path.display(), bytes = data.len(), "Upload staged");
        Ok(staged)
    }
}

/// A staged upload; the file is removed when this value is dropped.
#[derive(Debug)]
pub struct StagedDocument {
    path: PathBuf,
}

impl StagedDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedDocument {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Staged upload removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_writes_bytes_and_drop_removes() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("data"));

        let staged = staging.stage(b"%PDF-1.5 fake").await.unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5 fake");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("financial_document_"));

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_staged_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let first = staging.stage(b"a").await.unwrap();
        let second = staging.stage(b"b").await.unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[tokio::test]
    async fn test_drop_ignores_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let staged = staging.stage(b"a").await.unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        drop(staged);
    }
}
