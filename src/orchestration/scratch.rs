//! Per-job scratch directories.
//!
//! A [`ScratchSpace`] owns `scratch_root/<job-id>` for the lifetime of a job
//! run. The normal exit path calls [`ScratchSpace::release`]; if the guard is
//! dropped without that (a panic unwinding through the job task, an aborted
//! task) the directory is removed synchronously in `Drop`.

use crate::models::JobId;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ScratchSpace {
    path: PathBuf,
    released: bool,
}

impl ScratchSpace {
    pub async fn acquire(root: &Path, job_id: JobId) -> io::Result<Self> {
        let path = root.join(job_id.to_string());
        tokio::fs::create_dir_all(&path).await?;
        debug!(job_id = %job_id, path = %path.display(), "Scratch space acquired");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.path)
    }

    /// Remove the directory and everything in it
    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Scratch space released");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Scratch space removed on drop"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove scratch space"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::acquire(root.path(), JobId::new()).await.unwrap();
        let path = scratch.path().to_path_buf();
        tokio::fs::write(path.join("narration.mp3"), b"audio").await.unwrap();
        assert!(path.exists());

        scratch.release().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchSpace::acquire(root.path(), JobId::new()).await.unwrap();
            std::fs::create_dir_all(scratch.path().join("assets")).unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_tolerates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::acquire(root.path(), JobId::new()).await.unwrap();
        std::fs::remove_dir_all(scratch.path()).unwrap();
        assert!(scratch.release().await.is_ok());
    }

    #[tokio::test]
    async fn test_contains() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::acquire(root.path(), JobId::new()).await.unwrap();
        assert!(scratch.contains(&scratch.path().join("video.mp4")));
        assert!(!scratch.contains(root.path()));
    }
}
