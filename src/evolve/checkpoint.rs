//! Append-only, timestamped snapshots of the artifact.
//!
//! One file per evolution attempt, named by second-resolution timestamp.
//! Files are never overwritten — a collision within one second appends a
//! counter — and are deleted only when a cycle is skipped or rejected.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use super::EvolveError;

/// The checkpoint directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

/// A snapshot taken before one mutation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot `artifact` under a fresh timestamped name.
    pub fn create(&self, artifact: &Path) -> Result<Checkpoint, EvolveError> {
        fs::create_dir_all(&self.dir).map_err(EvolveError::Checkpoint)?;

        let stem = artifact
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("artifact");
        let extension = artifact
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");

        let mut path = self.dir.join(format!("{stem}_{timestamp}{extension}"));
        let mut counter = 1u32;
        while path.exists() {
            path = self
                .dir
                .join(format!("{stem}_{timestamp}_{counter}{extension}"));
            counter += 1;
        }

        fs::copy(artifact, &path).map_err(EvolveError::Checkpoint)?;
        info!(path = %path.display(), "checkpoint created");
        Ok(Checkpoint { path })
    }
}

impl Checkpoint {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the snapshot (cycle skipped or rejected).
    pub fn discard(self) -> Result<(), EvolveError> {
        fs::remove_file(&self.path).map_err(EvolveError::Checkpoint)?;
        info!(path = %self.path.display(), "checkpoint discarded");
        Ok(())
    }

    /// Keep the snapshot as the permanent rollback point for an applied
    /// cycle.
    pub fn retain(self) -> PathBuf {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact_in(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("main.py");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn create_snapshots_the_artifact_bytes() {
        let tmp = TempDir::new().unwrap();
        let artifact = artifact_in(&tmp, "print('v1')\n");
        let store = CheckpointStore::new(tmp.path().join("checkpoints"));

        let checkpoint = store.create(&artifact).unwrap();
        assert_eq!(
            fs::read_to_string(checkpoint.path()).unwrap(),
            "print('v1')\n"
        );

        let name = checkpoint.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("main_"));
        assert!(name.ends_with(".py"));
    }

    #[test]
    fn discard_removes_the_snapshot_file() {
        let tmp = TempDir::new().unwrap();
        let artifact = artifact_in(&tmp, "x = 1\n");
        let store = CheckpointStore::new(tmp.path().join("checkpoints"));

        let checkpoint = store.create(&artifact).unwrap();
        let path = checkpoint.path().to_path_buf();
        checkpoint.discard().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn retained_snapshot_stays_on_disk() {
        let tmp = TempDir::new().unwrap();
        let artifact = artifact_in(&tmp, "x = 1\n");
        let store = CheckpointStore::new(tmp.path().join("checkpoints"));

        let checkpoint = store.create(&artifact).unwrap();
        let path = checkpoint.retain();
        assert!(path.exists());
    }

    #[test]
    fn same_second_collisions_get_a_counter_suffix() {
        let tmp = TempDir::new().unwrap();
        let artifact = artifact_in(&tmp, "x = 1\n");
        let store = CheckpointStore::new(tmp.path().join("checkpoints"));

        let first = store.create(&artifact).unwrap();
        let second = store.create(&artifact).unwrap();
        let third = store.create(&artifact).unwrap();

        assert_ne!(first.path(), second.path());
        assert_ne!(second.path(), third.path());
        assert!(first.path().exists());
        assert!(second.path().exists());
        assert!(third.path().exists());
    }

    #[test]
    fn missing_artifact_is_a_checkpoint_error() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path().join("checkpoints"));
        let err = store.create(&tmp.path().join("nope.py")).unwrap_err();
        assert!(matches!(err, EvolveError::Checkpoint(_)));
    }
}
