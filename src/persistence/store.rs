//! The checkpoint store abstraction.
//!
//! The session talks to a [`CheckpointStore`] rather than the filesystem
//! directly: [`FsStore`] is the production implementation, [`MemoryStore`]
//! the in-memory fake used in tests. Both serialize, so round-trip behavior
//! is exercised either way.

use std::path::{Path, PathBuf};

use super::checkpoint::{
    Checkpoint, Result, StoreError, clear_checkpoint, quarantine_checkpoint,
    save_checkpoint_atomic, try_load_checkpoint,
};

/// Durable storage for exactly one checkpoint.
pub trait CheckpointStore {
    /// Reads the checkpoint. Absent storage yields `Ok(None)`; structural
    /// corruption yields an error with [`StoreError::is_corrupt`] true.
    fn load(&self) -> Result<Option<Checkpoint>>;

    /// Serializes and atomically overwrites the checkpoint.
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()>;

    /// Moves a corrupt checkpoint aside, never deleting it. Returns the
    /// quarantine location if there was something to move.
    fn quarantine(&mut self) -> Result<Option<PathBuf>>;

    /// Removes the checkpoint on successful completion.
    fn clear(&mut self) -> Result<()>;
}

/// Filesystem-backed store: one JSON document, atomically replaced on save.
#[derive(Debug, Clone)]
pub struct FsStore {
    path: PathBuf,
}

impl FsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FsStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FsStore {
    fn load(&self) -> Result<Option<Checkpoint>> {
        try_load_checkpoint(&self.path)
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        save_checkpoint_atomic(&self.path, checkpoint)
    }

    fn quarantine(&mut self) -> Result<Option<PathBuf>> {
        quarantine_checkpoint(&self.path)
    }

    fn clear(&mut self) -> Result<()> {
        clear_checkpoint(&self.path)
    }
}

/// In-memory store for tests.
///
/// Holds serialized bytes rather than the checkpoint value so that load and
/// save exercise the same round-trip path as the filesystem store. Corrupt
/// contents can be injected and saves can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: Option<Vec<u8>>,
    quarantined: Vec<Vec<u8>>,
    fail_saves: bool,
    save_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Replaces the stored bytes with arbitrary content, e.g. a truncated
    /// document.
    pub fn inject_bytes(&mut self, bytes: impl Into<Vec<u8>>) {
        self.current = Some(bytes.into());
    }

    /// Makes every subsequent `save` fail with an IO error.
    pub fn fail_saves(&mut self) {
        self.fail_saves = true;
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    /// Contents moved aside by `quarantine`, oldest first.
    pub fn quarantined(&self) -> &[Vec<u8>] {
        &self.quarantined
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

impl CheckpointStore for MemoryStore {
    fn load(&self) -> Result<Option<Checkpoint>> {
        let Some(bytes) = &self.current else {
            return Ok(None);
        };
        let checkpoint: Checkpoint = serde_json::from_slice(bytes)?;

        if checkpoint.schema_version != super::checkpoint::SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                expected: super::checkpoint::SCHEMA_VERSION,
                got: checkpoint.schema_version,
            });
        }
        if checkpoint.states.is_empty() {
            return Err(StoreError::Empty);
        }

        Ok(Some(checkpoint))
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if self.fail_saves {
            return Err(StoreError::Io(std::io::Error::other(
                "injected save failure",
            )));
        }
        self.current = Some(serde_json::to_vec_pretty(checkpoint)?);
        self.save_count += 1;
        Ok(())
    }

    fn quarantine(&mut self) -> Result<Option<PathBuf>> {
        match self.current.take() {
            Some(bytes) => {
                self.quarantined.push(bytes);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemName, RankingState};
    use tempfile::tempdir;

    fn sample() -> Checkpoint {
        Checkpoint::new(
            vec![ItemName::new("A"), ItemName::new("B")],
            vec![RankingState::new(2)],
        )
    }

    #[test]
    fn fs_store_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = FsStore::new(dir.path().join("state.json"));

        assert!(store.load().unwrap().is_none());
        let checkpoint = sample();
        store.save(&checkpoint).unwrap();
        assert_eq!(store.load().unwrap(), Some(checkpoint));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn fs_store_quarantines_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "garbage").unwrap();

        let mut store = FsStore::new(&path);
        let err = store.load().unwrap_err();
        assert!(err.is_corrupt());

        let quarantined = store.quarantine().unwrap().unwrap();
        assert!(quarantined.exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_save_load_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        let checkpoint = sample();
        store.save(&checkpoint).unwrap();
        assert_eq!(store.load().unwrap(), Some(checkpoint));
        assert_eq!(store.save_count(), 1);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_reports_corrupt_bytes() {
        let mut store = MemoryStore::new();
        store.inject_bytes("{ truncated");
        assert!(store.load().unwrap_err().is_corrupt());

        store.quarantine().unwrap();
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.quarantined().len(), 1);
    }

    #[test]
    fn memory_store_injected_save_failure() {
        let mut store = MemoryStore::new();
        store.fail_saves();
        let err = store.save(&sample()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
