//! Checkpoint persistence for the ranking engine.
//!
//! The checkpoint captures the complete session at a point in time: the item
//! roster the session is working through and the history stack of ranking
//! states (last entry = current). It is written after every mutating event
//! and read once at session start, so a crash or restart resumes exactly
//! where the session left off.
//!
//! # Atomic Writes
//!
//! Checkpoints are written atomically using a write-to-temp-then-rename
//! pattern:
//! 1. Write to `<path>.tmp`
//! 2. fsync the file
//! 3. Rename to `<path>`
//! 4. fsync the directory
//!
//! Readers always see either the old or new checkpoint, never a partial
//! write.
//!
//! # Corruption
//!
//! A checkpoint that fails to deserialize (or carries an unknown schema
//! version) is quarantined: renamed aside under a timestamped name so the
//! operator can inspect it. It is never silently deleted.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fsync::{fsync_dir, fsync_file};
use crate::types::{ItemName, RankingState};

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema version mismatch.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },

    /// A checkpoint that deserialized to an empty history stack.
    #[error("checkpoint contains no states")]
    Empty,
}

impl StoreError {
    /// True for structural corruption: the file exists but cannot be used.
    /// These are quarantined and treated as absent; IO errors are not.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            StoreError::Json(_) | StoreError::SchemaMismatch { .. } | StoreError::Empty
        )
    }
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Persisted session snapshot.
///
/// `items` is the working item order the cursor indexes into; comparing it
/// against the freshly read item list is how the session detects that the
/// backing list changed since the checkpoint was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Schema version for forward-compatible migrations.
    pub schema_version: u32,

    /// When this checkpoint was written (operator diagnostics only).
    pub saved_at: DateTime<Utc>,

    /// The working item order this checkpoint was built against.
    pub items: Vec<ItemName>,

    /// History stack, oldest first; the last entry is the current state.
    /// Always non-empty once loaded (`StoreError::Empty` otherwise).
    pub states: Vec<RankingState>,
}

impl Checkpoint {
    /// Creates a checkpoint stamped with the current time.
    pub fn new(items: Vec<ItemName>, states: Vec<RankingState>) -> Self {
        Checkpoint {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            items,
            states,
        }
    }

    /// The current (most recent) state.
    pub fn current(&self) -> Option<&RankingState> {
        self.states.last()
    }
}

/// Saves a checkpoint atomically to disk.
///
/// # Errors
///
/// Returns an error if any IO operation fails. Callers treat a failed save
/// as fatal: the engine must not keep accepting comparisons it cannot
/// durably record.
pub fn save_checkpoint_atomic(path: &Path, checkpoint: &Checkpoint) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path(path);
    let bytes = serde_json::to_vec_pretty(checkpoint)?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        fsync_file(&file)?;
    }

    std::fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fsync_dir(parent)?;
    }

    Ok(())
}

/// Loads a checkpoint from disk.
///
/// # Errors
///
/// Returns an error if the file can't be read, the JSON is malformed, the
/// schema version is incompatible, or the history stack is empty. Use
/// [`StoreError::is_corrupt`] to decide between quarantining and failing.
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint> {
    let bytes = std::fs::read(path)?;
    let checkpoint: Checkpoint = serde_json::from_slice(&bytes)?;

    if checkpoint.schema_version != SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            got: checkpoint.schema_version,
        });
    }

    if checkpoint.states.is_empty() {
        return Err(StoreError::Empty);
    }

    Ok(checkpoint)
}

/// Attempts to load a checkpoint, returning `None` if the file doesn't exist.
///
/// Other errors (malformed JSON, schema mismatch) are propagated.
pub fn try_load_checkpoint(path: &Path) -> Result<Option<Checkpoint>> {
    match load_checkpoint(path) {
        Ok(checkpoint) => Ok(Some(checkpoint)),
        Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Renames a corrupt checkpoint aside for operator inspection.
///
/// Returns the quarantine path, or `None` if there was nothing to rename.
/// The rename is made durable with a directory fsync.
pub fn quarantine_checkpoint(path: &Path) -> Result<Option<PathBuf>> {
    let quarantined = quarantine_path(path, Utc::now());

    match std::fs::rename(path, &quarantined) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fsync_dir(parent)?;
    }

    Ok(Some(quarantined))
}

/// Removes the checkpoint after successful completion.
///
/// A missing file is tolerated (nothing to clear); other errors are
/// propagated.
pub fn clear_checkpoint(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        match fsync_dir(parent) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}

fn quarantine_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    sibling_with_suffix(path, &format!("corrupt.{}", at.format("%Y%m%dT%H%M%SZ")))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.{suffix}"))
}
