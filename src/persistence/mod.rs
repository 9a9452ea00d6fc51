//! Persistence layer for the ranking engine.
//!
//! This module provides crash-safe checkpointing: the complete session is
//! captured as a single JSON document, atomically replaced after every
//! mutating event and deleted on completion.
//!
//! # File Layout
//!
//! ```text
//! <state path>                       # current checkpoint (JSON)
//! <state path>.tmp                   # in-flight atomic write
//! <state path>.corrupt.<timestamp>   # quarantined corrupt checkpoint
//! ```
//!
//! # Recovery
//!
//! On startup:
//! 1. Load the checkpoint; absence means a fresh session
//! 2. Structural corruption (bad JSON, wrong schema) quarantines the file
//!    by rename, never deleting it, and falls back to a fresh session
//! 3. A clean load is validated against the current item list; a stale
//!    checkpoint is routed to the reconciler
//!
//! # Crash Safety
//!
//! Writes use write-to-temp-then-rename with fsync on both the file and the
//! directory, so readers always observe a complete document.

pub mod checkpoint;
pub mod fsync;
pub mod store;

pub use checkpoint::{
    Checkpoint, SCHEMA_VERSION, StoreError, clear_checkpoint, load_checkpoint,
    quarantine_checkpoint, save_checkpoint_atomic, try_load_checkpoint,
};
pub use fsync::{fsync_dir, fsync_file};
pub use store::{CheckpointStore, FsStore, MemoryStore};
