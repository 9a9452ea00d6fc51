//! Invariant checks for states loaded from a checkpoint.
//!
//! A state that deserialized cleanly can still be unusable: the window can be
//! inverted or out of bounds, or the backing item list can have changed since
//! the checkpoint was written. Validation failures are routed to the
//! reconciler rather than accepted blindly.

use thiserror::Error;

use crate::types::{ItemName, RankingState};

/// A way in which a loaded state fails its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `start` is past `end`.
    #[error("search window inverted: start {start} > end {end}")]
    WindowInverted { start: usize, end: usize },

    /// The window reaches beyond the sorted prefix.
    #[error("search window end {end} exceeds sorted prefix length {sorted_len}")]
    WindowOutOfBounds { end: usize, sorted_len: usize },

    /// The insertion cursor does not point at a real candidate. Converged
    /// pre-insertion states are never persisted, so a stored active state
    /// must have an item left to insert.
    #[error("insertion cursor {next_index} has no candidate in a list of {item_count}")]
    CursorOutOfBounds { next_index: usize, item_count: usize },

    /// The sorted prefix has already reached (or passed) the required length.
    /// Completed states are retired, never persisted, so this is stale data.
    #[error("sorted prefix length {sorted_len} not below required length {required_len}")]
    AlreadyComplete { sorted_len: usize, required_len: usize },

    /// The checkpoint expects a different item count than the current list.
    #[error("checkpoint expects {required_len} items but the current list has {item_count}")]
    ItemCountMismatch { required_len: usize, item_count: usize },
}

/// Validates a loaded state against the current item list.
///
/// Checks the `RankingState` invariants plus length/index consistency against
/// the current list. Note this deliberately does not compare item *content*;
/// content drift is detected by the session via the item roster stored in the
/// checkpoint, and both failures end up at the reconciler.
pub fn validate(state: &RankingState, items: &[ItemName]) -> Result<(), ValidationError> {
    if state.start > state.end {
        return Err(ValidationError::WindowInverted {
            start: state.start,
            end: state.end,
        });
    }

    if state.end > state.sorted_names.len() {
        return Err(ValidationError::WindowOutOfBounds {
            end: state.end,
            sorted_len: state.sorted_names.len(),
        });
    }

    if state.next_index >= items.len() {
        return Err(ValidationError::CursorOutOfBounds {
            next_index: state.next_index,
            item_count: items.len(),
        });
    }

    if state.sorted_names.len() >= state.required_len {
        return Err(ValidationError::AlreadyComplete {
            sorted_len: state.sorted_names.len(),
            required_len: state.required_len,
        });
    }

    if state.required_len != items.len() {
        return Err(ValidationError::ItemCountMismatch {
            required_len: state.required_len,
            item_count: items.len(),
        });
    }

    Ok(())
}
