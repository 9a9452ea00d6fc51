//! The ranking state: sorted prefix plus binary-search cursor.
//!
//! This is the single entity the engine mutates. Each instance is a complete
//! snapshot of ranking progress, so the undo history and the checkpoint file
//! are both just sequences of these.

use serde::{Deserialize, Serialize};

use super::item::ItemName;

/// A snapshot of ranking progress.
///
/// INVARIANTS (checked by `engine::validation` when loaded from disk):
/// - `start <= end <= sorted_names.len()`
/// - `next_index <= total item count`
/// - `sorted_names.len() < required_len` while the session is active
/// - `required_len == total item count` for the active item list
///
/// The window `[start, end)` indexes into `sorted_names` and brackets the
/// positions where the current candidate may still be inserted. When
/// `start == end` the window has collapsed and `start` is the insertion index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingState {
    /// Total order established so far; index 0 is best.
    pub sorted_names: Vec<ItemName>,

    /// Inclusive lower bound of the binary-search window.
    pub start: usize,

    /// Exclusive upper bound of the binary-search window.
    pub end: usize,

    /// Index into the working item order of the next item awaiting insertion.
    pub next_index: usize,

    /// Expected final length of `sorted_names`.
    pub required_len: usize,
}

impl RankingState {
    /// Creates the initial state for a fresh session over `required_len` items.
    ///
    /// The initial window is already collapsed (`start == end == 0`), so the
    /// first item is inserted without any comparison.
    pub fn new(required_len: usize) -> Self {
        RankingState {
            sorted_names: Vec::new(),
            start: 0,
            end: 0,
            next_index: 0,
            required_len,
        }
    }

    /// The probe index for the next comparison: `sorted_names[mid]` is pitted
    /// against the current candidate.
    pub fn mid(&self) -> usize {
        (self.start + self.end) / 2
    }

    /// True when the search window has collapsed and the candidate's rank is
    /// fixed at `start`.
    pub fn is_converged(&self) -> bool {
        self.start == self.end
    }

    /// True when every item has been inserted.
    pub fn is_complete(&self) -> bool {
        self.sorted_names.len() == self.required_len
    }

    /// Number of items still awaiting insertion.
    pub fn remaining(&self) -> usize {
        self.required_len.saturating_sub(self.sorted_names.len())
    }
}
