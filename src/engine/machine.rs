//! Transitions of the interactive binary-insertion sort.
//!
//! Pure functions for advancing the search window on a comparison answer and
//! for fixing a candidate's rank when the window collapses. All I/O and
//! persistence are handled elsewhere (see `session`).

use crate::types::{ItemName, RankingState};

/// A comparison answer delivered by the external actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// The already-ranked probe item (`sorted_names[mid]`) ranks better than
    /// or equal to the candidate.
    Incumbent,

    /// The candidate being inserted ranks better than the probe item.
    Candidate,
}

/// Narrows the search window according to a comparison answer.
///
/// `Candidate` pulls the upper bound down to `mid`; `Incumbent` pushes the
/// lower bound past `mid`. Both bounds are clamped so the window never
/// inverts, even from a degenerate loaded state.
pub fn apply_choice(state: &RankingState, choice: Choice) -> RankingState {
    let mid = state.mid();
    let mut next = state.clone();

    match choice {
        Choice::Incumbent => {
            next.start = (mid + 1).min(next.end);
        }
        Choice::Candidate => {
            next.end = mid.max(next.start);
        }
    }

    next
}

/// Fixes the candidate's rank at the collapsed window position.
///
/// Inserts `candidate` at index `start` (stable shift), resets the window to
/// span the grown sorted prefix, and advances the insertion cursor. Callers
/// must only invoke this when `state.is_converged()` holds.
pub fn insert_candidate(state: &RankingState, candidate: ItemName) -> RankingState {
    debug_assert!(state.is_converged());

    let mut next = state.clone();
    next.sorted_names.insert(next.start, candidate);
    next.start = 0;
    next.end = next.sorted_names.len();
    next.next_index += 1;
    next
}
