//! Shared test utilities and arbitrary generators for property-based testing.

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use crate::persistence::checkpoint::Checkpoint;
use crate::types::{ItemName, RankingState};

pub fn arb_item_name() -> impl Strategy<Value = ItemName> {
    "[a-zA-Z0-9 ]{1,20}".prop_map(ItemName::new)
}

pub fn arb_datetime() -> impl Strategy<Value = DateTime<Utc>> {
    // Timestamps in a reasonable range (year 2000-2100)
    (946684800i64..4102444800i64).prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap())
}

/// Generates structurally well-formed states: the window lies within the
/// sorted prefix and the counters are mutually consistent.
pub fn arb_ranking_state() -> impl Strategy<Value = RankingState> {
    (
        prop::collection::vec(arb_item_name(), 0..8),
        1usize..8,
        any::<u16>(),
    )
        .prop_map(|(sorted_names, extra, window_seed)| {
            let len = sorted_names.len();
            let start = window_seed as usize % (len + 1);
            let end = start + (window_seed as usize / 7) % (len - start + 1);
            RankingState {
                next_index: len,
                required_len: len + extra,
                start,
                end,
                sorted_names,
            }
        })
}

pub fn arb_checkpoint() -> impl Strategy<Value = Checkpoint> {
    (
        arb_datetime(),
        prop::collection::vec(arb_item_name(), 1..6),
        prop::collection::vec(arb_ranking_state(), 1..4),
    )
        .prop_map(|(saved_at, items, states)| {
            let mut checkpoint = Checkpoint::new(items, states);
            checkpoint.saved_at = saved_at;
            checkpoint
        })
}
