//! Repairing a stale session when the item list has changed.
//!
//! A checkpoint written against one item list may be loaded against another:
//! the operator edited the file between runs. Rather than discarding all
//! progress, reconciliation rebuilds a consistent session that keeps the
//! relative order of every already-ranked item still present, drops ranked
//! items that disappeared, and queues newly-added items for insertion.
//!
//! Renames are not detected; a renamed item is a removal plus an addition.
//! Duplicate item text pairs off one occurrence at a time (multiset
//! semantics).

use std::collections::HashMap;

use crate::types::{ItemName, RankingState};

/// The rebuilt session produced by reconciliation.
///
/// `items` is the new working order: the retained sorted prefix followed by
/// the to-insert queue. `state.next_index` points at the first queued item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub state: RankingState,
    pub items: Vec<ItemName>,
}

/// Rebuilds a consistent session from a stale state and the current item list.
///
/// Walks lexicographically sorted copies of the current list and the old
/// sorted prefix with two cursors: items present in both are still ranked,
/// items only in the current list are newly added (collected in original
/// relative order), and items only in the old prefix are dropped along with
/// their rank.
pub fn reconcile(old: &RankingState, current_items: &[ItemName]) -> Reconciled {
    let retained_counts = multiset_intersection(&old.sorted_names, current_items);

    // Retained prefix: old rank order, excess occurrences dropped.
    let mut to_retain = retained_counts.clone();
    let retained: Vec<ItemName> = old
        .sorted_names
        .iter()
        .filter(|name| take_one(&mut to_retain, name))
        .cloned()
        .collect();

    // To-insert queue: current-list order, minus the occurrences already ranked.
    let mut ranked = retained_counts;
    let added: Vec<ItemName> = current_items
        .iter()
        .filter(|name| !take_one(&mut ranked, name))
        .cloned()
        .collect();

    let state = RankingState {
        start: 0,
        end: retained.len(),
        next_index: retained.len(),
        required_len: current_items.len(),
        sorted_names: retained.clone(),
    };

    let mut items = retained;
    items.extend(added);

    Reconciled { state, items }
}

/// Per-name occurrence counts shared between the two lists, computed by the
/// two-cursor walk over sorted copies.
fn multiset_intersection<'a>(
    old_sorted_names: &'a [ItemName],
    current_items: &'a [ItemName],
) -> HashMap<&'a ItemName, usize> {
    let mut old_names: Vec<&ItemName> = old_sorted_names.iter().collect();
    let mut cur_names: Vec<&ItemName> = current_items.iter().collect();
    old_names.sort_unstable();
    cur_names.sort_unstable();

    let mut shared: HashMap<&ItemName, usize> = HashMap::new();
    let (mut i, mut j) = (0, 0);
    while i < old_names.len() && j < cur_names.len() {
        match old_names[i].cmp(cur_names[j]) {
            std::cmp::Ordering::Equal => {
                *shared.entry(old_names[i]).or_insert(0) += 1;
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,    // dropped: no longer in the list
            std::cmp::Ordering::Greater => j += 1, // newly added
        }
    }
    shared
}

/// Decrements the count for `name` if one remains; returns whether it did.
fn take_one(counts: &mut HashMap<&ItemName, usize>, name: &ItemName) -> bool {
    match counts.get_mut(name) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}
