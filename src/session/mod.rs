//! The owned session value orchestrating engine, history and store.
//!
//! A [`Session`] is created once per run and passed explicitly to every
//! operation; there are no ambient singletons. It advances strictly one step
//! per delivered event, and every mutating transition is persisted before it
//! is reported applied, so the durable state always reflects a fully-applied
//! transition.
//!
//! The plain, undo-capable and reconciling engines are one state machine
//! with composable capabilities, selected by [`SessionConfig`].

pub mod history;

pub use history::History;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::machine::{Choice, apply_choice, insert_candidate};
use crate::engine::reconcile::reconcile;
use crate::engine::validation::{ValidationError, validate};
use crate::persistence::checkpoint::{Checkpoint, StoreError};
use crate::persistence::store::CheckpointStore;
use crate::types::{ItemName, RankingState};

/// Capability flags for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Track the full history stack and allow single-step undo. When off,
    /// the history is held at depth 1.
    pub undo: bool,

    /// Repair a checkpoint whose item list changed instead of discarding it.
    /// When off, a stale checkpoint starts a fresh session.
    pub reconcile: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            undo: true,
            reconcile: true,
        }
    }
}

/// Errors that can occur while starting or driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The item source produced nothing to rank. Not fatal; the caller
    /// decides how to prompt the user.
    #[error("no items to rank")]
    NoItems,

    /// The checkpoint store failed. Fatal for saves: the engine must not
    /// accept comparisons it cannot durably record.
    #[error("checkpoint store error: {0}")]
    Store(#[from] StoreError),

    /// Reconciliation could not produce a consistent state. Fatal
    /// configuration error; guessing would corrupt ranking results.
    #[error("checkpoint cannot be reconciled with the item list: {0}")]
    Irrecoverable(#[source] ValidationError),
}

/// The externally visible result of one comparison event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The state advanced; another comparison is required.
    Advanced,

    /// The final item was inserted; the ranking is ready. Returned exactly
    /// once. Emit the results, then call [`Session::conclude`] to clear the
    /// checkpoint.
    Finished,

    /// The event arrived after completion and was dropped.
    Ignored,
}

/// What the presentation layer should show next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status<'a> {
    /// A comparison is pending between an already-ranked item and the
    /// candidate being inserted.
    Comparing {
        incumbent: &'a ItemName,
        candidate: &'a ItemName,
        remaining: usize,
    },

    /// Every item is ranked; index 0 is best.
    Done { ranking: &'a [ItemName] },
}

/// An in-progress (or just-completed) ranking session.
///
/// The capability flags are consumed at start; the history itself carries
/// the undo behavior from then on.
#[derive(Debug)]
pub struct Session<S: CheckpointStore> {
    /// Working item order; `next_index` in the current state indexes here.
    items: Vec<ItemName>,
    history: History,
    store: S,
    done: bool,
}

impl<S: CheckpointStore> Session<S> {
    /// Starts a session over `items`, resuming from the store's checkpoint
    /// when one is present and usable.
    ///
    /// A corrupt checkpoint is quarantined and the session starts fresh. A
    /// clean checkpoint that no longer matches the item list is reconciled
    /// (or discarded, per `config`). Bootstrap insertions, items that need
    /// no comparison like the very first, are applied and persisted before
    /// this returns, so the session is always either awaiting a comparison
    /// or already done.
    pub fn start(
        items: Vec<ItemName>,
        mut store: S,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if items.is_empty() {
            return Err(SessionError::NoItems);
        }

        let loaded = match store.load() {
            Ok(found) => found,
            Err(e) if e.is_corrupt() => {
                match store.quarantine()? {
                    Some(path) => warn!(
                        error = %e,
                        quarantined = %path.display(),
                        "corrupt checkpoint quarantined; starting fresh"
                    ),
                    None => warn!(error = %e, "corrupt checkpoint discarded; starting fresh"),
                }
                None
            }
            Err(e) => return Err(e.into()),
        };

        let (items, history) = match loaded {
            Some(checkpoint) => Self::restore(checkpoint, items, config)?,
            None => Self::fresh(items, config),
        };

        let mut session = Session {
            items,
            history,
            store,
            done: false,
        };
        session.settle()?;
        Ok(session)
    }

    fn fresh(items: Vec<ItemName>, config: SessionConfig) -> (Vec<ItemName>, History) {
        let initial = RankingState::new(items.len());
        (items, History::new(initial, config.undo))
    }

    /// Decides between resuming, reconciling and starting over for a loaded
    /// checkpoint.
    fn restore(
        checkpoint: Checkpoint,
        file_items: Vec<ItemName>,
        config: SessionConfig,
    ) -> Result<(Vec<ItemName>, History), SessionError> {
        let Checkpoint {
            items: old_items,
            states,
            ..
        } = checkpoint;

        let roster_unchanged = old_items == file_items;
        let current_valid = states
            .last()
            .is_some_and(|state| validate(state, &old_items).is_ok());

        if roster_unchanged && current_valid {
            if let Some(history) = History::resume(states, config.undo) {
                debug!(depth = history.depth(), "resumed checkpoint");
                return Ok((old_items, history));
            }
            // Unreachable: the store rejects empty history stacks.
            return Ok(Self::fresh(file_items, config));
        }

        let reason = if roster_unchanged {
            "checkpoint state failed validation"
        } else {
            "item list changed since checkpoint"
        };

        let Some(stale) = states.last() else {
            return Ok(Self::fresh(file_items, config));
        };

        if !config.reconcile {
            warn!(reason, "discarding checkpoint; starting fresh");
            return Ok(Self::fresh(file_items, config));
        }

        let rec = reconcile(stale, &file_items);
        if !rec.state.is_complete() {
            validate(&rec.state, &rec.items).map_err(SessionError::Irrecoverable)?;
        }
        info!(
            reason,
            retained = rec.state.sorted_names.len(),
            queued = rec.items.len() - rec.state.next_index,
            "reconciled session"
        );
        Ok((rec.items, History::new(rec.state, config.undo)))
    }

    /// Applies pending bootstrap insertions until the session is awaiting a
    /// comparison or done, persisting the outcome.
    ///
    /// Converged states are transient: they are replaced in the history
    /// rather than stacked, so undo never lands on one.
    fn settle(&mut self) -> Result<(), SessionError> {
        let mut mutated = false;

        loop {
            let current = self.history.current();

            if current.is_complete() {
                self.finish();
                return Ok(());
            }

            if !current.is_converged() {
                break;
            }

            let next = insert_candidate(current, self.candidate_at(current.next_index)?);
            self.history.replace_top(next);
            mutated = true;
        }

        if mutated {
            self.save()?;
        }
        Ok(())
    }

    /// Delivers one comparison answer.
    ///
    /// The checkpoint (and history) are updated before this returns, so a
    /// crash after any `Ok` resumes from the state just reported. Events
    /// arriving after completion are ignored.
    pub fn choose(&mut self, choice: Choice) -> Result<Step, SessionError> {
        if self.done {
            debug!("comparison after completion ignored");
            return Ok(Step::Ignored);
        }

        let after_choice = apply_choice(self.history.current(), choice);

        if !after_choice.is_converged() {
            self.history.push(after_choice);
            self.save()?;
            return Ok(Step::Advanced);
        }

        // This answer fixed the candidate's rank. The insertion folds into
        // the same history step, so one undo reverts the whole comparison.
        let after_insert =
            insert_candidate(&after_choice, self.candidate_at(after_choice.next_index)?);
        let finished = after_insert.is_complete();
        self.history.push(after_insert);

        if finished {
            self.finish();
            Ok(Step::Finished)
        } else {
            self.save()?;
            Ok(Step::Advanced)
        }
    }

    /// Undoes the most recent comparison.
    ///
    /// Returns `false` (a no-op) at the initial snapshot or after
    /// completion. The popped history is persisted before returning, so
    /// History and Checkpoint stay in lock-step.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        if self.done {
            return Ok(false);
        }
        if !self.history.pop() {
            debug!("undo at initial snapshot ignored");
            return Ok(false);
        }
        self.save()?;
        debug!(depth = self.history.depth(), "undid one comparison");
        Ok(true)
    }

    /// What to show next: the pending matchup, or the final ranking.
    pub fn status(&self) -> Status<'_> {
        let current = self.history.current();
        if self.done {
            return Status::Done {
                ranking: &current.sorted_names,
            };
        }
        // Invariant: an active session is always awaiting a comparison, so
        // the probe and candidate indices are in bounds.
        Status::Comparing {
            incumbent: &current.sorted_names[current.mid()],
            candidate: &self.items[current.next_index],
            remaining: current.remaining(),
        }
    }

    /// The total order established so far; index 0 is best.
    pub fn ranked_so_far(&self) -> &[ItemName] {
        &self.history.current().sorted_names
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// How many undo steps are currently available.
    pub fn undo_depth(&self) -> usize {
        self.history.depth().saturating_sub(1)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn candidate_at(&self, index: usize) -> Result<ItemName, SessionError> {
        self.items.get(index).cloned().ok_or_else(|| {
            SessionError::Irrecoverable(ValidationError::CursorOutOfBounds {
                next_index: index,
                item_count: self.items.len(),
            })
        })
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let checkpoint = Checkpoint::new(self.items.clone(), self.history.states().to_vec());
        self.store.save(&checkpoint)
    }

    /// Completion transition: retire the state and stop accepting input.
    ///
    /// The completed state is never persisted; the last checkpoint on disk
    /// (if any) is one comparison behind, so a crash between completion and
    /// [`Session::conclude`] resumes at the final comparison instead of
    /// losing the run.
    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        info!(
            items = self.history.current().sorted_names.len(),
            "ranking complete"
        );
    }

    /// Deletes the checkpoint after the results have been emitted.
    ///
    /// Called once the result sink has the final order; the checkpoint must
    /// outlive the results, not the other way around.
    pub fn conclude(&mut self) -> Result<(), SessionError> {
        self.store.clear()?;
        Ok(())
    }
}

/// Convenience alias for sessions over the filesystem store.
pub type FsSession = Session<crate::persistence::store::FsStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::{FsStore, MemoryStore};

    fn names(list: &[&str]) -> Vec<ItemName> {
        list.iter().map(|n| ItemName::new(*n)).collect()
    }

    fn start_mem(list: &[&str]) -> Session<MemoryStore> {
        Session::start(names(list), MemoryStore::new(), SessionConfig::default()).unwrap()
    }

    fn matchup(session: &Session<MemoryStore>) -> (String, String) {
        match session.status() {
            Status::Comparing {
                incumbent,
                candidate,
                ..
            } => (incumbent.to_string(), candidate.to_string()),
            Status::Done { .. } => panic!("expected a pending comparison"),
        }
    }

    #[test]
    fn empty_item_list_is_no_session() {
        let result = Session::start(Vec::new(), MemoryStore::new(), SessionConfig::default());
        assert!(matches!(result, Err(SessionError::NoItems)));
    }

    #[test]
    fn single_item_completes_without_comparisons() {
        let mut session = start_mem(&["Only"]);
        assert!(session.is_done());
        match session.status() {
            Status::Done { ranking } => assert_eq!(ranking, names(&["Only"])),
            _ => panic!("expected done"),
        }
        // The completed state is never persisted.
        assert!(session.store().is_empty());
        session.conclude().unwrap();
        assert!(session.store().is_empty());
    }

    #[test]
    fn two_items_candidate_win_ranks_it_first() {
        // "Cat" bootstraps without a comparison, then "Dog" is compared
        // against it; answering that "Dog" wins yields ["Dog", "Cat"].
        let mut session = start_mem(&["Cat", "Dog"]);
        assert_eq!(matchup(&session), ("Cat".into(), "Dog".into()));

        let step = session.choose(Choice::Candidate).unwrap();
        assert_eq!(step, Step::Finished);
        match session.status() {
            Status::Done { ranking } => assert_eq!(ranking, names(&["Dog", "Cat"])),
            _ => panic!("expected done"),
        }
    }

    #[test]
    fn three_items_ranked_by_consistent_answers() {
        // Reference order C > B > A, arrival order A, B, C.
        let mut session = start_mem(&["A", "B", "C"]);

        // B vs A: B wins and converges immediately.
        assert_eq!(matchup(&session), ("A".into(), "B".into()));
        assert_eq!(session.choose(Choice::Candidate).unwrap(), Step::Advanced);
        assert_eq!(session.ranked_so_far(), names(&["B", "A"]));

        // C probes the lower half first (mid of [0,2) over ["B","A"] is 1).
        assert_eq!(matchup(&session), ("A".into(), "C".into()));
        assert_eq!(session.choose(Choice::Candidate).unwrap(), Step::Advanced);

        // Then against "B"; C wins and the ranking completes.
        assert_eq!(matchup(&session), ("B".into(), "C".into()));
        assert_eq!(session.choose(Choice::Candidate).unwrap(), Step::Finished);

        match session.status() {
            Status::Done { ranking } => assert_eq!(ranking, names(&["C", "B", "A"])),
            _ => panic!("expected done"),
        }

        // The checkpoint outlives the results: it is still present until the
        // caller has emitted them and concludes.
        assert!(!session.store().is_empty());
        session.conclude().unwrap();
        assert!(session.store().is_empty());
    }

    #[test]
    fn crash_before_conclude_resumes_at_the_final_comparison() {
        let mut session = start_mem(&["Cat", "Dog"]);
        assert_eq!(session.choose(Choice::Candidate).unwrap(), Step::Finished);

        // "Crash" before conclude: the last checkpoint is one comparison
        // behind, so the run is not lost.
        let store = session.into_store();
        let resumed =
            Session::start(names(&["Cat", "Dog"]), store, SessionConfig::default()).unwrap();
        assert!(!resumed.is_done());
        assert_eq!(matchup(&resumed), ("Cat".into(), "Dog".into()));
    }

    #[test]
    fn finished_is_reported_exactly_once() {
        let mut session = start_mem(&["Cat", "Dog"]);
        assert_eq!(session.choose(Choice::Candidate).unwrap(), Step::Finished);
        assert_eq!(session.choose(Choice::Candidate).unwrap(), Step::Ignored);
        assert_eq!(session.choose(Choice::Incumbent).unwrap(), Step::Ignored);
        assert!(!session.undo().unwrap());
    }

    #[test]
    fn every_transition_is_persisted_before_reporting() {
        let mut session = start_mem(&["A", "B", "C", "D"]);
        let after_start = session.store().save_count();
        assert!(after_start >= 1, "bootstrap insertion must be saved");

        session.choose(Choice::Incumbent).unwrap();
        assert_eq!(session.store().save_count(), after_start + 1);

        session.undo().unwrap();
        assert_eq!(session.store().save_count(), after_start + 2);
    }

    #[test]
    fn undo_reverts_exactly_one_comparison() {
        let mut session = start_mem(&["A", "B", "C"]);
        let before = matchup(&session);
        let ranked_before = session.ranked_so_far().to_vec();

        session.choose(Choice::Candidate).unwrap();
        assert_ne!(session.ranked_so_far(), &ranked_before[..]);

        assert!(session.undo().unwrap());
        assert_eq!(matchup(&session), before);
        assert_eq!(session.ranked_so_far(), &ranked_before[..]);
    }

    #[test]
    fn undo_at_initial_snapshot_is_a_no_op() {
        let mut session = start_mem(&["A", "B"]);
        assert!(!session.undo().unwrap());
        assert_eq!(matchup(&session), ("A".into(), "B".into()));
    }

    #[test]
    fn undo_disabled_holds_history_at_depth_one() {
        let config = SessionConfig {
            undo: false,
            ..SessionConfig::default()
        };
        let mut session =
            Session::start(names(&["A", "B", "C"]), MemoryStore::new(), config).unwrap();

        session.choose(Choice::Candidate).unwrap();
        assert_eq!(session.undo_depth(), 0);
        assert!(!session.undo().unwrap());

        let store = session.into_store();
        let checkpoint = store.load().unwrap().unwrap();
        assert_eq!(checkpoint.states.len(), 1);
    }

    #[test]
    fn session_resumes_from_saved_checkpoint() {
        let mut session = start_mem(&["A", "B", "C"]);
        session.choose(Choice::Candidate).unwrap(); // ["B", "A"], C pending
        let before = matchup(&session);
        let store = session.into_store();

        // Restart against the unchanged item list.
        let resumed = Session::start(names(&["A", "B", "C"]), store, SessionConfig::default())
            .unwrap();
        assert_eq!(matchup(&resumed), before);
        assert_eq!(resumed.ranked_so_far(), names(&["B", "A"]));
        assert_eq!(resumed.undo_depth(), 1);
    }

    #[test]
    fn corrupt_checkpoint_is_quarantined_and_session_starts_fresh() {
        let mut store = MemoryStore::new();
        store.inject_bytes(r#"{"schema_version": 1, "items": ["A"#); // truncated

        let session =
            Session::start(names(&["A", "B"]), store, SessionConfig::default()).unwrap();
        assert_eq!(matchup(&session), ("A".into(), "B".into()));
        assert_eq!(session.store().quarantined().len(), 1);
    }

    #[test]
    fn corrupt_checkpoint_on_disk_is_renamed_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "definitely not json").unwrap();

        let session = Session::start(
            names(&["A", "B"]),
            FsStore::new(&path),
            SessionConfig::default(),
        )
        .unwrap();
        assert!(!session.is_done());

        let quarantined: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("state.json.corrupt."))
            .collect();
        assert_eq!(quarantined.len(), 1);
    }

    #[test]
    fn changed_item_list_reconciles_instead_of_discarding() {
        // Checkpoint for ["A","B","C"] with ["B","A"] ranked; the list
        // becomes ["A","B","D"].
        let mut session = start_mem(&["A", "B", "C"]);
        session.choose(Choice::Candidate).unwrap();
        assert_eq!(session.ranked_so_far(), names(&["B", "A"]));
        let store = session.into_store();

        let resumed = Session::start(names(&["A", "B", "D"]), store, SessionConfig::default())
            .unwrap();
        assert_eq!(resumed.ranked_so_far(), names(&["B", "A"]));
        assert_eq!(matchup(&resumed), ("A".into(), "D".into()));
        assert_eq!(resumed.undo_depth(), 0); // history resets on reconcile
    }

    #[test]
    fn reconcile_disabled_discards_stale_checkpoint() {
        let mut session = start_mem(&["A", "B", "C"]);
        session.choose(Choice::Candidate).unwrap();
        let store = session.into_store();

        let config = SessionConfig {
            reconcile: false,
            ..SessionConfig::default()
        };
        let fresh = Session::start(names(&["A", "B", "D"]), store, config).unwrap();
        assert_eq!(fresh.ranked_so_far(), names(&["A"]));
        assert_eq!(matchup(&fresh), ("A".into(), "B".into()));
    }

    #[test]
    fn reconciling_away_all_pending_items_completes_the_session() {
        // Rank two of three, then shrink the list to exactly the ranked two.
        let mut session = start_mem(&["A", "B", "C"]);
        session.choose(Choice::Candidate).unwrap(); // ["B", "A"]
        let store = session.into_store();

        let mut resumed =
            Session::start(names(&["A", "B"]), store, SessionConfig::default()).unwrap();
        assert!(resumed.is_done());
        match resumed.status() {
            Status::Done { ranking } => assert_eq!(ranking, names(&["B", "A"])),
            _ => panic!("expected done"),
        }
        resumed.conclude().unwrap();
        assert!(resumed.store().is_empty());
    }

    #[test]
    fn failed_save_is_fatal() {
        let mut session = start_mem(&["A", "B", "C", "D"]);
        session.store_mut().fail_saves();

        let result = session.choose(Choice::Incumbent);
        assert!(matches!(result, Err(SessionError::Store(_))));
    }

    #[test]
    fn failed_save_during_bootstrap_is_fatal() {
        let mut store = MemoryStore::new();
        store.fail_saves();
        let result = Session::start(names(&["A", "B"]), store, SessionConfig::default());
        assert!(matches!(result, Err(SessionError::Store(_))));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Driving a session with answers consistent with a reference
            /// order reproduces that order, across random restarts.
            #[test]
            fn consistent_answers_reproduce_reference_order(
                n in 1usize..10,
                seed in any::<u64>(),
                restart_mask in any::<u32>(),
            ) {
                let reference: Vec<ItemName> =
                    (0..n).map(|i| ItemName::new(format!("item-{i}"))).collect();

                let mut working = reference.clone();
                let mut s = seed;
                for i in (1..working.len()).rev() {
                    s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    working.swap(i, (s % (i as u64 + 1)) as usize);
                }

                let rank_of = |name: &ItemName| {
                    reference.iter().position(|r| r == name).unwrap()
                };

                let mut session = Session::start(
                    working.clone(),
                    MemoryStore::new(),
                    SessionConfig::default(),
                )
                .unwrap();

                let mut steps = 0u32;
                while !session.is_done() {
                    // Occasionally drop the session and resume from the
                    // checkpoint mid-run.
                    if restart_mask & (1 << (steps % 32)) != 0 {
                        let store = session.into_store();
                        session = Session::start(
                            working.clone(),
                            store,
                            SessionConfig::default(),
                        )
                        .unwrap();
                    }

                    let choice = match session.status() {
                        Status::Comparing { incumbent, candidate, .. } => {
                            if rank_of(candidate) < rank_of(incumbent) {
                                Choice::Candidate
                            } else {
                                Choice::Incumbent
                            }
                        }
                        Status::Done { .. } => break,
                    };
                    session.choose(choice).unwrap();
                    steps += 1;
                }

                match session.status() {
                    Status::Done { ranking } => prop_assert_eq!(ranking, &reference[..]),
                    _ => prop_assert!(false, "session did not finish"),
                }
            }

            /// Undo then redo with the same answer lands in the same state.
            #[test]
            fn undo_is_inverse_of_choose(answer_candidate: bool) {
                let mut session = Session::start(
                    (0..6).map(|i| ItemName::new(format!("item-{i}"))).collect(),
                    MemoryStore::new(),
                    SessionConfig::default(),
                )
                .unwrap();

                let choice = if answer_candidate {
                    Choice::Candidate
                } else {
                    Choice::Incumbent
                };

                // Advance one step so undo has somewhere to go.
                session.choose(choice).unwrap();
                let ranked = session.ranked_so_far().to_vec();
                let depth = session.undo_depth();

                session.choose(choice).unwrap();
                prop_assert!(session.undo().unwrap());

                prop_assert_eq!(session.ranked_so_far(), &ranked[..]);
                prop_assert_eq!(session.undo_depth(), depth);
            }
        }
    }
}
