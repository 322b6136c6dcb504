//! Debounced auto-save of planner metadata.
//!
//! # Responsibility
//! - Track `saved -> unsaved -> saving` transitions for the open planner.
//! - Arm, reset and fire a debounce deadline against an injectable clock.
//! - Skip the network when content matches the last-saved snapshot.
//!
//! # Invariants
//! - Every accepted mutation resets the deadline to `now + debounce`.
//! - A mutation during `saving` is never lost: the timer re-arms once the
//!   in-flight save settles.
//! - `temp-` planners never reach the backend; their timer is disarmed and
//!   state stays `unsaved`.
//! - At most one save is in flight.

use crate::store::PlannerStore;
use crate::sync::backend::PlannerBackend;
use crate::sync::coordinator::{SyncCoordinator, SyncOutcome};
use crate::sync::error::{SyncError, SyncResult};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Millisecond clock the scheduler reads deadlines from.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Manually advanced clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// User-visible save indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Saved,
    Unsaved,
    Saving,
}

impl SaveState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Unsaved => "unsaved",
            Self::Saving => "saving",
        }
    }
}

/// What `begin_save` decided for the current content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    /// Root is a `temp-` planner; nothing is sent.
    SkipTemp,
    /// Content equals the last-saved snapshot.
    SkipIdentical,
    /// State moved to `saving`; the caller must send and `finish_save`.
    Save,
}

/// Result of one fired auto-save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveEvent {
    Saved,
    SkippedIdentical,
    SkippedTemp,
    Failed(SyncError),
}

/// Debounce timer plus save-state machine.
#[derive(Debug)]
pub struct AutoSaveScheduler<C: Clock> {
    clock: C,
    debounce_ms: u64,
    state: SaveState,
    deadline_ms: Option<u64>,
    dirty_during_save: bool,
}

impl<C: Clock> AutoSaveScheduler<C> {
    pub fn new(clock: C, debounce: Duration) -> Self {
        Self::with_state(clock, debounce, SaveState::Saved)
    }

    /// Starts disarmed in `state`; `Saving` is treated as `Unsaved`.
    pub fn with_state(clock: C, debounce: Duration, state: SaveState) -> Self {
        let state = match state {
            SaveState::Saving => SaveState::Unsaved,
            other => other,
        };
        Self {
            clock,
            debounce_ms: u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX),
            state,
            deadline_ms: None,
            dirty_during_save: false,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    /// Pending fire time, if armed.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Drops pending work after local state was replaced by saved content.
    pub fn reset_saved(&mut self) {
        self.state = SaveState::Saved;
        self.deadline_ms = None;
        self.dirty_during_save = false;
    }

    /// Records one accepted local mutation.
    pub fn note_mutation(&mut self) {
        if self.state == SaveState::Saving {
            self.dirty_during_save = true;
            debug!("event=autosave_arm module=autosave status=skip reason=save_in_flight");
            return;
        }
        self.state = SaveState::Unsaved;
        self.arm();
    }

    /// Returns whether the debounce deadline has passed.
    pub fn is_due(&self) -> bool {
        self.state == SaveState::Unsaved
            && self
                .deadline_ms
                .is_some_and(|deadline| self.clock.now_ms() >= deadline)
    }

    /// Decides whether the current content needs a network save.
    ///
    /// On `Save` the state becomes `saving` and the deadline is cleared.
    pub fn begin_save(&mut self, store: &PlannerStore) -> SaveDecision {
        self.deadline_ms = None;
        if store.current().is_temp() {
            debug!("event=autosave_skip module=autosave status=skip reason=temp_root");
            return SaveDecision::SkipTemp;
        }
        if !store.has_unsaved_metadata() {
            self.state = SaveState::Saved;
            debug!("event=autosave_skip module=autosave status=skip reason=identical");
            return SaveDecision::SkipIdentical;
        }
        self.state = SaveState::Saving;
        self.dirty_during_save = false;
        SaveDecision::Save
    }

    /// Settles an in-flight save.
    ///
    /// Mutations seen while saving (or metadata still differing from the
    /// saved snapshot) leave the scheduler `unsaved` with a fresh deadline.
    /// A failure leaves it `unsaved` and disarmed until the next mutation.
    pub fn finish_save(&mut self, store: &PlannerStore, result: &SyncResult<SyncOutcome>) {
        let dirty = std::mem::take(&mut self.dirty_during_save);
        match result {
            Ok(_) if dirty || store.has_unsaved_metadata() => {
                self.state = SaveState::Unsaved;
                self.arm();
            }
            Ok(_) => {
                self.state = SaveState::Saved;
            }
            Err(_) => {
                self.state = SaveState::Unsaved;
                if dirty {
                    self.arm();
                } else {
                    self.deadline_ms = None;
                }
            }
        }
    }

    /// Fires the save when the deadline has passed.
    pub fn tick<B: PlannerBackend>(
        &mut self,
        store: &mut PlannerStore,
        coordinator: &mut SyncCoordinator<B>,
    ) -> Option<AutoSaveEvent> {
        if !self.is_due() {
            return None;
        }
        Some(self.run_save(store, coordinator))
    }

    /// Saves immediately unless already `saved`.
    pub fn flush<B: PlannerBackend>(
        &mut self,
        store: &mut PlannerStore,
        coordinator: &mut SyncCoordinator<B>,
    ) -> Option<AutoSaveEvent> {
        if self.state != SaveState::Unsaved {
            return None;
        }
        Some(self.run_save(store, coordinator))
    }

    fn run_save<B: PlannerBackend>(
        &mut self,
        store: &mut PlannerStore,
        coordinator: &mut SyncCoordinator<B>,
    ) -> AutoSaveEvent {
        match self.begin_save(store) {
            SaveDecision::SkipTemp => AutoSaveEvent::SkippedTemp,
            SaveDecision::SkipIdentical => AutoSaveEvent::SkippedIdentical,
            SaveDecision::Save => {
                let started_at = Instant::now();
                let result = coordinator.save_metadata(store);
                self.finish_save(store, &result);
                match result {
                    Ok(outcome) => {
                        info!(
                            "event=autosave_save module=autosave status=ok outcome={:?} duration_ms={}",
                            outcome,
                            started_at.elapsed().as_millis()
                        );
                        AutoSaveEvent::Saved
                    }
                    Err(err) => {
                        warn!(
                            "event=autosave_save module=autosave status=error duration_ms={} error_code={} error={}",
                            started_at.elapsed().as_millis(),
                            err.code(),
                            err
                        );
                        AutoSaveEvent::Failed(err)
                    }
                }
            }
        }
    }

    fn arm(&mut self) {
        let deadline = self.clock.now_ms().saturating_add(self.debounce_ms);
        self.deadline_ms = Some(deadline);
        debug!(
            "event=autosave_arm module=autosave status=ok deadline_ms={}",
            deadline
        );
    }
}
