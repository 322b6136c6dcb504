//! One open planner: store, sync coordinator and auto-save in one place.
//!
//! # Responsibility
//! - Expose the single `dispatch(command)` entry point UI layers use.
//! - Feed every accepted mutation into the auto-save scheduler.
//! - Turn failures into non-fatal notices instead of aborting.
//!
//! # Invariants
//! - The session is single-threaded; callers serialize access.
//! - A failed dispatch leaves the planner either untouched (validation) or
//!   restored to its pre-mutation snapshot (backend failure).

use crate::autosave::{AutoSaveEvent, AutoSaveScheduler, Clock, SaveState};
use crate::engine::command::Command;
use crate::engine::ordering::normalize_planner;
use crate::model::planner::Planner;
use crate::store::PlannerStore;
use crate::sync::backend::PlannerBackend;
use crate::sync::coordinator::{SyncCoordinator, SyncOutcome};
use crate::sync::error::{SyncError, SyncResult};
use log::info;
use serde::Serialize;
use std::time::Duration;

/// User-visible, non-fatal failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncNotice {
    /// Command or task that failed (`move_card`, `autosave`, ...).
    pub operation: String,
    /// Stable error code (`network_error`, `backend_error`, ...).
    pub code: String,
    pub message: String,
}

impl SyncNotice {
    fn from_error(operation: &str, err: &SyncError) -> Self {
        Self {
            operation: operation.to_string(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Interactive editing session over one planner.
pub struct PlannerSession<B: PlannerBackend, C: Clock> {
    store: PlannerStore,
    coordinator: SyncCoordinator<B>,
    autosave: AutoSaveScheduler<C>,
    notices: Vec<SyncNotice>,
}

impl<B: PlannerBackend, C: Clock> PlannerSession<B, C> {
    /// Opens a session over a planner loaded from (or created on) `backend`.
    ///
    /// `temp-` planners start `unsaved`: their metadata never reached the
    /// backend.
    pub fn new(planner: Planner, backend: B, clock: C, autosave_debounce: Duration) -> Self {
        let planner = normalize_planner(&planner);
        let store = if planner.is_temp() {
            PlannerStore::unsaved(planner)
        } else {
            PlannerStore::new(planner)
        };
        info!(
            "event=planner_open module=session status=ok temp={} lanes={} cards={}",
            store.current().is_temp(),
            store.current().lanes.len(),
            store.current().card_count()
        );
        let initial_state = if store.has_unsaved_metadata() {
            SaveState::Unsaved
        } else {
            SaveState::Saved
        };
        Self {
            store,
            coordinator: SyncCoordinator::new(backend),
            autosave: AutoSaveScheduler::with_state(clock, autosave_debounce, initial_state),
            notices: Vec::new(),
        }
    }

    pub fn planner(&self) -> &Planner {
        self.store.current()
    }

    pub fn save_state(&self) -> SaveState {
        self.autosave.state()
    }

    pub fn store(&self) -> &PlannerStore {
        &self.store
    }

    pub fn coordinator(&self) -> &SyncCoordinator<B> {
        &self.coordinator
    }

    pub fn autosave(&self) -> &AutoSaveScheduler<C> {
        &self.autosave
    }

    /// Applies one command optimistically and confirms it.
    ///
    /// # Errors
    /// - Returns the `SyncError` that was also queued as a notice.
    pub fn dispatch(&mut self, command: Command) -> SyncResult<SyncOutcome> {
        let operation = command.name();
        match self.coordinator.dispatch(&mut self.store, command) {
            Ok(outcome) => {
                if outcome != SyncOutcome::Unchanged {
                    self.autosave.note_mutation();
                }
                Ok(outcome)
            }
            Err(err) => {
                self.notices.push(SyncNotice::from_error(operation, &err));
                Err(err)
            }
        }
    }

    /// Drives the auto-save timer; call from the UI event loop.
    pub fn tick(&mut self) -> Option<AutoSaveEvent> {
        let event = self.autosave.tick(&mut self.store, &mut self.coordinator);
        self.record_autosave(event)
    }

    /// Saves pending metadata now, e.g. before closing the planner.
    pub fn flush(&mut self) -> Option<AutoSaveEvent> {
        let event = self.autosave.flush(&mut self.store, &mut self.coordinator);
        self.record_autosave(event)
    }

    /// Replaces local state with the backend's current planner.
    ///
    /// Unsaved local edits are discarded and the save state returns to
    /// `saved`. `temp-` planners have nothing to reload and are left as is.
    pub fn reload(&mut self) -> SyncResult<()> {
        if self.store.current().is_temp() {
            return Ok(());
        }
        let planner_id = self.store.current().id.clone();
        match self.coordinator.backend().get_planner(&planner_id) {
            Ok(planner) => {
                self.store.replace(normalize_planner(&planner));
                let fingerprint = self.store.metadata_fingerprint();
                self.store.mark_saved(fingerprint);
                self.autosave.reset_saved();
                info!(
                    "event=planner_reload module=session status=ok lanes={} cards={}",
                    self.store.current().lanes.len(),
                    self.store.current().card_count()
                );
                Ok(())
            }
            Err(err) => {
                let err = SyncError::Backend(err);
                self.notices.push(SyncNotice::from_error("reload", &err));
                Err(err)
            }
        }
    }

    /// Drains queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<SyncNotice> {
        std::mem::take(&mut self.notices)
    }

    fn record_autosave(&mut self, event: Option<AutoSaveEvent>) -> Option<AutoSaveEvent> {
        if let Some(AutoSaveEvent::Failed(err)) = &event {
            self.notices.push(SyncNotice::from_error("autosave", err));
        }
        event
    }
}
