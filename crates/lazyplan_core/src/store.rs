//! In-memory holder for the one open planner.
//!
//! # Responsibility
//! - Hold the current planner value and the last-saved metadata snapshot.
//! - Apply commands through the pure reducer.
//! - Provide snapshot/restore for optimistic rollback.
//!
//! # Invariants
//! - The store performs no I/O; it is a value holder, not an actor.
//! - A rejected command leaves `current` untouched.
//! - `restore(snapshot())` yields a planner deep-equal to the snapshot time.

use crate::engine::command::{reduce, Command};
use crate::model::planner::Planner;
use crate::model::validation::ValidationError;

/// Opaque copy of a planner taken before an optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerSnapshot {
    planner: Planner,
}

impl PlannerSnapshot {
    pub fn planner(&self) -> &Planner {
        &self.planner
    }
}

/// Current planner plus last-saved bookkeeping.
#[derive(Debug, Clone)]
pub struct PlannerStore {
    current: Planner,
    last_saved: Option<String>,
}

impl PlannerStore {
    /// Wraps a planner freshly loaded from (or created on) the backend.
    ///
    /// The loaded metadata counts as saved.
    pub fn new(planner: Planner) -> Self {
        let last_saved = Some(metadata_fingerprint(&planner));
        Self {
            current: planner,
            last_saved,
        }
    }

    /// Wraps a planner whose metadata was never persisted.
    pub fn unsaved(planner: Planner) -> Self {
        Self {
            current: planner,
            last_saved: None,
        }
    }

    pub fn current(&self) -> &Planner {
        &self.current
    }

    /// Applies one command and returns the new current planner.
    ///
    /// # Errors
    /// - Returns `ValidationError` without touching state when the command
    ///   fails its preconditions.
    pub fn apply(&mut self, command: &Command) -> Result<&Planner, ValidationError> {
        let next = reduce(&self.current, command)?;
        self.current = next;
        Ok(&self.current)
    }

    pub fn snapshot(&self) -> PlannerSnapshot {
        PlannerSnapshot {
            planner: self.current.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: PlannerSnapshot) {
        self.current = snapshot.planner;
    }

    /// Replaces the whole planner, e.g. after a full reload.
    pub fn replace(&mut self, planner: Planner) {
        self.current = planner;
    }

    pub(crate) fn current_mut(&mut self) -> &mut Planner {
        &mut self.current
    }

    /// Serialized metadata of the current planner.
    pub fn metadata_fingerprint(&self) -> String {
        metadata_fingerprint(&self.current)
    }

    pub fn last_saved(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    pub fn mark_saved(&mut self, fingerprint: String) {
        self.last_saved = Some(fingerprint);
    }

    /// Returns whether current metadata differs from the last-saved snapshot.
    pub fn has_unsaved_metadata(&self) -> bool {
        self.last_saved.as_deref() != Some(self.metadata_fingerprint().as_str())
    }
}

/// Deep-serialized form of the metadata auto-save persists.
pub fn metadata_fingerprint(planner: &Planner) -> String {
    serde_json::json!({
        "title": planner.title,
        "description": planner.description,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::PlannerStore;
    use crate::engine::command::Command;
    use crate::model::planner::{Lane, Planner};

    fn store() -> PlannerStore {
        let mut planner = Planner::new("p1", "Board");
        planner.lanes.push(Lane::new("todo", "p1", "To Do", 0));
        PlannerStore::new(planner)
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let mut store = store();
        let before = store.current().clone();
        let snapshot = store.snapshot();
        store.apply(&Command::add_card("todo", "Card", "")).unwrap();
        assert_ne!(store.current(), &before);
        store.restore(snapshot);
        assert_eq!(store.current(), &before);
    }

    #[test]
    fn rejected_command_keeps_state() {
        let mut store = store();
        let before = store.current().clone();
        assert!(store.apply(&Command::add_card("todo", "", "")).is_err());
        assert_eq!(store.current(), &before);
    }

    #[test]
    fn metadata_tracking_ignores_board_changes() {
        let mut store = store();
        assert!(!store.has_unsaved_metadata());
        store.apply(&Command::add_card("todo", "Card", "")).unwrap();
        assert!(!store.has_unsaved_metadata());
        store
            .apply(&Command::UpdatePlanner {
                title: "Renamed".to_string(),
                description: String::new(),
            })
            .unwrap();
        assert!(store.has_unsaved_metadata());
        let fingerprint = store.metadata_fingerprint();
        store.mark_saved(fingerprint);
        assert!(!store.has_unsaved_metadata());
        assert!(PlannerStore::unsaved(Planner::new("p2", "x")).has_unsaved_metadata());
    }
}
