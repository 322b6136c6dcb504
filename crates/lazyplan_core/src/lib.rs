//! Core domain logic for LazyPlan boards.
//! This crate is the single source of truth for planner ordering and sync
//! invariants.

pub mod autosave;
pub mod config;
pub mod engine;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod service;
pub mod session;
pub mod store;
pub mod sync;

pub use autosave::{AutoSaveEvent, AutoSaveScheduler, Clock, ManualClock, SaveState, SystemClock};
pub use config::{ClientConfig, ConfigError};
pub use engine::command::{reduce, Command};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use markdown::{export_planner_markdown, import_planner_from_markdown, MarkdownError};
pub use model::planner::{is_temp_id, Card, Lane, LaneGroupRole, Planner};
pub use model::template::{PlannerKind, PlannerTemplate, TemplateLane};
pub use model::validation::{EntityKind, ValidationError};
pub use service::planner_service::{PlannerService, ServiceError, ServiceResult};
pub use session::{PlannerSession, SyncNotice};
pub use store::{PlannerSnapshot, PlannerStore};
pub use sync::backend::PlannerBackend;
pub use sync::coordinator::{MutationState, PendingMutation, SyncCoordinator, SyncOutcome};
pub use sync::error::{BackendError, BackendResult, SyncError, SyncResult};
pub use sync::http::HttpPlannerBackend;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
