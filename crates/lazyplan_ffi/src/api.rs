//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level planner functions to Dart via FRB.
//! - Hold the one open planner session the board screen edits.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Planner payloads cross the boundary as JSON strings.
//! - At most one planner session is open per process.

use lazyplan_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AutoSaveEvent, ClientConfig, Command, HttpPlannerBackend, Planner, PlannerService,
    PlannerSession, SystemClock,
};
use log::warn;
use std::sync::{Mutex, MutexGuard, PoisonError};

type FfiSession = PlannerSession<HttpPlannerBackend, SystemClock>;

static CLIENT_CONFIG: Mutex<Option<ClientConfig>> = Mutex::new(None);
static SESSION: Mutex<Option<FfiSession>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - UI-thread safe for current implementation.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Planner response envelope for board screen calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Current planner as JSON; present whenever a session is open.
    pub planner_json: Option<String>,
    /// `saved|unsaved|saving`; present whenever a session is open.
    pub save_state: Option<String>,
    /// Outcome label on success, error message on failure.
    pub message: String,
}

impl PlannerResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            planner_json: None,
            save_state: None,
            message: message.into(),
        }
    }

    fn from_session(ok: bool, session: &FfiSession, message: impl Into<String>) -> Self {
        match planner_to_json(session.planner()) {
            Ok(planner_json) => Self {
                ok,
                planner_json: Some(planner_json),
                save_state: Some(session.save_state().as_str().to_string()),
                message: message.into(),
            },
            Err(err) => Self::failure(err),
        }
    }
}

/// Text response envelope (markdown, template lists).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub ok: bool,
    pub text: String,
    pub message: String,
}

/// Non-fatal sync failure reported to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerNotice {
    /// Command or task that failed (`move_card`, `autosave`, ...).
    pub operation: String,
    /// Stable error code (`network_error`, `backend_error`, ...).
    pub code: String,
    pub message: String,
}

/// Sets the backend base URL and optional bearer token.
///
/// Applies to sessions opened afterwards; the open session keeps its client.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_configure(base_url: String, auth_token: Option<String>) -> String {
    let config = ClientConfig {
        base_url: base_url.trim().to_string(),
        auth_token: auth_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty()),
        ..ClientConfig::default()
    };
    if let Err(err) = config.validate() {
        return err.to_string();
    }
    *lock(&CLIENT_CONFIG) = Some(config);
    String::new()
}

/// Lists planner templates as a JSON array.
///
/// # FFI contract
/// - Sync call, network-backed; falls back to built-in templates.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_list_templates() -> TextResponse {
    let result = with_service(|service| {
        serde_json::to_string(&service.list_templates()).map_err(|err| err.to_string())
    });
    match result {
        Ok(text) => TextResponse {
            ok: true,
            text,
            message: "ok".to_string(),
        },
        Err(message) => TextResponse {
            ok: false,
            text: String::new(),
            message,
        },
    }
}

/// Creates a planner from a template and opens it.
///
/// # FFI contract
/// - Sync call, network-backed; yields a local-only planner when offline.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_create(template_id: String, title: String, description: String) -> PlannerResponse {
    open_with(|service| {
        service
            .create_planner(&template_id, &title, &description)
            .map_err(|err| err.to_string())
    })
}

/// Loads a persisted planner and opens it.
///
/// # FFI contract
/// - Sync call, network-backed.
/// - Never panics; the previous session stays open on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_open(planner_id: String) -> PlannerResponse {
    open_with(|service| {
        service
            .open_planner(planner_id.trim())
            .map_err(|err| err.to_string())
    })
}

/// Imports markdown as a new planner and opens it.
///
/// # FFI contract
/// - Sync call, network-backed; parses locally when offline.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_import_markdown(markdown: String, template_id: String) -> PlannerResponse {
    open_with(|service| {
        service
            .import_markdown(&markdown, &template_id)
            .map_err(|err| err.to_string())
    })
}

/// Deletes a planner, closing it first when it is the open session.
///
/// # FFI contract
/// - Sync call, network-backed.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_delete(planner_id: String) -> PlannerResponse {
    let planner_id = planner_id.trim().to_string();
    match with_service(|service| {
        service
            .delete_planner(&planner_id)
            .map_err(|err| err.to_string())
    }) {
        Ok(()) => {
            let mut guard = lock(&SESSION);
            if guard
                .as_ref()
                .is_some_and(|session| session.planner().id == planner_id)
            {
                *guard = None;
            }
            PlannerResponse {
                ok: true,
                planner_json: None,
                save_state: None,
                message: "deleted".to_string(),
            }
        }
        Err(message) => PlannerResponse::failure(message),
    }
}

/// Applies one JSON-encoded command to the open planner.
///
/// Input semantics:
/// - `command_json`: `{"type": "move_card", "card_id": ..., ...}`.
///
/// # FFI contract
/// - Sync call, network-backed for persisted entities.
/// - Never panics.
/// - On backend failure the returned planner is the rolled-back state.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_dispatch(command_json: String) -> PlannerResponse {
    let command: Command = match serde_json::from_str(&command_json) {
        Ok(command) => command,
        Err(err) => return PlannerResponse::failure(format!("invalid command: {err}")),
    };
    with_session(|session| match session.dispatch(command) {
        Ok(outcome) => PlannerResponse::from_session(true, session, outcome.as_str()),
        Err(err) => PlannerResponse::from_session(false, session, err.to_string()),
    })
}

/// Returns the open planner without changing it.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_snapshot() -> PlannerResponse {
    with_session(|session| PlannerResponse::from_session(true, session, "ok"))
}

/// Drives the auto-save timer; call periodically from the UI.
///
/// # FFI contract
/// - Sync call; network-backed only when a save is due.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_tick() -> PlannerResponse {
    with_session(|session| {
        let event = session.tick();
        respond_to_autosave(session, event)
    })
}

/// Re-fetches the open planner from the backend.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_reload() -> PlannerResponse {
    with_session(|session| match session.reload() {
        Ok(()) => PlannerResponse::from_session(true, session, "reloaded"),
        Err(err) => PlannerResponse::from_session(false, session, err.to_string()),
    })
}

/// Flushes pending metadata and closes the open planner.
///
/// # FFI contract
/// - Sync call, network-backed when metadata is unsaved.
/// - Never panics; the session is closed even when the flush fails.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_close() -> PlannerResponse {
    let Some(mut session) = lock(&SESSION).take() else {
        return PlannerResponse::failure("no planner is open");
    };
    let event = session.flush();
    respond_to_autosave(&session, event)
}

/// Renders the open planner as markdown.
///
/// # FFI contract
/// - Sync call, network-backed for persisted planners with local fallback.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_export_markdown() -> TextResponse {
    let Some(planner) = lock(&SESSION).as_ref().map(|session| session.planner().clone()) else {
        return TextResponse {
            ok: false,
            text: String::new(),
            message: "no planner is open".to_string(),
        };
    };
    match with_service(|service| Ok(service.export_markdown(&planner))) {
        Ok(text) => TextResponse {
            ok: true,
            text,
            message: "ok".to_string(),
        },
        Err(message) => TextResponse {
            ok: false,
            text: String::new(),
            message,
        },
    }
}

/// Drains sync notices queued by the open session.
#[flutter_rust_bridge::frb(sync)]
pub fn planner_take_notices() -> Vec<PlannerNotice> {
    lock(&SESSION)
        .as_mut()
        .map(|session| {
            session
                .take_notices()
                .into_iter()
                .map(|notice| PlannerNotice {
                    operation: notice.operation,
                    code: notice.code,
                    message: notice.message,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn client_config() -> Result<ClientConfig, String> {
    let mut guard = lock(&CLIENT_CONFIG);
    if let Some(config) = guard.as_ref() {
        return Ok(config.clone());
    }
    let config = ClientConfig::from_env().map_err(|err| format!("client config invalid: {err}"))?;
    *guard = Some(config.clone());
    Ok(config)
}

fn build_backend() -> Result<(HttpPlannerBackend, ClientConfig), String> {
    let config = client_config()?;
    let backend = HttpPlannerBackend::new(&config)
        .map_err(|err| format!("backend client init failed: {err}"))?;
    Ok((backend, config))
}

fn with_service<T>(
    f: impl FnOnce(&PlannerService<HttpPlannerBackend>) -> Result<T, String>,
) -> Result<T, String> {
    let (backend, _) = build_backend()?;
    f(&PlannerService::new(backend))
}

fn open_with(f: impl FnOnce(&PlannerService<HttpPlannerBackend>) -> Result<Planner, String>) -> PlannerResponse {
    let (backend, config) = match build_backend() {
        Ok(pair) => pair,
        Err(message) => return PlannerResponse::failure(message),
    };
    let service = PlannerService::new(backend);
    let planner = match f(&service) {
        Ok(planner) => planner,
        Err(message) => return PlannerResponse::failure(message),
    };

    let mut guard = lock(&SESSION);
    if let Some(previous) = guard.as_mut() {
        if let Some(AutoSaveEvent::Failed(err)) = previous.flush() {
            warn!(
                "event=planner_close module=ffi status=error planner_id={} error_code={}",
                previous.planner().id,
                err.code()
            );
        }
    }
    let session = PlannerSession::new(
        planner,
        service.into_backend(),
        SystemClock::new(),
        config.autosave_debounce,
    );
    let response = PlannerResponse::from_session(true, &session, "opened");
    *guard = Some(session);
    response
}

fn with_session(f: impl FnOnce(&mut FfiSession) -> PlannerResponse) -> PlannerResponse {
    match lock(&SESSION).as_mut() {
        Some(session) => f(session),
        None => PlannerResponse::failure("no planner is open"),
    }
}

fn respond_to_autosave(session: &FfiSession, event: Option<AutoSaveEvent>) -> PlannerResponse {
    match event {
        None => PlannerResponse::from_session(true, session, "idle"),
        Some(AutoSaveEvent::Saved) => PlannerResponse::from_session(true, session, "saved"),
        Some(AutoSaveEvent::SkippedIdentical) => {
            PlannerResponse::from_session(true, session, "unchanged")
        }
        Some(AutoSaveEvent::SkippedTemp) => PlannerResponse::from_session(true, session, "local_only"),
        Some(AutoSaveEvent::Failed(err)) => PlannerResponse::from_session(false, session, err.to_string()),
    }
}

fn planner_to_json(planner: &Planner) -> Result<String, String> {
    serde_json::to_string(planner).map_err(|err| format!("planner encode failed: {err}"))
}
