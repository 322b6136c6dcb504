//! Planner-level use cases above the board engine.
//!
//! # Responsibility
//! - List templates, create/open/delete planners, export/import markdown.
//! - Degrade to local-only `temp-` planners when the backend is unavailable.
//!
//! # Invariants
//! - `temp-` planner ids never reach the backend.
//! - Creation and import always yield a usable planner unless input itself
//!   is invalid (blank title, unknown template, malformed markdown).

use crate::engine::ordering::normalize_planner;
use crate::markdown::{export_planner_markdown, import_planner_from_markdown, MarkdownError};
use crate::model::planner::{is_temp_id, temp_planner_id, Planner};
use crate::model::template::PlannerTemplate;
use crate::model::validation::{require_title, EntityKind, ValidationError};
use crate::sync::backend::{CreatePlannerRequest, ImportMarkdownRequest, PlannerBackend};
use crate::sync::error::BackendError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from planner service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    Validation(ValidationError),
    Markdown(MarkdownError),
    Backend(BackendError),
    /// Operation needs the backend but the planner exists only locally.
    LocalOnly(String),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Markdown(err) => write!(f, "{err}"),
            Self::Backend(err) => write!(f, "{err}"),
            Self::LocalOnly(id) => write!(f, "planner exists only locally: {id}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Markdown(err) => Some(err),
            Self::Backend(err) => Some(err),
            Self::LocalOnly(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<MarkdownError> for ServiceError {
    fn from(value: MarkdownError) -> Self {
        Self::Markdown(value)
    }
}

impl From<BackendError> for ServiceError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}

/// Planner service facade.
pub struct PlannerService<B: PlannerBackend> {
    backend: B,
}

impl<B: PlannerBackend> PlannerService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Lists backend templates, or the built-ins when the backend fails.
    pub fn list_templates(&self) -> Vec<PlannerTemplate> {
        match self.backend.list_templates() {
            Ok(templates) => templates,
            Err(err) => {
                warn!(
                    "event=planner_templates module=service status=error error_code={} fallback=builtin",
                    err.code()
                );
                PlannerTemplate::builtins()
            }
        }
    }

    /// Creates a planner from a template.
    ///
    /// Falls back to a local `temp-` planner built from the matching built-in
    /// template when the backend call fails.
    ///
    /// # Errors
    /// - `Validation(BlankTitle)` for blank titles.
    /// - `Validation(UnknownTemplate)` when the backend fails and no
    ///   built-in template matches `template_id`.
    pub fn create_planner(&self, template_id: &str, title: &str, description: &str) -> ServiceResult<Planner> {
        let title = require_title(title, EntityKind::Planner)?;
        let request = CreatePlannerRequest {
            template_id: template_id.trim().to_string(),
            title: title.clone(),
            description: description.to_string(),
        };

        match self.backend.create_planner(&request) {
            Ok(planner) => {
                info!(
                    "event=planner_create module=service status=ok mode=remote planner_id={} lanes={}",
                    planner.id,
                    planner.lanes.len()
                );
                Ok(normalize_planner(&planner))
            }
            Err(err) => {
                let template = PlannerTemplate::builtin(template_id)
                    .ok_or_else(|| ValidationError::UnknownTemplate(template_id.to_string()))?;
                let planner = template.instantiate(temp_planner_id(), title, description);
                warn!(
                    "event=planner_create module=service status=ok mode=local_fallback planner_id={} error_code={}",
                    planner.id,
                    err.code()
                );
                Ok(planner)
            }
        }
    }

    /// Loads a persisted planner.
    ///
    /// # Errors
    /// - `LocalOnly` for `temp-` ids; `Backend` when the request fails.
    pub fn open_planner(&self, planner_id: &str) -> ServiceResult<Planner> {
        if is_temp_id(planner_id) {
            return Err(ServiceError::LocalOnly(planner_id.to_string()));
        }
        let planner = self.backend.get_planner(planner_id)?;
        info!(
            "event=planner_open module=service status=ok planner_id={} lanes={} cards={}",
            planner.id,
            planner.lanes.len(),
            planner.card_count()
        );
        Ok(normalize_planner(&planner))
    }

    /// Deletes a planner; `temp-` planners are dropped locally.
    pub fn delete_planner(&self, planner_id: &str) -> ServiceResult<()> {
        if is_temp_id(planner_id) {
            return Ok(());
        }
        self.backend.delete_planner(planner_id).map_err(Into::into)
    }

    /// Exports markdown through the backend, or locally for `temp-`
    /// planners and when the backend fails.
    pub fn export_markdown(&self, planner: &Planner) -> String {
        if planner.is_temp() {
            return export_planner_markdown(planner);
        }
        match self.backend.export_markdown(&planner.id) {
            Ok(markdown) => markdown,
            Err(err) => {
                warn!(
                    "event=markdown_export module=service status=error planner_id={} error_code={} fallback=local",
                    planner.id,
                    err.code()
                );
                export_planner_markdown(planner)
            }
        }
    }

    /// Imports markdown through the backend, or parses it locally into a
    /// `temp-` planner when the backend fails.
    ///
    /// # Errors
    /// - `Markdown` when the local parse rejects the document.
    pub fn import_markdown(&self, markdown: &str, template_id: &str) -> ServiceResult<Planner> {
        let request = ImportMarkdownRequest {
            markdown: markdown.to_string(),
            template_id: template_id.trim().to_string(),
        };
        match self.backend.import_markdown(&request) {
            Ok(planner) => {
                info!(
                    "event=markdown_import module=service status=ok mode=remote planner_id={} lanes={}",
                    planner.id,
                    planner.lanes.len()
                );
                Ok(normalize_planner(&planner))
            }
            Err(err) => {
                warn!(
                    "event=markdown_import module=service status=error error_code={} fallback=local",
                    err.code()
                );
                import_planner_from_markdown(markdown, Some(template_id)).map_err(Into::into)
            }
        }
    }
}
