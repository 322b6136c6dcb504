//! Client-side preconditions checked before any state change.
//!
//! # Invariants
//! - A failed check never leaves a partially applied mutation behind.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Board entity kinds referenced by validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Planner,
    Lane,
    Card,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Lane => "lane",
            Self::Card => "card",
        }
    }
}

/// Precondition failure raised before a mutation or request is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty after trim.
    BlankTitle(EntityKind),
    /// Id is empty after trim.
    BlankId(EntityKind),
    /// Template id does not match any known template.
    UnknownTemplate(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle(kind) => write!(f, "{} title must not be blank", kind.as_str()),
            Self::BlankId(kind) => write!(f, "{} id must not be blank", kind.as_str()),
            Self::UnknownTemplate(id) => write!(f, "unknown planner template: {id}"),
        }
    }
}

impl Error for ValidationError {}

/// Returns the trimmed title, or `BlankTitle` when nothing is left.
pub fn require_title(value: &str, kind: EntityKind) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankTitle(kind));
    }
    Ok(trimmed.to_string())
}

/// Rejects empty ids.
pub fn require_id(value: &str, kind: EntityKind) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankId(kind));
    }
    Ok(())
}
