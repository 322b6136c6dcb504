//! Planner board domain model.
//!
//! # Responsibility
//! - Define canonical board structures used by the engine and sync layers.
//! - Keep the wire shape (snake_case JSON) identical to the backend contract.
//!
//! # Invariants
//! - Every lane and card is identified by a stable string id.
//! - Client-only entities carry the `temp-` prefix.

pub mod planner;
pub mod template;
pub mod validation;
