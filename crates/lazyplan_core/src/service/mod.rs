//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate backend calls into planner-level use cases.
//! - Keep UI/FFI layers decoupled from transport details.

pub mod planner_service;
