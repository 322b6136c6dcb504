//! Pure board mutation engine.
//!
//! # Responsibility
//! - Compute new planner states for every user action, synchronously.
//! - Stay free of I/O so the sync layer can apply results optimistically.
//!
//! # Invariants
//! - Functions never mutate their input planner; they return a new value.

pub mod command;
pub mod ordering;
pub mod split;
