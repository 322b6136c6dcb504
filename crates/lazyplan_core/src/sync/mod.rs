//! Backend synchronization for the open planner.
//!
//! # Responsibility
//! - Define the backend contract and its REST implementation.
//! - Confirm optimistic board mutations and roll back failed ones.

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod http;
