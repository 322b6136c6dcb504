//! Flutter bridge for the LazyPlan core.

pub mod api;
