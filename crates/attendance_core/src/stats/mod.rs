//! Derived attendance statistics.
//!
//! # Responsibility
//! - Compute per-student rates, rankings, trends and aggregates on demand.
//! - Render those results into an exportable report document.
//!
//! # Invariants
//! - No state of its own; nothing here is cached or persisted with the stores.

pub mod engine;
pub mod report;
