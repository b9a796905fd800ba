//! Persisted dashboard entities.
//!
//! # Responsibility
//! - Define the JSON shapes kept under the well-known store keys.
//! - Keep cross-widget task identity (`TaskId`) in one place.
//!
//! # Invariants
//! - Every entity round-trips through `serde_json` with camelCase fields.
//! - Enum-valued fields only ever hold one of their declared variants.

pub mod brain_dump;
pub mod capacity_task;
pub mod project;
pub mod unified_task;
