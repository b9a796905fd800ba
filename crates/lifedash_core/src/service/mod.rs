//! Use-case services over the key-value store.
//!
//! # Responsibility
//! - Own every write path that widgets trigger.
//! - Keep widgets away from raw store keys and JSON shapes.

pub mod brain_dump_service;
pub mod project_service;
pub mod task_hub;
