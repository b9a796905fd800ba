//! Capacity-planning tasks (`enoughTasks`).
//!
//! # Invariants
//! - A task carries exactly one `CapacitySource`; the ad hoc flag soup of
//!   calculator/quick-add/project markers is a single tagged union here.
//! - Calculator and quick-add capacities are clamped to `[0, 100]` on
//!   construction.

use crate::model::project::ProjectId;
use crate::model::unified_task::TaskId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CapacityTaskId = Uuid;

/// How a task's capacity cost was decided.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CapacitySource {
    /// Cost computed by the energy calculator.
    Calculator { calculated_capacity: f64 },
    /// Quick-add preset scaled by the current energy multiplier.
    QuickAdd {
        adjusted_capacity: f64,
        energy_multiplier: f64,
    },
    /// Work pulled in from a project for today.
    Project {
        project_id: ProjectId,
        project_name: String,
        calculated_capacity: f64,
    },
    /// Mirror of a high-priority brain-dump task; owned by reconciliation.
    BrainSpace { energy_weight: f64 },
    /// Plain entry; cost derives from duration.
    #[default]
    Manual,
}

/// One entry of the `enoughTasks` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityTask {
    pub id: CapacityTaskId,
    pub text: String,
    /// Minutes.
    pub duration: u32,
    #[serde(default)]
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub created: i64,
    #[serde(default)]
    pub source: CapacitySource,
    /// Back-reference to the unified task this entry was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unified_task_id: Option<TaskId>,
}

impl CapacityTask {
    pub fn manual(text: impl Into<String>, duration: u32, created: i64) -> Self {
        Self::with_source(text, duration, created, CapacitySource::Manual)
    }

    pub fn calculated(
        text: impl Into<String>,
        duration: u32,
        calculated_capacity: f64,
        created: i64,
    ) -> Self {
        Self::with_source(
            text,
            duration,
            created,
            CapacitySource::Calculator {
                calculated_capacity: clamp_percent(calculated_capacity),
            },
        )
    }

    pub fn quick_add(
        text: impl Into<String>,
        duration: u32,
        adjusted_capacity: f64,
        energy_multiplier: f64,
        created: i64,
    ) -> Self {
        Self::with_source(
            text,
            duration,
            created,
            CapacitySource::QuickAdd {
                adjusted_capacity: clamp_percent(adjusted_capacity),
                energy_multiplier,
            },
        )
    }

    pub fn with_source(
        text: impl Into<String>,
        duration: u32,
        created: i64,
        source: CapacitySource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            duration,
            completed: false,
            created,
            source,
            unified_task_id: None,
        }
    }

    pub fn is_brain_space_mirror(&self) -> bool {
        matches!(self.source, CapacitySource::BrainSpace { .. })
    }
}

/// Clamps to `[0, 100]`; NaN collapses to 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}
