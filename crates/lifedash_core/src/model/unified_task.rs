//! Canonical cross-widget task record.
//!
//! # Responsibility
//! - Give brain-dump, project and capacity work one identity (`TaskId`).
//! - Carry exactly one origin payload, selected by `source`.
//!
//! # Invariants
//! - `source` and the payload cannot disagree: both come from `TaskLink`.
//! - `status` only moves `active -> completed`; `complete()` is the only
//!   mutator and it never reopens.

use crate::model::brain_dump::BrainDumpPriority;
use crate::model::project::{ProjectId, ProjectPriority};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;

/// Widget a unified task originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    BrainSpace,
    Projects,
    Capacity,
}

impl TaskSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BrainSpace => "brain_space",
            Self::Projects => "projects",
            Self::Capacity => "capacity",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "brain_space" => Some(Self::BrainSpace),
            "projects" => Some(Self::Projects),
            "capacity" => Some(Self::Capacity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Completed,
}

impl TaskStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Priority scale shared by every origin.
///
/// Brain-dump `unsorted` is kept distinct so triage state survives the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
    Unsorted,
}

impl TaskPriority {
    /// Fixed capacity points a mirrored task of this priority costs.
    pub fn energy_weight(self) -> f64 {
        match self {
            Self::High => 25.0,
            Self::Medium => 15.0,
            Self::Low | Self::Unsorted => 8.0,
        }
    }
}

impl From<BrainDumpPriority> for TaskPriority {
    fn from(value: BrainDumpPriority) -> Self {
        match value {
            BrainDumpPriority::High => Self::High,
            BrainDumpPriority::Low => Self::Low,
            BrainDumpPriority::Unsorted => Self::Unsorted,
        }
    }
}

impl From<ProjectPriority> for TaskPriority {
    fn from(value: ProjectPriority) -> Self {
        match value {
            ProjectPriority::High => Self::High,
            ProjectPriority::Medium => Self::Medium,
            ProjectPriority::Low => Self::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainSpaceData {
    /// Position of the source item in `simpleBrainDumpItems`.
    pub original_index: usize,
    pub priority: BrainDumpPriority,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLink {
    pub project_id: ProjectId,
    pub project_name: String,
    /// True when the task was committed to today's plan.
    pub is_active_work: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityData {
    /// Minutes.
    pub duration: u32,
    pub energy_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_capacity: Option<f64>,
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<i64>,
}

/// Origin payload; the serde tag doubles as the `source` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "source",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum TaskLink {
    BrainSpace { brain_space_data: BrainSpaceData },
    Projects { project_link: ProjectLink },
    Capacity { capacity_data: CapacityData },
}

/// One entry of the `unifiedTasks` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedTask {
    pub id: TaskId,
    pub text: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(flatten)]
    pub link: TaskLink,
}

impl UnifiedTask {
    /// Creates an active task with a fresh id.
    pub fn new(
        text: impl Into<String>,
        priority: TaskPriority,
        link: TaskLink,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            priority,
            status: TaskStatus::Active,
            created_at: now_ms,
            updated_at: now_ms,
            link,
        }
    }

    pub fn source(&self) -> TaskSource {
        match self.link {
            TaskLink::BrainSpace { .. } => TaskSource::BrainSpace,
            TaskLink::Projects { .. } => TaskSource::Projects,
            TaskLink::Capacity { .. } => TaskSource::Capacity,
        }
    }

    pub fn brain_space_data(&self) -> Option<&BrainSpaceData> {
        match &self.link {
            TaskLink::BrainSpace { brain_space_data } => Some(brain_space_data),
            _ => None,
        }
    }

    pub fn project_link(&self) -> Option<&ProjectLink> {
        match &self.link {
            TaskLink::Projects { project_link } => Some(project_link),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }

    pub fn is_active_project_work(&self) -> bool {
        self.project_link().is_some_and(|link| link.is_active_work)
    }

    /// Marks the task completed. Returns `false` when it already was.
    pub fn complete(&mut self, now_ms: i64) -> bool {
        if self.status == TaskStatus::Completed {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.updated_at = now_ms;
        true
    }
}
