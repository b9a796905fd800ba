//! Core state for the personal dashboard.
//! Owns the notifying key-value store, unified task reconciliation and
//! capacity scoring; widgets only render what this crate persists.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod scoring;
pub mod service;
pub mod store;
pub mod sync;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DashboardConfig;
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::brain_dump::{BrainDumpId, BrainDumpItem, BrainDumpPriority};
pub use model::capacity_task::{CapacitySource, CapacityTask, CapacityTaskId};
pub use model::project::{Project, ProjectId, ProjectLinkKind, ProjectPriority, ProjectTodo};
pub use model::unified_task::{
    TaskId, TaskLink, TaskPriority, TaskSource, TaskStatus, UnifiedTask,
};
pub use scoring::CapacitySnapshot;
pub use service::brain_dump_service::BrainDumpService;
pub use service::project_service::{NewProject, ProjectService, ProjectServiceError};
pub use service::task_hub::{
    CompletionReport, PulledWork, ReconcileReport, TaskComponent, TaskFilters,
    TaskIntegrationHub,
};
pub use store::{
    KeyValueStore, MemoryBackend, SqliteBackend, StoreError, StoreResult, Subscription,
};
pub use sync::{FlushReport, PendingMutation, RemoteErrorEnvelope, RemoteStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Wired-up services sharing one store.
pub struct Dashboard {
    pub store: KeyValueStore,
    pub hub: std::rc::Rc<TaskIntegrationHub>,
    pub brain_dump: BrainDumpService,
    pub projects: ProjectService,
}

impl Dashboard {
    /// Attaches the hub to `store` and builds the widget services around it.
    pub fn new(store: KeyValueStore) -> Self {
        let hub = TaskIntegrationHub::attach(store.clone());
        Self {
            brain_dump: BrainDumpService::new(store.clone()),
            projects: ProjectService::new(store.clone(), std::rc::Rc::clone(&hub)),
            hub,
            store,
        }
    }

    /// Opens the store described by `config` (file or in-memory).
    pub fn open(config: &DashboardConfig) -> StoreResult<Self> {
        let backend = match &config.db_path {
            Some(path) => SqliteBackend::open(path)?,
            None => SqliteBackend::in_memory()?,
        };
        Ok(Self::new(KeyValueStore::new(backend)))
    }

    /// Capacity summary at the store clock's current hour.
    pub fn capacity_snapshot(&self) -> CapacitySnapshot {
        self.capacity_snapshot_at(self.store.clock().local_hour())
    }

    /// Capacity summary as if it were local `hour`.
    pub fn capacity_snapshot_at(&self, hour: u32) -> CapacitySnapshot {
        let tasks: Vec<CapacityTask> = self.store.get_collection(store::keys::CAPACITY_TASKS);
        scoring::snapshot(&tasks, hour)
    }
}

#[cfg(test)]
mod tests {
    use super::{core_version, Dashboard, DashboardConfig, NewProject};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn default_config_opens_in_memory_dashboard() {
        let dashboard = Dashboard::open(&DashboardConfig::default()).unwrap();
        assert!(dashboard.hub.is_attached());
        assert!(dashboard.capacity_snapshot().used <= 100);
    }

    #[test]
    fn snapshot_at_explicit_hour_applies_depletion() {
        let dashboard = Dashboard::open(&DashboardConfig::default()).unwrap();
        let site = NewProject {
            name: "Site".to_string(),
            ..NewProject::default()
        };
        let project = dashboard.projects.create(site).unwrap();
        dashboard.projects.commit_today(project.id, "footer", 1.0).unwrap();

        let morning = dashboard.capacity_snapshot_at(10);
        let evening = dashboard.capacity_snapshot_at(19);
        assert_eq!((morning.used, morning.depletion), (20, 0));
        assert_eq!((evening.used, evening.depletion), (40, 20));
        assert_eq!(evening.remaining, 60);
    }
}
