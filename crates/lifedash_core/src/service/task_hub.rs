//! Unified task reconciliation across dashboard widgets.
//!
//! # Responsibility
//! - Rebuild `brain_space` unified tasks whenever the brain dump changes.
//! - Mirror active high-priority brain tasks into `enoughTasks`.
//! - Record project work pulled into today's plan.
//! - Cascade completion to every record derived from one unified task.
//!
//! # Invariants
//! - Brain tasks keep their id across rebuilds while `(originalIndex, text)`
//!   still matches; anything else gets a fresh id.
//! - Reconciliation replaces only `brain_space` unified entries and only
//!   `BrainSpace` capacity mirrors; everything else is left byte-for-byte.
//! - The capacity mirror and the `Capacity` component query share one
//!   selection rule (`is_capacity_candidate`).
//! - Every collection a pass touches is persisted before any subscriber is
//!   notified, so readers never observe a half-applied pass.

use crate::clock::Clock;
use crate::model::brain_dump::BrainDumpItem;
use crate::model::capacity_task::{CapacitySource, CapacityTask, CapacityTaskId};
use crate::model::project::ProjectId;
use crate::model::unified_task::{
    BrainSpaceData, ProjectLink, TaskId, TaskLink, TaskPriority, TaskSource, TaskStatus,
    UnifiedTask,
};
use crate::store::keys::{BRAIN_DUMP_ITEMS, CAPACITY_TASKS, UNIFIED_TASKS};
use crate::store::{decode_indexed, KeyValueStore, StoreResult, Subscription};
use log::{debug, info};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Capacity points per estimated hour of pulled project work.
const PROJECT_POINTS_PER_HOUR: f64 = 20.0;
/// Mirrored tasks get `weight * 3` minutes so duration-based scoring
/// reproduces the priority weight.
const MIRROR_MINUTES_PER_POINT: f64 = 3.0;

/// Widget asking for unified tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskComponent {
    BrainSpace,
    Projects,
    Capacity,
    All,
}

impl TaskComponent {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "brain_space" | "brain-space" => Some(Self::BrainSpace),
            "projects" => Some(Self::Projects),
            "capacity" => Some(Self::Capacity),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Optional narrowing applied after the component rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub source: Option<TaskSource>,
    /// Gate on `projectLink.isActiveWork`; non-project tasks count as `false`.
    pub active_project_work: Option<bool>,
}

impl TaskFilters {
    fn matches(&self, task: &UnifiedTask) -> bool {
        self.status.map_or(true, |status| task.status == status)
            && self.source.map_or(true, |source| task.source() == source)
            && self
                .active_project_work
                .map_or(true, |wanted| task.is_active_project_work() == wanted)
    }
}

/// Counts from one brain-space reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub brain_tasks: usize,
    pub created: usize,
    pub updated: usize,
    pub mirrored: usize,
}

/// Ids of the record pair created by a project pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulledWork {
    pub unified_task_id: TaskId,
    pub capacity_task_id: CapacityTaskId,
}

/// Which records a completion reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionReport {
    pub unified: bool,
    pub capacity: bool,
    pub brain_item: bool,
}

/// Active, and either high-priority brain work or active project work.
pub fn is_capacity_candidate(task: &UnifiedTask) -> bool {
    if !task.is_active() {
        return false;
    }
    match &task.link {
        TaskLink::BrainSpace { .. } => task.priority == TaskPriority::High,
        TaskLink::Projects { project_link } => project_link.is_active_work,
        TaskLink::Capacity { .. } => false,
    }
}

/// Keeps `unifiedTasks` and the brain-space capacity mirror consistent.
pub struct TaskIntegrationHub {
    store: KeyValueStore,
    clock: Rc<dyn Clock>,
    subscription: RefCell<Option<Subscription>>,
}

impl TaskIntegrationHub {
    /// Creates a hub that only reconciles when called explicitly.
    pub fn new(store: KeyValueStore) -> Self {
        let clock = store.clock();
        Self {
            store,
            clock,
            subscription: RefCell::new(None),
        }
    }

    /// Creates a hub that reconciles on every brain-dump write.
    pub fn attach(store: KeyValueStore) -> Rc<Self> {
        let hub = Rc::new(Self::new(store));
        let weak = Rc::downgrade(&hub);
        let subscription = hub
            .store
            .subscribe(BRAIN_DUMP_ITEMS, move |new_value, _old_value| {
                if let Some(hub) = weak.upgrade() {
                    hub.reconcile_brain_space_value(new_value)?;
                }
                Ok(())
            });
        *hub.subscription.borrow_mut() = Some(subscription);
        hub
    }

    /// Stops reacting to brain-dump writes.
    pub fn detach(&self) {
        if let Some(subscription) = self.subscription.borrow_mut().take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.borrow().is_some()
    }

    /// Reconciles against whatever the store currently holds.
    pub fn reconcile_from_store(&self) -> StoreResult<ReconcileReport> {
        let items = self.store.get_value(BRAIN_DUMP_ITEMS).unwrap_or(Value::Null);
        self.reconcile_brain_space_value(&items)
    }

    /// Reconciles from raw stored JSON.
    ///
    /// A non-array reads as no items; undecodable elements are skipped but
    /// the remaining items keep their original positions.
    pub fn reconcile_brain_space_value(&self, items: &Value) -> StoreResult<ReconcileReport> {
        let decoded: Vec<(usize, BrainDumpItem)> = decode_indexed(BRAIN_DUMP_ITEMS, items);
        self.reconcile_entries(decoded.iter().map(|(index, item)| (*index, item)))
    }

    pub fn reconcile_brain_space(&self, items: &[BrainDumpItem]) -> StoreResult<ReconcileReport> {
        self.reconcile_entries(items.iter().enumerate())
    }

    fn reconcile_entries<'a>(
        &self,
        entries: impl Iterator<Item = (usize, &'a BrainDumpItem)>,
    ) -> StoreResult<ReconcileReport> {
        let now_ms = self.clock.now_ms();
        let mut report = ReconcileReport::default();

        let mut kept = Vec::new();
        let mut previous = Vec::new();
        for value in self.store.get_array(UNIFIED_TASKS) {
            match serde_json::from_value::<UnifiedTask>(value.clone()) {
                Ok(task) if task.source() == TaskSource::BrainSpace => previous.push(task),
                _ => kept.push(value),
            }
        }

        let mut fresh = Vec::new();
        for (index, item) in entries {
            let matched = previous.iter().find(|task| {
                task.text == item.text
                    && task
                        .brain_space_data()
                        .is_some_and(|data| data.original_index == index)
            });
            let task = match matched {
                Some(existing) => {
                    let mut task = existing.clone();
                    if refresh_brain_task(&mut task, item, now_ms) {
                        report.updated += 1;
                    }
                    task
                }
                None => {
                    report.created += 1;
                    new_brain_task(index, item, now_ms)
                }
            };
            fresh.push(task);
        }
        report.brain_tasks = fresh.len();

        for task in &fresh {
            kept.push(serde_json::to_value(task)?);
        }
        let (capacity, mirrored) = self.rebuild_capacity_mirror(&fresh, now_ms)?;
        report.mirrored = mirrored;

        self.store.set_many(vec![
            (UNIFIED_TASKS, Value::Array(kept)),
            (CAPACITY_TASKS, capacity),
        ])?;

        info!(
            "event=reconcile_brain_space module=task_hub status=ok brain_tasks={} created={} updated={} mirrored={}",
            report.brain_tasks, report.created, report.updated, report.mirrored
        );
        Ok(report)
    }

    /// Returns the new `enoughTasks` value and how many mirrors it holds.
    fn rebuild_capacity_mirror(
        &self,
        brain_tasks: &[UnifiedTask],
        now_ms: i64,
    ) -> StoreResult<(Value, usize)> {
        let mut kept = Vec::new();
        let mut previous_mirror = Vec::new();
        for value in self.store.get_array(CAPACITY_TASKS) {
            match serde_json::from_value::<CapacityTask>(value.clone()) {
                Ok(task) if task.is_brain_space_mirror() => previous_mirror.push(task),
                _ => kept.push(value),
            }
        }

        let mut mirrored = 0;
        for task in brain_tasks.iter().filter(|task| is_capacity_candidate(task)) {
            let entry = match previous_mirror
                .iter()
                .find(|mirror| mirror.unified_task_id == Some(task.id))
            {
                Some(existing) => {
                    let mut entry = existing.clone();
                    entry.text.clone_from(&task.text);
                    entry
                }
                None => mirror_capacity_task(task, now_ms),
            };
            kept.push(serde_json::to_value(&entry)?);
            mirrored += 1;
        }

        Ok((Value::Array(kept), mirrored))
    }

    /// Commits project work to today.
    ///
    /// Always appends a new unified task and a new capacity task linked by
    /// `unifiedTaskId`; repeated calls are separate work sessions. Inputs are
    /// not validated here (see `ProjectService::commit_today`).
    pub fn pull_project_task_to_daily(
        &self,
        project_id: ProjectId,
        project_name: &str,
        description: &str,
        estimated_hours: f64,
    ) -> StoreResult<PulledWork> {
        let now_ms = self.clock.now_ms();

        let unified = UnifiedTask::new(
            description,
            TaskPriority::High,
            TaskLink::Projects {
                project_link: ProjectLink {
                    project_id,
                    project_name: project_name.to_string(),
                    is_active_work: true,
                },
            },
            now_ms,
        );

        let mut capacity = CapacityTask::with_source(
            description,
            (estimated_hours * 60.0).round() as u32,
            now_ms,
            CapacitySource::Project {
                project_id,
                project_name: project_name.to_string(),
                calculated_capacity: (estimated_hours * PROJECT_POINTS_PER_HOUR).min(100.0),
            },
        );
        capacity.unified_task_id = Some(unified.id);

        let mut unified_values = self.store.get_array(UNIFIED_TASKS);
        unified_values.push(serde_json::to_value(&unified)?);
        let mut capacity_values = self.store.get_array(CAPACITY_TASKS);
        capacity_values.push(serde_json::to_value(&capacity)?);
        self.store.set_many(vec![
            (UNIFIED_TASKS, Value::Array(unified_values)),
            (CAPACITY_TASKS, Value::Array(capacity_values)),
        ])?;

        info!(
            "event=project_pull module=task_hub status=ok project_id={} unified_task_id={} capacity_task_id={}",
            project_id, unified.id, capacity.id
        );
        Ok(PulledWork {
            unified_task_id: unified.id,
            capacity_task_id: capacity.id,
        })
    }

    /// Completes a unified task and whatever was derived from it.
    ///
    /// Missing records are skipped; completing twice is harmless.
    pub fn complete_task(&self, unified_task_id: TaskId) -> StoreResult<CompletionReport> {
        let now_ms = self.clock.now_ms();
        let mut report = CompletionReport::default();

        let mut brain_index = None;
        let mut unified_values = self.store.get_array(UNIFIED_TASKS);
        for value in unified_values.iter_mut() {
            let Ok(mut task) = serde_json::from_value::<UnifiedTask>(value.clone()) else {
                continue;
            };
            if task.id != unified_task_id {
                continue;
            }
            report.unified = true;
            brain_index = task.brain_space_data().map(|data| data.original_index);
            if task.complete(now_ms) {
                *value = serde_json::to_value(&task)?;
            }
            break;
        }

        let mut capacity_values = self.store.get_array(CAPACITY_TASKS);
        for value in capacity_values.iter_mut() {
            let Ok(mut task) = serde_json::from_value::<CapacityTask>(value.clone()) else {
                continue;
            };
            if task.unified_task_id != Some(unified_task_id) {
                continue;
            }
            report.capacity = true;
            if !task.completed {
                task.completed = true;
                *value = serde_json::to_value(&task)?;
            }
        }
        let mut writes = Vec::new();
        if report.unified {
            writes.push((UNIFIED_TASKS, Value::Array(unified_values)));
        }
        if report.capacity {
            writes.push((CAPACITY_TASKS, Value::Array(capacity_values)));
        }
        self.store.set_many(writes)?;

        // Written last: this write re-enters reconciliation when attached.
        if let Some(index) = brain_index {
            let mut items = self.store.get_array(BRAIN_DUMP_ITEMS);
            if let Some(item) = items.get_mut(index).and_then(Value::as_object_mut) {
                item.insert("completed".to_string(), Value::Bool(true));
                report.brain_item = true;
                self.store.set_value(BRAIN_DUMP_ITEMS, Value::Array(items))?;
            }
        }

        info!(
            "event=task_complete module=task_hub status=ok unified_task_id={} unified={} capacity={} brain_item={}",
            unified_task_id, report.unified, report.capacity, report.brain_item
        );
        Ok(report)
    }

    /// Reads unified tasks for one widget.
    pub fn get_tasks_for_component(
        &self,
        component: TaskComponent,
        filters: &TaskFilters,
    ) -> Vec<UnifiedTask> {
        let tasks: Vec<UnifiedTask> = self.store.get_collection(UNIFIED_TASKS);
        let selected: Vec<UnifiedTask> = tasks
            .into_iter()
            .filter(|task| match component {
                TaskComponent::BrainSpace => task.source() == TaskSource::BrainSpace,
                TaskComponent::Projects => task.source() == TaskSource::Projects,
                TaskComponent::Capacity => is_capacity_candidate(task),
                TaskComponent::All => true,
            })
            .filter(|task| filters.matches(task))
            .collect();
        debug!(
            "event=tasks_for_component module=task_hub status=ok component={:?} count={}",
            component,
            selected.len()
        );
        selected
    }
}

fn status_for(item: &BrainDumpItem) -> TaskStatus {
    if item.completed {
        TaskStatus::Completed
    } else {
        TaskStatus::Active
    }
}

fn new_brain_task(index: usize, item: &BrainDumpItem, now_ms: i64) -> UnifiedTask {
    let mut task = UnifiedTask::new(
        item.text.clone(),
        item.priority.into(),
        TaskLink::BrainSpace {
            brain_space_data: BrainSpaceData {
                original_index: index,
                priority: item.priority,
                created_at: item.created_at,
            },
        },
        now_ms,
    );
    task.created_at = item.created_at;
    task.status = status_for(item);
    task
}

/// Copies priority and completion from the source item.
///
/// Completion is one-way: an un-completed item does not reopen its task.
fn refresh_brain_task(task: &mut UnifiedTask, item: &BrainDumpItem, now_ms: i64) -> bool {
    let priority = TaskPriority::from(item.priority);
    let mut changed = false;

    if task.priority != priority {
        task.priority = priority;
        changed = true;
    }
    if let TaskLink::BrainSpace { brain_space_data } = &mut task.link {
        if brain_space_data.priority != item.priority {
            brain_space_data.priority = item.priority;
            changed = true;
        }
    }
    if status_for(item) == TaskStatus::Completed && task.status == TaskStatus::Active {
        task.status = TaskStatus::Completed;
        changed = true;
    }

    if changed {
        task.updated_at = now_ms;
    }
    changed
}

fn mirror_capacity_task(task: &UnifiedTask, now_ms: i64) -> CapacityTask {
    let energy_weight = task.priority.energy_weight();
    let mut entry = CapacityTask::with_source(
        task.text.clone(),
        (energy_weight * MIRROR_MINUTES_PER_POINT).round() as u32,
        now_ms,
        CapacitySource::BrainSpace { energy_weight },
    );
    entry.unified_task_id = Some(task.id);
    entry
}
