//! Projects table use-cases.
//!
//! # Invariants
//! - Project ids are assigned as `max(existing) + 1` and never reused
//!   while a higher id is stored.
//! - Names are non-blank after trim.
//! - `commit_today` validates before handing off to the task hub, which
//!   trusts its inputs.

use crate::model::project::{Project, ProjectId, ProjectLinkKind, ProjectLinks, ProjectPriority};
use crate::service::task_hub::{PulledWork, TaskIntegrationHub};
use crate::store::keys::PROJECTS;
use crate::store::{KeyValueStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Debug)]
pub enum ProjectServiceError {
    /// Name is blank after trim.
    InvalidName,
    /// Work description is blank after trim.
    InvalidDescription,
    /// Estimated hours must be a positive finite number.
    InvalidHours(f64),
    ProjectNotFound(ProjectId),
    /// The highest stored id is already `i64::MAX`.
    IdsExhausted,
    Store(StoreError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "project name must not be blank"),
            Self::InvalidDescription => write!(f, "work description must not be blank"),
            Self::InvalidHours(hours) => {
                write!(f, "estimated hours must be greater than zero, got {hours}")
            }
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::IdsExhausted => write!(f, "no project id left above the stored maximum"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ProjectServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type ProjectResult<T> = Result<T, ProjectServiceError>;

/// Form input for a new project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub priority: ProjectPriority,
    pub category: String,
    pub todos: String,
}

pub struct ProjectService {
    store: KeyValueStore,
    hub: Rc<TaskIntegrationHub>,
}

impl ProjectService {
    pub fn new(store: KeyValueStore, hub: Rc<TaskIntegrationHub>) -> Self {
        Self { store, hub }
    }

    pub fn list(&self) -> Vec<Project> {
        self.store.get_collection(PROJECTS)
    }

    pub fn get(&self, id: ProjectId) -> Option<Project> {
        self.list().into_iter().find(|project| project.id == id)
    }

    pub fn create(&self, input: NewProject) -> ProjectResult<Project> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ProjectServiceError::InvalidName);
        }

        let mut projects = self.list();
        let id = projects
            .iter()
            .map(|project| project.id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or(ProjectServiceError::IdsExhausted)?;
        let project = Project {
            id,
            name: name.to_string(),
            priority: input.priority,
            category: input.category.trim().to_string(),
            todos: input.todos,
            links: ProjectLinks::default(),
        };
        projects.push(project.clone());
        self.store.set(PROJECTS, &projects)?;
        info!("event=project_create module=project status=ok project_id={id}");
        Ok(project)
    }

    pub fn update_priority(
        &self,
        id: ProjectId,
        priority: ProjectPriority,
    ) -> ProjectResult<Project> {
        self.update(id, |project| project.priority = priority)
    }

    pub fn update_todos(&self, id: ProjectId, todos: impl Into<String>) -> ProjectResult<Project> {
        let todos = todos.into();
        self.update(id, |project| project.todos = todos)
    }

    /// Sets or clears (blank `url`) one link slot.
    pub fn set_link(
        &self,
        id: ProjectId,
        kind: ProjectLinkKind,
        url: &str,
    ) -> ProjectResult<Project> {
        let url = url.trim();
        let value = (!url.is_empty()).then(|| url.to_string());
        self.update(id, |project| *project.links.slot_mut(kind) = value)
    }

    pub fn delete(&self, id: ProjectId) -> ProjectResult<()> {
        let mut projects = self.list();
        let before = projects.len();
        projects.retain(|project| project.id != id);
        if projects.len() == before {
            return Err(ProjectServiceError::ProjectNotFound(id));
        }
        self.store.set(PROJECTS, &projects)?;
        info!("event=project_delete module=project status=ok project_id={id}");
        Ok(())
    }

    /// Validates and pulls project work into today's plan.
    pub fn commit_today(
        &self,
        id: ProjectId,
        description: &str,
        estimated_hours: f64,
    ) -> ProjectResult<PulledWork> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ProjectServiceError::InvalidDescription);
        }
        if !estimated_hours.is_finite() || estimated_hours <= 0.0 {
            return Err(ProjectServiceError::InvalidHours(estimated_hours));
        }
        let project = self
            .get(id)
            .ok_or(ProjectServiceError::ProjectNotFound(id))?;

        Ok(self.hub.pull_project_task_to_daily(
            project.id,
            &project.name,
            description,
            estimated_hours,
        )?)
    }

    fn update(&self, id: ProjectId, apply: impl FnOnce(&mut Project)) -> ProjectResult<Project> {
        let mut projects = self.list();
        let project = projects
            .iter_mut()
            .find(|project| project.id == id)
            .ok_or(ProjectServiceError::ProjectNotFound(id))?;
        apply(project);
        let updated = project.clone();
        self.store.set(PROJECTS, &projects)?;
        Ok(updated)
    }
}
