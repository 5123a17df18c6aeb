use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{project::Project, task::Task, tree};

/// Current schema version
pub const CURRENT_VERSION: u32 = 2;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Store {
    pub version: u32,
    /// Root tasks; subtasks live inside their parents
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    /// Project selected for new root tasks and scoped views
    #[serde(default)]
    pub current_project: Option<Uuid>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            tasks: vec![],
            projects: vec![],
            current_project: None,
        }
    }
}

impl Store {
    pub fn get_task(&self, id: Uuid) -> Option<&Task> {
        tree::find(&self.tasks, id)
    }

    pub fn get_task_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        tree::find_mut(&mut self.tasks, id)
    }

    /// Every task at any depth, parents before their subtasks.
    pub fn all_tasks(&self) -> Vec<&Task> {
        tree::flatten(&self.tasks)
    }

    pub fn get_tasks_for_project(&self, project_id: Uuid) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(move |t| t.project_id == Some(project_id))
    }

    pub fn get_project(&self, id: Uuid) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn get_project_mut(&mut self, id: Uuid) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    pub fn get_active_projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter().filter(|p| !p.is_archived)
    }

    pub fn get_archived_projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter().filter(|p| p.is_archived)
    }
}
