use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{project::Project, store::Store, task::Task, tree};

pub mod json;
pub mod legacy;
pub mod memory;
pub mod migrations;
pub mod writer;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load store from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save store to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize store to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create backup at '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to cleanup old backups in '{dir}': {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to import legacy data from '{path}': {reason}")]
    LegacyImportFailed { path: PathBuf, reason: String },

    #[error("Store is unavailable: {0}")]
    Unavailable(String),

    #[error(
        "Store file was created by a newer version of taskflow (version {0}). Please upgrade taskflow to open this file."
    )]
    FutureVersion(u32),

    #[error("Store file has unsupported version {0}. This version of taskflow cannot read this file.")]
    UnsupportedVersion(u32),
}

/// Durable home of the task forest and the project registry.
///
/// `load` and `save` are the whole contract; the collection-level and
/// incremental methods default to a full load/modify/save round trip and
/// exist so backends with finer-grained writes can override them.
pub trait Storage {
    /// The complete store, or an empty one when nothing was persisted yet.
    fn load(&self) -> Result<Store, StorageError>;

    /// Replaces everything persisted. A later `load` sees either the old or
    /// the new store, never a mix.
    fn save(&self, store: &Store) -> Result<(), StorageError>;

    fn load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        Ok(self.load()?.tasks)
    }

    fn load_projects(&self) -> Result<Vec<Project>, StorageError> {
        Ok(self.load()?.projects)
    }

    fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let mut store = self.load()?;
        store.tasks = tasks.to_vec();
        self.save(&store)
    }

    fn save_projects(&self, projects: &[Project]) -> Result<(), StorageError> {
        let mut store = self.load()?;
        store.projects = projects.to_vec();
        self.save(&store)
    }

    /// Replaces the task with the same id wherever it sits, or appends it
    /// as a root task.
    fn upsert_task(&self, task: &Task) -> Result<(), StorageError> {
        let mut store = self.load()?;
        match tree::find_mut(&mut store.tasks, task.id) {
            Some(existing) => *existing = task.clone(),
            None => store.tasks.push(task.clone()),
        }
        self.save(&store)
    }

    fn remove_task(&self, id: Uuid) -> Result<(), StorageError> {
        let mut store = self.load()?;
        if tree::remove(&mut store.tasks, id).is_some() {
            self.save(&store)?;
        }
        Ok(())
    }

    fn upsert_project(&self, project: &Project) -> Result<(), StorageError> {
        let mut store = self.load()?;
        match store.get_project_mut(project.id) {
            Some(existing) => *existing = project.clone(),
            None => store.projects.push(project.clone()),
        }
        self.save(&store)
    }

    fn remove_project(&self, id: Uuid) -> Result<(), StorageError> {
        let mut store = self.load()?;
        let before = store.projects.len();
        store.projects.retain(|p| p.id != id);
        if store.projects.len() != before {
            self.save(&store)?;
        }
        Ok(())
    }
}
