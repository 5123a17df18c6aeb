//! The live store object.
//!
//! A [`Workspace`] owns the in-memory store, the view state and a snapshot
//! writer. Every mutation is applied synchronously and, when it changed
//! something, followed by a full snapshot submitted to the writer. Reads are
//! computed on demand from the current state.

use jiff::{Timestamp, civil::Date, tz::TimeZone};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    models::{
        project::{AddProjectParameters, Project, ProjectPatch},
        store::Store,
        task::{AddTaskParameters, Task, TaskPatch},
        tree,
    },
    services::{
        calendar::{self, CalendarDay},
        projects::{self, DeleteProjectResult, ResolveProjectError},
        tasks::{self, MoveTaskError, ResolveTaskError},
        views::{self, Filter, SortKey, TaskStats, ViewState},
    },
    storage::{Storage, StorageError, writer::SnapshotWriter},
};

pub struct Workspace<W: SnapshotWriter> {
    store: Store,
    view: ViewState,
    writer: W,
}

impl<W: SnapshotWriter> Workspace<W> {
    /// Loads the persisted store and prepares it for use.
    pub fn open<S: Storage>(storage: &S, writer: W) -> Result<Self, StorageError> {
        let store = storage.load()?;
        Ok(Self::from_store(store, writer))
    }

    /// Synthesizes the default project, marked current, when the registry
    /// is empty, and drops a current pointer that names no project.
    pub fn from_store(store: Store, writer: W) -> Self {
        let mut workspace = Self {
            store,
            view: ViewState::default(),
            writer,
        };

        let mut changed = false;
        if let Some(current) = workspace.store.current_project
            && workspace.store.get_project(current).is_none()
        {
            debug!(%current, "current project no longer exists");
            workspace.store.current_project = None;
            changed = true;
        }
        if let Some(default) = projects::ensure_default_project(&mut workspace.store) {
            info!(id = %default.id, "created default project");
            workspace.store.current_project = Some(default.id);
            changed = true;
        }
        if changed {
            workspace.commit();
        }
        workspace
    }

    /// Hands back the writer so the caller can flush it.
    pub fn close(self) -> W {
        self.writer
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.store.tasks
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.store.get_task(id)
    }

    pub fn project(&self, id: Uuid) -> Option<&Project> {
        self.store.get_project(id)
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    fn commit(&mut self) {
        self.writer.submit(self.store.clone());
    }

    fn commit_if(&mut self, changed: bool) -> bool {
        if changed {
            self.commit();
        }
        changed
    }

    // Tasks

    /// New root task. Without an explicit project it joins the current one.
    pub fn add_task(&mut self, mut parameters: AddTaskParameters) -> Task {
        if parameters.project_id.is_none() {
            parameters.project_id = self.store.current_project;
        }
        let task = tasks::add_task(&mut self.store, parameters);
        self.commit();
        task
    }

    pub fn add_subtask(&mut self, parent_id: Uuid, parameters: AddTaskParameters) -> Option<Task> {
        let subtask = tasks::add_subtask(&mut self.store, parent_id, parameters);
        self.commit_if(subtask.is_some());
        subtask
    }

    pub fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> bool {
        if patch.is_empty() {
            return self.store.get_task(id).is_some();
        }
        let updated = tasks::update_task(&mut self.store, id, patch);
        self.commit_if(updated)
    }

    pub fn delete_task(&mut self, id: Uuid) -> Option<Task> {
        let removed = tasks::delete_task(&mut self.store, id);
        self.commit_if(removed.is_some());
        removed
    }

    pub fn toggle_completed(&mut self, id: Uuid) -> Option<bool> {
        let completed = tasks::toggle_completed(&mut self.store, id);
        self.commit_if(completed.is_some());
        completed
    }

    pub fn toggle_expanded(&mut self, id: Uuid) -> Option<bool> {
        let expanded = tasks::toggle_expanded(&mut self.store, id);
        self.commit_if(expanded.is_some());
        expanded
    }

    pub fn archive_task(&mut self, id: Uuid) -> bool {
        let archived = tasks::set_archived(&mut self.store, id, true);
        self.commit_if(archived)
    }

    pub fn unarchive_task(&mut self, id: Uuid) -> bool {
        let restored = tasks::set_archived(&mut self.store, id, false);
        self.commit_if(restored)
    }

    pub fn archive_completed(&mut self) -> usize {
        let count = tasks::archive_completed(&mut self.store);
        self.commit_if(count > 0);
        count
    }

    pub fn clear_completed(&mut self) -> usize {
        let count = tasks::clear_completed(&mut self.store);
        self.commit_if(count > 0);
        count
    }

    pub fn reorder_siblings(&mut self, parent: Option<Uuid>, ordered_ids: &[Uuid]) -> bool {
        let reordered = tasks::reorder_siblings(&mut self.store, parent, ordered_ids);
        self.commit_if(reordered)
    }

    /// Drag-and-drop entry point. The root list is taken in its visible
    /// order, a subtask list in ascending `order`.
    pub fn move_sibling(&mut self, container: Option<Uuid>, from_index: usize, to_index: usize) -> bool {
        let mut ids: Vec<Uuid> = match container {
            None => self.visible_tasks().iter().map(|t| t.id).collect(),
            Some(parent_id) => {
                let Some(parent) = self.store.get_task(parent_id) else {
                    debug!(%parent_id, "move_sibling: parent not found");
                    return false;
                };
                tree::ordered(&parent.subtasks).iter().map(|t| t.id).collect()
            }
        };

        if from_index >= ids.len() || to_index >= ids.len() {
            debug!(from_index, to_index, "move_sibling: index out of range");
            return false;
        }
        let moved = ids.remove(from_index);
        ids.insert(to_index, moved);
        self.reorder_siblings(container, &ids)
    }

    pub fn move_task(&mut self, id: Uuid, new_parent: Option<Uuid>) -> Result<(), MoveTaskError> {
        tasks::move_task(&mut self.store, id, new_parent)?;
        self.commit();
        Ok(())
    }

    pub fn resolve_task(&self, query: &str) -> Result<Uuid, ResolveTaskError> {
        tasks::resolve_task(&self.store, query)
    }

    // Views

    pub fn set_filter(&mut self, filter: Filter) {
        self.view.filter = filter;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.view.sort = sort;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.view.search = search.into();
    }

    pub fn set_project_scope(&mut self, project: Option<Uuid>) {
        self.view.project = project;
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        views::visible_tasks(&self.store.tasks, &self.view)
    }

    pub fn stats(&self, now: Timestamp) -> TaskStats {
        views::stats(&self.store.tasks, now)
    }

    pub fn project_stats(&self, project_id: Uuid, now: Timestamp) -> TaskStats {
        views::project_stats(&self.store.tasks, project_id, now)
    }

    // Projects

    pub fn add_project(&mut self, parameters: AddProjectParameters) -> Project {
        let project = projects::add_project(&mut self.store, parameters);
        self.commit();
        project
    }

    pub fn update_project(&mut self, id: Uuid, patch: ProjectPatch) -> bool {
        let updated = projects::update_project(&mut self.store, id, patch);
        self.commit_if(updated)
    }

    /// Deleting the current project clears the current pointer.
    pub fn delete_project(&mut self, id: Uuid) -> Option<DeleteProjectResult> {
        let result = projects::delete_project(&mut self.store, id)?;
        if self.store.current_project == Some(id) {
            self.store.current_project = None;
        }
        if self.view.project == Some(id) {
            self.view.project = None;
        }
        self.commit();
        Some(result)
    }

    pub fn archive_project(&mut self, id: Uuid) -> bool {
        let archived = projects::set_project_archived(&mut self.store, id, true);
        self.commit_if(archived)
    }

    pub fn unarchive_project(&mut self, id: Uuid) -> bool {
        let restored = projects::set_project_archived(&mut self.store, id, false);
        self.commit_if(restored)
    }

    pub fn reorder_projects(&mut self, from_index: usize, to_index: usize) -> bool {
        let reordered = projects::reorder_projects(&mut self.store, from_index, to_index);
        self.commit_if(reordered)
    }

    /// `false` when `id` names no project; the pointer is left unchanged.
    pub fn set_current_project(&mut self, id: Option<Uuid>) -> bool {
        if let Some(id) = id
            && self.store.get_project(id).is_none()
        {
            debug!(%id, "set_current_project: project not found");
            return false;
        }
        if self.store.current_project != id {
            self.store.current_project = id;
            self.commit();
        }
        true
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.store
            .current_project
            .and_then(|id| self.store.get_project(id))
    }

    pub fn active_projects(&self) -> Vec<&Project> {
        projects::active_projects(&self.store)
    }

    pub fn archived_projects(&self) -> Vec<&Project> {
        projects::archived_projects(&self.store)
    }

    pub fn project_task_count(&self, id: Uuid) -> usize {
        projects::project_task_count(&self.store, id)
    }

    pub fn resolve_project(&self, query: &str) -> Result<Uuid, ResolveProjectError> {
        projects::resolve_project(&self.store, query)
    }

    // Calendar

    pub fn tasks_on(&self, date: Date, tz: &TimeZone) -> Vec<&Task> {
        calendar::tasks_on(&self.store.tasks, date, tz)
    }

    pub fn week_view(&self, anchor: Date, today: Date, tz: &TimeZone) -> Vec<CalendarDay<'_>> {
        calendar::week_view(&self.store.tasks, anchor, today, tz)
    }

    pub fn month_view(&self, anchor: Date, today: Date, tz: &TimeZone) -> Vec<CalendarDay<'_>> {
        calendar::month_view(&self.store.tasks, anchor, today, tz)
    }

    pub fn task_count(&self) -> usize {
        tree::count(&self.store.tasks)
    }
}
