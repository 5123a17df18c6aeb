use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    store::Store,
    task::{AddTaskParameters, Task, TaskPatch},
    tree,
};

/// Appends a new root task after the current last one.
pub fn add_task(store: &mut Store, parameters: AddTaskParameters) -> Task {
    let mut task = parameters.into_task();
    task.order = tree::next_order(&store.tasks);
    store.tasks.push(task.clone());
    task
}

/// Appends a subtask under `parent_id` at any depth and expands the parent
/// so the new node is visible. `None` when the parent does not exist.
pub fn add_subtask(store: &mut Store, parent_id: Uuid, parameters: AddTaskParameters) -> Option<Task> {
    let Some(parent) = store.get_task_mut(parent_id) else {
        debug!(%parent_id, "add_subtask: parent not found");
        return None;
    };

    let mut subtask = parameters.into_task();
    subtask.order = tree::next_order(&parent.subtasks);
    subtask.parent_id = Some(parent_id);

    parent.subtasks.push(subtask.clone());
    parent.is_expanded = true;
    parent.touch();

    Some(subtask)
}

pub fn update_task(store: &mut Store, id: Uuid, patch: TaskPatch) -> bool {
    let found = tree::update(&mut store.tasks, id, |task| patch.apply(task)).is_some();
    if !found {
        debug!(%id, "update_task: task not found");
    }
    found
}

/// Removes the task together with its subtree.
pub fn delete_task(store: &mut Store, id: Uuid) -> Option<Task> {
    let removed = tree::remove(&mut store.tasks, id);
    if removed.is_none() {
        debug!(%id, "delete_task: task not found");
    }
    removed
}

/// Flips `completed` on this node only; subtasks keep their own state.
/// Returns the new state.
pub fn toggle_completed(store: &mut Store, id: Uuid) -> Option<bool> {
    tree::update(&mut store.tasks, id, |task| {
        task.completed = !task.completed;
        task.touch();
        task.completed
    })
}

/// Display-only flag, so `updated_at` is left alone.
pub fn toggle_expanded(store: &mut Store, id: Uuid) -> Option<bool> {
    tree::update(&mut store.tasks, id, |task| {
        task.is_expanded = !task.is_expanded;
        task.is_expanded
    })
}

/// Sets `archived` on this node only.
pub fn set_archived(store: &mut Store, id: Uuid, archived: bool) -> bool {
    tree::update(&mut store.tasks, id, |task| {
        task.archived = archived;
        task.touch();
    })
    .is_some()
}

/// Archives every completed node at any depth. Returns how many changed.
pub fn archive_completed(store: &mut Store) -> usize {
    let mut archived = 0;
    tree::for_each_mut(&mut store.tasks, &mut |task| {
        if task.completed && !task.archived {
            task.archived = true;
            task.touch();
            archived += 1;
        }
    });
    archived
}

/// Removes every completed node at any depth, including whatever sits under
/// it. Returns the number of nodes removed.
pub fn clear_completed(store: &mut Store) -> usize {
    tree::retain(&mut store.tasks, &|task| !task.completed)
}

/// Assigns `order = index` to the named siblings of `parent` (the root list
/// when `None`). Siblings not named keep their order value and are placed
/// after the named ones. Ids that are not siblings are ignored.
pub fn reorder_siblings(store: &mut Store, parent: Option<Uuid>, ordered_ids: &[Uuid]) -> bool {
    let Some(siblings) = tree::siblings_mut(&mut store.tasks, parent) else {
        debug!(?parent, "reorder_siblings: parent not found");
        return false;
    };

    let mut remaining = std::mem::take(siblings);
    let mut reordered = Vec::with_capacity(remaining.len());
    for id in ordered_ids {
        if let Some(position) = remaining.iter().position(|t| t.id == *id) {
            let mut task = remaining.remove(position);
            let order = reordered.len() as i64;
            if task.order != order {
                task.order = order;
                task.touch();
            }
            reordered.push(task);
        }
    }
    reordered.extend(remaining);
    *siblings = reordered;
    true
}

/// Reasons a task cannot be moved to a new parent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveTaskError {
    #[error("Task '{0}' not found")]
    TaskNotFound(Uuid),

    #[error("Parent task '{0}' not found")]
    ParentNotFound(Uuid),

    #[error("Task '{task}' cannot be moved under itself or one of its subtasks")]
    WouldCreateCycle { task: Uuid, parent: Uuid },
}

/// Re-attaches a task under `new_parent`, or at the root when `None`.
pub fn move_task(store: &mut Store, id: Uuid, new_parent: Option<Uuid>) -> Result<(), MoveTaskError> {
    if store.get_task(id).is_none() {
        return Err(MoveTaskError::TaskNotFound(id));
    }
    if let Some(parent_id) = new_parent {
        if store.get_task(parent_id).is_none() {
            return Err(MoveTaskError::ParentNotFound(parent_id));
        }
        if parent_id == id || tree::is_descendant(&store.tasks, id, parent_id) {
            return Err(MoveTaskError::WouldCreateCycle {
                task: id,
                parent: parent_id,
            });
        }
    }

    // Project membership lives on root tasks, so a promoted subtask inherits
    // the project of the root it was filed under.
    let root_project = store
        .tasks
        .iter()
        .find(|root| root.id == id || tree::find(&root.subtasks, id).is_some())
        .and_then(|root| root.project_id);

    let Some(mut task) = tree::remove(&mut store.tasks, id) else {
        return Err(MoveTaskError::TaskNotFound(id));
    };
    let siblings = match new_parent {
        None => &mut store.tasks,
        Some(parent_id) => match tree::find_mut(&mut store.tasks, parent_id) {
            Some(parent) => &mut parent.subtasks,
            None => return Err(MoveTaskError::ParentNotFound(parent_id)),
        },
    };
    if new_parent.is_none() {
        task.project_id = task.project_id.or(root_project);
    }
    task.parent_id = new_parent;
    task.order = tree::next_order(siblings);
    task.touch();
    siblings.push(task);
    Ok(())
}

#[derive(Debug, Error)]
pub enum ResolveTaskError {
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Task name is ambiguous. Multiple tasks found: {}", .0.join(", "))]
    AmbiguousTaskName(Vec<String>),
}

/// Finds a task by full id, unique id prefix or unique title fragment.
pub fn resolve_task(store: &Store, query: &str) -> Result<Uuid, ResolveTaskError> {
    if let Ok(id) = query.parse::<Uuid>() {
        return store
            .get_task(id)
            .map(|t| t.id)
            .ok_or_else(|| ResolveTaskError::TaskNotFound(query.to_string()));
    }

    let all = store.all_tasks();
    let needle = query.to_lowercase();

    if needle.len() >= 4 && needle.chars().all(|c| c.is_ascii_hexdigit()) {
        let by_prefix: Vec<_> = all
            .iter()
            .filter(|t| t.id.simple().to_string().starts_with(&needle))
            .collect();
        if by_prefix.len() == 1 {
            return Ok(by_prefix[0].id);
        }
    }

    let matching_tasks: Vec<_> = all
        .iter()
        .filter(|t| t.title.to_lowercase().contains(&needle))
        .collect();

    match matching_tasks.len() {
        0 => Err(ResolveTaskError::TaskNotFound(query.to_string())),
        1 => Ok(matching_tasks[0].id),
        _ => {
            if let Some(exact) = matching_tasks.iter().find(|t| t.title.to_lowercase() == needle) {
                return Ok(exact.id);
            }
            let titles: Vec<String> = matching_tasks.iter().map(|t| t.title.clone()).collect();
            Err(ResolveTaskError::AmbiguousTaskName(titles))
        }
    }
}
