use jiff::Timestamp;
use slug::slugify;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    project::{
        AddProjectParameters, DEFAULT_PROJECT_COLORS, DEFAULT_PROJECT_DESCRIPTION,
        DEFAULT_PROJECT_ICON, DEFAULT_PROJECT_NAME, Project, ProjectPatch, palette_color,
    },
    store::Store,
    tree,
};

pub fn add_project(store: &mut Store, parameters: AddProjectParameters) -> Project {
    let now = Timestamp::now();
    let order = store
        .projects
        .iter()
        .map(|p| p.order)
        .max()
        .map_or(0, |max| max + 1);

    let project = Project {
        id: Uuid::new_v4(),
        name: parameters.name,
        description: parameters.description,
        color: parameters
            .color
            .unwrap_or_else(|| palette_color(store.projects.len()).to_string()),
        icon: parameters.icon,
        is_archived: parameters.is_archived,
        order,
        created_at: now,
        updated_at: now,
    };

    store.projects.push(project.clone());
    project
}

/// Synthesizes the default project when the registry is empty.
pub fn ensure_default_project(store: &mut Store) -> Option<Project> {
    if !store.projects.is_empty() {
        return None;
    }
    Some(add_project(
        store,
        AddProjectParameters {
            name: DEFAULT_PROJECT_NAME.to_string(),
            description: Some(DEFAULT_PROJECT_DESCRIPTION.to_string()),
            color: Some(DEFAULT_PROJECT_COLORS[0].to_string()),
            icon: Some(DEFAULT_PROJECT_ICON.to_string()),
            is_archived: false,
        },
    ))
}

pub fn update_project(store: &mut Store, id: Uuid, patch: ProjectPatch) -> bool {
    match store.get_project_mut(id) {
        Some(project) => {
            patch.apply(project);
            true
        }
        None => {
            debug!(%id, "update_project: project not found");
            false
        }
    }
}

pub fn set_project_archived(store: &mut Store, id: Uuid, is_archived: bool) -> bool {
    update_project(
        store,
        id,
        ProjectPatch {
            is_archived: Some(is_archived),
            ..ProjectPatch::default()
        },
    )
}

pub struct DeleteProjectResult {
    pub project: Project,
    pub cascaded_tasks_count: usize,
}

/// Removes the project and every root task that belongs to it, subtrees
/// included.
pub fn delete_project(store: &mut Store, id: Uuid) -> Option<DeleteProjectResult> {
    let Some(position) = store.projects.iter().position(|p| p.id == id) else {
        debug!(%id, "delete_project: project not found");
        return None;
    };
    let project = store.projects.remove(position);

    let before = store.tasks.len();
    store.tasks.retain(|t| t.project_id != Some(id));
    let cascaded_tasks_count = before - store.tasks.len();

    Some(DeleteProjectResult {
        project,
        cascaded_tasks_count,
    })
}

pub fn active_projects(store: &Store) -> Vec<&Project> {
    let mut projects: Vec<_> = store.get_active_projects().collect();
    projects.sort_by_key(|p| p.order);
    projects
}

pub fn archived_projects(store: &Store) -> Vec<&Project> {
    let mut projects: Vec<_> = store.get_archived_projects().collect();
    projects.sort_by_key(|p| p.order);
    projects
}

/// Moves an entry of the active list and renumbers that list from zero.
/// Archived projects keep their order values.
pub fn reorder_projects(store: &mut Store, from_index: usize, to_index: usize) -> bool {
    let mut ids: Vec<Uuid> = active_projects(store).iter().map(|p| p.id).collect();
    if from_index >= ids.len() || to_index >= ids.len() {
        debug!(from_index, to_index, "reorder_projects: index out of range");
        return false;
    }

    let moved = ids.remove(from_index);
    ids.insert(to_index, moved);

    let now = Timestamp::now();
    for (index, id) in ids.into_iter().enumerate() {
        if let Some(project) = store.get_project_mut(id) {
            project.order = index as i64;
            project.updated_at = now;
        }
    }
    true
}

/// Tasks owned by the project, subtasks included.
pub fn project_task_count(store: &Store, id: Uuid) -> usize {
    store
        .get_tasks_for_project(id)
        .map(|t| tree::count(std::slice::from_ref(t)))
        .sum()
}

#[derive(Debug, Error)]
pub enum ResolveProjectError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Project name is ambiguous. Multiple projects found: {}", .0.join(", "))]
    AmbiguousProjectName(Vec<String>),
}

/// Finds a project by id, slug or unique name fragment.
pub fn resolve_project(store: &Store, query: &str) -> Result<Uuid, ResolveProjectError> {
    if let Ok(id) = query.parse::<Uuid>()
        && store.get_project(id).is_some()
    {
        return Ok(id);
    }

    let query_slug = slugify(query);
    if let Some(project) = store.projects.iter().find(|p| slugify(&p.name) == query_slug) {
        return Ok(project.id);
    }

    let matching_projects: Vec<_> = store
        .projects
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&query.to_lowercase()))
        .collect();

    match matching_projects.len() {
        0 => Err(ResolveProjectError::ProjectNotFound(query.to_string())),
        1 => Ok(matching_projects[0].id),
        _ => {
            let names: Vec<String> = matching_projects.iter().map(|p| p.name.clone()).collect();
            Err(ResolveProjectError::AmbiguousProjectName(names))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::AddTaskParameters;
    use crate::services::tasks::{add_subtask, add_task};

    fn named(name: &str) -> AddProjectParameters {
        AddProjectParameters {
            name: name.to_string(),
            ..AddProjectParameters::default()
        }
    }

    #[test]
    fn test_add_project_orders_and_colors() {
        let mut store = Store::default();
        let first = add_project(&mut store, named("Home"));
        let second = add_project(&mut store, named("Work"));

        assert_eq!(first.order, 0);
        assert_eq!(second.order, 1);
        assert_eq!(first.color, DEFAULT_PROJECT_COLORS[0]);
        assert_eq!(second.color, DEFAULT_PROJECT_COLORS[1]);
    }

    #[test]
    fn test_default_project_only_when_empty() {
        let mut store = Store::default();
        let default = ensure_default_project(&mut store).unwrap();
        assert_eq!(default.name, "Personal Tasks");
        assert_eq!(default.order, 0);
        assert!(ensure_default_project(&mut store).is_none());
        assert_eq!(store.projects.len(), 1);
    }

    #[test]
    fn test_partition_sorted_by_order() {
        let mut store = Store::default();
        let a = add_project(&mut store, named("a"));
        let b = add_project(&mut store, named("b"));
        let c = add_project(&mut store, named("c"));
        set_project_archived(&mut store, b.id, true);
        store.get_project_mut(a.id).unwrap().order = 10;

        let active: Vec<_> = active_projects(&store).iter().map(|p| p.id).collect();
        let archived: Vec<_> = archived_projects(&store).iter().map(|p| p.id).collect();
        assert_eq!(active, [c.id, a.id]);
        assert_eq!(archived, [b.id]);
    }

    #[test]
    fn test_reorder_projects_leaves_archived_alone() {
        let mut store = Store::default();
        let a = add_project(&mut store, named("a"));
        let archived = add_project(&mut store, named("old"));
        let b = add_project(&mut store, named("b"));
        let c = add_project(&mut store, named("c"));
        set_project_archived(&mut store, archived.id, true);

        assert!(reorder_projects(&mut store, 2, 0));

        let active: Vec<_> = active_projects(&store).iter().map(|p| (p.id, p.order)).collect();
        assert_eq!(active, [(c.id, 0), (a.id, 1), (b.id, 2)]);
        assert_eq!(store.get_project(archived.id).unwrap().order, 1);

        assert!(!reorder_projects(&mut store, 5, 0));
    }

    #[test]
    fn test_delete_project_cascades_tasks() {
        let mut store = Store::default();
        let project = add_project(&mut store, named("Work"));
        let owned = add_task(
            &mut store,
            AddTaskParameters {
                project_id: Some(project.id),
                ..AddTaskParameters::titled("owned")
            },
        );
        let child = add_subtask(&mut store, owned.id, AddTaskParameters::titled("child")).unwrap();
        let loose = add_task(&mut store, AddTaskParameters::titled("loose"));

        assert_eq!(project_task_count(&store, project.id), 2);

        let result = delete_project(&mut store, project.id).unwrap();
        assert_eq!(result.cascaded_tasks_count, 1);
        assert!(store.get_task(owned.id).is_none());
        assert!(store.get_task(child.id).is_none());
        assert!(store.get_task(loose.id).is_some());
        assert!(delete_project(&mut store, project.id).is_none());
    }

    #[test]
    fn test_resolve_project() {
        let mut store = Store::default();
        let home = add_project(&mut store, named("Home Chores"));
        add_project(&mut store, named("Work"));
        add_project(&mut store, named("Workshop"));

        assert_eq!(resolve_project(&store, "home-chores").unwrap(), home.id);
        assert_eq!(resolve_project(&store, "chores").unwrap(), home.id);
        assert!(resolve_project(&store, "work").is_ok());
        assert!(matches!(
            resolve_project(&store, "wor"),
            Err(ResolveProjectError::AmbiguousProjectName(_))
        ));
        assert!(matches!(
            resolve_project(&store, "garden"),
            Err(ResolveProjectError::ProjectNotFound(_))
        ));
    }
}
