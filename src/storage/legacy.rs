//! One-shot import of the flat `todos.json` file written by older releases.
//!
//! That format is a camelCase JSON array of tasks with short string ids and
//! nested `subtasks`. Ids are re-minted as UUIDs on import and parent links
//! are rebuilt from the nesting.

use std::{
    fs,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    models::task::{Priority, Task},
    storage::{Storage, StorageError},
};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct LegacyTask {
    title: String,
    description: Option<String>,
    category: Option<String>,
    completed: bool,
    archived: bool,
    priority: Option<String>,
    due_date: Option<String>,
    start_date_time: Option<String>,
    end_date_time: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    subtasks: Vec<LegacyTask>,
    is_expanded: bool,
    order: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyImport {
    /// Nothing to import
    NoLegacyFile,
    /// The store already had tasks; the legacy file was left alone
    Skipped { existing_tasks: usize },
    /// Root tasks imported and saved; the legacy file was removed
    Imported { tasks: usize },
}

/// `todos.json` next to the store file.
pub fn legacy_path_for(store_path: &Path) -> PathBuf {
    store_path
        .parent()
        .unwrap_or(Path::new("."))
        .join("todos.json")
}

pub fn parse_legacy(content: &str) -> Result<Vec<Task>, serde_json::Error> {
    let legacy: Vec<LegacyTask> = serde_json::from_str(content)?;
    let now = Timestamp::now();
    Ok(legacy
        .into_iter()
        .map(|task| convert(task, None, now))
        .collect())
}

fn parse_instant(value: Option<&str>) -> Option<Timestamp> {
    value.and_then(|v| v.parse().ok())
}

fn parse_priority(value: Option<&str>) -> Priority {
    match value {
        Some("low") => Priority::Low,
        Some("high") => Priority::High,
        _ => Priority::Medium,
    }
}

fn convert(legacy: LegacyTask, parent_id: Option<Uuid>, now: Timestamp) -> Task {
    let id = Uuid::new_v4();
    let created_at = parse_instant(legacy.created_at.as_deref()).unwrap_or(now);
    let start_date_time = parse_instant(legacy.start_date_time.as_deref());
    let end_date_time = parse_instant(legacy.end_date_time.as_deref());

    let mut task = Task {
        id,
        title: legacy.title,
        description: legacy.description,
        category: legacy.category,
        completed: legacy.completed,
        archived: legacy.archived,
        priority: parse_priority(legacy.priority.as_deref()),
        due_date: parse_instant(legacy.due_date.as_deref()),
        start_date_time,
        end_date_time,
        duration: None,
        parent_id,
        project_id: None,
        subtasks: legacy
            .subtasks
            .into_iter()
            .map(|subtask| convert(subtask, Some(id), now))
            .collect(),
        is_expanded: legacy.is_expanded,
        order: legacy.order.unwrap_or(0),
        created_at,
        updated_at: parse_instant(legacy.updated_at.as_deref()).unwrap_or(created_at),
    };
    task.duration = task.span_minutes();
    task
}

/// Imports `legacy_path` into `storage` when the persisted store holds no
/// tasks. The legacy file is removed only once the imported store is saved.
pub fn import_legacy(
    storage: &impl Storage,
    legacy_path: &Path,
) -> Result<LegacyImport, StorageError> {
    let content = match fs::read_to_string(legacy_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LegacyImport::NoLegacyFile);
        }
        Err(e) => {
            return Err(StorageError::LoadFailed {
                path: legacy_path.to_path_buf(),
                source: e,
            });
        }
    };

    let mut store = storage.load()?;
    if !store.tasks.is_empty() {
        info!(
            path = %legacy_path.display(),
            existing_tasks = store.tasks.len(),
            "store already has tasks, leaving legacy file in place"
        );
        return Ok(LegacyImport::Skipped {
            existing_tasks: store.tasks.len(),
        });
    }

    let tasks = parse_legacy(&content).map_err(|e| StorageError::LegacyImportFailed {
        path: legacy_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let imported = tasks.len();
    store.tasks = tasks;
    storage.save(&store)?;
    info!(path = %legacy_path.display(), tasks = imported, "imported legacy tasks");

    if let Err(e) = fs::remove_file(legacy_path) {
        warn!(path = %legacy_path.display(), error = %e, "failed to remove legacy file after import");
    }
    Ok(LegacyImport::Imported { tasks: imported })
}
