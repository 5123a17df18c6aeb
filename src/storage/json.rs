use std::{
    fs::{self, OpenOptions, rename, write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde_json::to_string_pretty;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    models::store::{CURRENT_VERSION, Store},
    storage::{
        Storage, StorageError,
        migrations::{apply_migrations, detect_version, stamp_version},
    },
};

pub const DEFAULT_BACKUP_LIMIT: usize = 5;

/// Whole-store JSON file with rotating backups next to it.
///
/// Saves go to a uniquely named temp file first and are renamed over the
/// store while holding an exclusive lock on `<store>.lock`, so readers only
/// ever see a complete file.
pub struct JsonFileStorage {
    path: PathBuf,
    backup_limit: usize,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            backup_limit: DEFAULT_BACKUP_LIMIT,
        }
    }

    /// Zero disables backups entirely.
    pub fn with_backup_limit(mut self, backup_limit: usize) -> Self {
        self.backup_limit = backup_limit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> PathBuf {
        let parent_store_path = self.path.parent().unwrap_or(Path::new("."));
        parent_store_path.join("backups")
    }

    fn create_backup(&self) -> Result<Option<PathBuf>, StorageError> {
        let file_exists = fs::exists(&self.path).map_err(|e| StorageError::BackupFailed {
            path: self.path.clone(),
            source: e,
        })?;
        if !file_exists {
            return Ok(None);
        }

        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir).map_err(|e| StorageError::BackupFailed {
            path: backup_dir.clone(),
            source: e,
        })?;

        let backup_path = self.backup_path();
        fs::copy(&self.path, &backup_path).map_err(|e| StorageError::BackupFailed {
            path: backup_path.clone(),
            source: e,
        })?;
        Ok(Some(backup_path))
    }

    /// Backs up the current file and swaps `temp_path` into its place while
    /// holding the exclusive lock.
    fn replace_with(&self, temp_path: &Path) -> Result<(), StorageError> {
        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;

        if self.backup_limit > 0 {
            if let Some(backup) = self.create_backup()? {
                debug!(backup = %backup.display(), "backed up previous store");
            }
            let removed = self.cleanup_old_backups()?;
            if removed > 0 {
                debug!(removed, "pruned old backups");
            }
        }

        rename(temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Backup names sort chronologically, so the oldest are at the front.
    fn cleanup_old_backups(&self) -> Result<usize, StorageError> {
        let backup_dir = self.backup_dir();
        let cleanup_failed = |source| StorageError::CleanupFailed {
            dir: backup_dir.clone(),
            source,
        };

        if !fs::exists(&backup_dir).map_err(cleanup_failed)? {
            return Ok(0);
        }

        let mut backups = fs::read_dir(&backup_dir)
            .map_err(cleanup_failed)?
            .flatten()
            .filter(|entry| entry.metadata().is_ok_and(|m| m.is_file()))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();
        backups.sort();

        let excess = backups.len().saturating_sub(self.backup_limit);
        for backup in &backups[..excess] {
            fs::remove_file(backup).map_err(cleanup_failed)?;
        }
        Ok(excess)
    }

    fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("store"));
        // Colons are not portable in file names.
        let now = jiff::Timestamp::now();
        let timestamp = format!("{}{:09}Z", now.strftime("%Y%m%dT%H%M%S."), now.subsec_nanosecond());
        self.backup_dir().join(format!("{stem}-{timestamp}"))
    }

    fn parse(&self, content: &str) -> Result<Store, StorageError> {
        let parse_failed = |source| StorageError::ParseFailed {
            path: self.path.clone(),
            source,
        };

        let file_version = detect_version(content).map_err(|e| match e {
            StorageError::ParseFailed { source, .. } => parse_failed(source),
            other => other,
        })?;
        if file_version > CURRENT_VERSION {
            return Err(StorageError::FutureVersion(file_version));
        }

        let mut data: serde_json::Value = serde_json::from_str(content).map_err(parse_failed)?;
        if file_version < CURRENT_VERSION {
            data = apply_migrations(data, file_version, CURRENT_VERSION)?;
        }
        stamp_version(&mut data, CURRENT_VERSION);

        serde_json::from_value(data).map_err(parse_failed)
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Store, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let store = self.parse(&content)?;
                debug!(
                    path = %self.path.display(),
                    tasks = store.tasks.len(),
                    projects = store.projects.len(),
                    "loaded store"
                );
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no store file yet, starting empty");
                Ok(Store::default())
            }
            Err(e) => Err(StorageError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        let json =
            to_string_pretty(store).map_err(|e| StorageError::SerializeFailed { source: e })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::SaveFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let temp_path = PathBuf::from(format!("{}.tmp.{}", self.path.display(), Uuid::new_v4()));
        if let Err(e) = write(&temp_path, json) {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::SaveFailed {
                path: temp_path,
                source: e,
            });
        }

        if let Err(e) = self.replace_with(&temp_path) {
            let _ = fs::remove_file(&temp_path);
            warn!(path = %self.path.display(), error = %e, "failed to replace store file");
            return Err(e);
        }

        debug!(
            path = %self.path.display(),
            tasks = store.tasks.len(),
            projects = store.projects.len(),
            "saved store"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        models::{project::AddProjectParameters, task::AddTaskParameters},
        services::{projects::add_project, tasks::{add_subtask, add_task}},
    };

    fn backup_count(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .count()
    }

    #[test]
    fn test_save_and_load_nested_forest() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json"));

        let mut store = Store::default();
        let project = add_project(
            &mut store,
            AddProjectParameters {
                name: String::from("Some Project"),
                ..AddProjectParameters::default()
            },
        );
        let task = add_task(
            &mut store,
            AddTaskParameters {
                project_id: Some(project.id),
                ..AddTaskParameters::titled("Some Task")
            },
        );
        let child = add_subtask(&mut store, task.id, AddTaskParameters::titled("Child")).unwrap();

        storage.save(&store).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, store);
        assert_eq!(loaded.tasks[0].subtasks[0].id, child.id);
        assert_eq!(loaded.tasks[0].subtasks[0].parent_id, Some(task.id));
    }

    #[test]
    fn test_failed_backup_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json"));
        storage.save(&Store::default()).unwrap();
        fs::write(storage.backup_dir(), "not a directory").unwrap();

        let mut store = Store::default();
        add_task(&mut store, AddTaskParameters::titled("Never saved"));
        let result = storage.save(&store);

        assert!(matches!(result, Err(StorageError::BackupFailed { .. })));
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
        assert!(storage.load().unwrap().tasks.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("absent.json"));

        let store = storage.load().unwrap();
        assert!(store.tasks.is_empty());
        assert!(store.projects.is_empty());
        assert_eq!(store.version, CURRENT_VERSION);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid_store.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        let result = JsonFileStorage::new(path.clone()).load();

        match result {
            Err(StorageError::ParseFailed { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected ParseFailed error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_v1_without_version_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1_store.json");
        let old_json = r#"{
            "tasks": [{
                "id": "0b6f7c1e-51c4-4d8c-9a36-8f0f1c9a2b11",
                "title": "Legacy",
                "description": null,
                "category": null,
                "due_date": null,
                "start_date_time": null,
                "end_date_time": null,
                "duration": null,
                "parent_id": null,
                "project_id": null,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }]
        }"#;
        fs::write(&path, old_json).unwrap();

        let store = JsonFileStorage::new(path).load().unwrap();

        assert_eq!(store.version, CURRENT_VERSION);
        assert_eq!(store.tasks.len(), 1);
        assert!(store.tasks[0].subtasks.is_empty());
        assert_eq!(store.tasks[0].order, 0);
        assert!(store.projects.is_empty());
    }

    #[test]
    fn test_load_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future_store.json");
        fs::write(&path, r#"{ "version": 999, "tasks": [], "projects": [] }"#).unwrap();

        let result = JsonFileStorage::new(path).load();

        assert!(matches!(result, Err(StorageError::FutureVersion(999))));
    }

    #[test]
    fn test_backup_rotation_keeps_limit() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json")).with_backup_limit(3);

        for _ in 0..7 {
            storage.save(&Store::default()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(backup_count(&storage.backup_dir()), 3);
    }

    #[test]
    fn test_first_save_makes_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json"));

        storage.save(&Store::default()).unwrap();
        assert!(!storage.backup_dir().exists());

        storage.save(&Store::default()).unwrap();
        assert_eq!(backup_count(&storage.backup_dir()), 1);
    }

    #[test]
    fn test_zero_limit_disables_backups() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json")).with_backup_limit(0);

        storage.save(&Store::default()).unwrap();
        storage.save(&Store::default()).unwrap();

        assert!(!storage.backup_dir().exists());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested/deeper/store.json"));

        storage.save(&Store::default()).unwrap();

        assert!(storage.path().exists());
    }

    #[test]
    fn test_default_incremental_methods() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json"));

        let mut store = Store::default();
        let parent = add_task(&mut store, AddTaskParameters::titled("parent"));
        let child = add_subtask(&mut store, parent.id, AddTaskParameters::titled("child")).unwrap();
        storage.save(&store).unwrap();

        let mut renamed = child.clone();
        renamed.title = String::from("renamed");
        storage.upsert_task(&renamed).unwrap();
        let tasks = storage.load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].subtasks[0].title, "renamed");

        storage.remove_task(child.id).unwrap();
        assert!(storage.load_tasks().unwrap()[0].subtasks.is_empty());

        assert!(storage.load_projects().unwrap().is_empty());
    }

    #[test]
    fn test_collection_saves_keep_the_other_collection() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json"));

        let mut store = Store::default();
        let project = add_project(
            &mut store,
            AddProjectParameters {
                name: String::from("Home"),
                ..AddProjectParameters::default()
            },
        );
        add_task(&mut store, AddTaskParameters::titled("old"));
        storage.save(&store).unwrap();

        let mut replacement = Store::default();
        let task = add_task(&mut replacement, AddTaskParameters::titled("new"));
        storage.save_tasks(&replacement.tasks).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].id, task.id);
        assert_eq!(loaded.projects, [project]);

        storage.save_projects(&[]).unwrap();

        let loaded = storage.load().unwrap();
        assert!(loaded.projects.is_empty());
        assert_eq!(loaded.tasks[0].id, task.id);
    }

    #[test]
    fn test_project_upsert_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let storage = JsonFileStorage::new(path.clone()).with_backup_limit(0);

        let mut store = Store::default();
        let project = add_project(
            &mut store,
            AddProjectParameters {
                name: String::from("Work"),
                ..AddProjectParameters::default()
            },
        );

        storage.upsert_project(&project).unwrap();
        assert_eq!(storage.load_projects().unwrap(), [project.clone()]);

        let mut renamed = project.clone();
        renamed.name = String::from("Office");
        storage.upsert_project(&renamed).unwrap();
        let projects = storage.load_projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Office");

        let written = fs::read_to_string(&path).unwrap();
        storage.remove_project(Uuid::new_v4()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), written);

        storage.remove_project(project.id).unwrap();
        assert!(storage.load_projects().unwrap().is_empty());
    }
}
