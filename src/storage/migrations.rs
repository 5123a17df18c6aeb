use std::path::PathBuf;

use serde_json::{Map, Value, json};

use crate::storage::StorageError;

type MigrationFn = fn(Value) -> Result<Value, StorageError>;

fn get_migrations() -> Vec<MigrationFn> {
    vec![migrate_v1_to_v2]
}

/// Returns 1 if version field is missing (assumes v1, our first versioned schema)
pub fn detect_version(content: &str) -> Result<u32, StorageError> {
    let value: Value = serde_json::from_str(content).map_err(|e| StorageError::ParseFailed {
        path: PathBuf::from("<unknown>"),
        source: e,
    })?;

    match value.get("version") {
        None => Ok(1),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(StorageError::UnsupportedVersion(0)),
    }
}

/// Migrations are applied sequentially: v1→v2→v3→...→target
pub fn apply_migrations(
    mut data: Value,
    from_version: u32,
    to_version: u32,
) -> Result<Value, StorageError> {
    if from_version == to_version {
        return Ok(data);
    }

    if from_version > to_version {
        return Err(StorageError::FutureVersion(from_version));
    }

    if from_version == 0 {
        return Err(StorageError::UnsupportedVersion(from_version));
    }

    let migrations = get_migrations();

    for version in from_version..to_version {
        let migration_idx = (version - 1) as usize; // v1→v2 is at index 0

        let Some(migration) = migrations.get(migration_idx) else {
            return Err(StorageError::UnsupportedVersion(version));
        };

        tracing::info!(from = version, to = version + 1, "migrating store schema");
        data = migration(data)?;
    }

    Ok(data)
}

/// v1 files could omit bookkeeping fields on tasks; v2 requires them.
fn migrate_v1_to_v2(mut value: Value) -> Result<Value, StorageError> {
    if let Some(obj) = value.as_object_mut() {
        obj.insert("version".to_string(), Value::from(2));

        if let Some(tasks) = obj.get_mut("tasks").and_then(|t| t.as_array_mut()) {
            for task in tasks {
                fill_task_defaults(task);
            }
        }
        obj.entry("projects").or_insert_with(|| json!([]));
    }

    Ok(value)
}

fn fill_task_defaults(task: &mut Value) {
    let Some(task_obj) = task.as_object_mut() else {
        return;
    };

    let defaults: [(&str, Value); 6] = [
        ("subtasks", json!([])),
        ("is_expanded", json!(false)),
        ("order", json!(0)),
        ("archived", json!(false)),
        ("completed", json!(false)),
        ("priority", json!("medium")),
    ];
    for (key, default) in defaults {
        match task_obj.get(key) {
            None | Some(Value::Null) => {
                task_obj.insert(key.to_string(), default);
            }
            Some(_) => {}
        }
    }

    if let Some(subtasks) = task_obj.get_mut("subtasks").and_then(|s| s.as_array_mut()) {
        for subtask in subtasks {
            fill_task_defaults(subtask);
        }
    }
}

/// Sets the version field after migrations ran.
pub fn stamp_version(data: &mut Value, version: u32) {
    if let Some(obj) = data.as_object_mut() {
        obj.insert("version".to_string(), json!(version));
    } else {
        let mut obj = Map::new();
        obj.insert("version".to_string(), json!(version));
        *data = Value::Object(obj);
    }
}
