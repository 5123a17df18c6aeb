use std::{ffi::OsString, path::PathBuf};

use tracing_subscriber::EnvFilter;

use crate::storage::{json::DEFAULT_BACKUP_LIMIT, legacy::legacy_path_for};

pub const STORE_ENV_VAR: &str = "TASKFLOW_STORE";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_path: PathBuf,
    /// Flat `todos.json` from older releases, imported once
    pub legacy_path: PathBuf,
    pub backup_limit: usize,
    /// Filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Config {
    /// Store path precedence: `--store`, then `TASKFLOW_STORE`, then the
    /// platform data directory.
    pub fn resolve(store_flag: Option<PathBuf>, log_level: Option<String>) -> Self {
        Self::resolve_with(
            store_flag,
            std::env::var_os(STORE_ENV_VAR),
            dirs::data_local_dir(),
            log_level,
        )
    }

    fn resolve_with(
        store_flag: Option<PathBuf>,
        store_env: Option<OsString>,
        data_dir: Option<PathBuf>,
        log_level: Option<String>,
    ) -> Self {
        let store_path = store_flag
            .or_else(|| store_env.filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| {
                data_dir
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("taskflow")
                    .join("store.json")
            });

        Self {
            legacy_path: legacy_path_for(&store_path),
            store_path,
            backup_limit: DEFAULT_BACKUP_LIMIT,
            log_level: log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

/// Compact logs on stderr. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
