use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    models::store::Store,
    storage::{Storage, StorageError},
};

/// In-process storage. Clones share the same contents, so a test can keep
/// one handle while a writer owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<Mutex<Store>>,
    failing: Arc<AtomicBool>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            ..Self::default()
        }
    }

    /// While set, every load and save fails with `StorageError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// What was last saved, regardless of the failure switch.
    pub fn snapshot(&self) -> Store {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(String::from(
                "memory storage switched off",
            )));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Store, StorageError> {
        self.check_available()?;
        Ok(self.snapshot())
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        self.check_available()?;
        *self.store.lock().unwrap_or_else(PoisonError::into_inner) = store.clone();
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
