use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use tracing::{debug, warn};

use crate::{models::store::Store, storage::Storage};

/// Receives a full snapshot after every applied mutation.
///
/// Submitting never fails from the caller's point of view. Implementations
/// log persistence errors and keep going; the in-memory state stays
/// authoritative either way.
pub trait SnapshotWriter {
    fn submit(&mut self, store: Store);
}

/// Saves on the calling thread.
pub struct InlineWriter<S: Storage> {
    storage: S,
}

impl<S: Storage> InlineWriter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S: Storage> SnapshotWriter for InlineWriter<S> {
    fn submit(&mut self, store: Store) {
        if let Err(e) = self.storage.save(&store) {
            warn!(error = %e, "failed to persist store");
        }
    }
}

/// Saves on a dedicated thread.
///
/// Snapshots queued while a save is in flight collapse into the newest one,
/// and a single thread performs every write in submission order, so the
/// last submitted snapshot is always the one left on disk.
pub struct BackgroundWriter<S: Storage + Send + 'static> {
    sender: Option<Sender<Store>>,
    handle: Option<JoinHandle<S>>,
}

impl<S: Storage + Send + 'static> BackgroundWriter<S> {
    pub fn spawn(storage: S) -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(String::from("taskflow-writer"))
            .spawn(move || run(storage, receiver));

        match handle {
            Ok(handle) => Self {
                sender: Some(sender),
                handle: Some(handle),
            },
            Err(e) => {
                // Without a thread every submit is dropped with a warning.
                warn!(error = %e, "failed to start background writer");
                Self {
                    sender: None,
                    handle: None,
                }
            }
        }
    }

    /// Flushes pending snapshots and hands the storage back.
    pub fn shutdown(mut self) -> Option<S> {
        self.join()
    }

    fn join(&mut self) -> Option<S> {
        drop(self.sender.take());
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(storage) => Some(storage),
            Err(_) => {
                warn!("background writer panicked");
                None
            }
        }
    }
}

fn run<S: Storage>(storage: S, receiver: Receiver<Store>) -> S {
    while let Ok(mut snapshot) = receiver.recv() {
        let mut skipped = 0usize;
        while let Ok(newer) = receiver.try_recv() {
            snapshot = newer;
            skipped += 1;
        }
        if skipped > 0 {
            debug!(skipped, "coalesced queued snapshots");
        }
        if let Err(e) = storage.save(&snapshot) {
            warn!(error = %e, "failed to persist store");
        }
    }
    storage
}

impl<S: Storage + Send + 'static> SnapshotWriter for BackgroundWriter<S> {
    fn submit(&mut self, store: Store) {
        let Some(sender) = &self.sender else {
            warn!("background writer is not running, snapshot dropped");
            return;
        };
        if sender.send(store).is_err() {
            warn!("background writer stopped, snapshot dropped");
        }
    }
}

impl<S: Storage + Send + 'static> Drop for BackgroundWriter<S> {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::task::Task, storage::memory::MemoryStorage};

    fn store_with(titles: &[&str]) -> Store {
        let mut store = Store::default();
        store.tasks = titles.iter().map(|t| Task::new(*t)).collect();
        store
    }

    #[test]
    fn test_inline_writer_saves_immediately() {
        let storage = MemoryStorage::new();
        let mut writer = InlineWriter::new(storage.clone());

        let store = store_with(&["a"]);
        writer.submit(store.clone());

        assert_eq!(storage.snapshot(), store);
    }

    #[test]
    fn test_inline_writer_swallows_failures() {
        let storage = MemoryStorage::new();
        storage.set_failing(true);
        let mut writer = InlineWriter::new(storage.clone());

        writer.submit(store_with(&["lost"]));

        storage.set_failing(false);
        assert!(storage.snapshot().tasks.is_empty());
    }

    #[test]
    fn test_background_writer_ends_on_last_snapshot() {
        let storage = MemoryStorage::new();
        let mut writer = BackgroundWriter::spawn(storage.clone());

        let mut last = Store::default();
        for i in 0..50 {
            last = store_with(&[format!("task {i}").as_str()]);
            writer.submit(last.clone());
        }
        let returned = writer.shutdown();

        assert!(returned.is_some());
        assert_eq!(storage.snapshot(), last);
        assert!(storage.save_count() >= 1);
        assert!(storage.save_count() <= 50);
    }

    #[test]
    fn test_background_writer_flushes_on_drop() {
        let storage = MemoryStorage::new();
        {
            let mut writer = BackgroundWriter::spawn(storage.clone());
            writer.submit(store_with(&["kept"]));
        }
        assert_eq!(storage.snapshot().tasks[0].title, "kept");
    }
}
