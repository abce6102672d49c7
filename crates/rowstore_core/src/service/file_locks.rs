//! Per-file writer locks.
//!
//! # Responsibility
//! - Serialize read-then-write position computations on one file.
//! - Let mutations on different files run independently.
//!
//! # Invariants
//! - At most one closure runs under `with_file` for a given file at a time.
//! - An entry lives only while some caller holds or waits on its lock.
//! - A poisoned lock is recovered; the guarded unit carries no data.

use crate::model::file::FileId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of one exclusive lock per file.
///
/// Share one registry (behind `Arc`) between every service that writes the
/// same store, typically one service per connection/thread.
#[derive(Debug, Default)]
pub struct FileLocks {
    entries: Mutex<HashMap<FileId, Arc<Mutex<()>>>>,
}

impl FileLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` while holding the exclusive lock of `file_id`.
    pub fn with_file<T>(&self, file_id: FileId, action: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(file_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            action()
        };
        self.release(file_id, lock);
        result
    }

    /// Number of files with a registered lock.
    pub fn tracked_files(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_for(&self, file_id: FileId) -> Arc<Mutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(file_id).or_default())
    }

    /// Drops the entry once no other caller holds a handle to it.
    ///
    /// Handles are only cloned under the registry lock, so a count of two
    /// (registry plus `lock`) means nobody is waiting.
    fn release(&self, file_id: FileId, lock: Arc<Mutex<()>>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2 {
            entries.remove(&file_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FileLocks;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn same_file_closures_never_overlap() {
        let locks = Arc::new(FileLocks::new());
        let file_id = Uuid::new_v4();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    for _ in 0..50 {
                        locks.with_file(file_id, || {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            thread::yield_now();
                            active.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("worker should not panic");
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked_files(), 0);
    }

    #[test]
    fn different_files_do_not_block_each_other() {
        let locks = Arc::new(FileLocks::new());
        let file_a = Uuid::new_v4();
        let file_b = Uuid::new_v4();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                locks.with_file(file_a, || {
                    entered_tx.send(()).expect("main thread should be listening");
                    release_rx.recv_timeout(Duration::from_secs(5))
                })
            })
        };

        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("holder should enter file A");
        locks.with_file(file_b, || release_tx.send(()).expect("holder should be waiting"));

        let released = holder.join().expect("holder should not panic");
        assert!(released.is_ok(), "file B was blocked by file A");
    }

    #[test]
    fn idle_entries_are_released() {
        let locks = FileLocks::new();
        let file_id = Uuid::new_v4();
        let inside = locks.with_file(file_id, || locks.tracked_files());
        assert_eq!(inside, 1);
        assert_eq!(locks.tracked_files(), 0);

        for _ in 0..100 {
            locks.with_file(Uuid::new_v4(), || ());
        }
        assert_eq!(locks.tracked_files(), 0);
    }

    #[test]
    fn entry_survives_while_a_waiter_holds_it() {
        let locks = Arc::new(FileLocks::new());
        let file_id = Uuid::new_v4();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                locks.with_file(file_id, || {
                    entered_tx.send(()).expect("main thread should be listening");
                    release_rx
                        .recv_timeout(Duration::from_secs(5))
                        .expect("release should arrive");
                })
            })
        };
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("holder should enter");

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.with_file(file_id, || locks.tracked_files()))
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).expect("holder should be waiting");

        holder.join().expect("holder should not panic");
        let seen_by_waiter = waiter.join().expect("waiter should not panic");
        assert_eq!(seen_by_waiter, 1);
        assert_eq!(locks.tracked_files(), 0);
    }
}
