//! Per-file exclusive sections.
//!
//! Ingestion, drift detection and verification of one logical path must not
//! interleave. Different paths are independent and run in parallel.
//!
//! The lock table only grows: one `Arc<Mutex<()>>` per path ever touched by
//! this process. Entries are a few dozen bytes and a process ingests a bounded
//! set of files, so nothing is evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};

/// Map from logical path to its exclusive section.
#[derive(Debug, Default)]
pub(crate) struct FileLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The lock object for `key`, created on first use.
    pub(crate) fn handle(&self, key: &str) -> Result<Arc<Mutex<()>>> {
        let mut table = self
            .locks
            .lock()
            .map_err(|e| Error::Internal(format!("file lock table poisoned: {e}")))?;
        Ok(Arc::clone(table.entry(key.to_string()).or_default()))
    }

    /// Number of distinct paths that have been locked.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().map(|t| t.len()).unwrap_or(0)
    }
}

/// Acquire `handle`, treating a poisoned lock as usable.
///
/// The guarded value is `()`, so a panic in another holder cannot have left
/// shared state half-written; the database transaction already rolled back.
pub(crate) fn acquire(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn same_key_returns_same_lock() {
        let locks = FileLocks::new();

        let a = locks.handle("pkg/a.py").expect("handle");
        let b = locks.handle("pkg/a.py").expect("handle");
        let c = locks.handle("pkg/c.py").expect("handle");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn same_key_is_mutually_exclusive() {
        let locks = Arc::new(FileLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let handle = locks.handle("same.py").expect("handle");
                    let _guard = acquire(&handle);
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(std::time::Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker should not panic");
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
