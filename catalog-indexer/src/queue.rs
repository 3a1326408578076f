//! Per-entity table of pending debounce timers.
//!
//! At most one pending job exists per source key; scheduling over an existing
//! entry aborts the old timer if it is still sleeping (last write wins), while
//! a job already past its window runs to completion. Generations guard the
//! completion path: a finished job only clears its own entry, never a
//! successor's.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use shop_store::SourceKind;
use tokio::task::AbortHandle;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub kind: SourceKind,
    pub id: String,
}

impl SourceKey {
    pub fn new(kind: SourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

struct PendingJob {
    generation: u64,
    handle: AbortHandle,
    running: bool,
}

#[derive(Default)]
pub(crate) struct DebounceQueue {
    jobs: Mutex<HashMap<SourceKey, PendingJob>>,
    generation: AtomicU64,
}

impl DebounceQueue {
    /// Reserves the next job generation.
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Registers a spawned job, aborting any predecessor for the key that is
    /// still in its debounce sleep. A predecessor already running is left to
    /// finish; the new entry supersedes it in the table.
    pub fn register(&self, key: SourceKey, generation: u64, handle: AbortHandle) {
        let mut jobs = self.jobs.lock().expect("job table poisoned");
        let job = PendingJob {
            generation,
            handle,
            running: false,
        };
        if let Some(prev) = jobs.insert(key, job)
            && !prev.running
        {
            prev.handle.abort();
        }
    }

    /// Marks the job as past its debounce sleep. Returns false if the entry
    /// was superseded or removed in the meantime; the caller must then exit
    /// without indexing.
    pub fn begin(&self, key: &SourceKey, generation: u64) -> bool {
        let mut jobs = self.jobs.lock().expect("job table poisoned");
        match jobs.get_mut(key) {
            Some(job) if job.generation == generation => {
                job.running = true;
                true
            }
            _ => false,
        }
    }

    /// Cancels the pending job for `key`, if any. A job already running is
    /// only dropped from the table, not aborted.
    pub fn cancel(&self, key: &SourceKey) {
        let mut jobs = self.jobs.lock().expect("job table poisoned");
        if let Some(job) = jobs.remove(key)
            && !job.running
        {
            job.handle.abort();
        }
    }

    /// Clears the entry for `key` if it still belongs to `generation`.
    pub fn clear(&self, key: &SourceKey, generation: u64) {
        let mut jobs = self.jobs.lock().expect("job table poisoned");
        if jobs.get(key).is_some_and(|job| job.generation == generation) {
            jobs.remove(key);
        }
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.jobs.lock().expect("job table poisoned").len()
    }
}
