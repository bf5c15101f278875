//! store.rs — process-lifetime run state shared by every pipeline run.
//!
//! Both structures are owned by the pipeline and injected where needed; there
//! are no process-wide statics. Locks are held only for set/pointer updates,
//! never across an await.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::format::FormattedPost;

#[derive(Debug, Default)]
struct RegistryState {
    processed: HashSet<String>,
    in_flight: HashSet<String>,
}

/// Keys of items already formatted. Append-only: a committed key is never removed.
///
/// Formatting reserves a key first (`try_reserve`), then either `commit`s it on
/// success or `release`s it on failure, so two overlapping runs never format
/// the same key at the same time and failed items stay eligible later.
#[derive(Debug, Default)]
pub struct ProcessedRegistry {
    inner: Mutex<RegistryState>,
}

impl ProcessedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().processed.contains(key)
    }

    /// `true` when the key was neither processed nor reserved, and is now reserved.
    pub fn try_reserve(&self, key: &str) -> bool {
        let mut g = self.inner.lock();
        if g.processed.contains(key) || g.in_flight.contains(key) {
            return false;
        }
        g.in_flight.insert(key.to_string());
        true
    }

    pub fn commit(&self, key: &str) {
        let mut g = self.inner.lock();
        g.in_flight.remove(key);
        g.processed.insert(key.to_string());
    }

    pub fn release(&self, key: &str) {
        self.inner.lock().in_flight.remove(key);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().processed.iter().cloned().collect();
        keys.sort();
        keys
    }
}

#[derive(Debug, Clone)]
pub struct CachedRun {
    pub run_id: u64,
    pub finished_at: DateTime<Utc>,
    pub posts: Arc<Vec<FormattedPost>>,
}

/// Posts of the most recent run. Replaced wholesale; a run never overwrites
/// the result of a run that started after it.
#[derive(Debug, Default)]
pub struct LastRunCache {
    inner: RwLock<Option<CachedRun>>,
}

impl LastRunCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` (and leaves the cache untouched) when a newer run already published.
    pub fn publish(&self, run_id: u64, finished_at: DateTime<Utc>, posts: Vec<FormattedPost>) -> bool {
        let mut g = self.inner.write();
        if g.as_ref().is_some_and(|c| c.run_id > run_id) {
            return false;
        }
        *g = Some(CachedRun {
            run_id,
            finished_at,
            posts: Arc::new(posts),
        });
        true
    }

    pub fn get(&self) -> Option<CachedRun> {
        self.inner.read().clone()
    }

    pub fn posts(&self) -> Arc<Vec<FormattedPost>> {
        self.get().map(|c| c.posts).unwrap_or_default()
    }
}

/// Registry + cache + run-id sequence, shared by all runs of one process.
#[derive(Debug, Default)]
pub struct RunStore {
    pub registry: ProcessedRegistry,
    pub last_run: LastRunCache,
    next_run_id: AtomicU64,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic, starting at 1.
    pub fn next_run_id(&self) -> u64 {
        self.next_run_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}
