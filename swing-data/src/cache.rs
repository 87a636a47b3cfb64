//! Single-slot, time-bounded memo for the latest ticker snapshot.

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::ticker::Snapshot;

#[derive(Debug, Clone)]
struct CachedSnapshot {
    stored_at: Instant,
    snapshot: Arc<Snapshot>,
}

/// Holds at most one [`Snapshot`], valid for `ttl` after it was stored.
///
/// Owned by the refresh worker, so no locking is involved.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    ttl: Duration,
    slot: Option<CachedSnapshot>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, slot: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached snapshot, if one exists and is younger than the TTL.
    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.slot
            .as_ref()
            .filter(|cached| cached.stored_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.snapshot))
    }

    /// Replace the slot contents, restarting the TTL.
    pub fn store(&mut self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.slot = Some(CachedSnapshot {
            stored_at: Instant::now(),
            snapshot: Arc::clone(&snapshot),
        });
        snapshot
    }

    /// Age of the stored snapshot, expired or not.
    pub fn age(&self) -> Option<Duration> {
        self.slot.as_ref().map(|cached| cached.stored_at.elapsed())
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}
