use crate::domain::ids::{ApplicationId, RequestId, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 4096;

/// Something a workflow needs exclusive access to while it reads, decides and
/// commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    User(UserId),
    Request(RequestId),
    Application(ApplicationId),
}

/// Per-entity async mutexes.
///
/// Keys are always taken in sorted order, so two workflows that need
/// overlapping sets of entities cannot deadlock.
#[derive(Clone, Default)]
pub struct EntityLocks {
    inner: Arc<DashMap<EntityKey, Arc<Mutex<()>>>>,
}

/// Guards held for the duration of one workflow.
pub struct LockSet {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, keys: impl IntoIterator<Item = EntityKey>) -> LockSet {
        let mut keys: Vec<EntityKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            // Clone the handle out so the shard guard is dropped before awaiting.
            let mutex = self.inner.entry(key).or_default().value().clone();
            guards.push(mutex.lock_owned().await);
        }
        self.prune();
        LockSet { _guards: guards }
    }

    /// Drops entries nobody holds or waits on.
    fn prune(&self) {
        if self.inner.len() > PRUNE_THRESHOLD {
            self.inner.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.len()
    }
}
