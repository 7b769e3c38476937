//! Per-session-id locking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes read-modify-write cycles against a single session id.
///
/// Requests carrying the same session cookie take the same lock, so a
/// simultaneous login and logout cannot interleave their session writes.
/// Distinct session ids never contend.
///
/// Locking is per process. A multi-node deployment sharing one Redis session
/// backend would additionally need a distributed lease, which this crate does
/// not provide.
#[derive(Clone, Debug, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `id`, creating it on first use. The guard is
    /// owned so it can be held across await points for the whole enforcement
    /// pass.
    ///
    /// Entries whose guards have all been released are swept on the next
    /// acquire, so the map tracks only in-flight session ids and arbitrary
    /// cookie values cannot grow it without bound.
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("session lock map poisoned");
            // Holders and waiters each keep an Arc clone; a count of one
            // means nobody is using the entry anymore.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }
}
