//! Per-key mutual exclusion with a bounded acquisition wait.
//!
//! Lock objects are created lazily and kept for the life of the process;
//! the key space is bounded by the number of novels and source URLs seen.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

/// A table of named locks.
#[derive(Debug)]
pub struct KeyedLock {
    locks: DashMap<String, Arc<Mutex<()>>>,
    poll_interval: Duration,
}

/// Proof of holding a key. The key is released when the guard drops.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl KeyedLock {
    /// Creates an empty table that re-checks busy keys every `poll_interval`.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    fn entry(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(key) {
            return lock.clone();
        }
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Tries to take `key`, polling until `timeout` has passed.
    ///
    /// Always makes at least one attempt. Returns `None` if the key is still
    /// held when the timeout expires; callers never queue behind a holder.
    pub async fn try_acquire(&self, key: &str, timeout: Duration) -> Option<KeyGuard> {
        let lock = self.entry(key);
        let deadline = Instant::now() + timeout;

        loop {
            if let Ok(guard) = lock.clone().try_lock_owned() {
                return Some(KeyGuard {
                    key: key.to_string(),
                    _guard: guard,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    #[cfg(test)]
    fn is_held(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of keys ever seen.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

impl Default for KeyedLock {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}
