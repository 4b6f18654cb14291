//! Request coalescing: at most one in-flight fetch per cache key.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

use crate::telemetry;
use crate::{BokhyllaError, Result};

/// Coalesces concurrent fetches for the same key into one upstream call.
///
/// The first caller for a key becomes the *leader* and runs the producer;
/// callers arriving while the flight is open become *followers* and await
/// the leader's broadcast result — success or the cloned failure. The
/// registry entry is removed exactly once, before the result is broadcast,
/// and also when the leader is cancelled mid-flight (drop guard), so a key
/// can never be wedged by an abandoned fetch.
pub struct Singleflight<T: Clone> {
    inflight: Mutex<HashMap<String, broadcast::Sender<Result<T>>>>,
}

impl<T: Clone> Default for Singleflight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Singleflight<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `producer` for `key`, or join the flight already running for it.
    ///
    /// On producer failure every waiter receives the failure (not a cached
    /// value); falling back to stale data is the caller's decision. A
    /// follower whose leader was cancelled gets
    /// [`BokhyllaError::FlightAbandoned`].
    pub async fn run<F, Fut>(&self, key: &str, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let role = {
            let mut map = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            match map.get(key) {
                Some(tx) => Role::Follower(tx.subscribe()),
                None => {
                    // Capacity 1 suffices: exactly one value is ever sent.
                    let (tx, _rx) = broadcast::channel(1);
                    map.insert(key.to_string(), tx.clone());
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => {
                metrics::counter!(telemetry::SINGLEFLIGHT_JOINS_TOTAL).increment(1);
                debug!(key, "joining in-flight fetch");
                match rx.recv().await {
                    Ok(result) => result,
                    // Sender dropped without sending: leader cancelled.
                    Err(_) => Err(BokhyllaError::FlightAbandoned),
                }
            }
            Role::Leader(tx) => {
                let guard = FlightGuard {
                    registry: self,
                    key,
                    released: false,
                };
                let result = producer().await;
                // Remove the entry *before* broadcasting so a caller that
                // arrives after the send starts a new flight instead of
                // subscribing to a closed channel.
                guard.release();
                let _ = tx.send(result.clone());
                result
            }
        }
    }

    fn remove(&self, key: &str) {
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    /// Number of flights currently open.
    #[cfg(test)]
    pub(crate) fn open_flights(&self) -> usize {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

enum Role<T> {
    Leader(broadcast::Sender<Result<T>>),
    Follower(broadcast::Receiver<Result<T>>),
}

/// Removes the registry entry on drop, covering leader cancellation and
/// producer panics. Release is idempotent.
struct FlightGuard<'a, T: Clone> {
    registry: &'a Singleflight<T>,
    key: &'a str,
    released: bool,
}

impl<T: Clone> FlightGuard<'_, T> {
    fn release(mut self) {
        self.registry.remove(self.key);
        self.released = true;
    }
}

impl<T: Clone> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.released {
            self.registry.remove(self.key);
        }
    }
}
