//! Duplicate-delivery guard.
//!
//! Webhook senders retry on timeouts, so the same `call_analyzed` event can
//! arrive more than once. The guard remembers call ids it has fully handled
//! for a retention window and lets the dispatcher short-circuit repeats.
//!
//! The guard is advisory. Two deliveries racing through `should_process`
//! before either calls `mark_seen` both proceed; the writer's transcript
//! check and a store-level unique constraint catch what slips through.
//!
//! Entries expire lazily on read and are also removed by [`sweep_task`],
//! which runs on its own interval until the shutdown channel flips.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Time-bounded set of processed call ids.
///
/// Implementations may be shared across processes (e.g. an external cache);
/// call sites only depend on this trait.
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    /// `false` when `call_id` was marked within the retention window.
    async fn should_process(&self, call_id: &str) -> bool;

    /// Record `call_id` as handled now.
    async fn mark_seen(&self, call_id: &str);

    /// Drop expired entries, returning how many were removed.
    async fn sweep(&self) -> usize;

    /// Number of entries currently held, expired or not.
    async fn entry_count(&self) -> usize;
}

/// Process-local cache on a concurrent map.
#[derive(Debug)]
pub struct InMemoryIdempotencyCache {
    entries: DashMap<String, Instant>,
    retention: Duration,
}

impl InMemoryIdempotencyCache {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn is_live(&self, seen: Instant) -> bool {
        seen.elapsed() < self.retention
    }

    #[cfg(test)]
    fn record_at(&self, call_id: &str, at: Instant) {
        self.entries.insert(call_id.to_string(), at);
    }
}

impl Default for InMemoryIdempotencyCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl IdempotencyCache for InMemoryIdempotencyCache {
    async fn should_process(&self, call_id: &str) -> bool {
        match self.entries.get(call_id) {
            Some(seen) => !self.is_live(*seen),
            None => true,
        }
    }

    async fn mark_seen(&self, call_id: &str) {
        self.entries.insert(call_id.to_string(), Instant::now());
    }

    async fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, seen| self.is_live(*seen));
        before.saturating_sub(self.entries.len())
    }

    async fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Periodically sweep `cache` until `shutdown_rx` carries `true`.
///
/// Returns the total number of entries removed over the task's lifetime.
pub async fn sweep_task(
    cache: Arc<dyn IdempotencyCache>,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut removed_total = 0u64;

    info!(interval_secs = every.as_secs(), "idempotency_sweeper_started");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // A dropped sender also means shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let removed = cache.sweep().await;
                if removed > 0 {
                    debug!(removed, "idempotency_sweep");
                }
                removed_total += removed as u64;
            }
        }
    }

    info!(removed_total, "idempotency_sweeper_stopped");
    removed_total
}

/// Spawn [`sweep_task`] on the current runtime.
pub fn spawn_sweeper(
    cache: Arc<dyn IdempotencyCache>,
    every: Duration,
    shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<u64> {
    tokio::spawn(sweep_task(cache, every, shutdown_rx))
}
