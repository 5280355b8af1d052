//! Session Clock - periodic reconciliation of cache and durable slot
//!
//! The slot can be rewritten by other processes with no change notification, so
//! the clock re-reads it on a fixed period. Per tick exactly one of these holds:
//!
//! 1. cache and slot differ: the cache adopts the slot's value (external login or
//!    logout);
//! 2. otherwise, if the stored session has a token and has expired: the slot and
//!    dependent state are cleared and the cache reverts to anonymous;
//! 3. otherwise nothing changes.
//!
//! A drift detected in a tick takes precedence over expiration in that same tick.

use crate::cache::SessionCache;
use crate::types::Session;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// What a single reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Unchanged,
    /// The cache adopted a value written to the slot from elsewhere
    Synced,
    /// The stored session expired and was evicted
    Expired,
}

impl SessionCache {
    /// Reconcile once against the wall clock
    pub fn reconcile(&self) -> TickOutcome {
        self.reconcile_at(Utc::now())
    }

    /// Reconcile once, treating `now` as the current time
    pub fn reconcile_at(&self, now: DateTime<Utc>) -> TickOutcome {
        let _guard = self.lock();
        let stored = self.store.load();
        let drifted = self.with_current(|cached| *cached != stored);

        if drifted {
            self.replace(stored);
            TickOutcome::Synced
        } else if stored.has_expired(now) {
            self.store.clear();
            self.clear_dependents();
            self.replace(Session::anonymous());
            TickOutcome::Expired
        } else {
            TickOutcome::Unchanged
        }
    }
}

/// Handle to the background reconciliation task. Dropping it stops the task.
pub struct SessionClock {
    handle: JoinHandle<()>,
    period: Duration,
}

impl SessionClock {
    /// Spawn the repeating task on the current tokio runtime.
    ///
    /// Ticks never overlap: each reconciliation finishes before the next is
    /// scheduled. Panics if called outside a runtime.
    pub fn start(cache: Arc<SessionCache>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let cache = Arc::clone(&cache);
                match tokio::task::spawn_blocking(move || cache.reconcile()).await {
                    Ok(TickOutcome::Unchanged) => {}
                    Ok(TickOutcome::Synced) => debug!("Session picked up from storage"),
                    Ok(TickOutcome::Expired) => info!("Session expired and was cleared"),
                    Err(e) => warn!(error = %e, "Session reconciliation task failed"),
                }
            }
        });

        debug!(period_ms = period.as_millis() as u64, "Session clock started");
        Self { handle, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
