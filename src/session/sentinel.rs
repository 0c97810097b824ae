//! Periodic eviction of expired sessions and attributes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::observability::metrics;
use crate::session::lock::SessionLock;
use crate::session::store::{SessionStore, SweepReport};

pub struct Sentinel {
    store: Arc<dyn SessionStore>,
    lock: SessionLock,
    interval: Duration,
}

impl Sentinel {
    pub fn new(store: Arc<dyn SessionStore>, lock: SessionLock, interval: Duration) -> Self {
        Self {
            store,
            lock,
            interval,
        }
    }

    /// One pass under the exclusive side of the session lock.
    ///
    /// No request enters the pipeline while this runs.
    pub async fn sweep_once(&self) -> SweepReport {
        let waited = Instant::now();
        let _guard = self.lock.write().await;
        let started = Instant::now();

        let report = self.store.evict_expired(started);
        let elapsed = started.elapsed();

        metrics::record_sweep(report.sessions, report.attributes, elapsed);
        tracing::debug!(
            sessions = report.sessions,
            attributes = report.attributes,
            remaining = self.store.len(),
            waited_ms = whole_millis(started.duration_since(waited)),
            "Session sweep complete"
        );
        report
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Session sentinel starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session sentinel received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Milliseconds in `d`, saturating at `u64::MAX`.
fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
