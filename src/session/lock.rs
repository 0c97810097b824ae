//! Process-wide session reader/writer lock.

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Coarse barrier between request processing and the sentinel sweep.
///
/// Every request holds the read side for its whole pass through the pipeline;
/// the sentinel holds the write side for one sweep. tokio's lock is fair, so a
/// waiting sweep stops new readers from entering until it has run.
#[derive(Debug, Clone, Default)]
pub struct SessionLock {
    inner: Arc<RwLock<()>>,
}

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> OwnedRwLockReadGuard<()> {
        Arc::clone(&self.inner).read_owned().await
    }

    /// Read side for code running outside the async runtime (e.g. `spawn_blocking`).
    ///
    /// Panics if called from within an async context, like `RwLock::blocking_read`.
    pub fn blocking_read(&self) -> OwnedRwLockReadGuard<()> {
        let inner = Arc::clone(&self.inner);
        tokio::runtime::Handle::current().block_on(inner.read_owned())
    }

    pub async fn write(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.inner).write_owned().await
    }

    /// Non-waiting probe, used by tests and diagnostics.
    pub fn try_write(&self) -> Option<OwnedRwLockWriteGuard<()>> {
        Arc::clone(&self.inner).try_write_owned().ok()
    }
}
