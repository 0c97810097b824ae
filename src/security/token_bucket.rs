//! Token buckets for admission control.
//!
//! Two refill strategies share the [`TokenBucket`] contract:
//! - [`FixedWindowBucket`]: full reset to capacity once the interval has passed.
//!   Bursty at window boundaries.
//! - [`MeteredBucket`]: starts empty, a background task adds one token per tick.
//!   Smooths arrivals.
//!
//! Both pop tokens with a compare-and-swap loop that fails fast at zero, so no
//! caller ever drives the count negative and at most `tokens` acquisitions can
//! succeed between two refills.

use std::fmt;
use std::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::BuildError;

/// Non-blocking admission check.
pub trait TokenBucket: Send + Sync + fmt::Debug {
    /// Take one token if available. Never blocks.
    fn try_acquire(&self) -> bool;

    fn capacity(&self) -> u32;

    /// Tokens currently available (a snapshot).
    fn available(&self) -> u32;
}

/// Decrement `tokens` unless it is zero.
fn pop(tokens: &AtomicU32) -> bool {
    let mut current = tokens.load(Ordering::Acquire);
    loop {
        if current == 0 {
            return false;
        }
        match tokens.compare_exchange_weak(current, current - 1, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return true,
            Err(actual) => current = actual,
        }
    }
}

/// Increment `tokens` unless it is at `cap`.
fn push(tokens: &AtomicU32, cap: u32) -> bool {
    let mut current = tokens.load(Ordering::Acquire);
    loop {
        if current >= cap {
            return false;
        }
        match tokens.compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return true,
            Err(actual) => current = actual,
        }
    }
}

/// Capacity `N`, refilled to `N` whenever more than `interval` has passed since the last reset.
///
/// Resets are serialized by a mutex and double-checked, so a burst of callers at
/// the boundary triggers exactly one. A stamp counter (odd while a reset is in
/// progress) lets acquirers read optimistically; when the stamp moved under them
/// they retry the pop while holding the reset mutex.
pub struct FixedWindowBucket {
    capacity: u32,
    interval: Duration,
    origin: Instant,
    tokens: AtomicU32,
    last_reset: AtomicU64,
    stamp: AtomicU64,
    reset_lock: Mutex<()>,
}

impl FixedWindowBucket {
    pub fn new(capacity: u32, interval: Duration) -> Self {
        Self {
            capacity,
            interval,
            origin: Instant::now(),
            tokens: AtomicU32::new(capacity),
            last_reset: AtomicU64::new(0),
            stamp: AtomicU64::new(0),
            reset_lock: Mutex::new(()),
        }
    }

    /// Number of resets performed so far.
    pub fn resets(&self) -> u64 {
        self.stamp.load(Ordering::Acquire) / 2
    }

    fn now_nanos(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn window_expired(&self, now: u64) -> bool {
        let last = self.last_reset.load(Ordering::Acquire);
        u128::from(now.saturating_sub(last)) > self.interval.as_nanos()
    }

    fn maybe_reset(&self) {
        let now = self.now_nanos();
        if !self.window_expired(now) {
            return;
        }

        let _guard = self.reset_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.window_expired(now) {
            return;
        }
        self.stamp.fetch_add(1, Ordering::AcqRel);
        self.tokens.store(self.capacity, Ordering::Release);
        self.last_reset.store(now, Ordering::Release);
        self.stamp.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(capacity = self.capacity, "Token bucket window reset");
    }
}

impl TokenBucket for FixedWindowBucket {
    fn try_acquire(&self) -> bool {
        self.maybe_reset();

        let stamp = self.stamp.load(Ordering::Acquire);
        if stamp % 2 == 0 {
            let seen = self.tokens.load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            if self.stamp.load(Ordering::Relaxed) == stamp {
                return seen > 0 && pop(&self.tokens);
            }
        }

        let _guard = self.reset_lock.lock().unwrap_or_else(PoisonError::into_inner);
        pop(&self.tokens)
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn available(&self) -> u32 {
        self.tokens.load(Ordering::Acquire)
    }
}

impl fmt::Debug for FixedWindowBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedWindowBucket")
            .field("capacity", &self.capacity)
            .field("interval", &self.interval)
            .field("tokens", &self.available())
            .finish()
    }
}

#[derive(Debug)]
struct MeteredState {
    capacity: u32,
    tokens: AtomicU32,
    stopped: AtomicBool,
}

/// Capacity `N`, empty at start, one token added per `tick` by a background task.
///
/// The refill task runs until the bucket is dropped or [`MeteredBucket::stop`] is called;
/// it checks the stop flag after every sleep.
pub struct MeteredBucket {
    state: Arc<MeteredState>,
    tick: Duration,
    task: JoinHandle<()>,
}

impl MeteredBucket {
    /// Start the bucket and its refill task on the current tokio runtime.
    pub fn start(capacity: u32, tick: Duration) -> Result<Self, BuildError> {
        let handle = Handle::try_current().map_err(|_| BuildError::NoRuntime)?;
        Ok(Self::start_on(&handle, capacity, tick))
    }

    pub fn start_on(handle: &Handle, capacity: u32, tick: Duration) -> Self {
        let state = Arc::new(MeteredState {
            capacity,
            tokens: AtomicU32::new(0),
            stopped: AtomicBool::new(false),
        });
        let task = handle.spawn(refill(Arc::clone(&state), tick));
        Self { state, tick, task }
    }

    /// Ask the refill task to exit after its current sleep.
    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::Release);
    }

    pub fn is_refilling(&self) -> bool {
        !self.task.is_finished()
    }
}

async fn refill(state: Arc<MeteredState>, tick: Duration) {
    loop {
        tokio::time::sleep(tick).await;
        if state.stopped.load(Ordering::Acquire) {
            break;
        }
        push(&state.tokens, state.capacity);
    }
    tracing::trace!(capacity = state.capacity, "Metered refill task stopped");
}

impl TokenBucket for MeteredBucket {
    fn try_acquire(&self) -> bool {
        pop(&self.state.tokens)
    }

    fn capacity(&self) -> u32 {
        self.state.capacity
    }

    fn available(&self) -> u32 {
        self.state.tokens.load(Ordering::Acquire)
    }
}

impl Drop for MeteredBucket {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for MeteredBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeteredBucket")
            .field("capacity", &self.state.capacity)
            .field("tick", &self.tick)
            .field("tokens", &self.available())
            .finish()
    }
}
