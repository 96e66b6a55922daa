//! Skiff Clock - coarse time source for the pipeline
//!
//! Entry ids and idle bookkeeping read the current unix second on every
//! entry, which is far too often for a syscall. [`CoarseClock`] caches the
//! second and refreshes it from a background task once per second, the
//! resolution everything in the pipeline actually needs.
//!
//! Components take an `Arc<dyn Clock>` so tests can inject a
//! [`VirtualClock`] and drive time by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

/// A source of coarse unix time.
pub trait Clock: Send + Sync {
    /// Current unix seconds.
    fn unix_now(&self) -> u64;

    /// Current time as a `SystemTime`, at second resolution.
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.unix_now())
    }
}

/// Clock that reads the system time on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> u64 {
        system_unix_now()
    }
}

/// Clock backed by a cached second, refreshed once per second by a
/// background task.
#[derive(Debug)]
pub struct CoarseClock {
    secs: AtomicU64,
}

impl CoarseClock {
    /// Start the clock. The refresh task runs until `cancel` fires.
    pub fn start(cancel: CancellationToken) -> Arc<Self> {
        let clock = Arc::new(Self {
            secs: AtomicU64::new(system_unix_now()),
        });

        let weak = Arc::downgrade(&clock);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        let Some(clock) = weak.upgrade() else { break };
                        clock.secs.store(system_unix_now(), Ordering::Release);
                    }
                }
            }
        });

        clock
    }
}

impl Clock for CoarseClock {
    fn unix_now(&self) -> u64 {
        self.secs.load(Ordering::Acquire)
    }
}

/// Manually driven clock for tests.
#[derive(Debug, Default)]
pub struct VirtualClock {
    secs: AtomicU64,
}

impl VirtualClock {
    /// Create a clock pinned at the given unix second.
    pub fn at(unix_secs: u64) -> Arc<Self> {
        Arc::new(Self {
            secs: AtomicU64::new(unix_secs),
        })
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::AcqRel);
    }

    /// Pin the clock to an absolute second.
    pub fn set(&self, unix_secs: u64) {
        self.secs.store(unix_secs, Ordering::Release);
    }
}

impl Clock for VirtualClock {
    fn unix_now(&self) -> u64 {
        self.secs.load(Ordering::Acquire)
    }
}

fn system_unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
