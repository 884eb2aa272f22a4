//! Time sources and tick pacing.
//!
//! Steps read "now" through a [`Clock`]; the runner paces itself through a
//! [`Ticker`]. Tests swap in [`ManualClock`] and [`ManualTicker`] so offer
//! expiry and tick cadence never depend on the wall clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::types::Millis;

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Millis;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Waits out the gap between two ticks.
pub trait Ticker: Send {
    fn wait(&mut self, interval: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SleepTicker;

impl Ticker for SleepTicker {
    fn wait(&mut self, interval: Duration) {
        thread::sleep(interval);
    }
}

/// Advances a shared [`ManualClock`] by each interval instead of sleeping.
#[derive(Debug, Clone)]
pub struct ManualTicker {
    clock: Arc<ManualClock>,
}

impl ManualTicker {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self { clock }
    }
}

impl Ticker for ManualTicker {
    fn wait(&mut self, interval: Duration) {
        self.clock.advance(interval);
        thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now_millis(), 1_250);
        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_manual_ticker_advances_clock() {
        let clock = Arc::new(ManualClock::new(0));
        let mut ticker = ManualTicker::new(Arc::clone(&clock));
        for _ in 0..3 {
            ticker.wait(Duration::from_millis(100));
        }
        assert_eq!(clock.now_millis(), 300);
    }

    #[test]
    fn test_system_clock_is_past_epoch() {
        assert!(SystemClock.now_millis() > 1_500_000_000_000);
    }
}
