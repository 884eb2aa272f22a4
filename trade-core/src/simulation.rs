//! Background runner that drives [`Economy::run_tick`] at a fixed cadence.
//!
//! One thread owns the tick loop; any other thread may start, pause and
//! query it. Starting a running simulation and pausing a stopped one are
//! harmless no-ops that report what happened.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::{SleepTicker, Ticker};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::registry::Registry;
use crate::tick::{Economy, TickReport};

pub type TickerFactory = Box<dyn Fn() -> Box<dyn Ticker> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    NotRunning,
}

/// State shared between the controller and the tick thread.
#[derive(Default)]
struct Shared {
    running: AtomicBool,
    last_report: Mutex<Option<TickReport>>,
    last_error: Mutex<Option<SimError>>,
}

pub struct Simulation {
    economy: Arc<Economy>,
    interval: Duration,
    ticker: TickerFactory,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Simulation {
    pub fn new(economy: Economy, config: &SimConfig) -> Self {
        Self {
            economy: Arc::new(economy),
            interval: config.tick_interval(),
            ticker: Box::new(|| -> Box<dyn Ticker> { Box::new(SleepTicker) }),
            shared: Arc::new(Shared::default()),
            handle: Mutex::new(None),
        }
    }

    /// Replace how the tick thread waits between ticks.
    pub fn with_ticker(
        mut self,
        factory: impl Fn() -> Box<dyn Ticker> + Send + Sync + 'static,
    ) -> Self {
        self.ticker = Box::new(factory);
        self
    }

    pub fn economy(&self) -> &Arc<Economy> {
        &self.economy
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.economy.registry()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn last_report(&self) -> Option<TickReport> {
        self.shared.last_report.lock().clone()
    }

    /// The error that last aborted a tick, if any.
    pub fn last_error(&self) -> Option<SimError> {
        self.shared.last_error.lock().clone()
    }

    pub fn start(&self) -> StartOutcome {
        let mut handle = self.handle.lock();
        if self.shared.running.load(Ordering::SeqCst) {
            tracing::info!("Program already running");
            return StartOutcome::AlreadyRunning;
        }
        // A loop that halted on its own leaves a finished thread behind. Join
        // it before raising the flag, so its exit cannot lower it again.
        if let Some(stale) = handle.take() {
            join(stale);
        }
        self.shared.running.store(true, Ordering::SeqCst);

        let economy = Arc::clone(&self.economy);
        let shared = Arc::clone(&self.shared);
        let ticker = (self.ticker)();
        let interval = self.interval;
        *handle = Some(thread::spawn(move || tick_loop(&economy, &shared, ticker, interval)));

        tracing::info!(interval_ms = interval.as_millis() as u64, "simulation started");
        StartOutcome::Started
    }

    /// Stop the tick loop and wait for the in-flight tick to finish.
    pub fn pause(&self) -> PauseOutcome {
        let mut handle = self.handle.lock();
        let was_running = self.shared.running.swap(false, Ordering::SeqCst);
        if let Some(running) = handle.take() {
            join(running);
        }
        if was_running {
            tracing::info!(ticks = self.economy.ticks(), "simulation paused");
            PauseOutcome::Paused
        } else {
            tracing::info!("World not active");
            PauseOutcome::NotRunning
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.get_mut().take() {
            join(handle);
        }
    }
}

fn join(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("simulation thread panicked");
    }
}

/// Lowers the run flag when the tick loop exits, including by panic.
struct StopOnExit<'a>(&'a AtomicBool);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn tick_loop(economy: &Economy, shared: &Shared, mut ticker: Box<dyn Ticker>, interval: Duration) {
    let _stop = StopOnExit(&shared.running);
    while shared.running.load(Ordering::SeqCst) {
        match economy.run_tick() {
            Ok(report) => *shared.last_report.lock() = Some(report),
            Err(err) if err.is_structural() => {
                tracing::error!(error = %err, "halting simulation");
                *shared.last_error.lock() = Some(err);
                shared.running.store(false, Ordering::SeqCst);
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "tick aborted");
                *shared.last_error.lock() = Some(err);
            }
        }
        ticker.wait(interval);
    }
}
