//! A small station economy: producers grow stocks, businesses quote their
//! inventory as offers, and a per-station market clears opposing offers
//! into settled trades.
//!
//! One tick runs four steps in order: production, business quoting, market
//! clearing and timeout. [`Economy::run_tick`] runs a single tick against a
//! shared [`Registry`]; [`Simulation`] runs ticks on a background thread.

pub mod clock;
pub mod config;
pub mod error;
pub mod market;
pub mod predicate;
pub mod production;
pub mod quoting;
pub mod records;
pub mod registry;
pub mod relations;
pub mod simulation;
pub mod tick;
pub mod types;
pub mod world;

pub use clock::{Clock, ManualClock, ManualTicker, SleepTicker, SystemClock, Ticker};
pub use config::{MarkupRange, SimConfig};
pub use error::{ConfigError, SimError, SimResult};
pub use market::{TimeoutOutcome, clear_pair, run_clearing_step, run_timeout_step, settle};
pub use production::run_production_step;
pub use quoting::{recommended_sell_price, run_business_step};
pub use records::{Business, Commodity, Entity, ProductionUnit, Record, Station, Stock, Trade};
pub use registry::{Registry, Stored, Tables};
pub use simulation::{PauseOutcome, Simulation, StartOutcome};
pub use tick::{Economy, TickReport};
pub use types::*;
pub use world::{ExampleWorld, WorldBuilder, setup_example_world};

/// Event targets emitted by the tick steps.
pub mod targets {
    pub const PRODUCTION: &str = "production";
    pub const OFFER: &str = "offer";
    pub const FILL: &str = "fill";
    pub const TIMEOUT: &str = "timeout";

    pub const ALL: [&str; 4] = [PRODUCTION, OFFER, FILL, TIMEOUT];
}

#[cfg(feature = "instrument")]
pub use instrument;
