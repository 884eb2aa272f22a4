//! Offer matching and the trade lifecycle after quoting.

pub mod clearing;
pub mod settlement;
pub mod timeout;

pub use clearing::{MatchTerms, clear_pair, clear_station, reciprocal_price, run_clearing_step};
pub use settlement::settle;
pub use timeout::{TimeoutOutcome, expire, run_timeout_step};
