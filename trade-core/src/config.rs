//! Simulation parameters.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```toml
//! tick_interval_ms = 50
//! seed = 7
//!
//! [markup]
//! low = 1.0
//! high = 1.2
//! ```

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::records::DEFAULT_TRADE_LIFETIME;
use crate::types::Price;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Uniform range sellers draw their markup from when quoting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkupRange {
    pub low: f64,
    pub high: f64,
}

impl Default for MarkupRange {
    fn default() -> Self {
        Self {
            low: 0.9,
            high: 1.5,
        }
    }
}

impl MarkupRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// A range that always yields `value`.
    pub fn fixed(value: f64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.low.is_finite() && self.high.is_finite()
    }

    /// Draw a markup. A collapsed or non-finite range yields `low`.
    pub fn sample(&self, rng: &mut impl Rng) -> Price {
        if self.is_finite() && self.low < self.high {
            rng.random_range(self.low..=self.high)
        } else {
            self.low
        }
    }

    pub fn contains(&self, markup: f64) -> bool {
        (self.low..=self.high).contains(&markup)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Delay between ticks of the simulation thread.
    pub tick_interval_ms: u64,
    pub markup: MarkupRange,
    /// RNG seed for quoting. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Offer lifetime given to stocks created by world builders.
    pub default_trade_lifetime_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            markup: MarkupRange::default(),
            seed: None,
            default_trade_lifetime_ms: DEFAULT_TRADE_LIFETIME.as_millis() as u64,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be positive".into(),
            ));
        }
        if !self.markup.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "markup bounds must be finite, got {}..={}",
                self.markup.low, self.markup.high
            )));
        }
        if !(self.markup.low > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "markup.low must be positive, got {}",
                self.markup.low
            )));
        }
        if self.markup.low > self.markup.high {
            return Err(ConfigError::Invalid(format!(
                "markup.low ({}) exceeds markup.high ({})",
                self.markup.low, self.markup.high
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn default_trade_lifetime(&self) -> Duration {
        Duration::from_millis(self.default_trade_lifetime_ms)
    }

    // === Builder-style setters ===

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_markup(mut self, markup: MarkupRange) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_default_trade_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_trade_lifetime_ms = lifetime.as_millis() as u64;
        self
    }
}
