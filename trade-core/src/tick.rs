use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::{MarkupRange, SimConfig};
use crate::error::SimResult;
use crate::market::{run_clearing_step, run_timeout_step};
use crate::production::run_production_step;
use crate::quoting::run_business_step;
use crate::records::Trade;
use crate::registry::Registry;
use crate::types::{Amount, Millis};

// ============================================================================
// TickReport - What one tick changed
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub now: Millis,
    /// Units added to stocks by production.
    pub produced: Amount,
    pub offers_posted: Vec<Trade>,
    /// Closed trades, in the order they were matched.
    pub fills: Vec<Trade>,
    pub timed_out: Vec<Trade>,
    /// Expired records the timeout step refused to touch.
    pub rejected_timeouts: usize,
}

// ============================================================================
// Economy - Shared state for the tick pipeline
// ============================================================================

/// Everything a tick needs: the registry, a clock for offer timestamps and
/// expiry, and the RNG quoting draws markups from.
pub struct Economy {
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    markup: MarkupRange,
    tick: AtomicU64,
}

impl Economy {
    pub fn new(registry: Arc<Registry>, clock: Arc<dyn Clock>, config: &SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            registry,
            clock,
            rng: Mutex::new(rng),
            markup: config.markup,
            tick: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of ticks started so far.
    pub fn ticks(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    /// Run Production, Business Quoting, Market Clearing and Timeout once,
    /// in that order. The first error aborts the rest of the tick.
    pub fn run_tick(&self) -> SimResult<TickReport> {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now_millis();
        let registry = self.registry.as_ref();

        let produced = run_production_step(registry, tick)?;

        let offers_posted = {
            let mut rng = self.rng.lock();
            run_business_step(registry, now, &mut *rng, &self.markup, tick)?
        };

        let fills = run_clearing_step(registry, now, tick)?;
        let timeouts = run_timeout_step(registry, now, tick)?;

        tracing::debug!(
            tick,
            produced,
            offers = offers_posted.len(),
            fills = fills.len(),
            timed_out = timeouts.timed_out.len(),
            "tick complete"
        );

        Ok(TickReport {
            tick,
            now,
            produced,
            offers_posted,
            fills,
            timed_out: timeouts.timed_out,
            rejected_timeouts: timeouts.rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::SimError;
    use crate::records::{ProductionUnit, Stock};
    use crate::types::{CommodityId, EntityId, RecordKind, StationId, StockId};

    fn economy(registry: Arc<Registry>, clock: Arc<ManualClock>) -> Economy {
        let config = SimConfig::default().with_seed(3);
        Economy::new(registry, clock, &config)
    }

    #[test]
    fn test_tick_counter_and_timestamp() {
        let clock = Arc::new(ManualClock::new(5_000));
        let economy = economy(Arc::new(Registry::new()), Arc::clone(&clock));

        let first = economy.run_tick().unwrap();
        clock.advance(Duration::from_millis(100));
        let second = economy.run_tick().unwrap();

        assert_eq!((first.tick, first.now), (0, 5_000));
        assert_eq!((second.tick, second.now), (1, 5_100));
        assert_eq!(economy.ticks(), 2);
        assert_eq!(second, TickReport { tick: 1, now: 5_100, ..TickReport::default() });
    }

    #[test]
    fn test_production_runs_before_quoting_in_the_same_tick() {
        let registry = Arc::new(Registry::new());
        let stock = Stock::new(EntityId::new(), StationId::new(), CommodityId::new());
        registry.insert(stock.clone());
        registry.insert(ProductionUnit::new(stock.id).with_production_amount(4));
        let economy = economy(Arc::clone(&registry), Arc::new(ManualClock::new(0)));

        let report = economy.run_tick().unwrap();
        assert_eq!(report.produced, 4);
        // No business owns the stock, so nothing is quoted from it.
        assert!(report.offers_posted.is_empty());
        assert_eq!(registry.get::<Stock>(stock.id).unwrap().amount, 4);
    }

    #[test]
    fn test_structural_error_aborts_tick() {
        let registry = Arc::new(Registry::new());
        let orphan = StockId::new();
        registry.insert(ProductionUnit::new(orphan));
        let economy = economy(registry, Arc::new(ManualClock::new(0)));

        let err = economy.run_tick().unwrap_err();
        assert_eq!(err, SimError::not_found(RecordKind::Stock, orphan));
    }
}
