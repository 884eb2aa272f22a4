use crate::error::{SimError, SimResult};
use crate::predicate::is_timed_out;
use crate::records::{Stock, Trade};
use crate::registry::{Registry, Tables};
use crate::relations::{selling_business, sell_stock_for};
use crate::types::Millis;

/// What the timeout step did this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeoutOutcome {
    /// Expired offers that were refunded and deleted.
    pub timed_out: Vec<Trade>,
    /// Expired records that could not be timed out (closed trades).
    pub rejected: usize,
}

/// Refund and delete every offer past its expiry.
///
/// Each candidate is re-read inside its own transaction, so an offer that
/// has already been refunded is skipped rather than paid out twice. A closed
/// trade in the candidate set is logged and skipped; a broken reference
/// aborts the step.
pub fn run_timeout_step(registry: &Registry, now: Millis, tick: u64) -> SimResult<TimeoutOutcome> {
    let expired = registry.list::<Trade>(&[&is_timed_out(now)]);
    let mut outcome = TimeoutOutcome::default();

    for candidate in expired {
        match registry.transaction(|tables| expire(tables, &candidate, now)) {
            Ok(Some(trade)) => {
                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "timeout",
                    tick = tick,
                    trade_id = %trade.id,
                    business_id = %trade.selling_business_id,
                    station_id = %trade.station_id,
                    commodity_id = %trade.sell_commodity_id,
                    quantity = trade.sell_amount,
                    price = trade.price,
                );
                outcome.timed_out.push(trade);
            }
            Ok(None) => {}
            Err(err @ SimError::InvalidStateTransition(_)) => {
                tracing::warn!(trade_id = %candidate.id, error = %err, "skipping timeout");
                outcome.rejected += 1;
            }
            Err(err) => return Err(err),
        }
    }

    #[cfg(not(feature = "instrument"))]
    let _ = tick;

    Ok(outcome)
}

/// Time out one trade. `Ok(None)` if it is gone or no longer expired.
pub fn expire(tables: &mut Tables, candidate: &Trade, now: Millis) -> SimResult<Option<Trade>> {
    let Some(trade) = tables.find::<Trade>(candidate.id).cloned() else {
        return Ok(None);
    };
    if trade.is_closed() {
        return Err(SimError::InvalidStateTransition(format!(
            "timing out closed trade {}",
            trade.id
        )));
    }
    if !trade.is_timed_out(now) {
        return Ok(None);
    }

    let business = selling_business(tables, &trade)?;
    let stock: Stock = sell_stock_for(tables, &business, trade.sell_commodity_id)?;
    tables.insert(stock.credited(trade.sell_amount));
    tables.remove::<Trade>(trade.id);
    Ok(Some(trade))
}
