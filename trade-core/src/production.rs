// Production step: every unit grows its target stock once per tick

use crate::error::SimResult;
use crate::records::{ProductionUnit, Stock};
use crate::registry::{Registry, Tables};
use crate::types::Amount;

/// Credit each production unit's stock with its per-tick amount.
///
/// Each unit re-reads its stock inside its own transaction, so a stock
/// changed by an earlier step is never overwritten with a stale value.
/// A unit whose stock has disappeared aborts the step with `NotFound`.
pub fn run_production_step(registry: &Registry, tick: u64) -> SimResult<Amount> {
    let units = registry.production_units(&[]);
    let mut produced: Amount = 0;

    for unit in &units {
        let stock = registry.transaction(|tables| produce(tables, unit))?;
        produced = produced.saturating_add(unit.production_amount);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "production",
            tick = tick,
            unit_id = %unit.id,
            stock_id = %stock.id,
            commodity_id = %stock.commodity_id,
            quantity = unit.production_amount,
            stock_after = stock.amount,
        );
        #[cfg(not(feature = "instrument"))]
        let _ = (tick, stock);
    }

    Ok(produced)
}

fn produce(tables: &mut Tables, unit: &ProductionUnit) -> SimResult<Stock> {
    let stock = tables.get::<Stock>(unit.stock_id)?.credited(unit.production_amount);
    tables.insert(stock.clone());
    Ok(stock)
}
