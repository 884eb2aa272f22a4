//! Business quoting: turns idle sell inventory into active offers.
//!
//! A business prices each non-empty sell stock off the market at the
//! stock's station, posts the whole amount there as one offer and zeroes the
//! stock. The inventory stays "in flight" until a match pays for it or the offer times
//! out and the timeout step hands it back.

use rand::Rng;

use crate::config::MarkupRange;
use crate::error::SimResult;
use crate::predicate::{at_station, is_active, is_buying, is_selling};
use crate::records::{Business, Stock, Trade};
use crate::registry::{Registry, Tables};
use crate::relations::buy_stock;
use crate::types::{Amount, Millis, Price};

/// Reference price when nothing comparable is on the market.
pub const DEFAULT_REFERENCE_PRICE: Price = 1.0;

/// Price for selling `stock` on behalf of `business`, before the guard.
///
/// The reference is the cheapest active offer of the same commodity for the
/// same payment at the stock's station. Failing that, the reciprocal of the
/// best inverse offer (someone selling the payment commodity for this one).
/// Failing both, [`DEFAULT_REFERENCE_PRICE`]. A markup drawn from `markup`
/// is applied on top in every case.
pub fn recommended_sell_price(
    tables: &Tables,
    business: &Business,
    stock: &Stock,
    rng: &mut impl Rng,
    markup: &MarkupRange,
) -> SimResult<Price> {
    let reference = reference_price(tables, business, stock)?;
    Ok(reference * markup.sample(rng))
}

fn reference_price(tables: &Tables, business: &Business, stock: &Stock) -> SimResult<Price> {
    let payment = buy_stock(tables, business)?.commodity_id;
    let station = stock.station_id;

    let lowest_sell = tables
        .list::<Trade>(&[
            &is_active(),
            &at_station::<Trade>(station),
            &is_selling(stock.commodity_id),
            &is_buying(payment),
        ])
        .into_iter()
        .map(|trade| trade.price)
        .filter(|price| *price > 0.0)
        .min_by(f64::total_cmp);
    if let Some(price) = lowest_sell {
        return Ok(price);
    }

    let highest_inverse = tables
        .list::<Trade>(&[
            &is_active(),
            &at_station::<Trade>(station),
            &is_selling(payment),
            &is_buying(stock.commodity_id),
        ])
        .into_iter()
        .map(|trade| trade.price)
        .filter(|price| *price > 0.0)
        .max_by(f64::total_cmp);
    if let Some(price) = highest_inverse {
        return Ok(1.0 / price);
    }

    Ok(DEFAULT_REFERENCE_PRICE)
}

/// Offers worth less than one whole unit of payment are not posted.
pub fn worth_posting(amount: Amount, price: Price) -> bool {
    amount as Price * price >= 1.0
}

/// Post offers for every business's non-empty sell stocks.
///
/// Each stock is quoted in its own transaction: the stock is re-read, priced
/// against the current market, and either left alone or zeroed together with
/// inserting the new offer. Returns the offers posted.
pub fn run_business_step(
    registry: &Registry,
    now: Millis,
    rng: &mut impl Rng,
    markup: &MarkupRange,
    tick: u64,
) -> SimResult<Vec<Trade>> {
    let businesses = registry.businesses(&[]);
    let mut posted = Vec::new();

    for business in &businesses {
        for stock_id in &business.sell_stock_ids {
            let offer = registry.transaction(|tables| {
                let stock = tables.get::<Stock>(*stock_id)?;
                quote_stock(tables, business, &stock, now, &mut *rng, markup)
            })?;
            let Some(offer) = offer else { continue };

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "offer",
                tick = tick,
                trade_id = %offer.id,
                business_id = %business.id,
                station_id = %offer.station_id,
                sell_commodity_id = %offer.sell_commodity_id,
                buy_commodity_id = %offer.buy_commodity_id,
                quantity = offer.sell_amount,
                price = offer.price,
            );

            posted.push(offer);
        }
    }

    #[cfg(not(feature = "instrument"))]
    let _ = tick;

    Ok(posted)
}

fn quote_stock(
    tables: &mut Tables,
    business: &Business,
    stock: &Stock,
    now: Millis,
    rng: &mut impl Rng,
    markup: &MarkupRange,
) -> SimResult<Option<Trade>> {
    if stock.amount == 0 {
        return Ok(None);
    }

    let price = recommended_sell_price(tables, business, stock, rng, markup)?;
    if !worth_posting(stock.amount, price) {
        tracing::debug!(
            stock_id = %stock.id,
            amount = stock.amount,
            price,
            "offer below one unit of payment, not posted"
        );
        return Ok(None);
    }

    let payment = buy_stock(tables, business)?.commodity_id;
    let offer = Trade::offer(
        business.id,
        stock.station_id,
        stock.commodity_id,
        payment,
        stock.amount,
        price,
        now,
        stock.trade_lifetime,
    );
    tables.insert(offer.clone());
    tables.insert(stock.with_balance(0));
    Ok(Some(offer))
}
