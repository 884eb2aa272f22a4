use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::error::SimResult;
use crate::predicate::{at_station, is_active, is_buying, is_selling};
use crate::records::Trade;
use crate::registry::{Registry, Tables};
use crate::types::{Amount, CommodityId, Millis, Price, StationId};

use super::settlement::settle;

// === PRICE CONVENTION ===
//
// Every offer quotes `price` as units of its buy commodity per unit sold.
// In the (S, B) book a seller offers S for B at `price` B per S. A buyer is
// itself an offer of B for S, so its bid in B-per-S terms is `1 / price`.

/// The bid of a buying-side offer, in the seller's units.
pub fn reciprocal_price(buyer: &Trade) -> Price {
    1.0 / buyer.price
}

/// Cheapest seller first. Equal prices keep snapshot order.
fn by_ask(a: &Trade, b: &Trade) -> Ordering {
    a.price.total_cmp(&b.price)
}

/// Highest reciprocal bid first, i.e. lowest posted price first.
fn by_bid(a: &Trade, b: &Trade) -> Ordering {
    reciprocal_price(b).total_cmp(&reciprocal_price(a))
}

// === MATCH ARITHMETIC ===

/// Quantities of one proposed match between the best seller and best buyer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchTerms {
    /// Units of S the buyer's remaining B would nominally buy at its own rate.
    pub want: Amount,
    /// Units of S changing hands.
    pub amount: Amount,
    /// Units of B paid for them.
    pub pay: Amount,
    /// `pay / amount`, in B per S.
    pub price: Price,
}

impl MatchTerms {
    pub fn propose(seller: &Trade, buyer: &Trade) -> Self {
        let can_sell = seller.sell_amount;
        let can_pay = buyer.sell_amount;
        let bid = reciprocal_price(buyer);

        let want = (can_pay as Price * buyer.price).ceil() as Amount;
        let amount = can_sell.min(want);
        let pay = can_pay.min((bid * amount as Price).floor() as Amount);
        let price = if amount == 0 {
            0.0
        } else {
            pay as Price / amount as Price
        };

        Self {
            want,
            amount,
            pay,
            price,
        }
    }

    /// Both sides get at least their own terms.
    pub fn crosses(&self, ask: Price, bid: Price) -> bool {
        self.amount > 0 && self.pay > 0 && ask <= self.price && self.price <= bid
    }
}

// === PAIRWISE CLEARING ===

/// Match offers selling `sell` for `buy` against offers selling `buy` for
/// `sell` at one station.
///
/// Works on a snapshot of the two books taken on entry. Each accepted match
/// becomes a closed trade that is settled immediately; exhausted offers are
/// deleted and partially filled ones shrink in place. Returns the closed
/// trades in the order they were made. Closed trades are not stored.
pub fn clear_pair(
    tables: &mut Tables,
    station: StationId,
    sell: CommodityId,
    buy: CommodityId,
    now: Millis,
    tick: u64,
) -> SimResult<Vec<Trade>> {
    let mut sellers = book(tables, station, sell, buy);
    sellers.sort_by(by_ask);
    let mut buyers = book(tables, station, buy, sell);
    buyers.sort_by(by_bid);

    let mut sellers = VecDeque::from(sellers);
    let mut buyers = VecDeque::from(buyers);
    let mut fills = Vec::new();

    while let (Some(seller), Some(buyer)) = (sellers.front(), buyers.front()) {
        let ask = seller.price;
        let bid = reciprocal_price(buyer);
        if bid < ask {
            break;
        }

        let terms = MatchTerms::propose(seller, buyer);
        if !terms.crosses(ask, bid) {
            if seller.sell_amount < terms.want {
                sellers.pop_front();
            } else {
                buyers.pop_front();
            }
            continue;
        }

        let fill = Trade::closed(seller, buyer, terms.amount, terms.pay, now);
        settle(tables, &fill)?;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "fill",
            tick = tick,
            trade_id = %fill.id,
            station_id = %station,
            seller_trade_id = %seller.id,
            buyer_trade_id = %buyer.id,
            sell_commodity_id = %sell,
            buy_commodity_id = %buy,
            quantity = fill.sell_amount,
            payment = fill.buy_amount,
            price = fill.price,
            ask = ask,
            bid = bid,
        );

        let buyer_left = buyer.sell_amount - terms.pay;
        let seller_left = seller.sell_amount - terms.amount;
        consume(tables, &mut buyers, buyer_left);
        consume(tables, &mut sellers, seller_left);

        fills.push(fill);
    }

    #[cfg(not(feature = "instrument"))]
    let _ = tick;

    Ok(fills)
}

fn book(tables: &Tables, station: StationId, sell: CommodityId, buy: CommodityId) -> Vec<Trade> {
    tables
        .list::<Trade>(&[
            &is_active(),
            &at_station::<Trade>(station),
            &is_selling(sell),
            &is_buying(buy),
        ])
        .into_iter()
        .filter(|trade| trade.sell_amount > 0 && trade.price > 0.0)
        .collect()
}

/// Shrink the offer at the front of `side` to `left`, deleting it when
/// nothing remains.
fn consume(tables: &mut Tables, side: &mut VecDeque<Trade>, left: Amount) {
    let Some(front) = side.front_mut() else {
        return;
    };
    if left == 0 {
        tables.remove::<Trade>(front.id);
        side.pop_front();
    } else {
        *front = front.with_sell_amount(left);
        tables.insert(front.clone());
    }
}

// === STATION / STEP ===

/// Distinct keys in the order they first appear.
fn first_seen<K: PartialEq>(keys: impl Iterator<Item = K>) -> Vec<K> {
    let mut seen = Vec::new();
    for key in keys {
        if !seen.contains(&key) {
            seen.push(key);
        }
    }
    seen
}

/// Clear every ordered commodity pair traded at `station`, each pair in its
/// own transaction with a fresh snapshot.
pub fn clear_station(
    registry: &Registry,
    station: StationId,
    now: Millis,
    tick: u64,
) -> SimResult<Vec<Trade>> {
    let offers = registry.active_trades(&[&at_station::<Trade>(station)]);
    let sells = first_seen(offers.iter().map(|t| t.sell_commodity_id));
    let buys = first_seen(offers.iter().map(|t| t.buy_commodity_id));

    let mut fills = Vec::new();
    for &sell in &sells {
        for &buy in &buys {
            if sell == buy {
                continue;
            }
            let pair =
                registry.transaction(|tables| clear_pair(tables, station, sell, buy, now, tick))?;
            fills.extend(pair);
        }
    }
    Ok(fills)
}

/// Clear every station that currently has open offers.
pub fn run_clearing_step(registry: &Registry, now: Millis, tick: u64) -> SimResult<Vec<Trade>> {
    let stations = first_seen(registry.active_trades(&[]).iter().map(|t| t.station_id));

    let mut fills = Vec::new();
    for station in stations {
        fills.extend(clear_station(registry, station, now, tick)?);
    }
    Ok(fills)
}
