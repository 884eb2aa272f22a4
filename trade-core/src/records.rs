use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{
    Amount, BusinessId, CommodityId, EntityId, Millis, Price, ProductionUnitId, RecordKind,
    StationId, StockId, TradeId,
};

pub const DEFAULT_TRADE_LIFETIME: Duration = Duration::from_millis(10_000);
pub const DEFAULT_PRODUCTION_AMOUNT: Amount = 1;

// ============================================================================
// Commodity - Reference data, never mutated after creation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    pub id: CommodityId,
    pub name: String,
    pub abbreviation: String,
}

impl Commodity {
    /// The abbreviation defaults to the full name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: CommodityId::new(),
            abbreviation: name.clone(),
            name,
        }
    }

    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = abbreviation.into();
        self
    }
}

// ============================================================================
// Station - Scopes trading
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
}

impl Station {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: StationId::new(),
            name: name.into(),
        }
    }
}

// ============================================================================
// Entity - An economic actor located at one station
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub station_id: StationId,
}

impl Entity {
    pub fn new(station_id: StationId) -> Self {
        Self {
            id: EntityId::new(),
            station_id,
        }
    }
}

// ============================================================================
// Stock - How much of a commodity an entity holds at a station
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub entity_id: EntityId,
    pub station_id: StationId,
    pub commodity_id: CommodityId,
    pub amount: Amount,
    /// How long offers posted from this stock stay open.
    pub trade_lifetime: Duration,
}

impl Stock {
    pub fn new(entity_id: EntityId, station_id: StationId, commodity_id: CommodityId) -> Self {
        Self {
            id: StockId::new(),
            entity_id,
            station_id,
            commodity_id,
            amount: 0,
            trade_lifetime: DEFAULT_TRADE_LIFETIME,
        }
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_trade_lifetime(mut self, trade_lifetime: Duration) -> Self {
        self.trade_lifetime = trade_lifetime;
        self
    }

    /// Replacement value with `delta` more units.
    pub fn credited(&self, delta: Amount) -> Self {
        Self {
            amount: self.amount.saturating_add(delta),
            ..self.clone()
        }
    }

    /// Replacement value with the given amount.
    pub fn with_balance(&self, amount: Amount) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }
}

// ============================================================================
// Production Unit - Grows one stock every tick
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionUnit {
    pub id: ProductionUnitId,
    pub stock_id: StockId,
    pub production_amount: Amount,
}

impl ProductionUnit {
    pub fn new(stock_id: StockId) -> Self {
        Self {
            id: ProductionUnitId::new(),
            stock_id,
            production_amount: DEFAULT_PRODUCTION_AMOUNT,
        }
    }

    pub fn with_production_amount(mut self, production_amount: Amount) -> Self {
        self.production_amount = production_amount;
        self
    }
}

// ============================================================================
// Business - What an entity trades
// ============================================================================

/// Accepts payment into `buy_stock_id` and offers inventory from each of
/// `sell_stock_ids`, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub station_id: StationId,
    pub entity_id: EntityId,
    pub buy_stock_id: StockId,
    pub sell_stock_ids: Vec<StockId>,
}

impl Business {
    pub fn new(
        station_id: StationId,
        entity_id: EntityId,
        buy_stock_id: StockId,
        sell_stock_ids: Vec<StockId>,
    ) -> Self {
        Self {
            id: BusinessId::new(),
            station_id,
            entity_id,
            buy_stock_id,
            sell_stock_ids,
        }
    }
}

// ============================================================================
// Trade - An open offer (active) or a settled match (closed)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub selling_business_id: BusinessId,
    /// Unset while the offer is open; set once, at creation, on a closed trade.
    pub buying_business_id: Option<BusinessId>,
    pub station_id: StationId,
    pub sell_commodity_id: CommodityId,
    pub buy_commodity_id: CommodityId,
    pub sell_amount: Amount,
    pub buy_amount: Amount,
    pub price: Price,
    pub timestamp: Millis,
    pub trade_lifetime: Duration,
}

impl Trade {
    /// A new active offer of `sell_amount` units at `price`.
    #[allow(clippy::too_many_arguments)]
    pub fn offer(
        selling_business_id: BusinessId,
        station_id: StationId,
        sell_commodity_id: CommodityId,
        buy_commodity_id: CommodityId,
        sell_amount: Amount,
        price: Price,
        timestamp: Millis,
        trade_lifetime: Duration,
    ) -> Self {
        Self {
            id: TradeId::new(),
            selling_business_id,
            buying_business_id: None,
            station_id,
            sell_commodity_id,
            buy_commodity_id,
            sell_amount,
            buy_amount: 0,
            price,
            timestamp,
            trade_lifetime,
        }
    }

    /// A settled match between a seller offer and a buyer offer.
    /// The recorded price is `buy_amount / sell_amount`.
    pub fn closed(
        seller: &Trade,
        buyer: &Trade,
        sell_amount: Amount,
        buy_amount: Amount,
        timestamp: Millis,
    ) -> Self {
        Self {
            id: TradeId::new(),
            selling_business_id: seller.selling_business_id,
            buying_business_id: Some(buyer.selling_business_id),
            station_id: seller.station_id,
            sell_commodity_id: seller.sell_commodity_id,
            buy_commodity_id: seller.buy_commodity_id,
            sell_amount,
            buy_amount,
            price: buy_amount as Price / sell_amount as Price,
            timestamp,
            trade_lifetime: Duration::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        self.buying_business_id.is_none()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_active()
    }

    pub fn expires_at(&self) -> Millis {
        let lifetime = u64::try_from(self.trade_lifetime.as_millis()).unwrap_or(u64::MAX);
        self.timestamp.saturating_add(lifetime)
    }

    /// Strictly past expiry: an offer expiring exactly at `now` is still open.
    pub fn is_timed_out(&self, now: Millis) -> bool {
        self.expires_at() < now
    }

    /// Replacement value with a smaller remaining offer.
    pub fn with_sell_amount(&self, sell_amount: Amount) -> Self {
        Self {
            sell_amount,
            ..self.clone()
        }
    }
}

// ============================================================================
// Record - Closed set of storable kinds
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record")]
pub enum Record {
    Commodity(Commodity),
    Station(Station),
    Entity(Entity),
    Stock(Stock),
    ProductionUnit(ProductionUnit),
    Business(Business),
    Trade(Trade),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Commodity(_) => RecordKind::Commodity,
            Record::Station(_) => RecordKind::Station,
            Record::Entity(_) => RecordKind::Entity,
            Record::Stock(_) => RecordKind::Stock,
            Record::ProductionUnit(_) => RecordKind::ProductionUnit,
            Record::Business(_) => RecordKind::Business,
            Record::Trade(_) => RecordKind::Trade,
        }
    }

    pub fn id_string(&self) -> String {
        match self {
            Record::Commodity(r) => r.id.to_string(),
            Record::Station(r) => r.id.to_string(),
            Record::Entity(r) => r.id.to_string(),
            Record::Stock(r) => r.id.to_string(),
            Record::ProductionUnit(r) => r.id.to_string(),
            Record::Business(r) => r.id.to_string(),
            Record::Trade(r) => r.id.to_string(),
        }
    }
}

macro_rules! into_record {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Record {
                fn from(record: $variant) -> Self {
                    Record::$variant(record)
                }
            }
        )*
    };
}

into_record!(Commodity, Station, Entity, Stock, ProductionUnit, Business, Trade);

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(price: Price, timestamp: Millis, lifetime_ms: u64) -> Trade {
        Trade::offer(
            BusinessId::new(),
            StationId::new(),
            CommodityId::new(),
            CommodityId::new(),
            10,
            price,
            timestamp,
            Duration::from_millis(lifetime_ms),
        )
    }

    #[test]
    fn test_commodity_abbreviation_defaults_to_name() {
        let water = Commodity::new("Water");
        assert_eq!(water.abbreviation, "Water");
        let credits = Commodity::new("Credits").with_abbreviation("Cr");
        assert_eq!(credits.abbreviation, "Cr");
    }

    #[test]
    fn test_stock_defaults() {
        let stock = Stock::new(EntityId::new(), StationId::new(), CommodityId::new());
        assert_eq!(stock.amount, 0);
        assert_eq!(stock.trade_lifetime, DEFAULT_TRADE_LIFETIME);
        let unit = ProductionUnit::new(stock.id);
        assert_eq!(unit.production_amount, 1);
    }

    #[test]
    fn test_stock_replacements_keep_identity() {
        let stock = Stock::new(EntityId::new(), StationId::new(), CommodityId::new()).with_amount(4);
        let credited = stock.credited(6);
        assert_eq!(credited.id, stock.id);
        assert_eq!(credited.amount, 10);
        assert_eq!(credited.with_balance(0).amount, 0);
    }

    #[test]
    fn test_offer_is_active_and_closed_match_is_not() {
        let seller = offer(2.0, 0, 1000);
        let buyer = offer(0.5, 0, 1000);
        assert!(seller.is_active());

        let closed = Trade::closed(&seller, &buyer, 5, 15, 10);
        assert!(closed.is_closed());
        assert_eq!(closed.buying_business_id, Some(buyer.selling_business_id));
        assert_eq!(closed.sell_commodity_id, seller.sell_commodity_id);
        assert_eq!(closed.price, 3.0);
    }

    #[test]
    fn test_timeout_is_strictly_after_expiry() {
        let trade = offer(1.0, 1_000, 500);
        assert_eq!(trade.expires_at(), 1_500);
        assert!(!trade.is_timed_out(1_499));
        assert!(!trade.is_timed_out(1_500));
        assert!(trade.is_timed_out(1_501));
    }

    #[test]
    fn test_record_kind_dispatch() {
        let station = Station::new("Station 1");
        let record: Record = station.clone().into();
        assert_eq!(record.kind(), RecordKind::Station);
        assert_eq!(record.id_string(), station.id.to_string());
    }
}
