// World construction: batches of new records committed in one write

use std::time::Duration;

use crate::config::SimConfig;
use crate::records::{
    Business, Commodity, DEFAULT_TRADE_LIFETIME, Entity, ProductionUnit, Record, Station, Stock,
};
use crate::registry::Registry;
use crate::types::{Amount, BusinessId, CommodityId, EntityId, ProductionUnitId, StationId, StockId};

/// Collects records for a world and inserts them all at once, so the
/// simulation never sees a business whose stocks are not there yet.
#[derive(Debug, Clone)]
pub struct WorldBuilder {
    records: Vec<Record>,
    trade_lifetime: Duration,
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            trade_lifetime: DEFAULT_TRADE_LIFETIME,
        }
    }

    /// Offer lifetime for stocks added after this call.
    pub fn with_trade_lifetime(mut self, trade_lifetime: Duration) -> Self {
        self.trade_lifetime = trade_lifetime;
        self
    }

    // === Reference data ===

    pub fn add_commodity(&mut self, name: &str, abbreviation: Option<&str>) -> CommodityId {
        let mut commodity = Commodity::new(name);
        if let Some(abbreviation) = abbreviation {
            commodity = commodity.with_abbreviation(abbreviation);
        }
        let id = commodity.id;
        self.records.push(commodity.into());
        id
    }

    pub fn add_station(&mut self, name: &str) -> StationId {
        let station = Station::new(name);
        let id = station.id;
        self.records.push(station.into());
        id
    }

    // === Actors ===

    pub fn add_entity(&mut self, station: StationId) -> EntityId {
        let entity = Entity::new(station);
        let id = entity.id;
        self.records.push(entity.into());
        id
    }

    pub fn add_stock(
        &mut self,
        entity: EntityId,
        station: StationId,
        commodity: CommodityId,
        amount: Amount,
    ) -> StockId {
        let stock = Stock::new(entity, station, commodity)
            .with_amount(amount)
            .with_trade_lifetime(self.trade_lifetime);
        let id = stock.id;
        self.records.push(stock.into());
        id
    }

    pub fn add_production_unit(&mut self, stock: StockId, amount: Amount) -> ProductionUnitId {
        let unit = ProductionUnit::new(stock).with_production_amount(amount);
        let id = unit.id;
        self.records.push(unit.into());
        id
    }

    pub fn add_business(
        &mut self,
        station: StationId,
        entity: EntityId,
        buy_stock: StockId,
        sell_stocks: Vec<StockId>,
    ) -> BusinessId {
        let business = Business::new(station, entity, buy_stock, sell_stocks);
        let id = business.id;
        self.records.push(business.into());
        id
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Insert everything under one write lock. Returns how many records.
    pub fn commit(self, registry: &Registry) -> usize {
        let count = self.records.len();
        registry.insert_all(self.records);
        count
    }
}

// ============================================================================
// Example world - Two producers trading water for credits at one station
// ============================================================================

/// Handles to everything [`setup_example_world`] created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExampleWorld {
    pub station: StationId,
    pub credits: CommodityId,
    pub water: CommodityId,
    /// Produces water and sells it for credits.
    pub water_seller: EntityId,
    pub water_seller_credits: StockId,
    pub water_seller_water: StockId,
    pub water_business: BusinessId,
    /// Produces credits and spends them on water.
    pub water_buyer: EntityId,
    pub water_buyer_credits: StockId,
    pub water_buyer_water: StockId,
    pub credit_business: BusinessId,
}

pub const EXAMPLE_WATER_PER_TICK: Amount = 10;
pub const EXAMPLE_CREDITS_PER_TICK: Amount = 100;
pub const EXAMPLE_STARTING_CREDITS: Amount = 1_000;

pub fn setup_example_world(registry: &Registry, config: &SimConfig) -> ExampleWorld {
    let mut world = WorldBuilder::new().with_trade_lifetime(config.default_trade_lifetime());

    let station = world.add_station("Station 1");
    let credits = world.add_commodity("Credits", Some("Cr"));
    let water = world.add_commodity("Water", None);

    let water_seller = world.add_entity(station);
    let water_seller_credits = world.add_stock(water_seller, station, credits, 0);
    let water_seller_water = world.add_stock(water_seller, station, water, 0);
    world.add_production_unit(water_seller_water, EXAMPLE_WATER_PER_TICK);
    let water_business =
        world.add_business(station, water_seller, water_seller_credits, vec![water_seller_water]);

    let water_buyer = world.add_entity(station);
    let water_buyer_credits =
        world.add_stock(water_buyer, station, credits, EXAMPLE_STARTING_CREDITS);
    world.add_production_unit(water_buyer_credits, EXAMPLE_CREDITS_PER_TICK);
    let water_buyer_water = world.add_stock(water_buyer, station, water, 0);
    let credit_business =
        world.add_business(station, water_buyer, water_buyer_water, vec![water_buyer_credits]);

    let count = world.commit(registry);
    tracing::info!(records = count, "example world initialized");

    ExampleWorld {
        station,
        credits,
        water,
        water_seller,
        water_seller_credits,
        water_seller_water,
        water_business,
        water_buyer,
        water_buyer_credits,
        water_buyer_water,
        credit_business,
    }
}
