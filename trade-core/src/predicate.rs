// Composable record filters for registry listings

use crate::records::{Business, Entity, Stock, Trade};
use crate::registry::Stored;
use crate::types::{CommodityId, Millis, StationId};

/// A filter over records of one kind. Listings apply predicates as a
/// logical AND, in the order given.
pub trait Predicate<T>: Send + Sync {
    fn test(&self, record: &T) -> bool;
}

impl<T, F> Predicate<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn test(&self, record: &T) -> bool {
        self(record)
    }
}

/// Apply every predicate in order; later predicates only see what earlier ones kept.
pub fn matches_all<T>(record: &T, predicates: &[&dyn Predicate<T>]) -> bool {
    predicates.iter().all(|p| p.test(record))
}

/// Records that live at a station.
pub trait Located {
    fn station_id(&self) -> StationId;
}

impl Located for Entity {
    fn station_id(&self) -> StationId {
        self.station_id
    }
}

impl Located for Business {
    fn station_id(&self) -> StationId {
        self.station_id
    }
}

impl Located for Stock {
    fn station_id(&self) -> StationId {
        self.station_id
    }
}

impl Located for Trade {
    fn station_id(&self) -> StationId {
        self.station_id
    }
}

// === CONSTRUCTORS ===

pub fn with_id<T: Stored>(id: T::Id) -> impl Predicate<T> {
    move |record: &T| record.id() == id
}

pub fn at_station<T: Located>(station: StationId) -> impl Predicate<T> {
    move |record: &T| record.station_id() == station
}

pub fn is_active() -> impl Predicate<Trade> {
    |trade: &Trade| trade.is_active()
}

pub fn is_timed_out(now: Millis) -> impl Predicate<Trade> {
    move |trade: &Trade| trade.is_timed_out(now)
}

pub fn is_selling(commodity: CommodityId) -> impl Predicate<Trade> {
    move |trade: &Trade| trade.sell_commodity_id == commodity
}

pub fn is_buying(commodity: CommodityId) -> impl Predicate<Trade> {
    move |trade: &Trade| trade.buy_commodity_id == commodity
}
