//! In-memory record store shared by the simulation thread and its callers.
//!
//! [`Tables`] holds one map per record kind and is the lock-free core every
//! tick step works against. [`Registry`] wraps it in a `parking_lot::RwLock`:
//! single-record calls take the lock once, and [`Registry::transaction`] runs a
//! closure under the write lock so multi-record work stays atomic.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};
use uuid::Uuid;

use crate::error::{SimError, SimResult};
use crate::predicate::{Predicate, is_active, matches_all};
use crate::records::{Business, Commodity, Entity, ProductionUnit, Record, Station, Stock, Trade};
use crate::types::{
    BusinessId, CommodityId, EntityId, ProductionUnitId, RecordKind, StationId, StockId, TradeId,
};

// ============================================================================
// Table - One kind's records, iterated in a deterministic order
// ============================================================================

new_key_type! {
    /// Position of a record inside its [`Table`].
    pub struct Slot;
}

/// Records of one kind. Lookups go through the id index; iteration walks
/// the slot map, so two runs that perform the same inserts and removals
/// list records in the same order whatever their ids are.
#[derive(Debug, Clone)]
pub struct Table<T: Stored> {
    slots: SlotMap<Slot, T>,
    index: HashMap<T::Id, Slot>,
}

impl<T: Stored> Default for Table<T> {
    fn default() -> Self {
        Self {
            slots: SlotMap::with_key(),
            index: HashMap::new(),
        }
    }
}

impl<T: Stored> Table<T> {
    /// Replace in place when the id is known, so the record keeps its slot.
    fn put(&mut self, record: T) {
        let id = record.id();
        if let Some(current) = self.index.get(&id).and_then(|slot| self.slots.get_mut(*slot)) {
            *current = record;
            return;
        }
        let slot = self.slots.insert(record);
        self.index.insert(id, slot);
    }

    fn remove(&mut self, id: T::Id) -> Option<T> {
        let slot = self.index.remove(&id)?;
        self.slots.remove(slot)
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.index.get(&id).and_then(|slot| self.slots.get(*slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.values()
    }
}

// ============================================================================
// Stored - Typed access to one table
// ============================================================================

/// A record kind with its own table in [`Tables`].
pub trait Stored: Clone + fmt::Debug + Into<Record> + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    const KIND: RecordKind;

    fn id(&self) -> Self::Id;
    fn table(tables: &Tables) -> &Table<Self>;
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;
}

macro_rules! stored {
    ($record:ident, $id:ident, $field:ident) => {
        impl Stored for $record {
            type Id = $id;
            const KIND: RecordKind = RecordKind::$record;

            fn id(&self) -> $id {
                self.id
            }

            fn table(tables: &Tables) -> &Table<Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
                &mut tables.$field
            }
        }
    };
}

stored!(Commodity, CommodityId, commodities);
stored!(Station, StationId, stations);
stored!(Entity, EntityId, entities);
stored!(Stock, StockId, stocks);
stored!(ProductionUnit, ProductionUnitId, production_units);
stored!(Business, BusinessId, businesses);
stored!(Trade, TradeId, trades);

// ============================================================================
// Tables - Unsynchronized store
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Tables {
    commodities: Table<Commodity>,
    stations: Table<Station>,
    entities: Table<Entity>,
    stocks: Table<Stock>,
    production_units: Table<ProductionUnit>,
    businesses: Table<Business>,
    trades: Table<Trade>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record already stored under its id.
    pub fn insert(&mut self, record: impl Into<Record>) {
        match record.into() {
            Record::Commodity(r) => self.put(r),
            Record::Station(r) => self.put(r),
            Record::Entity(r) => self.put(r),
            Record::Stock(r) => self.put(r),
            Record::ProductionUnit(r) => self.put(r),
            Record::Business(r) => self.put(r),
            Record::Trade(r) => self.put(r),
        }
    }

    fn put<T: Stored>(&mut self, record: T) {
        T::table_mut(self).put(record);
    }

    /// Remove a record by typed id, returning it if it was present.
    pub fn remove<T: Stored>(&mut self, id: T::Id) -> Option<T> {
        T::table_mut(self).remove(id)
    }

    /// Remove a record by kind and raw id.
    pub fn delete_by_id(&mut self, kind: RecordKind, id: Uuid) -> Option<Record> {
        match kind {
            RecordKind::Commodity => self.remove::<Commodity>(id.into()).map(Record::from),
            RecordKind::Station => self.remove::<Station>(id.into()).map(Record::from),
            RecordKind::Entity => self.remove::<Entity>(id.into()).map(Record::from),
            RecordKind::Stock => self.remove::<Stock>(id.into()).map(Record::from),
            RecordKind::ProductionUnit => {
                self.remove::<ProductionUnit>(id.into()).map(Record::from)
            }
            RecordKind::Business => self.remove::<Business>(id.into()).map(Record::from),
            RecordKind::Trade => self.remove::<Trade>(id.into()).map(Record::from),
        }
    }

    pub fn find<T: Stored>(&self, id: T::Id) -> Option<&T> {
        T::table(self).get(id)
    }

    /// Current value for `id`, or [`SimError::NotFound`].
    pub fn get<T: Stored>(&self, id: T::Id) -> SimResult<T> {
        self.find::<T>(id)
            .cloned()
            .ok_or_else(|| SimError::not_found(T::KIND, id))
    }

    pub fn contains<T: Stored>(&self, id: T::Id) -> bool {
        T::table(self).get(id).is_some()
    }

    /// Snapshot of every record of kind `T` passing all predicates, in
    /// table order.
    pub fn list<T: Stored>(&self, predicates: &[&dyn Predicate<T>]) -> Vec<T> {
        T::table(self)
            .values()
            .filter(|record| matches_all(*record, predicates))
            .cloned()
            .collect()
    }

    pub fn count<T: Stored>(&self) -> usize {
        T::table(self).len()
    }
}

// ============================================================================
// Registry - Shared, lock-protected store
// ============================================================================

#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access. Nothing else observes the tables
    /// until `f` returns.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.write();
        f(&mut tables)
    }

    /// Run `f` against a consistent read view.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let tables = self.tables.read();
        f(&tables)
    }

    pub fn insert(&self, record: impl Into<Record>) {
        self.tables.write().insert(record);
    }

    /// Insert a batch under one write lock, so no reader sees half of it.
    pub fn insert_all(&self, records: impl IntoIterator<Item = Record>) {
        let mut tables = self.tables.write();
        for record in records {
            tables.insert(record);
        }
    }

    pub fn remove<T: Stored>(&self, id: T::Id) -> Option<T> {
        self.tables.write().remove::<T>(id)
    }

    pub fn delete_by_id(&self, kind: RecordKind, id: Uuid) -> Option<Record> {
        self.tables.write().delete_by_id(kind, id)
    }

    pub fn get<T: Stored>(&self, id: T::Id) -> SimResult<T> {
        self.tables.read().get::<T>(id)
    }

    pub fn list<T: Stored>(&self, predicates: &[&dyn Predicate<T>]) -> Vec<T> {
        self.tables.read().list::<T>(predicates)
    }

    // === Query entry points ===

    pub fn commodities(&self, predicates: &[&dyn Predicate<Commodity>]) -> Vec<Commodity> {
        self.list(predicates)
    }

    pub fn stations(&self, predicates: &[&dyn Predicate<Station>]) -> Vec<Station> {
        self.list(predicates)
    }

    pub fn entities(&self, predicates: &[&dyn Predicate<Entity>]) -> Vec<Entity> {
        self.list(predicates)
    }

    pub fn stocks(&self, predicates: &[&dyn Predicate<Stock>]) -> Vec<Stock> {
        self.list(predicates)
    }

    pub fn production_units(
        &self,
        predicates: &[&dyn Predicate<ProductionUnit>],
    ) -> Vec<ProductionUnit> {
        self.list(predicates)
    }

    pub fn businesses(&self, predicates: &[&dyn Predicate<Business>]) -> Vec<Business> {
        self.list(predicates)
    }

    /// Active trades only; extra predicates narrow the result further.
    pub fn active_trades(&self, predicates: &[&dyn Predicate<Trade>]) -> Vec<Trade> {
        self.read(|tables| {
            tables
                .list::<Trade>(&[&is_active()])
                .into_iter()
                .filter(|trade| matches_all(trade, predicates))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::predicate::{at_station, with_id};

    #[test]
    fn test_insert_replaces_by_id() {
        let registry = Registry::new();
        let station = StationId::new();
        let stock = Stock::new(EntityId::new(), station, CommodityId::new());
        registry.insert(stock.clone());
        registry.insert(stock.credited(7));

        let stored: Stock = registry.get(stock.id).unwrap();
        assert_eq!(stored.amount, 7);
        assert_eq!(registry.stocks(&[]).len(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let registry = Registry::new();
        let id = StockId::new();
        let err = registry.get::<Stock>(id).unwrap_err();
        assert_eq!(err, SimError::not_found(RecordKind::Stock, id));
    }

    #[test]
    fn test_delete_by_kind_and_id() {
        let registry = Registry::new();
        let station = Station::new("Outpost");
        registry.insert(station.clone());

        let wrong_kind = registry.delete_by_id(RecordKind::Commodity, station.id.as_uuid());
        assert!(wrong_kind.is_none());

        let removed = registry.delete_by_id(RecordKind::Station, station.id.as_uuid());
        assert_eq!(removed, Some(Record::Station(station.clone())));
        assert!(registry.get::<Station>(station.id).is_err());
        assert!(registry.remove::<Station>(station.id).is_none());
    }

    #[test]
    fn test_list_applies_predicates_in_order() {
        let registry = Registry::new();
        let here = StationId::new();
        let there = StationId::new();
        let entities: Vec<Entity> = (0..3).map(|_| Entity::new(here)).collect();
        registry.insert_all(entities.iter().cloned().map(Record::from));
        registry.insert(Entity::new(there));

        assert_eq!(registry.entities(&[]).len(), 4);
        assert_eq!(registry.entities(&[&at_station::<Entity>(here)]).len(), 3);

        let first = entities[0].id;
        let narrowed = registry.entities(&[&at_station::<Entity>(here), &with_id::<Entity>(first)]);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].id, first);

        // A later predicate cannot bring back what an earlier one dropped.
        let none = registry.entities(&[&at_station::<Entity>(there), &with_id::<Entity>(first)]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_listing_order_ignores_ids() {
        let registry = Registry::new();
        let stations: Vec<Station> = (0..20).map(|i| Station::new(format!("S{i}"))).collect();
        registry.insert_all(stations.iter().cloned().map(Record::from));

        let names = |registry: &Registry| -> Vec<String> {
            registry.stations(&[]).into_iter().map(|s| s.name).collect()
        };
        let inserted: Vec<String> = stations.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names(&registry), inserted);

        // Replacing a record keeps its position.
        let mut renamed = stations[3].clone();
        renamed.name = "S3 renamed".into();
        registry.insert(renamed);
        assert_eq!(names(&registry)[3], "S3 renamed");
        assert_eq!(registry.stations(&[]).len(), 20);
    }

    #[test]
    fn test_active_trades_excludes_closed() {
        let registry = Registry::new();
        let seller = Trade::offer(
            BusinessId::new(),
            StationId::new(),
            CommodityId::new(),
            CommodityId::new(),
            5,
            2.0,
            0,
            std::time::Duration::from_secs(1),
        );
        let buyer = seller.clone();
        let closed = Trade::closed(&seller, &buyer, 5, 10, 0);
        registry.insert(seller.clone());
        registry.insert(closed);

        let active = registry.active_trades(&[]);
        assert_eq!(active, vec![seller]);
    }

    #[test]
    fn test_transaction_is_atomic_to_readers() {
        let registry = Arc::new(Registry::new());
        let stock = Stock::new(EntityId::new(), StationId::new(), CommodityId::new());
        let other = Stock::new(EntityId::new(), StationId::new(), CommodityId::new());
        registry.insert_all([Record::from(stock.clone()), Record::from(other.clone())]);

        let writer = {
            let registry = Arc::clone(&registry);
            let (a, b) = (stock.id, other.id);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    registry.transaction(|tables| {
                        let a_stock = tables.get::<Stock>(a).unwrap();
                        let b_stock = tables.get::<Stock>(b).unwrap();
                        tables.insert(a_stock.credited(1));
                        tables.insert(b_stock.credited(1));
                    });
                }
            })
        };

        for _ in 0..1_000 {
            let (a, b) = registry.read(|tables| {
                (
                    tables.get::<Stock>(stock.id).unwrap().amount,
                    tables.get::<Stock>(other.id).unwrap().amount,
                )
            });
            assert_eq!(a, b, "reader observed a half-applied transaction");
        }
        writer.join().unwrap();
        assert_eq!(registry.get::<Stock>(stock.id).unwrap().amount, 1_000);
    }
}
