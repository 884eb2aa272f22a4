// Foreign-key lookups, always resolved against the current tables

use crate::error::{SimError, SimResult};
use crate::records::{Business, Commodity, Stock, Trade};
use crate::registry::Tables;
use crate::types::{CommodityId, RecordKind};

/// The stock a business is paid into.
pub fn buy_stock(tables: &Tables, business: &Business) -> SimResult<Stock> {
    tables.get::<Stock>(business.buy_stock_id)
}

/// The stocks a business offers from, in declaration order.
pub fn sell_stocks(tables: &Tables, business: &Business) -> SimResult<Vec<Stock>> {
    business
        .sell_stock_ids
        .iter()
        .map(|id| tables.get::<Stock>(*id))
        .collect()
}

/// The first sell stock of `business` holding `commodity`.
pub fn sell_stock_for(
    tables: &Tables,
    business: &Business,
    commodity: CommodityId,
) -> SimResult<Stock> {
    sell_stocks(tables, business)?
        .into_iter()
        .find(|stock| stock.commodity_id == commodity)
        .ok_or_else(|| {
            SimError::not_found(
                RecordKind::Stock,
                format!("selling {commodity} for business {}", business.id),
            )
        })
}

pub fn stock_commodity(tables: &Tables, stock: &Stock) -> SimResult<Commodity> {
    tables.get::<Commodity>(stock.commodity_id)
}

pub fn selling_business(tables: &Tables, trade: &Trade) -> SimResult<Business> {
    tables.get::<Business>(trade.selling_business_id)
}

/// `None` while the trade is still active.
pub fn buying_business(tables: &Tables, trade: &Trade) -> SimResult<Option<Business>> {
    trade
        .buying_business_id
        .map(|id| tables.get::<Business>(id))
        .transpose()
}

pub fn sell_commodity(tables: &Tables, trade: &Trade) -> SimResult<Commodity> {
    tables.get::<Commodity>(trade.sell_commodity_id)
}

pub fn buy_commodity(tables: &Tables, trade: &Trade) -> SimResult<Commodity> {
    tables.get::<Commodity>(trade.buy_commodity_id)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::records::{Entity, Record, Station};

    #[test]
    fn test_business_stock_lookups() {
        let mut tables = Tables::new();
        let station = Station::new("Station 1");
        let water = Commodity::new("Water");
        let credits = Commodity::new("Credits").with_abbreviation("Cr");
        let entity = Entity::new(station.id);
        let credit_stock = Stock::new(entity.id, station.id, credits.id);
        let water_stock = Stock::new(entity.id, station.id, water.id).with_amount(3);
        let business = Business::new(
            station.id,
            entity.id,
            credit_stock.id,
            vec![water_stock.id],
        );
        let records: [Record; 7] = [
            station.into(),
            water.clone().into(),
            credits.clone().into(),
            entity.into(),
            credit_stock.clone().into(),
            water_stock.clone().into(),
            business.clone().into(),
        ];
        for record in records {
            tables.insert(record);
        }

        assert_eq!(buy_stock(&tables, &business).unwrap(), credit_stock);
        assert_eq!(sell_stocks(&tables, &business).unwrap(), vec![water_stock.clone()]);
        assert_eq!(
            sell_stock_for(&tables, &business, water.id).unwrap(),
            water_stock
        );
        assert!(sell_stock_for(&tables, &business, credits.id).is_err());
        assert_eq!(stock_commodity(&tables, &water_stock).unwrap(), water);

        let offer = Trade::offer(
            business.id,
            business.station_id,
            water.id,
            credits.id,
            3,
            1.0,
            0,
            Duration::from_secs(1),
        );
        assert_eq!(selling_business(&tables, &offer).unwrap(), business);
        assert_eq!(buying_business(&tables, &offer).unwrap(), None);
        assert_eq!(sell_commodity(&tables, &offer).unwrap().name, "Water");
        assert_eq!(buy_commodity(&tables, &offer).unwrap().abbreviation, "Cr");
    }

    #[test]
    fn test_broken_reference_is_not_found() {
        let tables = Tables::new();
        let business = Business::new(
            crate::types::StationId::new(),
            crate::types::EntityId::new(),
            crate::types::StockId::new(),
            vec![],
        );
        assert!(matches!(
            buy_stock(&tables, &business),
            Err(SimError::NotFound {
                kind: RecordKind::Stock,
                ..
            })
        ));
    }
}
