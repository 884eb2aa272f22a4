use crate::error::{SimError, SimResult};
use crate::records::{Stock, Trade};
use crate::registry::Tables;
use crate::relations::{buy_stock, buying_business, selling_business};
use crate::types::{Amount, StockId};

/// Credit both parties of a closed trade.
///
/// Each side is paid into its own business's buy stock: the buyer receives
/// `sell_amount` units of the traded commodity, the seller receives
/// `buy_amount` units of payment. Runs against the caller's tables so it
/// commits together with whatever trade bookkeeping surrounds it.
pub fn settle(tables: &mut Tables, trade: &Trade) -> SimResult<()> {
    let Some(buyer) = buying_business(tables, trade)? else {
        return Err(SimError::InvalidStateTransition(format!(
            "settling trade {} which has no buyer",
            trade.id
        )));
    };
    let seller = selling_business(tables, trade)?;

    // Resolve both stocks before touching either, so a broken reference
    // leaves the tables unchanged.
    let buyer_stock = buy_stock(tables, &buyer)?.id;
    let seller_stock = buy_stock(tables, &seller)?.id;

    credit(tables, buyer_stock, trade.sell_amount)?;
    credit(tables, seller_stock, trade.buy_amount)?;

    Ok(())
}

fn credit(tables: &mut Tables, stock: StockId, amount: Amount) -> SimResult<()> {
    let stock = tables.get::<Stock>(stock)?.credited(amount);
    tables.insert(stock);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::records::{Business, Record};
    use crate::types::{CommodityId, EntityId, RecordKind, StationId};

    struct Party {
        business: Business,
        buy_stock: Stock,
    }

    fn party(tables: &mut Tables, station: StationId, pays_into: CommodityId) -> Party {
        let entity = EntityId::new();
        let buy_stock = Stock::new(entity, station, pays_into).with_amount(100);
        let business = Business::new(station, entity, buy_stock.id, vec![]);
        let records: [Record; 2] = [buy_stock.clone().into(), business.clone().into()];
        for record in records {
            tables.insert(record);
        }
        Party {
            business,
            buy_stock,
        }
    }

    fn offer(party: &Party, sell: CommodityId, buy: CommodityId) -> Trade {
        Trade::offer(
            party.business.id,
            party.business.station_id,
            sell,
            buy,
            10,
            1.0,
            0,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_settlement_credits_both_buy_stocks() {
        let mut tables = Tables::new();
        let station = StationId::new();
        let water = CommodityId::new();
        let credits = CommodityId::new();
        let seller = party(&mut tables, station, credits);
        let buyer = party(&mut tables, station, water);

        let closed = Trade::closed(
            &offer(&seller, water, credits),
            &offer(&buyer, credits, water),
            4,
            9,
            0,
        );
        settle(&mut tables, &closed).unwrap();

        assert_eq!(tables.get::<Stock>(buyer.buy_stock.id).unwrap().amount, 104);
        assert_eq!(tables.get::<Stock>(seller.buy_stock.id).unwrap().amount, 109);
    }

    #[test]
    fn test_settling_active_trade_is_rejected() {
        let mut tables = Tables::new();
        let station = StationId::new();
        let water = CommodityId::new();
        let credits = CommodityId::new();
        let seller = party(&mut tables, station, credits);
        let active = offer(&seller, water, credits);

        let err = settle(&mut tables, &active).unwrap_err();
        assert!(matches!(err, SimError::InvalidStateTransition(_)));
        assert_eq!(tables.get::<Stock>(seller.buy_stock.id).unwrap().amount, 100);
    }

    #[test]
    fn test_settlement_with_missing_buyer_business_is_not_found() {
        let mut tables = Tables::new();
        let station = StationId::new();
        let water = CommodityId::new();
        let credits = CommodityId::new();
        let seller = party(&mut tables, station, credits);
        let ghost = Party {
            business: Business::new(station, EntityId::new(), StockId::new(), vec![]),
            buy_stock: Stock::new(EntityId::new(), station, water),
        };

        let closed = Trade::closed(
            &offer(&seller, water, credits),
            &offer(&ghost, credits, water),
            1,
            1,
            0,
        );
        let err = settle(&mut tables, &closed).unwrap_err();
        assert!(matches!(
            err,
            SimError::NotFound {
                kind: RecordKind::Business,
                ..
            }
        ));
    }
}
