use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// IDs - Opaque, globally unique across every record kind
// ============================================================================

macro_rules! record_ids {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub Uuid);

            impl $name {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                pub fn as_uuid(&self) -> Uuid {
                    self.0
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl From<Uuid> for $name {
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }
        )*
    };
}

record_ids!(
    CommodityId,
    StationId,
    EntityId,
    StockId,
    ProductionUnitId,
    BusinessId,
    TradeId,
);

// ============================================================================
// Quantities
// ============================================================================

/// Whole units of a commodity.
pub type Amount = u64;

/// Units of the buy commodity per unit of the sell commodity.
pub type Price = f64;

/// Milliseconds since the unix epoch (or since a manual clock's origin).
pub type Millis = u64;

// ============================================================================
// Record Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Commodity,
    Station,
    Entity,
    Stock,
    ProductionUnit,
    Business,
    Trade,
}

impl RecordKind {
    pub fn all() -> impl Iterator<Item = RecordKind> {
        [
            RecordKind::Commodity,
            RecordKind::Station,
            RecordKind::Entity,
            RecordKind::Stock,
            RecordKind::ProductionUnit,
            RecordKind::Business,
            RecordKind::Trade,
        ]
        .into_iter()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Commodity => "commodity",
            RecordKind::Station => "station",
            RecordKind::Entity => "entity",
            RecordKind::Stock => "stock",
            RecordKind::ProductionUnit => "production unit",
            RecordKind::Business => "business",
            RecordKind::Trade => "trade",
        };
        f.write_str(name)
    }
}
