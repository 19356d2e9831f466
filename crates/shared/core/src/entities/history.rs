use serde::{Deserialize, Serialize};
use std::fmt;

use super::Depth;

/// Which side of a snapshot a history row records.
///
/// The string form is what lands in the `transcription_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Asks,
    Bids,
}

impl Leg {
    /// Legs in the order they are persisted
    pub const ALL: [Leg; 2] = [Leg::Asks, Leg::Bids];

    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Asks => "asks",
            Leg::Bids => "bids",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only history entry, one per snapshot leg.
///
/// `factor` is not part of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub type_price: String,
    pub price: String,
    pub volume: String,
    pub amount: String,
    pub time_stamp_order: i64,
    pub transcription_type: Leg,
}

impl HistoryRow {
    pub fn from_depth(depth: &Depth, leg: Leg) -> Self {
        let order = depth.leg(leg);
        Self {
            type_price: order.order_type.clone(),
            price: order.price.clone(),
            volume: order.volume.clone(),
            amount: order.amount.clone(),
            time_stamp_order: depth.timestamp,
            transcription_type: leg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Order;

    #[test]
    fn test_leg_strings() {
        assert_eq!(Leg::Asks.as_str(), "asks");
        assert_eq!(Leg::Bids.to_string(), "bids");
        assert_eq!(Leg::ALL, [Leg::Asks, Leg::Bids]);
    }

    #[test]
    fn test_row_copies_leg_fields_verbatim() {
        let depth = Depth::new(
            Order::new("100.50", "2", "201.0", "0.5", "limit"),
            Order::new("99.10", "3", "297.3", "0.5", "market"),
            1700000000,
        );

        let asks = HistoryRow::from_depth(&depth, Leg::Asks);
        assert_eq!(asks.type_price, "limit");
        assert_eq!(asks.price, "100.50");
        assert_eq!(asks.volume, "2");
        assert_eq!(asks.amount, "201.0");
        assert_eq!(asks.time_stamp_order, 1700000000);
        assert_eq!(asks.transcription_type, Leg::Asks);

        let bids = HistoryRow::from_depth(&depth, Leg::Bids);
        assert_eq!(bids.type_price, "market");
        assert_eq!(bids.time_stamp_order, asks.time_stamp_order);
        assert_eq!(bids.transcription_type, Leg::Bids);
    }
}
