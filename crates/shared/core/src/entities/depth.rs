use serde::{Deserialize, Deserializer, Serialize};

use super::{Leg, Order};

/// Top-of-book snapshot: the best ask, the best bid and the source timestamp.
///
/// A snapshot is either fully populated (both orders present and a non-zero
/// timestamp) or the empty sentinel returned by [`Depth::empty`]. The
/// timestamp is opaque and kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depth {
    pub timestamp: i64,
    pub asks: Order,
    pub bids: Order,
}

impl Depth {
    /// Build a populated snapshot. Returns the empty sentinel instead when
    /// any part is missing, so a partial snapshot cannot be constructed here.
    pub fn new(asks: Order, bids: Order, timestamp: i64) -> Self {
        let depth = Self {
            timestamp,
            asks,
            bids,
        };
        if depth.is_complete() {
            depth
        } else {
            Self::empty()
        }
    }

    /// The "nothing to report" sentinel
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.timestamp != 0 && !self.asks.is_empty() && !self.bids.is_empty()
    }

    /// The order carried by the given leg
    pub fn leg(&self, leg: Leg) -> &Order {
        match leg {
            Leg::Asks => &self.asks,
            Leg::Bids => &self.bids,
        }
    }
}

/// Wire shape of the upstream depth endpoint.
///
/// The source may send several price levels per side; only the first of
/// each survives normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DepthEnvelope {
    pub timestamp: i64,
    #[serde(deserialize_with = "null_as_empty")]
    pub asks: Vec<Order>,
    #[serde(deserialize_with = "null_as_empty")]
    pub bids: Vec<Order>,
}

impl DepthEnvelope {
    /// Project the top level of each side into a snapshot.
    pub fn into_depth(self) -> Depth {
        if self.timestamp == 0 {
            return Depth::empty();
        }

        match (self.asks.into_iter().next(), self.bids.into_iter().next()) {
            (Some(asks), Some(bids)) => Depth::new(asks, bids, self.timestamp),
            _ => Depth::empty(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Order>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Order>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask() -> Order {
        Order::new("100", "1", "100", "2", "ask")
    }

    fn bid() -> Order {
        Order::new("90", "1", "90", "2", "bid")
    }

    #[test]
    fn test_new_keeps_complete_snapshot() {
        let depth = Depth::new(ask(), bid(), 1234567890);
        assert!(depth.is_complete());
        assert!(!depth.is_empty());
        assert_eq!(depth.leg(Leg::Asks).price, "100");
        assert_eq!(depth.leg(Leg::Bids).price, "90");
    }

    #[test]
    fn test_new_collapses_partial_snapshot() {
        assert!(Depth::new(ask(), Order::default(), 1).is_empty());
        assert!(Depth::new(Order::default(), bid(), 1).is_empty());
        assert!(Depth::new(ask(), bid(), 0).is_empty());
    }

    #[test]
    fn test_envelope_takes_first_level_of_each_side() {
        let envelope = DepthEnvelope {
            timestamp: 42,
            asks: vec![ask(), Order::new("101", "5", "505", "2", "ask")],
            bids: vec![bid(), Order::new("89", "5", "445", "2", "bid")],
        };

        let depth = envelope.into_depth();
        assert_eq!(depth.asks, ask());
        assert_eq!(depth.bids, bid());
        assert_eq!(depth.timestamp, 42);
    }

    #[test]
    fn test_envelope_null_sides_decode_as_empty() {
        let envelope: DepthEnvelope =
            serde_json::from_str(r#"{"timestamp":5,"asks":null,"bids":null}"#).unwrap();
        assert!(envelope.asks.is_empty());
        assert!(envelope.bids.is_empty());
        assert!(envelope.into_depth().is_empty());
    }
}
