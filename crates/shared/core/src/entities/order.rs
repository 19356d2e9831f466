use serde::{Deserialize, Serialize};

/// One side of a quote as supplied by the upstream source.
///
/// Decimal values are carried as the exact text the source sent so no
/// precision is lost between the wire, the store and the caller.
/// `order_type` is the source's own label and is not required to be
/// "ask" or "bid".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub price: String,
    pub volume: String,
    pub amount: String,
    pub factor: String,
    #[serde(rename = "type")]
    pub order_type: String,
}

impl Order {
    pub fn new(
        price: impl Into<String>,
        volume: impl Into<String>,
        amount: impl Into<String>,
        factor: impl Into<String>,
        order_type: impl Into<String>,
    ) -> Self {
        Self {
            price: price.into(),
            volume: volume.into(),
            amount: amount.into(),
            factor: factor.into(),
            order_type: order_type.into(),
        }
    }

    /// True when the source sent nothing for any field
    pub fn is_empty(&self) -> bool {
        self.price.is_empty()
            && self.volume.is_empty()
            && self.amount.is_empty()
            && self.factor.is_empty()
            && self.order_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_field_uses_wire_name() {
        let order: Order = serde_json::from_str(
            r#"{"price":"96.5","volume":"10","amount":"965","factor":"0.01","type":"limit"}"#,
        )
        .unwrap();

        assert_eq!(order.order_type, "limit");
        assert_eq!(order.price, "96.5");

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["type"], "limit");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let order: Order = serde_json::from_str(r#"{"price":"1"}"#).unwrap();
        assert_eq!(order.price, "1");
        assert!(order.volume.is_empty());
        assert!(!order.is_empty());
        assert!(Order::default().is_empty());
    }
}
