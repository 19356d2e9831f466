use rates_core::{Depth, Order};
use serde::{Deserialize, Serialize};

/// GetRates takes no parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesRequest {}

/// Wire form of one order, field for field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMessage {
    pub price: String,
    pub volume: String,
    pub amount: String,
    pub factor: String,
    #[serde(rename = "type")]
    pub order_type: String,
}

impl From<&Order> for OrderMessage {
    fn from(order: &Order) -> Self {
        OrderMessage {
            price: order.price.clone(),
            volume: order.volume.clone(),
            amount: order.amount.clone(),
            factor: order.factor.clone(),
            order_type: order.order_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesResponse {
    pub ask: OrderMessage,
    pub bid: OrderMessage,
    pub timestamp: i64,
}

impl From<&Depth> for RatesResponse {
    fn from(depth: &Depth) -> Self {
        RatesResponse {
            ask: OrderMessage::from(&depth.asks),
            bid: OrderMessage::from(&depth.bids),
            timestamp: depth.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_wire_shape() {
        let depth = Depth::new(
            Order::new("100.50", "2", "201.0", "1", "limit"),
            Order::new("99.50", "3", "298.5", "1", "limit"),
            1700000000,
        );

        let json = serde_json::to_value(RatesResponse::from(&depth)).unwrap();

        assert_eq!(json["timestamp"], 1700000000);
        assert_eq!(json["ask"]["price"], "100.50");
        assert_eq!(json["ask"]["type"], "limit");
        assert_eq!(json["bid"]["amount"], "298.5");
    }

    #[test]
    fn test_sentinel_maps_to_empty_messages() {
        let response = RatesResponse::from(&Depth::empty());

        assert_eq!(response.timestamp, 0);
        assert!(response.ask.price.is_empty());
        assert!(response.bid.order_type.is_empty());
    }

    #[test]
    fn test_request_ignores_unknown_fields() {
        let request: RatesRequest = serde_json::from_str(r#"{"market":"usdtrub"}"#).unwrap();
        assert_eq!(request, RatesRequest::default());
    }
}
