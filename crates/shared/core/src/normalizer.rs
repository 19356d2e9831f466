//! Snapshot normalizer
//!
//! Turns the raw body of the upstream depth endpoint into a [`Depth`].
//! Only undecodable payloads fail; an empty side or a zero timestamp yields
//! the empty sentinel.

use crate::entities::{Depth, DepthEnvelope};
use crate::error::ParseError;

pub fn normalize(raw: &[u8]) -> Result<Depth, ParseError> {
    let envelope: DepthEnvelope = serde_json::from_slice(raw)?;
    Ok(envelope.into_depth())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Order;

    const SAMPLE: &str = r#"{"timestamp":1234567890,"asks":[{"price":"100","volume":"1","amount":"100","factor":"2","type":"ask"}],"bids":[{"price":"90","volume":"1","amount":"90","factor":"2","type":"bid"}]}"#;

    #[test]
    fn test_sample_payload() {
        let depth = normalize(SAMPLE.as_bytes()).unwrap();

        assert_eq!(depth.timestamp, 1234567890);
        assert_eq!(depth.asks, Order::new("100", "1", "100", "2", "ask"));
        assert_eq!(depth.bids, Order::new("90", "1", "90", "2", "bid"));
    }

    #[test]
    fn test_first_level_is_kept_verbatim() {
        let raw = r#"{
            "timestamp": 1727000000,
            "asks": [
                {"price":"96.51","volume":"1520.00","amount":"146694.2","factor":"0.012","type":"limit"},
                {"price":"96.60","volume":"10.0","amount":"966.0","factor":"0.013","type":"limit"}
            ],
            "bids": [
                {"price":"96.20","volume":"300.000","amount":"28860","factor":"-0.01","type":"factor"},
                {"price":"96.00","volume":"1","amount":"96","factor":"-0.02","type":"factor"}
            ]
        }"#;

        let depth = normalize(raw.as_bytes()).unwrap();

        assert_eq!(depth.asks.price, "96.51");
        assert_eq!(depth.asks.volume, "1520.00");
        assert_eq!(depth.asks.factor, "0.012");
        assert_eq!(depth.bids.price, "96.20");
        assert_eq!(depth.bids.volume, "300.000");
        assert_eq!(depth.bids.order_type, "factor");
    }

    #[test]
    fn test_empty_asks_yields_sentinel() {
        let raw = r#"{"timestamp":1,"asks":[],"bids":[{"price":"90","type":"bid"}]}"#;
        let depth = normalize(raw.as_bytes()).unwrap();
        assert!(depth.is_empty());
    }

    #[test]
    fn test_empty_bids_yields_sentinel() {
        let raw = r#"{"timestamp":1,"asks":[{"price":"100","type":"ask"}],"bids":[]}"#;
        let depth = normalize(raw.as_bytes()).unwrap();
        assert!(depth.is_empty());
    }

    #[test]
    fn test_zero_timestamp_yields_sentinel() {
        let raw = r#"{"timestamp":0,"asks":[{"price":"100"}],"bids":[{"price":"90"}]}"#;
        let depth = normalize(raw.as_bytes()).unwrap();
        assert!(depth.is_empty());
    }

    #[test]
    fn test_missing_fields_yield_sentinel() {
        let depth = normalize(b"{}").unwrap();
        assert_eq!(depth, Depth::empty());
    }

    #[test]
    fn test_blank_first_level_yields_sentinel() {
        let raw = r#"{"timestamp":7,"asks":[{}],"bids":[{"price":"90"}]}"#;
        let depth = normalize(raw.as_bytes()).unwrap();
        assert!(depth.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let raw = r#"{"timestamp":3,"market":"usdtrub","asks":[{"price":"1","extra":true}],"bids":[{"price":"2"}]}"#;
        let depth = normalize(raw.as_bytes()).unwrap();
        assert_eq!(depth.asks.price, "1");
        assert_eq!(depth.bids.price, "2");
    }

    #[test]
    fn test_undecodable_payload_is_an_error() {
        assert!(normalize(b"<html>502 Bad Gateway</html>").is_err());
        assert!(normalize(b"").is_err());
        assert!(normalize(br#"{"timestamp":"soon"}"#).is_err());
        assert!(normalize(br#"{"timestamp":1,"asks":[{"price":96.5}],"bids":[]}"#).is_err());
    }
}
