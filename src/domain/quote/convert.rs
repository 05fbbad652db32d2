//! Conversions from cache wire payloads to quote records.

use super::wire::CachedQuotesResponse;
use super::QuoteRecord;
use serde_json::Value;

/// Decode the fallback cache payload into records, preserving order.
///
/// Entries that fail to decode are skipped with a warning, so one corrupt
/// snapshot does not hide the rest. An empty result means "no data".
pub fn decode_cached(raw: CachedQuotesResponse) -> Vec<QuoteRecord> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let decoded = match entry {
                Value::String(text) => serde_json::from_str::<QuoteRecord>(&text),
                other => serde_json::from_value::<QuoteRecord>(other),
            };
            match decoded {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(index, "Skipping undecodable cached quote: {}", e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_decode_string_encoded_entries_in_order() {
        let raw = vec![
            json!(r#"{"stockId":"B","currentPrice":"200","acmlvol":"10"}"#),
            json!(r#"{"stockId":"B","currentPrice":"199"}"#),
        ];
        let records = decode_cached(raw);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].current_price, Some(Decimal::from(200)));
        assert_eq!(records[0].accumulated_volume, Some(10));
        assert_eq!(records[1].current_price, Some(Decimal::from(199)));
    }

    #[test]
    fn test_decode_accepts_object_entries() {
        let raw = vec![json!({ "currentPrice": 200, "volume": 10 })];
        let records = decode_cached(raw);
        assert_eq!(records[0].current_price, Some(Decimal::from(200)));
    }

    #[test]
    fn test_decode_skips_corrupt_entries() {
        let raw = vec![json!("{broken"), json!(r#"{"currentPrice":"5"}"#), json!(42)];
        let records = decode_cached(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].current_price, Some(Decimal::from(5)));
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(decode_cached(Vec::new()).is_empty());
    }
}
