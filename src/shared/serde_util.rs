//! Custom serde helpers for backend wire formats.

/// Deserializes an optional scalar that the backend may send either as a
/// JSON string or as a JSON number.
///
/// The live feed forwards upstream text fields verbatim (`"71000"`), while
/// cached snapshots and baseline payloads may carry real numbers. `null`,
/// a missing field, and a blank string all decode as `None`.
///
/// Use with `#[serde(default, deserialize_with = "lenient::deserialize")]`.
pub mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed.parse::<T>().map(Some).map_err(D::Error::custom)
            }
            Some(Value::Number(n)) => {
                n.to_string().parse::<T>().map(Some).map_err(D::Error::custom)
            }
            Some(other) => Err(D::Error::custom(format!(
                "expected string or number, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::lenient;
    use rust_decimal::Decimal;
    use serde::Deserialize;
    use std::str::FromStr;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient::deserialize")]
        price: Option<Decimal>,
        #[serde(default, deserialize_with = "lenient::deserialize")]
        volume: Option<u64>,
    }

    #[test]
    fn test_lenient_accepts_strings_and_numbers() {
        let p: Sample = serde_json::from_str(r#"{"price":"71000.5","volume":120}"#).unwrap();
        assert_eq!(p.price, Some(Decimal::from_str("71000.5").unwrap()));
        assert_eq!(p.volume, Some(120));

        let p: Sample = serde_json::from_str(r#"{"price":-1.25,"volume":"7"}"#).unwrap();
        assert_eq!(p.price, Some(Decimal::from_str("-1.25").unwrap()));
        assert_eq!(p.volume, Some(7));
    }

    #[test]
    fn test_lenient_blank_and_null_are_absent() {
        let p: Sample = serde_json::from_str(r#"{"price":"  ","volume":null}"#).unwrap();
        assert!(p.price.is_none());
        assert!(p.volume.is_none());

        let p: Sample = serde_json::from_str("{}").unwrap();
        assert!(p.price.is_none());
    }

    #[test]
    fn test_lenient_rejects_garbage() {
        assert!(serde_json::from_str::<Sample>(r#"{"volume":"many"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"price":[1]}"#).is_err());
    }
}
