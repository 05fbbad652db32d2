//! Shared newtypes and utilities used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize identically
//! to the raw format the backend sends, so they can be used directly in wire types
//! without conversion overhead.

pub mod serde_util;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// ─── StockId ─────────────────────────────────────────────────────────────────

/// Newtype for instrument identifiers (e.g. `"005930"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StockId(String);

impl StockId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for StockId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StockId(s.to_string()))
    }
}

impl Serialize for StockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StockId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Some endpoints send numeric codes; keep them as text.
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(StockId(s)),
            serde_json::Value::Number(n) => Ok(StockId(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected stock id string, got {}",
                other
            ))),
        }
    }
}

// ─── FluctuationSign ─────────────────────────────────────────────────────────

/// Change-direction sign versus the previous close, as coded by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FluctuationSign {
    /// `"1"` — hit the daily upper limit.
    UpperLimit,
    /// `"2"`
    Rise,
    /// `"3"`
    Unchanged,
    /// `"4"` — hit the daily lower limit.
    LowerLimit,
    /// `"5"`
    Fall,
    Unknown,
}

impl FluctuationSign {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UpperLimit => "1",
            Self::Rise => "2",
            Self::Unchanged => "3",
            Self::LowerLimit => "4",
            Self::Fall => "5",
            Self::Unknown => "",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UpperLimit => "upper limit",
            Self::Rise => "rise",
            Self::Unchanged => "unchanged",
            Self::LowerLimit => "lower limit",
            Self::Fall => "fall",
            Self::Unknown => "N/A",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, Self::UpperLimit | Self::Rise)
    }

    pub fn is_down(&self) -> bool {
        matches!(self, Self::LowerLimit | Self::Fall)
    }
}

impl FromStr for FluctuationSign {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "1" => Self::UpperLimit,
            "2" => Self::Rise,
            "3" => Self::Unchanged,
            "4" => Self::LowerLimit,
            "5" => Self::Fall,
            _ => Self::Unknown,
        })
    }
}

impl std::fmt::Display for FluctuationSign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for FluctuationSign {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code())
    }
}
