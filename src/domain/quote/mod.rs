//! Quote domain — partial quote records, the keyed store, and the live tape.

#[cfg(feature = "http")]
pub mod client;
mod convert;
pub mod state;
pub mod tape;
pub mod wire;

use crate::shared::serde_util::lenient;
use crate::shared::{FluctuationSign, StockId};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use convert::decode_cached;
pub use state::QuoteStore;
pub use tape::{QuoteTape, TAPE_CAPACITY};
pub use wire::QuoteUpdate;

/// One instrument's latest known state.
///
/// Every field is independently optional: a record is a partial view of
/// the schema, and the feed routinely pushes only the fields that changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub stock_id: Option<StockId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub stock_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub ranking: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub current_price: Option<Decimal>,
    /// Absolute change versus the previous close.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub fluctuation_price: Option<Decimal>,
    /// Percent change versus the previous close.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub fluctuation_rate: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub fluctuation_sign: Option<FluctuationSign>,
    /// Cumulative traded volume for the session.
    #[serde(
        rename = "acmlvol",
        alias = "acmlVol",
        alias = "volume",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub accumulated_volume: Option<u64>,
    /// Last trade time, `HHMMSS`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub trading_time: Option<String>,
    /// Volume of the last trade.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::deserialize"
    )]
    pub transaction_volume: Option<u64>,
}

impl QuoteRecord {
    /// An empty record keyed by `stock_id`.
    pub fn for_stock(stock_id: StockId) -> Self {
        Self {
            stock_id: Some(stock_id),
            ..Self::default()
        }
    }

    /// Field-level merge: every field present in `update` overwrites,
    /// absent fields keep their prior value. Never clears a field.
    ///
    /// The identifier is not touched; the store owns record identity.
    pub fn merge(&mut self, update: QuoteRecord) {
        let QuoteRecord {
            stock_id: _,
            stock_name,
            ranking,
            current_price,
            fluctuation_price,
            fluctuation_rate,
            fluctuation_sign,
            accumulated_volume,
            trading_time,
            transaction_volume,
        } = update;

        overwrite(&mut self.stock_name, stock_name);
        overwrite(&mut self.ranking, ranking);
        overwrite(&mut self.current_price, current_price);
        overwrite(&mut self.fluctuation_price, fluctuation_price);
        overwrite(&mut self.fluctuation_rate, fluctuation_rate);
        overwrite(&mut self.fluctuation_sign, fluctuation_sign);
        overwrite(&mut self.accumulated_volume, accumulated_volume);
        overwrite(&mut self.trading_time, trading_time);
        overwrite(&mut self.transaction_volume, transaction_volume);
    }

    /// Fill only the fields this record does not have yet. Fields already
    /// set are left alone.
    pub fn fill_missing(&mut self, snapshot: QuoteRecord) {
        let QuoteRecord {
            stock_id: _,
            stock_name,
            ranking,
            current_price,
            fluctuation_price,
            fluctuation_rate,
            fluctuation_sign,
            accumulated_volume,
            trading_time,
            transaction_volume,
        } = snapshot;

        fill(&mut self.stock_name, stock_name);
        fill(&mut self.ranking, ranking);
        fill(&mut self.current_price, current_price);
        fill(&mut self.fluctuation_price, fluctuation_price);
        fill(&mut self.fluctuation_rate, fluctuation_rate);
        fill(&mut self.fluctuation_sign, fluctuation_sign);
        fill(&mut self.accumulated_volume, accumulated_volume);
        fill(&mut self.trading_time, trading_time);
        fill(&mut self.transaction_volume, transaction_volume);
    }

    /// Whether this record carries a usable live price.
    pub fn has_current_price(&self) -> bool {
        self.current_price.is_some()
    }

    /// `tradingTime` parsed as a time of day.
    pub fn trading_time_of_day(&self) -> Option<NaiveTime> {
        let raw = self.trading_time.as_deref()?;
        NaiveTime::parse_from_str(raw, "%H%M%S").ok()
    }

    /// `true` when no field at all is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}
