//! Typed tick records decoded from the vendor's `results` arrays.
//!
//! Records are validated at the ingestion boundary: a JSON object that is missing
//! a required field (or carries one of the wrong shape) fails to decode and is
//! dropped by the fetcher instead of travelling downstream as an untyped map.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::models::timestamp;

/// Which tick endpoint a record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    Trade,
    Quote,
}

impl TickKind {
    /// Path segment of the v3 endpoint (`/v3/{segment}/{symbol}`).
    pub const fn path_segment(self) -> &'static str {
        match self {
            TickKind::Trade => "trades",
            TickKind::Quote => "quotes",
        }
    }
}

/// Common behaviour of every tick record the fetcher can produce.
pub trait Tick: DeserializeOwned + Send + Sync + 'static {
    /// Endpoint this record type is served from.
    const KIND: TickKind;

    /// Instant the exchange stamped the event, used for bucketing and lookback.
    ///
    /// `None` when the vendor omitted the participant timestamp or sent one
    /// that could not be read.
    fn event_time(&self) -> Option<DateTime<Utc>>;
}

/// A single executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTick {
    /// Vendor trade id (unique per exchange and day).
    pub id: String,
    pub sequence_number: u64,
    /// Time the SIP received the trade.
    #[serde(deserialize_with = "timestamp::deserialize_required")]
    pub sip_timestamp: DateTime<Utc>,
    /// Time the exchange generated the trade.
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub participant_timestamp: Option<DateTime<Utc>>,
    pub price: Decimal,
    pub size: u64,
    pub exchange: i32,
    #[serde(default)]
    pub tape: Option<i32>,
    #[serde(default)]
    pub conditions: Vec<i32>,
}

impl Tick for TradeTick {
    const KIND: TickKind = TickKind::Trade;

    fn event_time(&self) -> Option<DateTime<Utc>> {
        self.participant_timestamp
    }
}

/// A top-of-book quote update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTick {
    #[serde(deserialize_with = "timestamp::deserialize_required")]
    pub sip_timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub participant_timestamp: Option<DateTime<Utc>>,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
    #[serde(default)]
    pub bid_size: u64,
    #[serde(default)]
    pub ask_size: u64,
    #[serde(default)]
    pub bid_exchange: Option<i32>,
    #[serde(default)]
    pub ask_exchange: Option<i32>,
    #[serde(default)]
    pub sequence_number: u64,
    #[serde(default)]
    pub tape: Option<i32>,
    #[serde(default)]
    pub conditions: Vec<i32>,
}

impl Tick for QuoteTick {
    const KIND: TickKind = TickKind::Quote;

    fn event_time(&self) -> Option<DateTime<Utc>> {
        self.participant_timestamp
    }
}
