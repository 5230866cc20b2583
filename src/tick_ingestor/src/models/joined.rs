//! Trades annotated with their lookback price and the momentum signal.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::models::tick::TradeTick;

/// A trade joined to the latest trade at or before `event_time - offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct LookbackJoinedRecord {
    pub trade: TradeTick,
    /// Price of the matched earlier trade.
    pub prior_price: Decimal,
    /// Event time of the matched earlier trade; always `<= event_time - offset`.
    pub lookback_timestamp: DateTime<Utc>,
    /// `(price - prior_price) / prior_price`.
    pub price_change_pct: f64,
    /// `price_change_pct > threshold`.
    pub signal: bool,
    /// Zone the participant timestamp is written in.
    pub timezone: Tz,
}

impl LookbackJoinedRecord {
    /// The signal as the 0/1 `move_green` column.
    pub fn move_green(&self) -> u8 {
        u8::from(self.signal)
    }
}

impl Serialize for LookbackJoinedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let t = &self.trade;
        let mut s = serializer.serialize_struct("LookbackJoinedRecord", 10)?;
        s.serialize_field("id", &t.id)?;
        s.serialize_field("sequence_number", &t.sequence_number)?;
        s.serialize_field("price", &t.price)?;
        s.serialize_field("size", &t.size)?;
        s.serialize_field("move_green", &self.move_green())?;
        s.serialize_field(
            "participant_timestamp",
            &t.participant_timestamp.map(|ts| ts.with_timezone(&self.timezone)),
        )?;
        // nanoseconds since the epoch, as the vendor sends it
        s.serialize_field("sip_timestamp", &t.sip_timestamp.timestamp_nanos_opt())?;
        s.serialize_field("exchange", &t.exchange)?;
        s.serialize_field("tape", &t.tape)?;
        s.serialize_field("conditions", &t.conditions)?;
        s.end()
    }
}
