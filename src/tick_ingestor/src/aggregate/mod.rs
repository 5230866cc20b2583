//! Interval aggregation of tick streams into bars.
//!
//! Ticks are bucketed by event time into fixed-width intervals aligned to the
//! wall clock of a target timezone (see [`bucket::bucket_start`]) and folded
//! into one [`TradeBar`](crate::models::bar::TradeBar) or
//! [`QuoteBar`](crate::models::bar::QuoteBar) per non-empty interval.

pub mod bars;
pub mod bucket;
pub mod quality;

use std::num::NonZeroU32;

use chrono_tz::Tz;
use thiserror::Error;

pub use bars::{aggregate_quotes, aggregate_trades};
pub use quality::{WindowQuality, assess_window};

/// Invalid aggregation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("interval must be at least one minute")]
    ZeroInterval,

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Validated interval width and target timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarSpec {
    pub interval: NonZeroU32,
    pub tz: Tz,
}

impl BarSpec {
    pub fn new(interval_minutes: u32, tz_name: &str) -> Result<Self, AggregateError> {
        let interval = NonZeroU32::new(interval_minutes).ok_or(AggregateError::ZeroInterval)?;
        let tz: Tz = tz_name
            .parse()
            .map_err(|_| AggregateError::UnknownTimezone(tz_name.to_string()))?;
        Ok(Self { interval, tz })
    }
}
