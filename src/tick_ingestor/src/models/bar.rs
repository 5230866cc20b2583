//! Canonical in-memory representation of interval bars.
//!
//! Trade and quote ticks are aggregated separately into [`TradeBar`] and
//! [`QuoteBar`]; the two sides are then outer-joined on `interval_start` into a
//! [`MergedBar`], which is the row type of the intraday master table.

use chrono::DateTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;

/// OHLCV summary of the trades inside one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeBar {
    /// Start of the interval, aligned to the interval boundary in the target timezone.
    pub interval_start: DateTime<Tz>,

    /// Price of the first trade by event time.
    pub open: Decimal,

    /// Highest trade price during the interval.
    pub high: Decimal,

    /// Lowest trade price during the interval.
    pub low: Decimal,

    /// Price of the last trade by event time.
    pub close: Decimal,

    /// Sum of trade sizes.
    pub volume: u64,

    /// Number of trades folded into this bar.
    pub tick_count: usize,
}

/// Summary of the quotes inside one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteBar {
    pub interval_start: DateTime<Tz>,
    /// Bid of the first quote.
    pub bid_open: Decimal,
    /// Ask of the last quote.
    pub ask_close: Decimal,
    pub ask_high: Decimal,
    pub bid_low: Decimal,
    /// Sum of displayed bid and ask sizes.
    pub quote_volume: u64,
    pub tick_count: usize,
}

/// Trade and quote bars sharing an `interval_start`. Either side may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedBar {
    pub interval_start: DateTime<Tz>,
    pub trade: Option<TradeBar>,
    pub quote: Option<QuoteBar>,
}

/// Flat output row; a missing side serializes as nulls.
#[derive(Serialize)]
struct MergedBarRow<'a> {
    interval_start: &'a DateTime<Tz>,
    open_price: Option<Decimal>,
    close_price: Option<Decimal>,
    high_price: Option<Decimal>,
    low_price: Option<Decimal>,
    total_volume: Option<u64>,
    bid_open: Option<Decimal>,
    ask_close: Option<Decimal>,
    ask_high: Option<Decimal>,
    bid_low: Option<Decimal>,
    quote_volume: Option<u64>,
}

impl Serialize for MergedBar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let t = self.trade.as_ref();
        let q = self.quote.as_ref();
        MergedBarRow {
            interval_start: &self.interval_start,
            open_price: t.map(|b| b.open),
            close_price: t.map(|b| b.close),
            high_price: t.map(|b| b.high),
            low_price: t.map(|b| b.low),
            total_volume: t.map(|b| b.volume),
            bid_open: q.map(|b| b.bid_open),
            ask_close: q.map(|b| b.ask_close),
            ask_high: q.map(|b| b.ask_high),
            bid_low: q.map(|b| b.bid_low),
            quote_volume: q.map(|b| b.quote_volume),
        }
        .serialize(serializer)
    }
}
