//! Lookback join: each trade against the most recent trade at least
//! `offset` earlier, producing a percentage change and a thresholded signal.

use chrono::Duration;
use chrono_tz::Tz;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use tracing::debug;

use crate::{
    aggregate::bars::order_by_event_time,
    models::{joined::LookbackJoinedRecord, tick::TradeTick},
};

/// Default lookback offset in minutes.
pub const DEFAULT_OFFSET_MINUTES: u32 = 15;

/// Default signal threshold (0.5%).
pub fn default_threshold() -> Decimal {
    Decimal::new(5, 3)
}

/// Join every trade to the last trade whose event time is `<= t - offset`.
///
/// Trades without an event time are ignored. Trades with no such prior trade,
/// or whose prior price is zero, are left out of the result. The output is in
/// event-time order and `signal` is `price_change_pct > threshold`. Rows are
/// written with their participant time in `tz`.
pub fn join_lookback(
    ticks: &[TradeTick],
    offset_minutes: u32,
    threshold: Decimal,
    tz: Tz,
) -> Vec<LookbackJoinedRecord> {
    let timed = order_by_event_time(ticks);
    let offset = Duration::minutes(i64::from(offset_minutes));

    let mut joined = Vec::with_capacity(timed.len());
    let mut prior: Option<usize> = None;
    let mut scan = 0;
    let mut without_prior = 0usize;
    let mut zero_prior = 0usize;

    for &(ts, trade) in &timed {
        let cutoff = ts - offset;
        while scan < timed.len() && timed[scan].0 <= cutoff {
            prior = Some(scan);
            scan += 1;
        }

        let Some(idx) = prior else {
            without_prior += 1;
            continue;
        };
        let (prior_ts, prior_trade) = timed[idx];

        let Some(change) = (trade.price - prior_trade.price).checked_div(prior_trade.price) else {
            zero_prior += 1;
            continue;
        };
        let Some(price_change_pct) = change.to_f64() else {
            continue;
        };

        joined.push(LookbackJoinedRecord {
            trade: trade.clone(),
            prior_price: prior_trade.price,
            lookback_timestamp: prior_ts,
            price_change_pct,
            signal: change > threshold,
            timezone: tz,
        });
    }

    debug!(
        input = ticks.len(),
        joined = joined.len(),
        without_prior,
        zero_prior,
        offset_minutes,
        "lookback join finished"
    );
    joined
}
