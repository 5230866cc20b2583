//! Generation of the fetch windows a run iterates over.

use std::num::NonZeroU32;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use tracing::warn;

use crate::models::window::{FetchWindow, TimeFilter};

pub const MARKET_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(t) => t,
    None => unreachable!(),
};

pub const MARKET_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// Start of the per-day momentum session (15 minutes before the open, so the
/// first lookback at the open has data to match).
pub const MOMENTUM_SESSION_START: NaiveTime = match NaiveTime::from_hms_opt(9, 15, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// Length of the momentum session in minutes (09:15 to 16:00).
pub const MOMENTUM_SESSION_MINUTES: u32 = 405;

/// Whether `time` is a bar boundary for `interval`-minute bars.
///
/// Bars are counted from local midnight, so intraday windows stepped by the
/// bar interval only line up with bars when the first window starts on this grid.
pub fn on_bar_grid(time: NaiveTime, interval: NonZeroU32) -> bool {
    let width = 60 * interval.get();
    time.nanosecond() == 0 && time.num_seconds_from_midnight() % width == 0
}

/// Consecutive `[t, t + step)` windows for one trading day.
///
/// Window starts run from `open` up to and including `close`, all local to
/// `tz`. Returns nothing when either bound does not exist on that day.
pub fn intraday_windows(
    day: NaiveDate,
    open: NaiveTime,
    close: NaiveTime,
    step: NonZeroU32,
    tz: Tz,
) -> Vec<FetchWindow> {
    let (Some(first), Some(last)) = (
        resolve_local(tz, day, open),
        resolve_local(tz, day, close),
    ) else {
        warn!(%day, %open, %close, "session bounds do not exist in local time; no windows");
        return Vec::new();
    };

    let step = Duration::minutes(i64::from(step.get()));
    let mut windows = Vec::new();
    let mut start = first;
    while start <= last {
        let end = start + step;
        windows.push(FetchWindow::new(
            start.format("%Y-%m-%d %H:%M").to_string(),
            TimeFilter::HalfOpen { gte: start, lt: end },
        ));
        start = end;
    }
    windows
}

/// One `[start, start + length]` window per calendar day from `first_day` to
/// `last_day` inclusive.
///
/// Days whose local session start cannot be resolved are skipped with a warning.
pub fn session_windows(
    first_day: NaiveDate,
    last_day: NaiveDate,
    session_start: NaiveTime,
    session_minutes: u32,
    tz: Tz,
) -> Vec<FetchWindow> {
    let length = Duration::minutes(i64::from(session_minutes));
    first_day
        .iter_days()
        .take_while(|day| *day <= last_day)
        .filter_map(|day| {
            let Some(gte) = resolve_local(tz, day, session_start) else {
                warn!(%day, %session_start, "session start does not exist in local time; skipping day");
                return None;
            };
            Some(FetchWindow::new(
                day.format("%Y-%m-%d").to_string(),
                TimeFilter::Range {
                    gte,
                    lte: gte + length,
                },
            ))
        })
        .collect()
}

/// Local wall time to an instant; the earlier instant wins when ambiguous.
fn resolve_local(tz: Tz, day: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&day.and_time(time)).earliest()
}
