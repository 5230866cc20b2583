//! Wall-clock aligned interval buckets.
//!
//! Buckets are counted from local midnight: the wall-clock seconds since
//! midnight of an instant are floored to the interval width and the remainder
//! is subtracted from the instant itself. A 7-minute grid therefore runs
//! 00:00, 00:07, ... 09:27, 09:34 on every day. Two instants that share a
//! wall-clock reading but not an offset (the repeated hour after a fall-back
//! transition) land in distinct buckets.

use std::num::NonZeroU32;

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;

/// Number of seconds in a minute.
pub const SECS_PER_MINUTE: i64 = 60;

/// Start of the `interval`-minute bucket containing `ts`, expressed in `tz`.
///
/// Always satisfies `start <= ts < start + interval`.
pub fn bucket_start(ts: DateTime<Utc>, interval: NonZeroU32, tz: Tz) -> DateTime<Tz> {
    let local = ts.with_timezone(&tz);
    let width = SECS_PER_MINUTE * i64::from(interval.get());

    let since_midnight = i64::from(local.num_seconds_from_midnight());
    let into_bucket = Duration::seconds(since_midnight.rem_euclid(width))
        + Duration::nanoseconds(i64::from(local.nanosecond() % 1_000_000_000));

    local - into_bucket
}

/// Exclusive end of the bucket starting at `start`.
pub fn bucket_end(start: DateTime<Tz>, interval: NonZeroU32) -> DateTime<Tz> {
    start + Duration::minutes(i64::from(interval.get()))
}
