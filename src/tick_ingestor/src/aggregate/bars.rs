use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::{
    aggregate::{AggregateError, BarSpec, bucket::bucket_start},
    models::{
        bar::{QuoteBar, TradeBar},
        tick::{QuoteTick, Tick, TradeTick},
    },
};

/// Fold trades into one OHLCV bar per non-empty `interval_minutes` bucket of `tz_name`.
///
/// Trades without an event time are ignored. The result is ordered by
/// `interval_start`; empty input yields an empty vector.
pub fn aggregate_trades(
    ticks: &[TradeTick],
    interval_minutes: u32,
    tz_name: &str,
) -> Result<Vec<TradeBar>, AggregateError> {
    let spec = BarSpec::new(interval_minutes, tz_name)?;
    let bars = group_by_bucket(ticks, spec)
        .into_iter()
        .filter_map(|(start, group)| trade_bar(start, &group))
        .collect();
    Ok(bars)
}

/// Fold quotes into one bar per non-empty bucket; see [`aggregate_trades`].
pub fn aggregate_quotes(
    ticks: &[QuoteTick],
    interval_minutes: u32,
    tz_name: &str,
) -> Result<Vec<QuoteBar>, AggregateError> {
    let spec = BarSpec::new(interval_minutes, tz_name)?;
    let bars = group_by_bucket(ticks, spec)
        .into_iter()
        .filter_map(|(start, group)| quote_bar(start, &group))
        .collect();
    Ok(bars)
}

/// Ticks in event-time order (stable), paired with their event time.
pub(crate) fn order_by_event_time<T: Tick>(ticks: &[T]) -> Vec<(DateTime<Utc>, &T)> {
    let mut timed: Vec<(DateTime<Utc>, &T)> = ticks
        .iter()
        .filter_map(|t| t.event_time().map(|ts| (ts, t)))
        .collect();
    let missing = ticks.len() - timed.len();
    if missing > 0 {
        debug!(kind = ?T::KIND, missing, "ignoring ticks without event time");
    }
    timed.sort_by_key(|(ts, _)| *ts);
    timed
}

fn group_by_bucket<T: Tick>(ticks: &[T], spec: BarSpec) -> BTreeMap<DateTime<Tz>, Vec<&T>> {
    let mut groups: BTreeMap<DateTime<Tz>, Vec<&T>> = BTreeMap::new();
    for (ts, tick) in order_by_event_time(ticks) {
        groups
            .entry(bucket_start(ts, spec.interval, spec.tz))
            .or_default()
            .push(tick);
    }
    groups
}

fn trade_bar(interval_start: DateTime<Tz>, trades: &[&TradeTick]) -> Option<TradeBar> {
    let first = trades.first()?;
    let last = trades.last()?;
    Some(TradeBar {
        interval_start,
        open: first.price,
        high: trades.iter().map(|t| t.price).max()?,
        low: trades.iter().map(|t| t.price).min()?,
        close: last.price,
        volume: trades.iter().fold(0u64, |acc, t| acc.saturating_add(t.size)),
        tick_count: trades.len(),
    })
}

fn quote_bar(interval_start: DateTime<Tz>, quotes: &[&QuoteTick]) -> Option<QuoteBar> {
    let first = quotes.first()?;
    let last = quotes.last()?;
    Some(QuoteBar {
        interval_start,
        bid_open: first.bid_price,
        ask_close: last.ask_price,
        ask_high: quotes.iter().map(|q| q.ask_price).max()?,
        bid_low: quotes.iter().map(|q| q.bid_price).min()?,
        quote_volume: quotes
            .iter()
            .fold(0u64, |acc, q| acc.saturating_add(q.bid_size).saturating_add(q.ask_size)),
        tick_count: quotes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const NY: &str = "America/New_York";

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn trade(id: &str, ts: &str, price: Decimal, size: u64) -> TradeTick {
        TradeTick {
            id: id.into(),
            sequence_number: 0,
            sip_timestamp: at(ts),
            participant_timestamp: Some(at(ts)),
            price,
            size,
            exchange: 4,
            tape: Some(3),
            conditions: vec![],
        }
    }

    fn quote(ts: &str, bid: Decimal, ask: Decimal, bid_size: u64, ask_size: u64) -> QuoteTick {
        QuoteTick {
            sip_timestamp: at(ts),
            participant_timestamp: Some(at(ts)),
            bid_price: bid,
            ask_price: ask,
            bid_size,
            ask_size,
            bid_exchange: Some(11),
            ask_exchange: Some(12),
            sequence_number: 0,
            tape: Some(3),
            conditions: vec![],
        }
    }

    #[test]
    fn empty_input_yields_no_bars() {
        assert!(aggregate_trades(&[], 15, NY).unwrap().is_empty());
        assert!(aggregate_quotes(&[], 15, NY).unwrap().is_empty());
    }

    #[test]
    fn single_interval_ohlcv() {
        let trades = [
            trade("a", "2025-02-03T09:30:00-05:00", dec!(100), 10),
            trade("b", "2025-02-03T09:31:00-05:00", dec!(105), 5),
            trade("c", "2025-02-03T09:44:59-05:00", dec!(98), 20),
        ];

        let bars = aggregate_trades(&trades, 15, NY).unwrap();

        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(bar.interval_start.to_rfc3339(), "2025-02-03T09:30:00-05:00");
        assert_eq!(bar.open, dec!(100));
        assert_eq!(bar.high, dec!(105));
        assert_eq!(bar.low, dec!(98));
        assert_eq!(bar.close, dec!(98));
        assert_eq!(bar.volume, 35);
        assert_eq!(bar.tick_count, 3);
    }

    #[test]
    fn orders_by_event_time_and_skips_empty_intervals() {
        let trades = [
            trade("late", "2025-02-03T10:20:00-05:00", dec!(7), 1),
            trade("first", "2025-02-03T09:30:05-05:00", dec!(5), 1),
            trade("second", "2025-02-03T09:40:00-05:00", dec!(6), 1),
        ];

        let bars = aggregate_trades(&trades, 15, NY).unwrap();

        let starts: Vec<String> = bars.iter().map(|b| b.interval_start.to_rfc3339()).collect();
        assert_eq!(
            starts,
            vec!["2025-02-03T09:30:00-05:00", "2025-02-03T10:15:00-05:00"]
        );
        assert_eq!((bars[0].open, bars[0].close), (dec!(5), dec!(6)));
    }

    #[test]
    fn equal_event_times_keep_input_order() {
        let trades = [
            trade("x", "2025-02-03T09:30:00-05:00", dec!(1), 1),
            trade("y", "2025-02-03T09:30:00-05:00", dec!(2), 1),
        ];
        let bars = aggregate_trades(&trades, 1, NY).unwrap();
        assert_eq!((bars[0].open, bars[0].close), (dec!(1), dec!(2)));
    }

    #[test]
    fn ticks_without_event_time_are_dropped() {
        let mut orphan = trade("o", "2025-02-03T09:31:00-05:00", dec!(500), 99);
        orphan.participant_timestamp = None;
        let trades = [trade("a", "2025-02-03T09:30:00-05:00", dec!(100), 1), orphan];

        let bars = aggregate_trades(&trades, 15, NY).unwrap();

        assert_eq!(bars[0].high, dec!(100));
        assert_eq!(bars[0].tick_count, 1);
    }

    #[test]
    fn quote_bar_fields() {
        let quotes = [
            quote("2025-02-03T09:30:01-05:00", dec!(99.90), dec!(100.10), 3, 4),
            quote("2025-02-03T09:35:00-05:00", dec!(99.50), dec!(100.40), 1, 1),
            quote("2025-02-03T09:44:00-05:00", dec!(99.80), dec!(100.00), 2, 2),
        ];

        let bars = aggregate_quotes(&quotes, 15, NY).unwrap();

        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(bar.bid_open, dec!(99.90));
        assert_eq!(bar.ask_close, dec!(100.00));
        assert_eq!(bar.ask_high, dec!(100.40));
        assert_eq!(bar.bid_low, dec!(99.50));
        assert_eq!(bar.quote_volume, 13);
    }

    #[test]
    fn oversized_sizes_saturate_instead_of_overflowing() {
        let trades = [
            trade("a", "2025-02-03T09:30:00-05:00", dec!(1), u64::MAX),
            trade("b", "2025-02-03T09:31:00-05:00", dec!(1), 7),
        ];
        let quotes = [
            quote("2025-02-03T09:30:00-05:00", dec!(1), dec!(2), u64::MAX, 1),
            quote("2025-02-03T09:31:00-05:00", dec!(1), dec!(2), 5, 5),
        ];

        assert_eq!(aggregate_trades(&trades, 15, NY).unwrap()[0].volume, u64::MAX);
        assert_eq!(aggregate_quotes(&quotes, 15, NY).unwrap()[0].quote_volume, u64::MAX);
    }

    #[test]
    fn uneven_interval_buckets_from_midnight() {
        let trades = [
            trade("a", "2025-02-03T09:26:59-05:00", dec!(1), 1),
            trade("b", "2025-02-03T09:27:00-05:00", dec!(2), 1),
            trade("c", "2025-02-03T09:33:59-05:00", dec!(3), 1),
            trade("d", "2025-02-03T09:34:00-05:00", dec!(4), 1),
        ];

        let bars = aggregate_trades(&trades, 7, NY).unwrap();

        let starts: Vec<String> = bars.iter().map(|b| b.interval_start.to_rfc3339()).collect();
        assert_eq!(
            starts,
            vec![
                "2025-02-03T09:20:00-05:00",
                "2025-02-03T09:27:00-05:00",
                "2025-02-03T09:34:00-05:00"
            ]
        );
        assert_eq!(bars[1].tick_count, 2);
    }

    #[test]
    fn rejects_bad_parameters() {
        let trades = [trade("a", "2025-02-03T09:30:00-05:00", dec!(1), 1)];
        assert_eq!(aggregate_trades(&trades, 0, NY), Err(AggregateError::ZeroInterval));
        assert!(matches!(
            aggregate_quotes(&[], 15, "Nowhere/Special"),
            Err(AggregateError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn fall_back_hour_produces_two_bars() {
        let trades = [
            trade("edt", "2024-11-03T01:40:00-04:00", dec!(10), 1),
            trade("est", "2024-11-03T01:40:00-05:00", dec!(20), 1),
        ];
        let bars = aggregate_trades(&trades, 15, NY).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(10));
        assert_eq!(bars[1].close, dec!(20));
    }
}
