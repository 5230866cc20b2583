use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::models::bar::{MergedBar, QuoteBar, TradeBar};

/// Full outer join of trade and quote bars on `interval_start`, ordered by it.
pub fn outer_merge(trades: Vec<TradeBar>, quotes: Vec<QuoteBar>) -> Vec<MergedBar> {
    let mut merged: BTreeMap<DateTime<Tz>, MergedBar> = BTreeMap::new();

    for bar in trades {
        let start = bar.interval_start;
        merged
            .entry(start)
            .or_insert_with(|| empty(start))
            .trade = Some(bar);
    }
    for bar in quotes {
        let start = bar.interval_start;
        merged
            .entry(start)
            .or_insert_with(|| empty(start))
            .quote = Some(bar);
    }

    merged.into_values().collect()
}

fn empty(interval_start: DateTime<Tz>) -> MergedBar {
    MergedBar {
        interval_start,
        trade: None,
        quote: None,
    }
}
