use chrono::{DateTime, NaiveDate, SecondsFormat};
use chrono_tz::Tz;

/// Time filter sent with the first page request of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFilter {
    /// Every tick of one calendar date (`timestamp=YYYY-MM-DD`).
    Date(NaiveDate),

    /// Inclusive bounds (`timestamp.gte` / `timestamp.lte`).
    Range {
        gte: DateTime<Tz>,
        lte: DateTime<Tz>,
    },

    /// Half-open bounds (`timestamp.gte` / `timestamp.lt`), so that adjacent
    /// windows never share a tick.
    HalfOpen {
        gte: DateTime<Tz>,
        lt: DateTime<Tz>,
    },
}

impl TimeFilter {
    /// Query pairs for this filter.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            TimeFilter::Date(day) => vec![("timestamp", day.format("%Y-%m-%d").to_string())],
            TimeFilter::Range { gte, lte } => vec![
                ("timestamp.gte", gte.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                ("timestamp.lte", lte.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ],
            TimeFilter::HalfOpen { gte, lt } => vec![
                ("timestamp.gte", gte.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                ("timestamp.lt", lt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ],
        }
    }
}

/// One unit of work for the orchestrator: a labelled time filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    /// Human-readable label used in logs and skip reports (e.g. `2024-01-02 09:30`).
    pub label: String,
    pub filter: TimeFilter,
}

impl FetchWindow {
    pub fn new(label: impl Into<String>, filter: TimeFilter) -> Self {
        Self {
            label: label.into(),
            filter,
        }
    }
}
