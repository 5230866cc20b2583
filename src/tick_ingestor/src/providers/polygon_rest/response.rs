use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::tick::Tick;

/// Envelope of every v3 list endpoint.
#[derive(Deserialize, Debug, Default)]
pub struct PolygonResponse {
    #[serde(default)]
    pub results: Option<Vec<Value>>,
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    /// Error text on failed requests (`error` or `message`, depending on the endpoint).
    #[serde(default, alias = "message")]
    pub error: Option<String>,
}

/// One page of decoded records plus the continuation reference, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub next_cursor: Option<String>,
}

impl PolygonResponse {
    /// `OK` and `DELAYED` carry data; a missing status is treated as success.
    pub fn is_success(&self) -> bool {
        matches!(self.status.as_deref(), None | Some("OK") | Some("DELAYED"))
    }

    /// Decode `results` into typed records.
    ///
    /// Returns `None` when the envelope has no `results` field. Records that do
    /// not validate are skipped; their count is returned next to the page.
    pub fn into_page<T: Tick>(self) -> Option<(Page<T>, usize)> {
        let raw = self.results?;
        let total = raw.len();
        let records: Vec<T> = raw
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<T>(v) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(kind = ?T::KIND, error = %e, "dropping malformed record");
                    None
                }
            })
            .collect();
        let dropped = total - records.len();

        Some((
            Page {
                records,
                next_cursor: self.next_url,
            },
            dropped,
        ))
    }
}
