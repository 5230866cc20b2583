use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    models::{
        tick::{QuoteTick, Tick, TickKind, TradeTick},
        window::TimeFilter,
    },
    providers::{
        FetchReport, ProviderInitError, StopReason, TickSource,
        polygon_rest::{
            client::{ClientConfig, VENDOR_BASE_URL},
            params::{QueryParams, continuation_params, initial_params},
            response::PolygonResponse,
        },
        sleep::{Sleeper, TokioSleeper},
        transport::{ReqwestTransport, Transport, TransportError, TransportResponse},
    },
};

/// Cursor-following fetcher for the v3 tick endpoints.
///
/// One request is in flight at a time. Pages are requested in the order the
/// continuation cursor dictates and concatenated as they arrive.
pub struct PagedFetcher<T = ReqwestTransport, S = TokioSleeper> {
    config: ClientConfig,
    transport: T,
    sleeper: S,
}

impl PagedFetcher {
    /// Creates a fetcher over a freshly built `reqwest` client.
    pub fn new(config: ClientConfig) -> Result<Self, ProviderInitError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_parts(config, transport, TokioSleeper))
    }
}

impl<T: Transport, S: Sleeper> PagedFetcher<T, S> {
    pub fn with_parts(config: ClientConfig, transport: T, sleeper: S) -> Self {
        Self {
            config,
            transport,
            sleeper,
        }
    }

    /// `{base_url}v3/{trades|quotes}/{symbol}`
    pub fn endpoint(&self, kind: TickKind, symbol: &str) -> Result<Url, url::ParseError> {
        self.config
            .base_url
            .join(&format!("v3/{}/{}", kind.path_segment(), symbol))
    }

    /// Resolve a `next_url` from the vendor into the URL to request next.
    ///
    /// Relative references are resolved under the base URL, keeping any path
    /// prefix it carries (`/v3/...` on `http://host/polygon/` becomes
    /// `http://host/polygon/v3/...`). Absolute URLs on
    /// the public vendor host are moved onto the configured base URL (keeping
    /// path and cursor query) when the two differ. Returns `None` for unusable input.
    pub fn rebase_continuation(&self, next_url: &str) -> Option<Url> {
        let base = &self.config.base_url;
        let next = match Url::parse(next_url) {
            Ok(url) => url,
            Err(_) => base.join(next_url.trim_start_matches('/')).ok()?,
        };
        let vendor = Url::parse(VENDOR_BASE_URL).ok()?;

        if next.origin() != vendor.origin() || base.origin() == vendor.origin() {
            return Some(next);
        }

        let mut rebased = base.clone();
        let prefix = base.path().trim_end_matches('/');
        rebased.set_path(&format!("{prefix}{}", next.path()));
        rebased.set_query(next.query());
        Some(rebased)
    }

    /// Fetch every page of `R` records for `symbol` matching `filter`.
    ///
    /// Never fails: see [`StopReason`] for how the fetch ended. On
    /// [`StopReason::Failed`] the accumulated records are discarded.
    pub async fn fetch<R: Tick>(&self, symbol: &str, filter: &TimeFilter) -> FetchReport<R> {
        let kind = R::KIND;
        let started = Instant::now();

        let mut url = match self.endpoint(kind, symbol) {
            Ok(url) => url,
            Err(e) => {
                error!(symbol, ?kind, error = %e, "cannot build endpoint url");
                return FetchReport::empty(StopReason::Failed(e.to_string()));
            }
        };
        let mut query = initial_params(filter, self.config.page_limit, &self.config.api_key);

        let mut records: Vec<R> = Vec::new();
        let mut pages = 0usize;
        let mut dropped = 0usize;
        let mut request_count = 0usize;

        info!(symbol, ?kind, ?filter, "fetch started");

        let stop = loop {
            if started.elapsed() > self.config.retry.deadline {
                warn!(
                    symbol,
                    ?kind,
                    elapsed_secs = started.elapsed().as_secs(),
                    "aborting fetch: deadline reached"
                );
                break StopReason::Deadline;
            }

            request_count += 1;
            debug!(symbol, ?kind, request = request_count, url = %url, "requesting page");

            let response = match self.send_with_retries(&url, &query, started).await {
                Ok(response) => response,
                Err(stop) => break stop,
            };

            if response.status != 200 {
                break StopReason::Terminal(format!("HTTP {}", response.status));
            }

            let envelope: PolygonResponse = match serde_json::from_str(&response.body) {
                Ok(envelope) => envelope,
                Err(e) => break StopReason::Failed(format!("undecodable response body: {e}")),
            };
            if !envelope.is_success() {
                break StopReason::Terminal(format!(
                    "status {}: {}",
                    envelope.status.as_deref().unwrap_or("?"),
                    envelope.error.as_deref().unwrap_or("no message")
                ));
            }

            let Some((page, page_dropped)) = envelope.into_page::<R>() else {
                break StopReason::Terminal("response has no results".to_string());
            };
            pages += 1;
            dropped += page_dropped;
            let added = page.records.len();
            records.extend(page.records);
            info!(symbol, ?kind, page = pages, added, total = records.len(), "page received");

            match page.next_cursor {
                None => break StopReason::Exhausted,
                Some(next) => match self.rebase_continuation(&next) {
                    Some(next_url) => {
                        url = next_url;
                        query = continuation_params(self.config.page_limit, &self.config.api_key);
                    }
                    None => break StopReason::Terminal(format!("unusable next_url: {next}")),
                },
            }
        };

        match &stop {
            StopReason::Failed(reason) => {
                error!(
                    symbol,
                    ?kind,
                    reason = %reason,
                    discarded = records.len(),
                    "fetch failed; reporting empty result"
                );
                records.clear();
            }
            StopReason::Exhausted => {
                info!(symbol, ?kind, pages, total = records.len(), dropped, "fetch complete")
            }
            other => warn!(
                symbol,
                ?kind,
                stop = %other,
                pages,
                total = records.len(),
                "fetch ended early; keeping partial result"
            ),
        }

        FetchReport {
            records,
            pages,
            dropped,
            stop,
        }
    }

    /// Send one page request, retrying the same request on 429 and timeouts.
    ///
    /// The 429 retry counter starts at zero for every page.
    async fn send_with_retries(
        &self,
        url: &Url,
        query: &QueryParams,
        started: Instant,
    ) -> Result<TransportResponse, StopReason> {
        let policy = &self.config.retry;
        let mut retries = 0u32;

        loop {
            match self.transport.get(url, query).await {
                Ok(response) if response.status == 429 => {
                    if !policy.allows_rate_limit_retry(retries) {
                        return Err(StopReason::Terminal(format!(
                            "still rate limited after {retries} retries"
                        )));
                    }
                    let wait = policy.rate_limit_wait(retries);
                    warn!(wait_secs = wait.as_secs(), retries, "rate limited, backing off");
                    self.sleeper.sleep(wait).await;
                    retries += 1;
                }
                Ok(response) => return Ok(response),
                Err(TransportError::Timeout { timeout }) => {
                    warn!(
                        timeout_secs = timeout.as_secs(),
                        delay_secs = policy.timeout_retry_delay.as_secs(),
                        "request timed out, retrying"
                    );
                    self.sleeper.sleep(policy.timeout_retry_delay).await;
                }
                Err(e) => return Err(StopReason::Failed(e.to_string())),
            }

            if started.elapsed() > policy.deadline {
                warn!(retries, "deadline reached while retrying");
                return Err(StopReason::Deadline);
            }
        }
    }
}

#[async_trait]
impl<T: Transport, S: Sleeper> TickSource for PagedFetcher<T, S> {
    async fn fetch_trades(&self, symbol: &str, filter: &TimeFilter) -> FetchReport<TradeTick> {
        self.fetch(symbol, filter).await
    }

    async fn fetch_quotes(&self, symbol: &str, filter: &TimeFilter) -> FetchReport<QuoteTick> {
        self.fetch(symbol, filter).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::NaiveDate;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::providers::polygon_rest::retry::RetryPolicy;

    type Responder = Box<dyn Fn(usize) -> Result<TransportResponse, TransportError> + Send + Sync>;

    /// Answers call `n` with `responder(n)` after an optional simulated latency.
    struct ScriptedTransport {
        responder: Responder,
        latency: Duration,
        calls: Mutex<Vec<(String, QueryParams)>>,
    }

    impl ScriptedTransport {
        fn new(responder: impl Fn(usize) -> Result<TransportResponse, TransportError> + Send + Sync + 'static) -> Self {
            Self {
                responder: Box::new(responder),
                latency: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn sequence(responses: Vec<TransportResponse>) -> Self {
            Self::new(move |n| {
                Ok(responses
                    .get(n)
                    .cloned()
                    .unwrap_or_else(|| TransportResponse::new(500, "script exhausted")))
            })
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn calls(&self) -> Vec<(String, QueryParams)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &Url, query: &QueryParams) -> Result<TransportResponse, TransportError> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((url.to_string(), query.clone()));
                calls.len() - 1
            };
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            (self.responder)(n)
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn secs(&self) -> Vec<u64> {
            self.waits.lock().unwrap().iter().map(Duration::as_secs).collect()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    fn trade(id: usize) -> serde_json::Value {
        let ts = 1_704_205_800_000_000_000_i64 + id as i64 * 1_000_000_000;
        json!({
            "id": id.to_string(),
            "sequence_number": id,
            "sip_timestamp": ts,
            "participant_timestamp": ts,
            "price": 100.0 + id as f64,
            "size": 10,
            "exchange": 4
        })
    }

    fn page(ids: std::ops::RangeInclusive<usize>, next: Option<&str>) -> TransportResponse {
        let mut body = json!({
            "status": "OK",
            "results": ids.map(trade).collect::<Vec<_>>(),
        });
        if let Some(next) = next {
            body["next_url"] = json!(next);
        }
        TransportResponse::new(200, body.to_string())
    }

    fn config(base: &str) -> ClientConfig {
        ClientConfig::new(base, SecretString::new("secret".into())).unwrap()
    }

    fn fetcher<T: Transport>(
        cfg: ClientConfig,
        transport: T,
    ) -> PagedFetcher<T, RecordingSleeper> {
        PagedFetcher::with_parts(cfg, transport, RecordingSleeper::default())
    }

    fn day() -> TimeFilter {
        TimeFilter::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    }

    fn ids(report: &FetchReport<TradeTick>) -> Vec<String> {
        report.records.iter().map(|t| t.id.clone()).collect()
    }

    #[tokio::test]
    async fn concatenates_pages_until_cursor_is_absent() {
        let transport = ScriptedTransport::sequence(vec![
            page(1..=2, Some("https://api.polygon.io/v3/trades/AMD?cursor=p2")),
            page(3..=4, Some("https://api.polygon.io/v3/trades/AMD?cursor=p3")),
            page(5..=6, None),
        ]);
        let f = fetcher(config("http://proxy.local"), transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(ids(&report), vec!["1", "2", "3", "4", "5", "6"]);
        assert_eq!(report.pages, 3);
        assert_eq!(report.stop, StopReason::Exhausted);

        let calls = f.transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, "http://proxy.local/v3/trades/AMD");
        assert_eq!(calls[0].1["order"], "asc");
        assert_eq!(calls[0].1["timestamp"], "2024-01-02");
        assert_eq!(calls[1].0, "http://proxy.local/v3/trades/AMD?cursor=p2");
        let continuation_keys: Vec<&str> = calls[1].1.keys().map(String::as_str).collect();
        assert_eq!(continuation_keys, vec!["limit", "apiKey"]);
    }

    #[tokio::test]
    async fn rate_limit_backoff_doubles_from_one_second() {
        let transport = ScriptedTransport::sequence(vec![
            TransportResponse::new(429, ""),
            TransportResponse::new(429, ""),
            TransportResponse::new(429, ""),
            page(1..=1, None),
        ]);
        let f = fetcher(config("http://proxy.local"), transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(f.sleeper.secs(), vec![1, 2, 4]);
        assert_eq!(ids(&report), vec!["1"]);
        assert_eq!(f.transport.calls().len(), 4);
    }

    #[tokio::test]
    async fn rate_limit_counter_restarts_on_each_page() {
        let transport = ScriptedTransport::sequence(vec![
            TransportResponse::new(429, ""),
            page(1..=1, Some("http://proxy.local/v3/trades/AMD?cursor=2")),
            TransportResponse::new(429, ""),
            page(2..=2, None),
        ]);
        let f = fetcher(config("http://proxy.local"), transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(f.sleeper.secs(), vec![1, 1]);
        assert_eq!(ids(&report), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn retry_limit_ends_fetch_with_partial_result() {
        let transport = ScriptedTransport::new(|n| match n {
            0 => Ok(page(1..=1, Some("http://proxy.local/next"))),
            _ => Ok(TransportResponse::new(429, "")),
        });
        let mut cfg = config("http://proxy.local");
        cfg.retry = RetryPolicy {
            max_rate_limit_retries: Some(2),
            ..RetryPolicy::default()
        };
        let f = fetcher(cfg, transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(f.sleeper.secs(), vec![1, 2]);
        assert_eq!(ids(&report), vec!["1"]);
        assert!(matches!(report.stop, StopReason::Terminal(_)));
    }

    #[tokio::test]
    async fn timeouts_are_retried_after_fixed_delay() {
        let transport = ScriptedTransport::new(|n| match n {
            0 | 1 => Err(TransportError::Timeout {
                timeout: Duration::from_secs(30),
            }),
            _ => Ok(page(1..=2, None)),
        });
        let f = fetcher(config("http://proxy.local"), transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(f.sleeper.secs(), vec![5, 5]);
        assert_eq!(ids(&report), vec!["1", "2"]);
        assert_eq!(report.stop, StopReason::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_endless_pagination() {
        let transport = ScriptedTransport::new(|n| {
            let first = n * 2 + 1;
            Ok(page(first..=first + 1, Some("http://proxy.local/more")))
        })
        .with_latency(Duration::from_millis(300));
        let mut cfg = config("http://proxy.local");
        cfg.retry.deadline = Duration::from_secs(1);
        let f = fetcher(cfg, transport);

        let started = Instant::now();
        let report = f.fetch::<TradeTick>("AMD", &day()).await;
        let elapsed = started.elapsed();

        // Checks happen at 0.0, 0.3, 0.6, 0.9 and 1.2s; the last one stops.
        assert_eq!(report.stop, StopReason::Deadline);
        assert_eq!(report.pages, 4);
        assert_eq!(ids(&report), (1..=8).map(|i| i.to_string()).collect::<Vec<_>>());
        assert!(elapsed <= Duration::from_millis(1_300), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_request_can_overrun_deadline_before_next_check() {
        // The deadline is only checked between requests; an in-flight request
        // is never cancelled, so one slow page overruns the budget.
        let transport = ScriptedTransport::new(|_| Ok(page(1..=1, Some("http://proxy.local/more"))))
            .with_latency(Duration::from_secs(5));
        let mut cfg = config("http://proxy.local");
        cfg.retry.deadline = Duration::from_secs(1);
        let f = fetcher(cfg, transport);

        let started = Instant::now();
        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(report.pages, 1);
        assert_eq!(report.stop, StopReason::Deadline);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_rate_limit_retries() {
        let transport = ScriptedTransport::new(|_| Ok(TransportResponse::new(429, "")));
        let mut cfg = config("http://proxy.local");
        cfg.retry.deadline = Duration::from_secs(10);
        let f = PagedFetcher::with_parts(cfg, transport, TokioSleeper);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(report.stop, StopReason::Deadline);
        assert!(report.records.is_empty());
        // 1 + 2 + 4 = 7s, then 8s more crosses the 10s budget.
        assert_eq!(f.transport.calls().len(), 4);
    }

    #[tokio::test]
    async fn non_200_keeps_what_was_gathered() {
        let transport = ScriptedTransport::sequence(vec![
            page(1..=2, Some("http://proxy.local/next")),
            TransportResponse::new(500, "upstream exploded"),
        ]);
        let f = fetcher(config("http://proxy.local"), transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(ids(&report), vec!["1", "2"]);
        assert_eq!(report.stop, StopReason::Terminal("HTTP 500".into()));
    }

    #[tokio::test]
    async fn missing_results_ends_pagination() {
        let transport = ScriptedTransport::sequence(vec![
            page(1..=1, Some("http://proxy.local/next")),
            TransportResponse::new(200, json!({"status": "OK"}).to_string()),
        ]);
        let f = fetcher(config("http://proxy.local"), transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert_eq!(ids(&report), vec!["1"]);
        assert!(matches!(report.stop, StopReason::Terminal(_)));
    }

    #[tokio::test]
    async fn error_status_in_body_is_terminal() {
        let transport = ScriptedTransport::sequence(vec![TransportResponse::new(
            200,
            json!({"status": "NOT_AUTHORIZED", "message": "plan does not include trades"}).to_string(),
        )]);
        let f = fetcher(config("http://proxy.local"), transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert!(report.records.is_empty());
        assert_eq!(
            report.stop,
            StopReason::Terminal("status NOT_AUTHORIZED: plan does not include trades".into())
        );
    }

    #[tokio::test]
    async fn undecodable_body_discards_everything() {
        let transport = ScriptedTransport::sequence(vec![
            page(1..=3, Some("http://proxy.local/next")),
            TransportResponse::new(200, "<html>gateway</html>"),
        ]);
        let f = fetcher(config("http://proxy.local"), transport);

        let report = f.fetch::<TradeTick>("AMD", &day()).await;

        assert!(report.records.is_empty());
        assert_eq!(report.pages, 1);
        assert!(matches!(report.stop, StopReason::Failed(_)));
    }

    #[test]
    fn continuation_on_vendor_host_moves_to_base() {
        let f = fetcher(
            config("http://10.1.2.3/polygon"),
            ScriptedTransport::sequence(vec![]),
        );
        let next = f
            .rebase_continuation("https://api.polygon.io/v3/quotes/AMD?cursor=YWJj")
            .unwrap();
        assert_eq!(next.as_str(), "http://10.1.2.3/polygon/v3/quotes/AMD?cursor=YWJj");

        let relative = f.rebase_continuation("/v3/quotes/AMD?cursor=cmVs").unwrap();
        assert_eq!(relative.as_str(), "http://10.1.2.3/polygon/v3/quotes/AMD?cursor=cmVs");

        let other = f
            .rebase_continuation("https://elsewhere.example/v3/quotes/AMD?cursor=1")
            .unwrap();
        assert_eq!(other.host_str(), Some("elsewhere.example"));
    }

    #[test]
    fn continuation_kept_when_base_is_vendor() {
        let f = fetcher(config(VENDOR_BASE_URL), ScriptedTransport::sequence(vec![]));
        let next = f
            .rebase_continuation("https://api.polygon.io/v3/trades/AMD?cursor=abc")
            .unwrap();
        assert_eq!(next.as_str(), "https://api.polygon.io/v3/trades/AMD?cursor=abc");
        assert_eq!(
            f.rebase_continuation("/v3/trades/AMD?cursor=rel").unwrap().as_str(),
            "https://api.polygon.io/v3/trades/AMD?cursor=rel"
        );
    }
}
