//! Provider abstraction for tick data sources.
//!
//! This module defines the [`TickSource`] trait, the unified interface the
//! orchestrator uses to pull raw trades and quotes for one time window, and the
//! seams the concrete fetcher is built on:
//!
//! - [`transport::Transport`]: one HTTP GET. Implemented over `reqwest` by
//!   [`transport::ReqwestTransport`], and by scripted fakes in tests.
//! - [`sleep::Sleeper`]: the only way the fetcher and orchestrator pause, so the
//!   backoff schedule can be observed without waiting for it.
//!
//! Fetches never fail: rate limits and timeouts are retried internally, terminal
//! vendor responses end pagination early, and anything unexpected is reported as
//! an empty [`FetchReport`]. The report says which of these happened.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use tick_ingestor::models::{tick::{QuoteTick, TradeTick}, window::TimeFilter};
//! use tick_ingestor::providers::{FetchReport, StopReason, TickSource};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl TickSource for Empty {
//!     async fn fetch_trades(&self, _symbol: &str, _filter: &TimeFilter) -> FetchReport<TradeTick> {
//!         FetchReport::empty(StopReason::Exhausted)
//!     }
//!     async fn fetch_quotes(&self, _symbol: &str, _filter: &TimeFilter) -> FetchReport<QuoteTick> {
//!         FetchReport::empty(StopReason::Exhausted)
//!     }
//! }
//! ```

pub mod polygon_rest;
pub mod sleep;
pub mod transport;

use std::fmt;

use async_trait::async_trait;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{
    tick::{QuoteTick, TradeTick},
    window::TimeFilter,
};

/// Source of raw ticks for one symbol and time filter.
#[async_trait]
pub trait TickSource: Send + Sync {
    /// All trades matching `filter`, in vendor (ascending) order.
    async fn fetch_trades(&self, symbol: &str, filter: &TimeFilter) -> FetchReport<TradeTick>;

    /// All quotes matching `filter`, in vendor (ascending) order.
    async fn fetch_quotes(&self, symbol: &str, filter: &TimeFilter) -> FetchReport<QuoteTick>;
}

/// Why a paginated fetch stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The last page carried no continuation reference.
    Exhausted,
    /// The overall wall-clock deadline elapsed before the next request.
    Deadline,
    /// The vendor answered with something that ends pagination (non-200,
    /// error status, missing `results`, unusable cursor). Records gathered so far are kept.
    Terminal(String),
    /// An unexpected failure. The report carries no records.
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => write!(f, "exhausted"),
            StopReason::Deadline => write!(f, "deadline reached"),
            StopReason::Terminal(reason) => write!(f, "terminal response: {reason}"),
            StopReason::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of one paginated fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport<T> {
    /// Concatenation of every decoded page, in page order.
    pub records: Vec<T>,
    /// Pages that returned a `results` array.
    pub pages: usize,
    /// Raw records that failed validation and were discarded.
    pub dropped: usize,
    pub stop: StopReason,
}

impl<T> FetchReport<T> {
    pub fn empty(stop: StopReason) -> Self {
        Self {
            records: Vec::new(),
            pages: 0,
            dropped: 0,
            stop,
        }
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

/// Errors that can occur during the creation of a provider instance.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The proxy URL was rejected by the HTTP client.
    #[snafu(display("Invalid proxy {proxy}: {source}"))]
    InvalidProxy {
        proxy: String,
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The configured base URL could not be parsed.
    #[snafu(display("Invalid base URL {url}: {source}"))]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
        backtrace: Backtrace,
    },
}
