//! Tick ingestion from a Polygon-style REST API, interval bar aggregation and a
//! lookback momentum signal.
//!
//! Layers, leaf first:
//! - [`providers`]: paginated, rate-limit aware fetching of raw trades and quotes.
//! - [`aggregate`]: fixed-interval trade and quote bars in a target timezone.
//! - [`lookback`]: each trade joined to the trade `offset` minutes earlier.
//! - [`pipeline`]: window-by-window orchestration into a [`pipeline::MasterTable`].
//! - [`io`]: sinks the finished table is flushed to.

pub mod aggregate;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod io;
pub mod lookback;
pub mod models;
pub mod pipeline;
pub mod providers;
