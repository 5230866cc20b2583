//! Polygon-style v3 tick endpoints (`/v3/trades/{symbol}`, `/v3/quotes/{symbol}`).

pub mod client;
pub mod params;
pub mod provider;
pub mod response;
pub mod retry;

pub use client::ClientConfig;
pub use provider::PagedFetcher;
pub use retry::RetryPolicy;
