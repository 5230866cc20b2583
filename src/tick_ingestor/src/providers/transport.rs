//! Single-request HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use snafu::{Backtrace, ResultExt, Snafu};
use url::Url;

use crate::providers::{
    ClientBuildSnafu, InvalidProxySnafu, ProviderInitError, polygon_rest::client::ClientConfig,
    polygon_rest::params::QueryParams,
};

/// Status code and raw body of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Errors raised while sending one request.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransportError {
    /// No response arrived within the per-request timeout.
    #[snafu(display("request timed out after {timeout:?}"))]
    Timeout { timeout: Duration },

    /// Any other failure (connection refused, TLS, body read, ...).
    #[snafu(display("request failed: {source}"))]
    Request {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

/// Issues one GET request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url, query: &QueryParams) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] over a shared `reqwest` client.
///
/// The client (connection pool, proxy, timeout) is built once per run from a
/// [`ClientConfig`] and only read afterwards.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ProviderInitError> {
        let mut builder = Client::builder().timeout(config.request_timeout);
        if let Some(proxy) = &config.proxy {
            let proxy_cfg = reqwest::Proxy::all(proxy.as_str())
                .context(InvalidProxySnafu { proxy: proxy.clone() })?;
            builder = builder.proxy(proxy_cfg);
        }
        let client = builder.build().context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            timeout: config.request_timeout,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, query: &QueryParams) -> Result<TransportResponse, TransportError> {
        let result = async {
            let response = self.client.get(url.clone()).query(query).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(TransportResponse { status, body })
        }
        .await;

        match result {
            Ok(response) => Ok(response),
            Err(e) if e.is_timeout() => Err(TransportError::Timeout {
                timeout: self.timeout,
            }),
            Err(e) => Err(e).context(RequestSnafu),
        }
    }
}
