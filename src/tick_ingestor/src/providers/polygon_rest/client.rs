use std::time::Duration;

use secrecy::SecretString;
use shared_utils::env::get_env_var;
use snafu::ResultExt;
use url::Url;

use crate::providers::{
    InvalidBaseUrlSnafu, MissingEnvVarSnafu, ProviderInitError, polygon_rest::retry::RetryPolicy,
};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "POLYGON_API_KEY";

/// Public vendor origin. Continuation URLs pointing here are rebased onto the
/// configured base URL when the two differ (e.g. when routing through a proxy host).
pub const VENDOR_BASE_URL: &str = "https://api.polygon.io";

/// Explicit HTTP client configuration, built once per run and handed to the fetcher.
#[derive(Debug)]
pub struct ClientConfig {
    /// Root every endpoint path is joined onto. Always ends with `/`.
    pub base_url: Url,
    pub api_key: SecretString,
    /// Proxy applied to every request, e.g. `http://10.0.0.5:80`.
    pub proxy: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Page-size limit sent with every request.
    pub page_limit: u32,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, ProviderInitError> {
        let mut url = Url::parse(base_url).context(InvalidBaseUrlSnafu { url: base_url })?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            base_url: url,
            api_key,
            proxy: None,
            request_timeout: Duration::from_secs(30),
            page_limit: 50_000,
            retry: RetryPolicy::default(),
        })
    }

    /// Like [`ClientConfig::new`], reading the key from [`API_KEY_ENV`].
    pub fn from_env(base_url: &str) -> Result<Self, ProviderInitError> {
        let key = get_env_var(API_KEY_ENV).context(MissingEnvVarSnafu)?;
        Self::new(base_url, SecretString::new(key.into()))
    }
}
