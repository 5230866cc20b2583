//! Run configuration loaded from TOML.
//!
//! Every key is optional; omitted keys take the defaults below. The API key is
//! never part of the file: it is read from the environment when the HTTP client
//! is configured (see [`ClientConfig::from_env`]).
//!
//! ```toml
//! base_url = "http://10.0.0.5"
//! symbol = "AMD"
//! proxy = "http://10.0.0.5:80"
//! inter_window_delay_secs = 12
//! ```

use std::{num::NonZeroU32, path::Path, time::Duration};

use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    aggregate::quality::DEFAULT_MIN_TICKS,
    lookback::{DEFAULT_OFFSET_MINUTES, default_threshold},
    pipeline::windows::{
        MARKET_CLOSE, MARKET_OPEN, MOMENTUM_SESSION_MINUTES, MOMENTUM_SESSION_START, on_bar_grid,
    },
    providers::{
        ProviderInitError,
        polygon_rest::{ClientConfig, RetryPolicy, client::VENDOR_BASE_URL},
    },
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Every tunable of a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub base_url: String,
    pub symbol: String,
    /// IANA zone bars are aligned in and session times are local to.
    pub timezone: String,
    pub interval_minutes: u32,
    pub lookback_minutes: u32,
    pub signal_threshold: Decimal,
    pub min_ticks_per_window: usize,
    pub page_limit: u32,
    pub deadline_secs: u64,
    pub request_timeout_secs: u64,
    pub timeout_retry_delay_secs: u64,
    pub inter_window_delay_secs: u64,
    pub proxy: Option<String>,
    pub max_backoff_secs: Option<u64>,
    pub max_rate_limit_retries: Option<u32>,
    /// First intraday window start (`HH:MM:SS`).
    pub market_open: NaiveTime,
    /// Last intraday window start.
    pub market_close: NaiveTime,
    pub momentum_session_start: NaiveTime,
    pub momentum_session_minutes: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: VENDOR_BASE_URL.to_string(),
            symbol: "AMD".to_string(),
            timezone: "America/New_York".to_string(),
            interval_minutes: 15,
            lookback_minutes: DEFAULT_OFFSET_MINUTES,
            signal_threshold: default_threshold(),
            min_ticks_per_window: DEFAULT_MIN_TICKS,
            page_limit: 50_000,
            deadline_secs: 300,
            request_timeout_secs: 30,
            timeout_retry_delay_secs: 5,
            inter_window_delay_secs: 12,
            proxy: None,
            max_backoff_secs: None,
            max_rate_limit_retries: None,
            market_open: MARKET_OPEN,
            market_close: MARKET_CLOSE,
            momentum_session_start: MOMENTUM_SESSION_START,
            momentum_session_minutes: MOMENTUM_SESSION_MINUTES,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn load_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        if self.symbol.trim().is_empty() {
            return Err(invalid("symbol", "must not be empty"));
        }
        let Some(interval) = NonZeroU32::new(self.interval_minutes) else {
            return Err(invalid("interval_minutes", "must be at least 1"));
        };
        if !on_bar_grid(self.market_open, interval) {
            return Err(invalid(
                "market_open",
                format!(
                    "{} is not a boundary of {}-minute bars counted from midnight",
                    self.market_open, self.interval_minutes
                ),
            ));
        }
        if self.page_limit == 0 {
            return Err(invalid("page_limit", "must be at least 1"));
        }
        if self.market_close < self.market_open {
            return Err(invalid("market_close", "must not be before market_open"));
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| invalid("timezone", format!("unknown timezone {}", self.timezone)))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            deadline: Duration::from_secs(self.deadline_secs),
            timeout_retry_delay: Duration::from_secs(self.timeout_retry_delay_secs),
            max_backoff: self.max_backoff_secs.map(Duration::from_secs),
            max_rate_limit_retries: self.max_rate_limit_retries,
        }
    }

    pub fn inter_window_delay(&self) -> Duration {
        Duration::from_secs(self.inter_window_delay_secs)
    }

    /// HTTP client settings, with the API key taken from the environment.
    pub fn client_config(&self) -> Result<ClientConfig, ProviderInitError> {
        let mut client = ClientConfig::from_env(&self.base_url)?;
        client.proxy = self.proxy.clone();
        client.request_timeout = Duration::from_secs(self.request_timeout_secs);
        client.page_limit = self.page_limit;
        client.retry = self.retry_policy();
        Ok(client)
    }
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}
