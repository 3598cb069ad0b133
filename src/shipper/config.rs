//! Configuration consumed by the shipping client.
//!
//! A token switches the shipping backend on; the endpoint host and port may
//! be overridden.

use std::{env, num::NonZeroUsize, time::Duration};

use thiserror::Error;

use super::transport::{TcpTarget, TlsOptions};

/// Default ingestion host.
pub const LOG_ENTRIES_URL: &str = "data.logentries.com";
/// Default ingestion port. The collector also listens on 80, 443 and 514.
pub const LOG_ENTRIES_PORT: u16 = 10000;
/// Base delay between reconnection attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);
/// Ceiling for the reconnection delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(2 * 60);
/// Number of records buffered before producers block.
pub const DEFAULT_QUEUE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Environment variable holding the collector token.
pub const TOKEN_ENV: &str = "LOG_ENTRIES_TOKEN";
/// Environment variable overriding the collector host.
pub const ENDPOINT_ENV: &str = "LOG_ENTRIES_ENDPOINT";
/// Environment variable overriding the collector port.
pub const PORT_ENV: &str = "LOG_ENTRIES_PORT";

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var} value {value:?}: expected a TCP port")]
    InvalidPort { var: &'static str, value: String },
}

/// Exponential backoff bounds for reconnection attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: RETRY_DELAY,
            cap: MAX_RETRY_DELAY,
        }
    }
}

/// Everything needed to construct a [`ShippingClient`](super::ShippingClient).
#[derive(Clone, Debug)]
pub struct ShipperConfig {
    pub token: String,
    pub target: TcpTarget,
    pub capacity: NonZeroUsize,
    pub backoff: BackoffPolicy,
    /// `None` dials without a deadline.
    pub connect_timeout: Option<Duration>,
    /// `None` lets a stalled peer block writes indefinitely.
    pub write_timeout: Option<Duration>,
}

impl ShipperConfig {
    /// Configuration targeting the default collector endpoint.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            target: TcpTarget::new(LOG_ENTRIES_URL, LOG_ENTRIES_PORT),
            capacity: DEFAULT_QUEUE_CAPACITY,
            backoff: BackoffPolicy::default(),
            connect_timeout: None,
            write_timeout: None,
        }
    }

    /// Override the collector host and port.
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.target.host = host.into();
        self.target.port = port;
        self
    }

    /// Wrap the connection in TLS.
    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.target.tls = Some(tls);
        self
    }

    /// Override the queue capacity.
    pub fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Override the reconnection backoff bounds.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// `host:port` of the configured collector.
    pub fn endpoint(&self) -> String {
        self.target.endpoint()
    }

    /// Load configuration from the process environment.
    ///
    /// Returns `Ok(None)` when no token is set, which selects the local
    /// fallback backend.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let Some(token) = non_empty(TOKEN_ENV) else {
            return Ok(None);
        };
        let host = non_empty(ENDPOINT_ENV).unwrap_or_else(|| LOG_ENTRIES_URL.to_owned());
        let port = match non_empty(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort {
                var: PORT_ENV,
                value: raw.clone(),
            })?,
            None => LOG_ENTRIES_PORT,
        };
        Ok(Some(Self::new(token).with_endpoint(host, port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_selects_fallback() {
        let cfg = ShipperConfig::from_lookup(lookup(&[(ENDPOINT_ENV, "example.com")]))
            .expect("valid configuration");
        assert!(cfg.is_none());
    }

    #[test]
    fn empty_token_is_unset() {
        let cfg = ShipperConfig::from_lookup(lookup(&[(TOKEN_ENV, "")])).expect("valid");
        assert!(cfg.is_none());
    }

    #[test]
    fn token_uses_default_endpoint() {
        let cfg = ShipperConfig::from_lookup(lookup(&[(TOKEN_ENV, "abc")]))
            .expect("valid")
            .expect("token present");
        assert_eq!(cfg.token, "abc");
        assert_eq!(cfg.endpoint(), "data.logentries.com:10000");
        assert_eq!(cfg.capacity.get(), 1000);
        assert_eq!(cfg.backoff, BackoffPolicy::default());
        assert!(cfg.connect_timeout.is_none());
    }

    #[test]
    fn endpoint_and_port_are_overridable() {
        let cfg = ShipperConfig::from_lookup(lookup(&[
            (TOKEN_ENV, "abc"),
            (ENDPOINT_ENV, "collector.internal"),
            (PORT_ENV, "514"),
        ]))
        .expect("valid")
        .expect("token present");
        assert_eq!(cfg.endpoint(), "collector.internal:514");
    }

    #[test]
    fn rejects_bad_port() {
        let err = ShipperConfig::from_lookup(lookup(&[(TOKEN_ENV, "abc"), (PORT_ENV, "101010")]))
            .expect_err("port out of range");
        assert_eq!(
            err,
            ConfigError::InvalidPort {
                var: PORT_ENV,
                value: "101010".into()
            }
        );
    }
}
