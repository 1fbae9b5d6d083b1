use crate::modules::chain::{ChainClient, ChainProvider};
use crate::modules::orchestrator::Orchestrator;
use crate::modules::rpc::{RpcClient, RpcError};
use crate::modules::wallet::{ConnectionManager, HttpWallet, Wallet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name} url {value:?}: {source}")]
    BadUrl {
        name: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("{name} must be http(s), got {value:?}")]
    BadScheme { name: &'static str, value: String },
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub rpc_url: String,
    /// `None` means the environment has no wallet.
    pub wallet_url: Option<String>,
    pub http_timeout: Duration,
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            wallet_url: None,
            http_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1000),
            confirmation_timeout: Duration::from_secs(600),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let non_empty = |k: &str| {
            get(k)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let number = |k: &str| non_empty(k).and_then(|s| s.parse::<u64>().ok());

        Self {
            rpc_url: non_empty("TOKEN_RPC_URL").unwrap_or(d.rpc_url),
            wallet_url: non_empty("TOKEN_WALLET_URL"),
            http_timeout: number("TOKEN_HTTP_TIMEOUT_SECS")
                .map(|s| Duration::from_secs(s.clamp(5, 300)))
                .unwrap_or(d.http_timeout),
            poll_interval: number("TOKEN_POLL_INTERVAL_MS")
                .map(|ms| Duration::from_millis(ms.clamp(50, 60_000)))
                .unwrap_or(d.poll_interval),
            confirmation_timeout: number("TOKEN_CONFIRM_TIMEOUT_SECS")
                .map(|s| Duration::from_secs(s.clamp(10, 3600)))
                .unwrap_or(d.confirmation_timeout),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("TOKEN_RPC_URL", &self.rpc_url)?;
        if let Some(w) = self.wallet_url.as_deref() {
            check_url("TOKEN_WALLET_URL", w)?;
        }
        Ok(())
    }

    /// Wire up transport, wallet and chain client into a ready-to-run orchestrator.
    pub fn build(&self) -> Result<Orchestrator, ConfigError> {
        self.validate()?;
        let provider: Arc<dyn ChainProvider> =
            Arc::new(RpcClient::new(self.rpc_url.clone(), self.http_timeout)?);
        let wallet: Option<Arc<dyn Wallet>> = match self.wallet_url.as_deref() {
            Some(url) => Some(Arc::new(HttpWallet::new(RpcClient::new(url, self.http_timeout)?))),
            None => None,
        };

        let chain = ChainClient::new(provider, wallet.clone())
            .with_confirmation(self.poll_interval, self.confirmation_timeout);
        Ok(Orchestrator::new(ConnectionManager::new(wallet), chain))
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::BadUrl {
        name,
        value: value.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ConfigError::BadScheme {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let c = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(c, ClientConfig::default());
        assert!(c.wallet_url.is_none());
    }

    #[test]
    fn values_are_clamped() {
        let c = ClientConfig::from_lookup(lookup(&[
            ("TOKEN_HTTP_TIMEOUT_SECS", "1"),
            ("TOKEN_POLL_INTERVAL_MS", "999999"),
            ("TOKEN_CONFIRM_TIMEOUT_SECS", "not-a-number"),
            ("TOKEN_WALLET_URL", "  "),
        ]));
        assert_eq!(c.http_timeout, Duration::from_secs(5));
        assert_eq!(c.poll_interval, Duration::from_millis(60_000));
        assert_eq!(c.confirmation_timeout, Duration::from_secs(600));
        assert!(c.wallet_url.is_none());
    }

    #[test]
    fn urls_are_checked() {
        let mut c = ClientConfig::from_lookup(lookup(&[("TOKEN_WALLET_URL", "http://127.0.0.1:1248")]));
        assert!(c.validate().is_ok());
        c.rpc_url = "ws://127.0.0.1:8546".to_string();
        assert!(matches!(c.validate(), Err(ConfigError::BadScheme { .. })));
        c.rpc_url = "not a url".to_string();
        assert!(matches!(c.validate(), Err(ConfigError::BadUrl { .. })));
    }
}
