//! Router configuration.
//!
//! Layered the usual way: built-in defaults, then an optional TOML/YAML/JSON
//! file, then `SORX__*` environment variables (`SORX__RETRY__MAX_RETRIES=5`).

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::market_data::adapters::{coinbase, gemini};
use crate::market_data::normaliser::Normaliser;
use crate::market_data::retry::RetryPolicy;

/// Upper bound on the summed sleeps of one fully throttled fetch.
pub const MAX_TOTAL_BACKOFF: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Minimum spacing between accepted calls to the same endpoint.
    pub min_interval_secs: f64,
    pub retry: RetryConfig,
    pub http: HttpConfig,
    pub normaliser: NormaliserConfig,
    pub gemini: VenueConfig,
    pub coinbase: VenueConfig,
    pub metrics_listen: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_secs: f64,
    pub backoff_factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: f64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormaliserConfig {
    pub price_decimals: u32,
    pub size_decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub base_url: String,
    pub symbol: String,
}

fn enabled() -> bool {
    true
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 2.0,
            retry: RetryConfig::default(),
            http: HttpConfig::default(),
            normaliser: NormaliserConfig::default(),
            gemini: VenueConfig {
                enabled: true,
                base_url: gemini::DEFAULT_BASE_URL.into(),
                symbol: "BTCUSD".into(),
            },
            coinbase: VenueConfig {
                enabled: true,
                base_url: coinbase::DEFAULT_BASE_URL.into(),
                symbol: "BTC-USD".into(),
            },
            metrics_listen: "0.0.0.0:9000".into(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay_secs: 2.0, backoff_factor: 2.0 }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10.0,
            user_agent: concat!("sorx-rs/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Default for NormaliserConfig {
    fn default() -> Self {
        Self { price_decimals: 8, size_decimals: 8 }
    }
}

fn secs(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::Message(format!("{field}: {e}")))
}

impl RouterConfig {
    /// Load from `path` (extension optional, file may be absent) plus the environment.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let cfg: RouterConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SORX").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.min_interval()?;
        self.http_timeout()?;
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 1.0 {
            return Err(ConfigError::Message(format!(
                "retry.backoff_factor must be >= 1, got {}",
                self.retry.backoff_factor
            )));
        }
        let total = self.retry_policy()?.total_backoff();
        if total > MAX_TOTAL_BACKOFF {
            return Err(ConfigError::Message(format!(
                "retry schedule sleeps {total:?} in total, limit is {MAX_TOTAL_BACKOFF:?}"
            )));
        }
        if !self.gemini.enabled && !self.coinbase.enabled {
            return Err(ConfigError::Message("at least one venue must be enabled".into()));
        }
        Ok(())
    }

    pub fn min_interval(&self) -> Result<Duration, ConfigError> {
        secs("min_interval_secs", self.min_interval_secs)
    }

    pub fn http_timeout(&self) -> Result<Duration, ConfigError> {
        secs("http.timeout_secs", self.http.timeout_secs)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_delay: secs("retry.initial_delay_secs", self.retry.initial_delay_secs)?,
            backoff_factor: self.retry.backoff_factor,
        })
    }

    pub fn normaliser(&self) -> Normaliser {
        Normaliser::new(self.normaliser.price_decimals, self.normaliser.size_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RouterConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.min_interval().unwrap(), Duration::from_secs(2));
        assert_eq!(cfg.retry_policy().unwrap(), RetryPolicy::default());
        assert_eq!(cfg.normaliser(), Normaliser::default());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let cfg = RouterConfig::load("definitely/not/here/sorx").unwrap();
        assert_eq!(cfg.gemini.symbol, "BTCUSD");
        assert_eq!(cfg.coinbase.symbol, "BTC-USD");
    }

    #[test]
    fn test_file_overrides() {
        let dir = std::env::temp_dir().join(format!("sorx-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sorx.toml");
        let toml = r#"
min_interval_secs = 0.5

[retry]
max_retries = 5

[coinbase]
enabled = false
base_url = "http://x"
symbol = "ETH-USD"
"#;
        std::fs::write(&path, toml).unwrap();
        let cfg = RouterConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.min_interval().unwrap(), Duration::from_millis(500));
        assert_eq!(cfg.retry.max_retries, 5);
        assert_eq!(cfg.retry.initial_delay_secs, 2.0);
        assert!(!cfg.coinbase.enabled);
        assert!(cfg.gemini.enabled);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = RouterConfig::default();
        cfg.retry.backoff_factor = 0.5;
        assert!(cfg.validate().is_err());

        let mut cfg = RouterConfig::default();
        cfg.min_interval_secs = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = RouterConfig::default();
        cfg.gemini.enabled = false;
        cfg.coinbase.enabled = false;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_unbounded_backoff() {
        let mut cfg = RouterConfig::default();
        cfg.retry.backoff_factor = 1e30;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("retry schedule"), "{err}");

        // 2s * (2^40 - 1) overflows nothing but is far past the limit
        let mut cfg = RouterConfig::default();
        cfg.retry.max_retries = 40;
        assert!(cfg.validate().is_err());

        // 2 + 4 + ... + 1024 = 2046s stays inside it
        let mut cfg = RouterConfig::default();
        cfg.retry.max_retries = 10;
        cfg.validate().unwrap();
    }
}
