//! Client configuration, layered with Figment.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Environment variables (`TESTAMENT_*` prefix)

use crate::core::constants::{
    DEFAULT_CONFIRMATIONS, DEFAULT_CONTRACT_ADDRESS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RPC_URL,
};
use alloy::primitives::Address;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for overrides.
///
/// Example: `TESTAMENT_RPC_URL` -> `rpc_url`
pub const ENV_PREFIX: &str = "TESTAMENT_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestamentConfig {
    /// JSON-RPC endpoint of the wallet/node
    pub rpc_url: String,
    pub contract_address: String,
    /// Blocks required on top of the inclusion block before a write is final
    pub confirmations: u64,
    /// Upper bound on the finality wait, unbounded when absent
    pub finality_timeout_secs: Option<u64>,
    pub poll_interval_ms: u64,
}

impl Default for TestamentConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            confirmations: DEFAULT_CONFIRMATIONS,
            finality_timeout_secs: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl TestamentConfig {
    /// Layered provider without extraction, useful for custom merges
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path)
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        debug!(
            "[config] rpc_url={} contract={} confirmations={}",
            config.rpc_url, config.contract_address, config.confirmations
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_url is empty".to_string()));
        }
        self.contract()?;
        if self.confirmations == 0 {
            return Err(ConfigError::Invalid(
                "confirmations must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed contract address
    pub fn contract(&self) -> Result<Address, ConfigError> {
        Address::from_str(self.contract_address.trim()).map_err(|e| {
            ConfigError::Invalid(format!(
                "contract_address {}: {}",
                self.contract_address, e
            ))
        })
    }

    pub fn finality_timeout(&self) -> Option<Duration> {
        self.finality_timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid() {
        let config = TestamentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.contract_address, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(config.finality_timeout(), None);
    }

    #[test]
    fn test_file_then_env_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "testament.toml",
                r#"
                rpc_url = "http://file:8545"
                confirmations = 3
                finality_timeout_secs = 120
                "#,
            )?;
            jail.set_env("TESTAMENT_RPC_URL", "http://env:8545");

            let config = TestamentConfig::load(Some(Path::new("testament.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.rpc_url, "http://env:8545");
            assert_eq!(config.confirmations, 3);
            assert_eq!(config.finality_timeout(), Some(Duration::from_secs(120)));
            assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = TestamentConfig {
            contract_address: "not-an-address".to_string(),
            ..TestamentConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = TestamentConfig {
            confirmations: 0,
            ..TestamentConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
