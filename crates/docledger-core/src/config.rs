//! Configuration module
//!
//! Environment-driven settings for the storage network, the ledger endpoints
//! and the orchestration timings. A `.env` file is honored when present.

use std::env;
use std::time::Duration;

use crate::models::is_valid_address;
use crate::storage_types::StorageBackend;

// Common constants
const HTTP_TIMEOUT_SECS: u64 = 60;
const CONFIRMATION_POLL_INTERVAL_MS: u64 = 1000;
const CONFIRMATION_TIMEOUT_SECS: u64 = 300;
const ACCOUNT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_LEDGER_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_PINATA_UPLOAD_URL: &str = "https://uploads.pinata.cloud";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./data/content";
const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    // Storage network
    pub storage_backend: StorageBackend,
    pub pinata_jwt: Option<String>,
    pub pinata_gateway: Option<String>,
    pub pinata_gateway_token: Option<String>,
    pub pinata_upload_url: String,
    pub local_storage_path: String,
    // Ledger
    pub ledger_rpc_url: String,
    pub wallet_rpc_url: String,
    pub contract_address: Option<String>,
    // Timings
    pub http_timeout_secs: u64,
    pub confirmation_poll_interval_ms: u64,
    pub confirmation_timeout_secs: u64,
    pub account_poll_interval_ms: u64,
    // Retrieval
    pub download_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            storage_backend: StorageBackend::Local,
            pinata_jwt: None,
            pinata_gateway: None,
            pinata_gateway_token: None,
            pinata_upload_url: DEFAULT_PINATA_UPLOAD_URL.to_string(),
            local_storage_path: DEFAULT_LOCAL_STORAGE_PATH.to_string(),
            ledger_rpc_url: DEFAULT_LEDGER_RPC_URL.to_string(),
            wallet_rpc_url: DEFAULT_LEDGER_RPC_URL.to_string(),
            contract_address: None,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            confirmation_poll_interval_ms: CONFIRMATION_POLL_INTERVAL_MS,
            confirmation_timeout_secs: CONFIRMATION_TIMEOUT_SECS,
            account_poll_interval_ms: ACCOUNT_POLL_INTERVAL_MS,
            download_dir: DEFAULT_DOWNLOAD_DIR.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Pinata,
        };

        let ledger_rpc_url =
            env::var("LEDGER_RPC_URL").unwrap_or_else(|_| DEFAULT_LEDGER_RPC_URL.to_string());
        let wallet_rpc_url = env::var("WALLET_RPC_URL").unwrap_or_else(|_| ledger_rpc_url.clone());

        let config = Config {
            environment,
            storage_backend,
            pinata_jwt: non_empty_var("PINATA_JWT"),
            pinata_gateway: non_empty_var("PINATA_GATEWAY"),
            pinata_gateway_token: non_empty_var("PINATA_GATEWAY_TOKEN"),
            pinata_upload_url: env::var("PINATA_UPLOAD_URL")
                .unwrap_or_else(|_| DEFAULT_PINATA_UPLOAD_URL.to_string()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| DEFAULT_LOCAL_STORAGE_PATH.to_string()),
            ledger_rpc_url,
            wallet_rpc_url,
            contract_address: non_empty_var("CONTRACT_ADDRESS"),
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS),
            confirmation_poll_interval_ms: parse_var(
                "CONFIRMATION_POLL_INTERVAL_MS",
                CONFIRMATION_POLL_INTERVAL_MS,
            ),
            confirmation_timeout_secs: parse_var(
                "CONFIRMATION_TIMEOUT_SECS",
                CONFIRMATION_TIMEOUT_SECS,
            ),
            account_poll_interval_ms: parse_var("ACCOUNT_POLL_INTERVAL_MS", ACCOUNT_POLL_INTERVAL_MS),
            download_dir: env::var("DOWNLOAD_DIR").unwrap_or_else(|_| DEFAULT_DOWNLOAD_DIR.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::Pinata => {
                if self.pinata_jwt.is_none() {
                    return Err(anyhow::anyhow!(
                        "PINATA_JWT must be set when using the pinata storage backend"
                    ));
                }
                if self.pinata_gateway.is_none() {
                    return Err(anyhow::anyhow!(
                        "PINATA_GATEWAY must be set when using the pinata storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using the local storage backend"
                    ));
                }
            }
        }

        for (name, url) in [
            ("LEDGER_RPC_URL", &self.ledger_rpc_url),
            ("WALLET_RPC_URL", &self.wallet_rpc_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!("{} must be an http(s) URL", name));
            }
        }

        if let Some(address) = &self.contract_address {
            if !is_valid_address(address) {
                return Err(anyhow::anyhow!(
                    "CONTRACT_ADDRESS must be a 0x-prefixed 20-byte hex address"
                ));
            }
        }

        if self.confirmation_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "CONFIRMATION_POLL_INTERVAL_MS must be greater than zero"
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn account_poll_interval(&self) -> Duration {
        Duration::from_millis(self.account_poll_interval_ms)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr + ToString>(name: &str, default: T) -> T {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn pinata_backend_requires_credentials() {
        let mut config = Config {
            storage_backend: StorageBackend::Pinata,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.pinata_jwt = Some("jwt".to_string());
        assert!(config.validate().is_err());

        config.pinata_gateway = Some("example.mypinata.cloud".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_contract_address_is_rejected() {
        let config = Config {
            contract_address: Some("0x1234".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rpc_urls_must_be_http() {
        let config = Config {
            ledger_rpc_url: "ws://127.0.0.1:8546".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn durations_follow_fields() {
        let config = Config {
            confirmation_poll_interval_ms: 250,
            ..Config::default()
        };
        assert_eq!(config.confirmation_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.http_timeout(), Duration::from_secs(HTTP_TIMEOUT_SECS));
    }
}
