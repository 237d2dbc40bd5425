//! Wiring shared by the `docledger` binary: tracing setup and assembly of the
//! storage, wallet, ledger and orchestrator from configuration.

use anyhow::Context;
use docledger_core::{Config, UserFacing};
use docledger_ledger::{
    ConnectionManager, ContractBinding, ContractGateway, JsonRpcLedger, JsonRpcWallet,
};
use docledger_services::{DownloadDirectory, RegistrationOrchestrator};
use docledger_storage::create_storage;
use std::fmt::Display;
use std::sync::Arc;

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Convert a domain error into its user-facing message, keeping the code.
pub fn user_error(error: impl UserFacing + Display) -> anyhow::Error {
    tracing::debug!(error = %error, "Command failed");
    anyhow::anyhow!("{} [{}]", error.user_message(), error.error_code())
}

/// Everything a command needs, assembled once from configuration.
pub struct Client {
    pub config: Config,
    pub connection: Arc<ConnectionManager>,
    pub orchestrator: RegistrationOrchestrator,
}

impl Client {
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let storage = create_storage(&config)
            .await
            .context("Failed to initialize document storage")?;

        let wallet = JsonRpcWallet::new(&config.wallet_rpc_url, config.http_timeout())
            .context("Failed to create wallet client")?;
        let ledger = JsonRpcLedger::new(&config.ledger_rpc_url, config.http_timeout())
            .context("Failed to create ledger client")?;

        let connection = Arc::new(ConnectionManager::new(Arc::new(wallet)));
        let gateway = ContractGateway::new(
            Arc::new(ledger),
            connection.clone(),
            config.confirmation_poll_interval(),
            config.confirmation_timeout(),
        );

        let orchestrator = RegistrationOrchestrator::new(
            storage,
            gateway,
            Arc::new(DownloadDirectory::new(&config.download_dir)),
        )
        .with_contract_address(config.contract_address.clone());

        Ok(Self {
            config,
            connection,
            orchestrator,
        })
    }

    /// Connect the wallet and return the active account.
    pub async fn connect(&self) -> anyhow::Result<String> {
        let accounts = self
            .connection
            .request_connection()
            .await
            .map_err(user_error)?;
        accounts
            .active()
            .map(String::from)
            .context("The wallet did not authorize any account")
    }

    /// Bind the registry at `explicit`, or at the configured contract address.
    pub fn bind(&self, explicit: Option<&str>) -> anyhow::Result<ContractBinding> {
        let address = explicit
            .or(self.config.contract_address.as_deref())
            .context("No contract address. Pass --contract or set CONTRACT_ADDRESS")?;
        self.orchestrator.bind_contract(address).map_err(user_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docledger_core::StorageBackend;
    use docledger_ledger::ContractError;
    use tempfile::TempDir;

    fn local_config(temp_dir: &TempDir) -> Config {
        Config {
            storage_backend: StorageBackend::Local,
            local_storage_path: temp_dir.path().join("content").display().to_string(),
            download_dir: temp_dir.path().join("downloads").display().to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn builds_from_local_config() {
        let temp_dir = TempDir::new().unwrap();
        let client = Client::from_config(local_config(&temp_dir)).await.unwrap();

        assert!(client.connection.has_provider());
        assert!(!client.connection.is_established());
        assert!(!client.orchestrator.is_busy());
    }

    #[tokio::test]
    async fn bind_without_contract_address_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let client = Client::from_config(local_config(&temp_dir)).await.unwrap();

        let err = client.bind(None).unwrap_err();
        assert!(err.to_string().contains("CONTRACT_ADDRESS"));
    }

    #[test]
    fn user_error_shows_message_and_code() {
        let err = user_error(ContractError::NoConnection);
        let text = err.to_string();
        assert!(text.contains("Connect a wallet"));
        assert!(text.ends_with("[NO_CONNECTION]"));
    }
}
