//! Wallet provider boundary
//!
//! The only wallet capabilities the client needs: ask for account access and
//! read the currently authorized accounts.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::error::ConnectionError;
use crate::rpc::{JsonRpcClient, RpcError, METHOD_NOT_FOUND_CODE, USER_REJECTED_CODE};

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet to authorize accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<String>, ConnectionError>;

    /// Accounts currently authorized, without prompting (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<String>, ConnectionError>;
}

/// Wallet reached over JSON-RPC (a local signer, or a development node with
/// unlocked accounts).
#[derive(Debug)]
pub struct JsonRpcWallet {
    rpc: JsonRpcClient,
}

impl JsonRpcWallet {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ConnectionError> {
        let rpc = JsonRpcClient::new(url, timeout)
            .map_err(|e| ConnectionError::WalletUnavailable(e.to_string()))?;
        Ok(Self { rpc })
    }
}

fn map_wallet_error(err: RpcError) -> ConnectionError {
    match err {
        RpcError::Remote { code, .. } if code == USER_REJECTED_CODE => ConnectionError::UserRejected,
        other => ConnectionError::WalletUnavailable(other.to_string()),
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, ConnectionError> {
        match self
            .rpc
            .request::<Vec<String>>("eth_requestAccounts", json!([]))
            .await
        {
            // Nodes that manage their own keys have no authorization prompt.
            Err(RpcError::Remote { code, .. }) if code == METHOD_NOT_FOUND_CODE => {
                tracing::debug!(url = %self.rpc.url(), "eth_requestAccounts unsupported, using eth_accounts");
                self.accounts().await
            }
            result => result.map_err(map_wallet_error),
        }
    }

    async fn accounts(&self) -> Result<Vec<String>, ConnectionError> {
        self.rpc
            .request::<Vec<String>>("eth_accounts", json!([]))
            .await
            .map_err(map_wallet_error)
    }
}
