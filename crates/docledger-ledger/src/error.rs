use docledger_core::{LogLevel, UserFacing};
use thiserror::Error;

/// Wallet connection errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("User rejected the connection request")]
    UserRejected,
}

impl UserFacing for ConnectionError {
    fn error_code(&self) -> &'static str {
        match self {
            ConnectionError::WalletUnavailable(_) => "WALLET_UNAVAILABLE",
            ConnectionError::UserRejected => "USER_REJECTED",
        }
    }

    fn user_message(&self) -> String {
        match self {
            ConnectionError::WalletUnavailable(_) => {
                "No compatible wallet was found. Install or start a wallet and try again.".to_string()
            }
            ConnectionError::UserRejected => "The wallet connection request was declined.".to_string(),
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ConnectionError::WalletUnavailable(_) => LogLevel::Warn,
            ConnectionError::UserRejected => LogLevel::Debug,
        }
    }
}

/// Contract binding and invocation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No wallet connection")]
    NoConnection,

    #[error("Transaction rejected by the signer")]
    TransactionRejected,

    #[error("Transaction reverted: {reason}")]
    TransactionReverted { reason: String },

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl UserFacing for ContractError {
    fn error_code(&self) -> &'static str {
        match self {
            ContractError::InvalidAddress(_) => "INVALID_ADDRESS",
            ContractError::NoConnection => "NO_CONNECTION",
            ContractError::TransactionRejected => "TRANSACTION_REJECTED",
            ContractError::TransactionReverted { .. } => "TRANSACTION_REVERTED",
            ContractError::NetworkError(_) => "NETWORK_ERROR",
        }
    }

    fn user_message(&self) -> String {
        match self {
            ContractError::InvalidAddress(_) => "The contract address is not valid.".to_string(),
            ContractError::NoConnection => {
                "Connect a wallet account before registering documents.".to_string()
            }
            ContractError::TransactionRejected => {
                "The registration was not signed in the wallet.".to_string()
            }
            ContractError::TransactionReverted { .. } => {
                "The ledger rejected the registration.".to_string()
            }
            ContractError::NetworkError(_) => "The ledger could not be reached.".to_string(),
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, ContractError::InvalidAddress(_))
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ContractError::TransactionRejected => LogLevel::Debug,
            ContractError::NoConnection | ContractError::InvalidAddress(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
