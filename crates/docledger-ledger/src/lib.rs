//! Docledger Ledger Library
//!
//! Everything the client needs from the blockchain side: the wallet provider
//! boundary, the process-wide connection manager, and the gateway to the
//! document registry contract, all over Ethereum JSON-RPC.

pub mod abi;
pub mod connection;
pub mod contract;
pub mod error;
pub mod rpc;
pub mod wallet;

// Re-export commonly used types
pub use connection::ConnectionManager;
pub use contract::{ContractBinding, ContractGateway, JsonRpcLedger, LedgerTransport, TransactionReceipt};
pub use error::{ConnectionError, ContractError};
pub use rpc::{JsonRpcClient, RpcError};
pub use wallet::{JsonRpcWallet, WalletProvider};
