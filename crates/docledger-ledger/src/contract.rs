//! Ledger Contract Gateway
//!
//! Binds to the deployed document registry and exposes its one write method
//! and three read methods as typed async calls. Nothing read from the ledger
//! is cached.

use async_trait::async_trait;
use docledger_core::{is_valid_address, DocumentRecord, RegistrationRecord};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::abi::{self, AbiError, Token};
use crate::connection::ConnectionManager;
use crate::error::ContractError;
use crate::rpc::{JsonRpcClient, RpcError, EXECUTION_REVERTED_CODE, USER_REJECTED_CODE};

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Raw ledger access the gateway is built on.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Execute a read-only call against `to`.
    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError>;

    /// Submit a transaction for signing by `from`; returns the transaction hash.
    async fn send_transaction(&self, from: &str, to: &str, data: &[u8]) -> Result<String, RpcError>;

    /// Receipt for `hash`, or `None` while the transaction is pending.
    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>, RpcError>;
}

/// Ledger reached over Ethereum JSON-RPC.
#[derive(Debug)]
pub struct JsonRpcLedger {
    rpc: JsonRpcClient,
}

impl JsonRpcLedger {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn parse_quantity(value: &str) -> Option<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).ok()
}

impl From<RpcReceipt> for TransactionReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.as_deref().and_then(parse_quantity),
            // Pre-Byzantium receipts carry no status; treat them as successful.
            success: receipt.status.as_deref().and_then(parse_quantity).map_or(true, |s| s == 1),
        }
    }
}

fn hex_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

#[async_trait]
impl LedgerTransport for JsonRpcLedger {
    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let result: String = self
            .rpc
            .request("eth_call", json!([{ "to": to, "data": hex_data(data) }, "latest"]))
            .await?;
        abi::decode_hex(&result).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }

    async fn send_transaction(&self, from: &str, to: &str, data: &[u8]) -> Result<String, RpcError> {
        self.rpc
            .request(
                "eth_sendTransaction",
                json!([{ "from": from, "to": to, "data": hex_data(data) }]),
            )
            .await
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
        let receipt: Option<RpcReceipt> = self
            .rpc
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        Ok(receipt.map(TransactionReceipt::from))
    }
}

/// Map a write-path RPC failure onto the contract error taxonomy.
fn map_write_error(err: RpcError) -> ContractError {
    match err {
        RpcError::Remote { code, .. } if code == USER_REJECTED_CODE => ContractError::TransactionRejected,
        RpcError::Remote {
            code,
            message,
            data,
        } if code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert") => {
            let reason = data
                .as_ref()
                .and_then(revert_payload)
                .and_then(|payload| abi::decode_revert_reason(&payload))
                .unwrap_or(message);
            ContractError::TransactionReverted { reason }
        }
        other => ContractError::NetworkError(other.to_string()),
    }
}

/// Revert data is either a bare hex string or nested under `data`.
fn revert_payload(data: &Value) -> Option<Vec<u8>> {
    match data {
        Value::String(hex) => abi::decode_hex(hex).ok(),
        Value::Object(map) => map.get("data").and_then(revert_payload),
        _ => None,
    }
}

fn map_read_error(err: RpcError) -> ContractError {
    ContractError::NetworkError(err.to_string())
}

fn map_decode_error(err: AbiError) -> ContractError {
    ContractError::NetworkError(err.to_string())
}

fn address_token(address: &str) -> Result<Token, ContractError> {
    Token::address(address).map_err(|_| ContractError::InvalidAddress(address.to_string()))
}

/// Creates bindings to the registry contract.
pub struct ContractGateway {
    transport: Arc<dyn LedgerTransport>,
    connection: Arc<ConnectionManager>,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl ContractGateway {
    pub fn new(
        transport: Arc<dyn LedgerTransport>,
        connection: Arc<ConnectionManager>,
        poll_interval: Duration,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            connection,
            poll_interval,
            confirmation_timeout,
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Bind to the contract deployed at `address`.
    ///
    /// Requires a well-formed address and a wallet connection that still holds
    /// an account.
    pub fn bind(&self, address: &str) -> Result<ContractBinding, ContractError> {
        let address = address.trim();
        if !is_valid_address(address) {
            return Err(ContractError::InvalidAddress(address.to_string()));
        }
        if !self.connection.is_connected() {
            return Err(ContractError::NoConnection);
        }

        tracing::info!(contract = %address, "Bound to registry contract");

        Ok(ContractBinding {
            address: address.to_string(),
            transport: self.transport.clone(),
            poll_interval: self.poll_interval,
            confirmation_timeout: self.confirmation_timeout,
        })
    }
}

/// A usable handle to the deployed registry.
#[derive(Clone)]
pub struct ContractBinding {
    address: String,
    transport: Arc<dyn LedgerTransport>,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl std::fmt::Debug for ContractBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractBinding")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl ContractBinding {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Submit `registerDocument` signed by `from` and wait for confirmation.
    #[tracing::instrument(skip(self, record), fields(contract = %self.address, document = %record.document_name()))]
    pub async fn submit_registration(
        &self,
        record: &RegistrationRecord,
        from: &str,
    ) -> Result<TransactionReceipt, ContractError> {
        let data = abi::encode_call(
            abi::REGISTER_DOCUMENT,
            &[
                address_token(record.receiver_address())?,
                Token::String(record.document_name().to_string()),
                Token::String(record.description().to_string()),
                Token::String(record.storage_reference().to_string()),
                Token::Uint(u128::from(record.document_type().code())),
            ],
        );

        let hash = self
            .transport
            .send_transaction(from, &self.address, &data)
            .await
            .map_err(map_write_error)?;

        tracing::info!(tx = %hash, "Registration submitted, awaiting confirmation");

        let receipt = self.wait_for_receipt(&hash).await?;
        if !receipt.success {
            return Err(ContractError::TransactionReverted {
                reason: format!("transaction {} failed on-chain", receipt.transaction_hash),
            });
        }

        tracing::info!(tx = %hash, block = ?receipt.block_number, "Registration confirmed");
        Ok(receipt)
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<TransactionReceipt, ContractError> {
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            if let Some(receipt) = self
                .transport
                .transaction_receipt(hash)
                .await
                .map_err(map_read_error)?
            {
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                return Err(ContractError::NetworkError(format!(
                    "transaction {} not confirmed within {:?}",
                    hash, self.confirmation_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn read(&self, data: Vec<u8>) -> Result<Vec<u8>, ContractError> {
        self.transport
            .call(&self.address, &data)
            .await
            .map_err(map_read_error)
    }

    /// Number of documents registered for `owner`.
    pub async fn document_count(&self, owner: &str) -> Result<u64, ContractError> {
        let data = abi::encode_call(abi::DOCUMENT_COUNT, &[address_token(owner)?]);
        let output = self.read(data).await?;
        abi::decode_uint(&output).map_err(map_decode_error)
    }

    /// Titles of the documents registered for `owner`.
    pub async fn document_titles(&self, owner: &str) -> Result<Vec<String>, ContractError> {
        let data = abi::encode_call(abi::DOCUMENT_TITLES, &[address_token(owner)?]);
        let output = self.read(data).await?;
        abi::decode_string_array(&output).map_err(map_decode_error)
    }

    /// The document registered for `owner` under `title`.
    pub async fn document_by_title(&self, owner: &str, title: &str) -> Result<DocumentRecord, ContractError> {
        let data = abi::encode_call(
            abi::DOCUMENT_BY_TITLE,
            &[address_token(owner)?, Token::String(title.to_string())],
        );
        let output = self.read(data).await?;
        abi::decode_document(&output).map_err(map_decode_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::WalletProvider;
    use crate::error::ConnectionError;
    use docledger_core::{DocumentType, RegistrationForm, StorageReference};
    use std::sync::Mutex;

    const CONTRACT: &str = "0xd9145CCE52D386f254917e481eB44e9943F39138";
    const RECEIVER: &str = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4";
    const SENDER: &str = "0xAb8483F64d9C6d1EcF9b849Ae677dD3315835cb2";

    struct StaticWallet;

    #[async_trait]
    impl WalletProvider for StaticWallet {
        async fn request_accounts(&self) -> Result<Vec<String>, ConnectionError> {
            Ok(vec![SENDER.to_string()])
        }

        async fn accounts(&self) -> Result<Vec<String>, ConnectionError> {
            Ok(vec![SENDER.to_string()])
        }
    }

    #[derive(Default)]
    struct FakeLedger {
        send_result: Mutex<Option<Result<String, RpcError>>>,
        pending_polls: Mutex<u32>,
        receipt_success: bool,
        call_output: Vec<u8>,
        sent: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    #[async_trait]
    impl LedgerTransport for FakeLedger {
        async fn call(&self, _to: &str, _data: &[u8]) -> Result<Vec<u8>, RpcError> {
            Ok(self.call_output.clone())
        }

        async fn send_transaction(&self, from: &str, to: &str, data: &[u8]) -> Result<String, RpcError> {
            self.sent
                .lock()
                .unwrap()
                .push((from.to_string(), to.to_string(), data.to_vec()));
            self.send_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok("0xfeed".to_string()))
        }

        async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
            let mut pending = self.pending_polls.lock().unwrap();
            if *pending > 0 {
                *pending -= 1;
                return Ok(None);
            }
            Ok(Some(TransactionReceipt {
                transaction_hash: hash.to_string(),
                block_number: Some(42),
                success: self.receipt_success,
            }))
        }
    }

    async fn connected_gateway(ledger: Arc<FakeLedger>) -> ContractGateway {
        let connection = Arc::new(ConnectionManager::new(Arc::new(StaticWallet)));
        connection.request_connection().await.unwrap();
        ContractGateway::new(ledger, connection, Duration::from_millis(1), Duration::from_secs(1))
    }

    fn record() -> RegistrationRecord {
        let form = RegistrationForm::new(RECEIVER, "Vaccine Record", "2nd dose", DocumentType(2));
        RegistrationRecord::from_form(&form, &StorageReference::new("cid-123")).unwrap()
    }

    #[tokio::test]
    async fn bind_rejects_malformed_address() {
        let gateway = connected_gateway(Arc::new(FakeLedger::default())).await;
        assert!(matches!(gateway.bind("0xnope"), Err(ContractError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn bind_requires_connection() {
        let connection = Arc::new(ConnectionManager::new(Arc::new(StaticWallet)));
        let gateway = ContractGateway::new(
            Arc::new(FakeLedger::default()),
            connection,
            Duration::from_millis(1),
            Duration::from_secs(1),
        );
        assert_eq!(gateway.bind(CONTRACT).unwrap_err(), ContractError::NoConnection);
    }

    #[tokio::test]
    async fn bind_after_disconnect_has_no_connection() {
        let gateway = connected_gateway(Arc::new(FakeLedger::default())).await;
        assert!(gateway.bind(CONTRACT).is_ok());

        gateway.connection().accounts_changed(Vec::<String>::new());

        assert_eq!(gateway.bind(CONTRACT).unwrap_err(), ContractError::NoConnection);
    }

    #[tokio::test]
    async fn submit_waits_for_receipt() {
        let ledger = Arc::new(FakeLedger {
            pending_polls: Mutex::new(3),
            receipt_success: true,
            ..Default::default()
        });
        let binding = connected_gateway(ledger.clone()).await.bind(CONTRACT).unwrap();

        let receipt = binding.submit_registration(&record(), SENDER).await.unwrap();

        assert_eq!(receipt.transaction_hash, "0xfeed");
        assert_eq!(receipt.block_number, Some(42));
        let sent = ledger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, SENDER);
        assert_eq!(sent[0].1, CONTRACT);
        assert_eq!(&sent[0].2[..4], &abi::selector(abi::REGISTER_DOCUMENT));
    }

    #[tokio::test]
    async fn failed_receipt_is_reverted() {
        let ledger = Arc::new(FakeLedger::default());
        let binding = connected_gateway(ledger).await.bind(CONTRACT).unwrap();

        let err = binding.submit_registration(&record(), SENDER).await.unwrap_err();
        assert!(matches!(err, ContractError::TransactionReverted { .. }));
    }

    #[tokio::test]
    async fn unconfirmed_transaction_times_out_as_network_error() {
        let ledger = Arc::new(FakeLedger {
            pending_polls: Mutex::new(u32::MAX),
            ..Default::default()
        });
        let connection = Arc::new(ConnectionManager::new(Arc::new(StaticWallet)));
        connection.request_connection().await.unwrap();
        let gateway = ContractGateway::new(ledger, connection, Duration::from_millis(1), Duration::from_millis(20));
        let binding = gateway.bind(CONTRACT).unwrap();

        let err = binding.submit_registration(&record(), SENDER).await.unwrap_err();
        assert!(matches!(err, ContractError::NetworkError(_)));
    }

    #[test]
    fn write_errors_map_to_taxonomy() {
        assert_eq!(
            map_write_error(RpcError::Remote {
                code: USER_REJECTED_CODE,
                message: "User denied transaction signature.".into(),
                data: None,
            }),
            ContractError::TransactionRejected
        );

        let mut revert = vec![0x08, 0xc3, 0x79, 0xa0];
        revert.extend_from_slice(&abi::encode(&[Token::String("Unauthorized".into())]));
        assert_eq!(
            map_write_error(RpcError::Remote {
                code: EXECUTION_REVERTED_CODE,
                message: "execution reverted: Unauthorized".into(),
                data: Some(Value::String(hex_data(&revert))),
            }),
            ContractError::TransactionReverted {
                reason: "Unauthorized".into()
            }
        );

        assert!(matches!(
            map_write_error(RpcError::Transport("connection refused".into())),
            ContractError::NetworkError(_)
        ));
    }

    #[tokio::test]
    async fn reads_decode_contract_output() {
        let mut output = vec![0u8; 32];
        output[31] = 3;
        let ledger = Arc::new(FakeLedger {
            call_output: output,
            ..Default::default()
        });
        let binding = connected_gateway(ledger).await.bind(CONTRACT).unwrap();

        assert_eq!(binding.document_count(RECEIVER).await.unwrap(), 3);
        assert!(matches!(
            binding.document_titles(RECEIVER).await,
            Err(ContractError::NetworkError(_))
        ));
    }

    #[test]
    fn receipt_status_parsing() {
        let receipt: TransactionReceipt = RpcReceipt {
            transaction_hash: "0x1".into(),
            block_number: Some("0x2a".into()),
            status: Some("0x0".into()),
        }
        .into();
        assert_eq!(receipt.block_number, Some(42));
        assert!(!receipt.success);
    }
}
