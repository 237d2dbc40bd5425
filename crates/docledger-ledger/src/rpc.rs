//! Minimal JSON-RPC 2.0 client over HTTP, shared by the wallet and ledger boundaries.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// EIP-1193 "user rejected the request"
pub const USER_REJECTED_CODE: i64 = 4001;
/// JSON-RPC "method not found"
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;
/// Execution reverted, as reported by geth-compatible nodes
pub const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced a JSON-RPC response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// HTTP JSON-RPC client.
#[derive(Debug)]
pub struct JsonRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` with positional `params` and deserialize the result.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method = %method, id, url = %self.url, "Sending JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(format!("Failed to read response: {}", e)))?;

        match serde_json::from_str::<RpcResponse>(&body) {
            Ok(envelope) => decode_envelope(envelope),
            Err(_) if !status.is_success() => Err(RpcError::Transport(format!(
                "Endpoint responded with status {}",
                status
            ))),
            Err(e) => Err(RpcError::InvalidResponse(format!(
                "Response is not a JSON-RPC envelope: {}",
                e
            ))),
        }
    }
}

fn decode_envelope<T: DeserializeOwned>(envelope: RpcResponse) -> Result<T, RpcError> {
    if let Some(error) = envelope.error {
        return Err(RpcError::Remote {
            code: error.code,
            message: error.message,
            data: error.data,
        });
    }

    let result = envelope.result.unwrap_or(Value::Null);
    serde_json::from_value(result)
        .map_err(|e| RpcError::InvalidResponse(format!("Unexpected result shape: {}", e)))
}
