//! Pinata IPFS backend
//!
//! Publishes through the Pinata v3 files API on the public network and fetches
//! through a dedicated Pinata gateway.

use crate::traits::{ContentStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use docledger_core::{FetchedContent, StorageReference};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Pinata storage implementation
#[derive(Clone, Debug)]
pub struct PinataStorage {
    client: Client,
    jwt: String,
    upload_url: String,
    gateway_url: String,
    gateway_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    cid: String,
}

impl PinataStorage {
    /// Create a new PinataStorage instance
    ///
    /// # Arguments
    /// * `jwt` - Pinata API JWT
    /// * `gateway` - Dedicated gateway host, with or without scheme (e.g. "example.mypinata.cloud")
    /// * `upload_url` - Upload API base (e.g. "https://uploads.pinata.cloud")
    /// * `gateway_token` - Optional gateway access token
    /// * `timeout` - Per-request timeout
    pub fn new(
        jwt: String,
        gateway: &str,
        upload_url: &str,
        gateway_token: Option<String>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            jwt,
            upload_url: upload_url.trim_end_matches('/').to_string(),
            gateway_url: normalize_gateway(gateway),
            gateway_token,
        })
    }

    fn upload_endpoint(&self) -> String {
        format!("{}/v3/files", self.upload_url)
    }

    fn gateway_endpoint(&self, reference: &StorageReference) -> String {
        format!(
            "{}/ipfs/{}",
            self.gateway_url,
            urlencoding::encode(reference.as_str())
        )
    }
}

/// Gateways are configured as bare hosts in most setups; default to https.
fn normalize_gateway(gateway: &str) -> String {
    let gateway = gateway.trim().trim_end_matches('/');
    if gateway.starts_with("http://") || gateway.starts_with("https://") {
        gateway.to_string()
    } else {
        format!("https://{}", gateway)
    }
}

fn parse_upload_response(body: &str) -> StorageResult<StorageReference> {
    let parsed: UploadResponse = serde_json::from_str(body).map_err(|e| {
        StorageError::UploadFailed(format!("Unexpected upload response: {}", e))
    })?;

    if parsed.data.cid.trim().is_empty() {
        return Err(StorageError::UploadFailed(
            "Upload response did not contain a content identifier".to_string(),
        ));
    }

    Ok(StorageReference::new(parsed.data.cid))
}

#[async_trait]
impl ContentStore for PinataStorage {
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    async fn publish(
        &self,
        data: Bytes,
        media_type: &str,
        name: &str,
    ) -> StorageResult<StorageReference> {
        let start = std::time::Instant::now();

        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(name.to_string())
            .mime_str(media_type)
            .map_err(|e| StorageError::UploadFailed(format!("Invalid media type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("network", "public")
            .text("name", name.to_string());

        let response = self
            .client
            .post(self.upload_endpoint())
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Failed to send upload: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, "Pinata upload rejected");
            return Err(StorageError::UploadFailed(format!(
                "Upload failed with status {}: {}",
                status, body
            )));
        }

        let reference = parse_upload_response(&body)?;

        tracing::info!(
            cid = %reference,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Pinata upload successful"
        );

        Ok(reference)
    }

    #[tracing::instrument(skip(self, reference), fields(cid = %reference))]
    async fn fetch(&self, reference: &StorageReference) -> StorageResult<FetchedContent> {
        let start = std::time::Instant::now();

        let mut request = self.client.get(self.gateway_endpoint(reference));
        if let Some(token) = &self.gateway_token {
            request = request.query(&[("pinataGatewayToken", token.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::RetrievalFailed(format!("Failed to send request: {}", e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound(reference.to_string())),
            status => {
                return Err(StorageError::RetrievalFailed(format!(
                    "Gateway responded with status {}",
                    status
                )))
            }
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_MEDIA_TYPE)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::RetrievalFailed(format!("Failed to read body: {}", e)))?;

        tracing::info!(
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Pinata gateway fetch successful"
        );

        Ok(FetchedContent { bytes, media_type })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Pinata
    }
}
