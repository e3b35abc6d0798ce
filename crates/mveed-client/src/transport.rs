//! Shared HTTP plumbing: client construction, auth headers, body decoding.

use std::time::Instant;

use mveed_models::ErrorPayload;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::metrics;
use crate::storage::TokenStore;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP client plus the config and credentials every request needs.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    config: ClientConfig,
    tokens: TokenStore,
}

impl Transport {
    pub fn new(config: ClientConfig, tokens: TokenStore) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::Network)?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Attach `X-API-Key` (when configured) and the cached bearer token.
    pub async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request;
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.header(API_KEY_HEADER, key);
        }
        if let Some(token) = self.tokens.current_token().await {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send and record latency/outcome under `operation`.
    pub async fn send(&self, operation: &str, request: RequestBuilder) -> ClientResult<Response> {
        let started = Instant::now();
        let result = request.send().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let success = matches!(&result, Ok(r) if r.status().is_success());
        metrics::record_request(operation, success, elapsed_ms);

        match &result {
            Ok(response) => debug!(
                operation,
                status = response.status().as_u16(),
                elapsed_ms,
                "Request finished"
            ),
            Err(e) => debug!(operation, elapsed_ms, "Request failed: {}", e),
        }

        result.map_err(ClientError::Network)
    }
}

/// Read an error body; unreadable or non-JSON bodies yield an empty payload.
pub async fn read_error_payload(response: Response) -> ErrorPayload {
    match response.bytes().await {
        Ok(bytes) => ErrorPayload::from_bytes(&bytes),
        Err(_) => ErrorPayload::default(),
    }
}

/// Decode a successful JSON body, reporting shape problems as `InvalidResponse`.
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::invalid_response(format!("Malformed response body: {}", e)))
}

/// Generic error parse used by the account and auto-post endpoints.
pub async fn generic_error(response: Response, fallback: &str) -> ClientError {
    let status = response.status().as_u16();
    let payload = read_error_payload(response).await;
    ClientError::server(status, payload.message().unwrap_or_else(|| fallback.to_string()))
}
