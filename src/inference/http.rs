//! HTTP client for the inference service
//!
//! Each stage is a `POST <base_url>/<endpoint>` with a JSON body. Responses are
//! parsed as JSON when possible; a plain-text body is kept as a JSON string.

use super::client::{endpoint_for, InferenceClient};
use crate::cache::StageKind;
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Longest body excerpt carried in error messages
const MAX_ERROR_BODY: usize = 512;

pub struct HttpInferenceClient {
    base_url: String,
    http_client: Client,
    timeout: Duration,
}

impl HttpInferenceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BackendError::ConfigurationError {
                message: format!("Inference URL must start with http:// or https://: {}", base_url),
            });
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::ConfigurationError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url,
            http_client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, stage: StageKind) -> String {
        format!("{}/{}", self.base_url, endpoint_for(stage))
    }

    /// Returns `Ok(true)` if the service answers at its base URL
    ///
    /// Unreachable or timed-out services report `Ok(false)`; only unexpected
    /// transport errors are returned as `Err`.
    pub async fn health_check(&self) -> Result<bool, BackendError> {
        debug!("Checking inference service at {}", self.base_url);

        match self.http_client.get(&self.base_url).send().await {
            Ok(response) => {
                // Any HTTP answer means the service is up; many have no index route.
                let status = response.status();
                if status.is_server_error() {
                    warn!("Inference service health check failed with status: {}", status);
                    return Ok(false);
                }
                info!("Inference service reachable at {}", self.base_url);
                Ok(true)
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                warn!("Cannot reach inference service at {}: {}", self.base_url, e);
                Ok(false)
            }
            Err(e) => Err(BackendError::NetworkError {
                message: format!("Health check failed: {}", e),
            }),
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            error!("Inference request timed out after {:?}", self.timeout);
            BackendError::timeout(self.timeout)
        } else if e.is_connect() {
            error!("Cannot connect to inference service at {}", self.base_url);
            BackendError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if e.is_builder() {
            BackendError::ConfigurationError {
                message: format!("Invalid request: {}", e),
            }
        } else {
            error!("Inference request error: {}", e);
            BackendError::NetworkError {
                message: format!("Request failed: {}", e),
            }
        }
    }
}

/// Maps a non-success status and its body to an error
pub fn status_error(status: StatusCode, body: &str) -> BackendError {
    BackendError::ApiError {
        message: format!("HTTP {}: {}", status, truncate(body, MAX_ERROR_BODY)),
        status_code: Some(status.as_u16()),
    }
}

/// Parses a success body: JSON if it is JSON, otherwise the raw text
pub fn parse_body(body: &str) -> Value {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn invoke(&self, stage: StageKind, payload: Value) -> Result<Value, BackendError> {
        let url = self.url_for(stage);
        debug!(stage = %stage, url = %url, "Sending inference request");

        let start = Instant::now();
        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            error!("Inference service returned error status {} for {}", status, stage);
            return Err(status_error(status, &body));
        }

        debug!(
            stage = %stage,
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Inference request completed"
        );
        Ok(parse_body(&body))
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl std::fmt::Debug for HttpInferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInferenceClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
