//! Company-registry client (`GET <base_url>/{registry_id}`).
//!
//! The provider answers `200 OK` for most logical errors and flags them with
//! `"status": "ERROR"` in the body, so the body is always inspected before
//! the HTTP status.

use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use tracing::{debug, warn};

use super::{FailureKind, RegistryLookup, RegistryRecord};
use crate::config::RegistryConfig;
use crate::error::AppError;

/// HTTP client for the registry provider. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| AppError::Http(format!("failed to build registry client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Single attempt, no retries. Every failure comes back as a value.
    pub async fn lookup(&self, registry_id: &str) -> RegistryRecord {
        let Some(id) = normalize_registry_id(registry_id) else {
            return RegistryRecord::failed(FailureKind::MissingIdentifier, "registry identifier not provided");
        };
        // The id becomes a path segment verbatim.
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return RegistryRecord::failed(
                FailureKind::InvalidIdentifier,
                format!("registry identifier {id:?} must contain only letters and digits"),
            );
        }

        let url = format!("{}/{id}", self.base_url);
        debug!(%url, "registry lookup");

        let response = match self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(registry_id = %id, error = %e, is_timeout = e.is_timeout(), "registry request failed (transport)");
                return RegistryRecord::failed(FailureKind::Transport, format!("registry request failed: {e}"));
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => classify_response(status, &body),
            Err(e) => RegistryRecord::failed(FailureKind::Transport, format!("failed to read registry body: {e}")),
        }
    }
}

impl RegistryLookup for RegistryClient {
    async fn lookup_registry(&self, registry_id: &str) -> RegistryRecord {
        self.lookup(registry_id).await
    }
}

/// Trim the identifier and, when it contains digits, keep only the digits
/// (`12.345.678/0001-95` → `12345678000195`). `None` when nothing is left.
pub fn normalize_registry_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let normalized: String = if trimmed.chars().any(|c| c.is_ascii_digit()) {
        trimmed.chars().filter(char::is_ascii_digit).collect()
    } else {
        trimmed.to_string()
    };
    (!normalized.is_empty()).then_some(normalized)
}

/// Turn a raw provider response into a [`RegistryRecord`].
fn classify_response(status: StatusCode, body: &str) -> RegistryRecord {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return RegistryRecord::failed(
                FailureKind::MalformedResponse,
                format!("registry returned non-JSON body (HTTP {status}): {e}"),
            );
        }
    };

    let Value::Object(data) = parsed else {
        return RegistryRecord::failed(FailureKind::MalformedResponse, "registry body is not a JSON object");
    };

    if data.get("status").and_then(Value::as_str) == Some("ERROR") {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown reason");
        return RegistryRecord::failed(FailureKind::ProviderError, format!("registry lookup failed: {message}"));
    }

    if !status.is_success() {
        return RegistryRecord::failed(FailureKind::ProviderError, format!("registry returned HTTP {status}"));
    }

    if data.is_empty() {
        return RegistryRecord::failed(FailureKind::EmptyResponse, "registry returned an empty response");
    }

    RegistryRecord::Ok { data }
}
