//! Report dispatcher — ships a [`ConsolidatedRecord`] to the rendering
//! collaborator and relays whatever it answers.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::ReportConfig;
use crate::error::AppError;
use crate::lookup::ConsolidatedRecord;

pub const RENDER_DISPATCH_FAILED: &str = "render_dispatch_failed";

/// What the caller gets back from [`ReportDispatcher::dispatch_report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderedReport {
    /// The collaborator's JSON body, untouched (`{document}` or `{error}`).
    Relayed(Value),
    /// The collaborator could not be reached or answered with non-JSON.
    DispatchFailed { error: String, cause: String },
}

impl RenderedReport {
    fn dispatch_failed(cause: impl Into<String>) -> Self {
        RenderedReport::DispatchFailed { error: RENDER_DISPATCH_FAILED.to_string(), cause: cause.into() }
    }

    pub fn is_dispatch_failure(&self) -> bool {
        matches!(self, RenderedReport::DispatchFailed { .. })
    }
}

/// HTTP client for the rendering collaborator. One attempt per call.
#[derive(Debug, Clone)]
pub struct ReportDispatcher {
    client: Client,
    render_url: String,
}

impl ReportDispatcher {
    pub fn new(config: &ReportConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Http(format!("failed to build report client: {e}")))?;

        Ok(Self { client, render_url: config.render_url.clone() })
    }

    pub async fn dispatch_report(&self, record: &ConsolidatedRecord) -> RenderedReport {
        debug!(url = %self.render_url, "dispatching consolidated record for rendering");

        let response = match self.client.post(&self.render_url).json(record).send().await {
            Ok(r) => r,
            Err(e) => {
                error!(url = %self.render_url, error = %e, "render dispatch failed (transport)");
                return RenderedReport::dispatch_failed(e.to_string());
            }
        };

        let status = response.status();
        match response.json::<Value>().await {
            Ok(body) => {
                debug!(%status, "render collaborator responded");
                RenderedReport::Relayed(body)
            }
            Err(e) => {
                error!(%status, error = %e, "render collaborator returned non-JSON body");
                RenderedReport::dispatch_failed(format!("invalid response body (HTTP {status}): {e}"))
            }
        }
    }
}
