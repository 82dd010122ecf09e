//! Rendering collaborator — turns a consolidated record into a Markdown
//! document through an LLM provider.
//!
//! The prompt lives in a plain-text template (`config/prompts/report.txt`)
//! with a single `{{data}}` placeholder, substituted with the pretty-printed
//! request body.

use std::fs;

use serde_json::Value;
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::AppError;
use crate::llm::{LlmProvider, ProviderError};

const DATA_PLACEHOLDER: &str = "{{data}}";

pub struct ReportRenderer {
    provider: LlmProvider,
    template: String,
}

impl ReportRenderer {
    /// Load the prompt template named by `config.prompt_path`.
    pub fn load(config: &RenderConfig, provider: LlmProvider) -> Result<Self, AppError> {
        let template = fs::read_to_string(&config.prompt_path).map_err(|e| {
            AppError::Config(format!("cannot read prompt template {}: {e}", config.prompt_path.display()))
        })?;
        Self::from_template(template, provider)
    }

    pub fn from_template(template: impl Into<String>, provider: LlmProvider) -> Result<Self, AppError> {
        let template = template.into();
        if !template.contains(DATA_PLACEHOLDER) {
            return Err(AppError::Config(format!("prompt template is missing {DATA_PLACEHOLDER}")));
        }
        Ok(Self { provider, template })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn prompt_for(&self, data: &Value) -> String {
        let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
        self.template.trim().replace(DATA_PLACEHOLDER, &pretty)
    }

    /// Ask the provider for a Markdown report about `data`.
    pub async fn render(&self, data: &Value) -> Result<String, ProviderError> {
        let prompt = self.prompt_for(data);
        debug!(provider = self.provider.name(), prompt_len = prompt.len(), "rendering report");
        let text = self.provider.complete(&prompt).await?;
        Ok(text.trim().to_string())
    }
}

/// `false` for bodies that carry nothing to report on: `null`, `{}`, `[]`, `""`.
pub fn has_data(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::String(s) => !s.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}
