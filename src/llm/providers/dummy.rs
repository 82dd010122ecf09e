//! Offline provider: wraps the prompt in a fixed Markdown draft.
//!
//! Output is a pure function of the prompt, so the render service can run
//! end to end (and be tested) without an API key.

use crate::llm::ProviderError;

pub const DRAFT_HEADING: &str = "# Company report (offline draft)";

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, content: &str) -> Result<String, ProviderError> {
        Ok(format!(
            "{DRAFT_HEADING}\n\nNo language model is configured. The prompt that would have been sent:\n\n```text\n{}\n```\n",
            content.trim()
        ))
    }
}
