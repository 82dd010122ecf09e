//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory, called once at startup.

pub mod dummy;
pub mod openai_compatible;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from `LLM_API_KEY` / `GROQ_API_KEY` (never TOML).
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "openai" | "openai-compatible" | "groq" => {
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn builds_dummy() {
        let cfg = Config::test_default().llm;
        assert_eq!(build(&cfg, None).unwrap().name(), "dummy");
    }

    #[test]
    fn builds_openai_compatible_aliases() {
        let mut cfg = Config::test_default().llm;
        for alias in ["openai", "openai-compatible", "groq"] {
            cfg.provider = alias.to_string();
            assert_eq!(build(&cfg, Some("key".into())).unwrap().name(), "openai");
        }
    }

    #[test]
    fn unknown_provider_errors() {
        let mut cfg = Config::test_default().llm;
        cfg.provider = "mystery".into();
        assert!(matches!(build(&cfg, None), Err(ProviderError::UnknownProvider(p)) if p == "mystery"));
    }
}
