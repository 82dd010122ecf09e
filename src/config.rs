//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `COMPANY_LOOKUP_LOG_LEVEL` and `COMPANY_LOOKUP_BIND` env
//! overrides. Provider secrets are only ever read from the environment.

use std::{env, fs, path::Path, path::PathBuf};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;

/// Lookup API listener configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address for the lookup API.
    pub bind: String,
}

/// Company-registry provider configuration (`[registry]`).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL; the identifier is appended as the last path segment.
    pub base_url: String,
    pub timeout_seconds: u64,
    /// `User-Agent` sent with every registry call.
    pub user_agent: String,
    /// Payload fields checked, in order, when deriving a company name.
    pub name_fields: Vec<String>,
}

/// Web-search provider configuration (`[search]`).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Appended to every query to bias results toward companies.
    pub query_suffix: String,
    /// `gl` locale parameter.
    pub country: String,
    /// `hl` locale parameter.
    pub language: String,
}

/// Report dispatcher configuration (`[report]`).
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Endpoint of the rendering collaborator.
    pub render_url: String,
    pub timeout_seconds: u64,
}

/// In-process render service configuration (`[render]`).
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Whether this process also hosts the render service.
    pub enabled: bool,
    pub bind: String,
    /// Prompt template containing a `{{data}}` placeholder.
    pub prompt_path: PathBuf,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration used by the render service.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"openai"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub service: ServiceConfig,
    pub registry: RegistryConfig,
    pub search: SearchConfig,
    pub report: ReportConfig,
    pub render: RenderConfig,
    pub llm: LlmConfig,
    /// From `SERPAPI_KEY`. Never sourced from TOML.
    pub search_api_key: Option<String>,
    /// From `LLM_API_KEY`, falling back to `GROQ_API_KEY`. Never sourced from TOML.
    pub llm_api_key: Option<String>,
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    service: RawService,
    #[serde(default)]
    registry: RawRegistry,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    report: RawReport,
    #[serde(default)]
    render: RawRender,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawService {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_service_bind")]
    bind: String,
}

impl Default for RawService {
    fn default() -> Self {
        Self { log_level: default_log_level(), bind: default_service_bind() }
    }
}

#[derive(Deserialize)]
struct RawRegistry {
    #[serde(default = "default_registry_base_url")]
    base_url: String,
    #[serde(default = "default_registry_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    user_agent: String,
    #[serde(default = "default_name_fields")]
    name_fields: Vec<String>,
}

impl Default for RawRegistry {
    fn default() -> Self {
        Self {
            base_url: default_registry_base_url(),
            timeout_seconds: default_registry_timeout_seconds(),
            user_agent: default_user_agent(),
            name_fields: default_name_fields(),
        }
    }
}

#[derive(Deserialize)]
struct RawSearch {
    #[serde(default = "default_search_base_url")]
    base_url: String,
    #[serde(default = "default_search_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_query_suffix")]
    query_suffix: String,
    #[serde(default = "default_country")]
    country: String,
    #[serde(default = "default_language")]
    language: String,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            timeout_seconds: default_search_timeout_seconds(),
            query_suffix: default_query_suffix(),
            country: default_country(),
            language: default_language(),
        }
    }
}

#[derive(Deserialize)]
struct RawReport {
    #[serde(default = "default_render_url")]
    render_url: String,
    #[serde(default = "default_llm_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawReport {
    fn default() -> Self {
        Self { render_url: default_render_url(), timeout_seconds: default_llm_timeout_seconds() }
    }
}

#[derive(Deserialize)]
struct RawRender {
    /// Defaults to `true`: the render service runs alongside the lookup API.
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_render_bind")]
    bind: String,
    #[serde(default = "default_prompt_path")]
    prompt_path: String,
}

impl Default for RawRender {
    fn default() -> Self {
        Self { enabled: true, bind: default_render_bind(), prompt_path: default_prompt_path() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_service_bind() -> String { "127.0.0.1:5000".to_string() }
fn default_registry_base_url() -> String { "https://www.receitaws.com.br/v1/cnpj".to_string() }
fn default_registry_timeout_seconds() -> u64 { 10 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}
fn default_name_fields() -> Vec<String> { vec!["nome".to_string(), "razao_social".to_string()] }
fn default_search_base_url() -> String { "https://serpapi.com/search".to_string() }
fn default_search_timeout_seconds() -> u64 { 20 }
fn default_query_suffix() -> String { "empresa".to_string() }
fn default_country() -> String { "br".to_string() }
fn default_language() -> String { "pt".to_string() }
fn default_render_url() -> String { "http://127.0.0.1:5001/render".to_string() }
fn default_render_bind() -> String { "127.0.0.1:5001".to_string() }
fn default_prompt_path() -> String { "config/prompts/report.txt".to_string() }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_openai_api_base_url() -> String { "https://api.groq.com/openai/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "llama3-8b-8192".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_llm_timeout_seconds() -> u64 { 60 }

fn default_true() -> bool {
    true
}

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let log_level_override = env::var("COMPANY_LOOKUP_LOG_LEVEL").ok();
    let bind_override = env::var("COMPANY_LOOKUP_BIND").ok();
    load_from(
        Path::new("config/default.toml"),
        log_level_override.as_deref(),
        bind_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    bind_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let log_level = log_level_override.unwrap_or(&parsed.service.log_level).to_string();
    logger::parse_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;

    let name_fields: Vec<String> = parsed
        .registry
        .name_fields
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    if name_fields.is_empty() {
        return Err(AppError::Config("registry.name_fields must list at least one field".into()));
    }

    Ok(Config {
        log_level,
        service: ServiceConfig {
            bind: bind_override.unwrap_or(&parsed.service.bind).to_string(),
        },
        registry: RegistryConfig {
            base_url: parsed.registry.base_url,
            timeout_seconds: parsed.registry.timeout_seconds,
            user_agent: parsed.registry.user_agent,
            name_fields,
        },
        search: SearchConfig {
            base_url: parsed.search.base_url,
            timeout_seconds: parsed.search.timeout_seconds,
            query_suffix: parsed.search.query_suffix.trim().to_string(),
            country: parsed.search.country,
            language: parsed.search.language,
        },
        report: ReportConfig {
            render_url: parsed.report.render_url,
            timeout_seconds: parsed.report.timeout_seconds,
        },
        render: RenderConfig {
            enabled: parsed.render.enabled,
            bind: parsed.render.bind,
            prompt_path: PathBuf::from(parsed.render.prompt_path),
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        search_api_key: non_empty_env("SERPAPI_KEY"),
        llm_api_key: non_empty_env("LLM_API_KEY").or_else(|| non_empty_env("GROQ_API_KEY")),
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — dummy LLM, no API keys, loopback URLs.
impl Config {
    pub fn test_default() -> Self {
        Self {
            log_level: "info".into(),
            service: ServiceConfig { bind: "127.0.0.1:0".into() },
            registry: RegistryConfig {
                base_url: "http://127.0.0.1:1/cnpj".into(),
                timeout_seconds: 1,
                user_agent: "company-lookup-test".into(),
                name_fields: default_name_fields(),
            },
            search: SearchConfig {
                base_url: "http://127.0.0.1:1/search".into(),
                timeout_seconds: 1,
                query_suffix: default_query_suffix(),
                country: default_country(),
                language: default_language(),
            },
            report: ReportConfig {
                render_url: "http://127.0.0.1:1/render".into(),
                timeout_seconds: 1,
            },
            render: RenderConfig {
                enabled: false,
                bind: "127.0.0.1:0".into(),
                prompt_path: PathBuf::from(default_prompt_path()),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://127.0.0.1:1/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            search_api_key: None,
            llm_api_key: None,
        }
    }
}
