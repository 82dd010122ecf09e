//! Company lookup — process entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at the configured level
//!   4. Build provider clients, aggregator and report dispatcher
//!   5. Spawn the lookup API (and render service, when enabled)
//!   6. Run until Ctrl-C or a listener fails

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use company_lookup::aggregator::Aggregator;
use company_lookup::config::{self, Config};
use company_lookup::error::AppError;
use company_lookup::logger;
use company_lookup::lookup::{registry::RegistryClient, search::SearchClient};
use company_lookup::report::ReportDispatcher;
use company_lookup::runtime::{Component, spawn_components};
use company_lookup::server::{ApiState, HttpListener, lookup_router};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level, false)?;

    info!(
        bind = %config.service.bind,
        render_enabled = config.render.enabled,
        render_url = %config.report.render_url,
        log_level = %config.log_level,
        "config loaded"
    );

    let components = build_components(&config)?;

    let shutdown = CancellationToken::new();
    let handle = spawn_components(components, shutdown.clone());

    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received, shutting down"),
            Err(e) => warn!("failed to listen for ctrl-c: {e}"),
        }
        ctrl_c_token.cancel();
    });

    handle.join().await
}

fn build_components(config: &Config) -> Result<Vec<Box<dyn Component>>, AppError> {
    let registry = RegistryClient::new(&config.registry)?;
    let search = SearchClient::new(&config.search, config.search_api_key.clone())?;
    let aggregator = Aggregator::new(registry, search, config.registry.name_fields.clone());
    let dispatcher = ReportDispatcher::new(&config.report)?;

    let mut components: Vec<Box<dyn Component>> = vec![Box::new(HttpListener::new(
        "lookup-api",
        config.service.bind.clone(),
        lookup_router(ApiState::new(aggregator, dispatcher)),
    ))];

    if config.render.enabled {
        components.push(render_component(config)?);
    }

    Ok(components)
}

#[cfg(feature = "render-service")]
fn render_component(config: &Config) -> Result<Box<dyn Component>, AppError> {
    use std::sync::Arc;

    use company_lookup::llm::providers;
    use company_lookup::render::ReportRenderer;
    use company_lookup::server::render_router;

    let provider = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;
    let renderer = ReportRenderer::load(&config.render, provider)?;
    info!(provider = renderer.provider_name(), bind = %config.render.bind, "render service enabled");

    Ok(Box::new(HttpListener::new("render-service", config.render.bind.clone(), render_router(Arc::new(renderer)))))
}

#[cfg(not(feature = "render-service"))]
fn render_component(_config: &Config) -> Result<Box<dyn Component>, AppError> {
    Err(AppError::Config(
        "render.enabled = true but this build lacks the `render-service` feature".into(),
    ))
}
