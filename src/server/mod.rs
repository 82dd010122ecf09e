//! Axum HTTP surface.
//!
//! ```text
//! lookup API (service.bind)
//!   GET  /health
//!   GET  /lookup?name=..&registry_id=..   → ConsolidatedRecord
//!   GET  /report?name=..&registry_id=..   → relayed render response
//!
//! render service (render.bind, feature `render-service`)
//!   POST /render                          → {document} | {error}
//! ```
//!
//! Each listener is an [`HttpListener`] component; cancelling the shared
//! token drains it through axum's graceful shutdown.

mod api;
#[cfg(feature = "render-service")]
mod render;

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregator::Aggregator;
use crate::error::AppError;
use crate::lookup::{RegistryLookup, SearchLookup};
use crate::report::ReportDispatcher;
use crate::runtime::{Component, ComponentFuture};

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state for the lookup API. Cheap to clone.
pub struct ApiState<R, S> {
    pub aggregator: Arc<Aggregator<R, S>>,
    pub dispatcher: Arc<ReportDispatcher>,
}

impl<R, S> ApiState<R, S> {
    pub fn new(aggregator: Aggregator<R, S>, dispatcher: ReportDispatcher) -> Self {
        Self { aggregator: Arc::new(aggregator), dispatcher: Arc::new(dispatcher) }
    }
}

impl<R, S> Clone for ApiState<R, S> {
    fn clone(&self) -> Self {
        Self { aggregator: Arc::clone(&self.aggregator), dispatcher: Arc::clone(&self.dispatcher) }
    }
}

// ── Routers ───────────────────────────────────────────────────────────────────

pub fn lookup_router<R, S>(state: ApiState<R, S>) -> Router
where
    R: RegistryLookup + 'static,
    S: SearchLookup + 'static,
{
    Router::new()
        .route("/health", get(api::health))
        .route("/lookup", get(api::lookup::<R, S>))
        .route("/report", get(api::report::<R, S>))
        .with_state(state)
}

#[cfg(feature = "render-service")]
pub fn render_router(renderer: Arc<crate::render::ReportRenderer>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/render", axum::routing::post(render::render))
        .with_state(renderer)
}

// ── HttpListener ──────────────────────────────────────────────────────────────

/// One bound router, run as a [`Component`].
pub struct HttpListener {
    id: String,
    bind_addr: String,
    router: Router,
}

impl HttpListener {
    pub fn new(id: impl Into<String>, bind_addr: impl Into<String>, router: Router) -> Self {
        Self { id: id.into(), bind_addr: bind_addr.into(), router }
    }
}

impl Component for HttpListener {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(serve(self.id, self.bind_addr, self.router, shutdown))
    }
}

async fn serve(id: String, bind_addr: String, router: Router, shutdown: CancellationToken) -> Result<(), AppError> {
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("{id}: bind failed on {bind_addr}: {e}")))?;

    info!(listener = %id, %bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("{id}: server error: {e}")))?;

    info!(listener = %id, "shut down");
    Ok(())
}
