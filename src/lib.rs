//! Company lookup — aggregates a company's registry record and web-search
//! footprint, and hands the result to an LLM-backed renderer.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod logger;
pub mod lookup;
pub mod report;
pub mod runtime;
pub mod server;

#[cfg(feature = "render-service")]
pub mod llm;
#[cfg(feature = "render-service")]
pub mod render;
