//! Provider lookups and the tagged result values they produce.
//!
//! Both provider clients classify every outcome at the client boundary:
//! callers only ever see [`SearchResult`] / [`RegistryRecord`], never raw
//! provider JSON with an error hiding inside a `200 OK`.
//!
//! The [`RegistryLookup`] and [`SearchLookup`] seams exist so the
//! [`Aggregator`](crate::aggregator::Aggregator) can be driven by fakes in
//! tests. They are consumed as generics, not trait objects.

pub mod registry;
pub mod search;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ── Request ───────────────────────────────────────────────────────────────────

/// One inbound lookup. At least one field is expected to be set; the
/// transport layer enforces that, the aggregator only tolerates absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LookupRequest {
    #[serde(default, alias = "nome")]
    pub name: Option<String>,
    #[serde(default, alias = "cnpj")]
    pub registry_id: Option<String>,
}

impl LookupRequest {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), registry_id: None }
    }

    pub fn by_registry_id(registry_id: impl Into<String>) -> Self {
        Self { name: None, registry_id: Some(registry_id.into()) }
    }

    /// Supplied name, with blank strings treated as absent.
    pub fn name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    /// Supplied registry identifier, with blank strings treated as absent.
    pub fn registry_id(&self) -> Option<&str> {
        non_blank(self.registry_id.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.name().is_none() && self.registry_id().is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// ── Failures ──────────────────────────────────────────────────────────────────

/// Why a single provider lookup produced no usable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Blank registry identifier; no call was made.
    MissingIdentifier,
    /// Registry identifier with characters other than ASCII letters and
    /// digits; no call was made.
    InvalidIdentifier,
    /// Blank search query; no call was made.
    MissingQuery,
    /// Connection, timeout or other transport failure.
    #[serde(rename = "transport_error")]
    Transport,
    /// Body was not the JSON shape the provider documents.
    MalformedResponse,
    /// Provider reported a logical error inside a readable response.
    ProviderError,
    /// Registry answered successfully with an empty payload.
    EmptyResponse,
    /// Search provider explicitly said nothing matched.
    NoResults,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::MissingIdentifier => "missing_identifier",
            FailureKind::InvalidIdentifier => "invalid_identifier",
            FailureKind::MissingQuery => "missing_query",
            FailureKind::Transport => "transport_error",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::ProviderError => "provider_error",
            FailureKind::EmptyResponse => "empty_response",
            FailureKind::NoResults => "no_results",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed lookup failure, carried as data inside the consolidated record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct LookupFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl LookupFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }
}

// ── Per-source outcomes ───────────────────────────────────────────────────────

/// Outcome of a web-search lookup. `Ok` with no results is a valid answer,
/// distinct from `Failed(NoResults)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchResult {
    Ok {
        /// The query actually used (before the provider suffix).
        query: String,
        results: Vec<Value>,
    },
    Failed(LookupFailure),
}

impl SearchResult {
    pub fn failed(kind: FailureKind, detail: impl Into<String>) -> Self {
        SearchResult::Failed(LookupFailure::new(kind, detail))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SearchResult::Ok { .. })
    }

    pub fn results(&self) -> Option<&[Value]> {
        match self {
            SearchResult::Ok { results, .. } => Some(results),
            SearchResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&LookupFailure> {
        match self {
            SearchResult::Failed(f) => Some(f),
            SearchResult::Ok { .. } => None,
        }
    }
}

/// Outcome of a company-registry lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistryRecord {
    Ok { data: Map<String, Value> },
    Failed(LookupFailure),
}

impl RegistryRecord {
    pub fn failed(kind: FailureKind, detail: impl Into<String>) -> Self {
        RegistryRecord::Failed(LookupFailure::new(kind, detail))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RegistryRecord::Ok { .. })
    }

    pub fn failure(&self) -> Option<&LookupFailure> {
        match self {
            RegistryRecord::Failed(f) => Some(f),
            RegistryRecord::Ok { .. } => None,
        }
    }

    /// First non-blank string among `fields`, checked in priority order.
    /// Always `None` for a failed lookup.
    pub fn company_name<S: AsRef<str>>(&self, fields: &[S]) -> Option<&str> {
        let RegistryRecord::Ok { data } = self else {
            return None;
        };
        fields.iter().find_map(|field| {
            data.get(field.as_ref())
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
    }
}

// ── Consolidated record ───────────────────────────────────────────────────────

/// Merged result for one request. A key is present iff that lookup was
/// attempted; emptiness and failure live inside the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryRecord>,
}

// ── Client seams ──────────────────────────────────────────────────────────────

/// Anything that can resolve a registry identifier. Never fails: every
/// error is folded into the returned [`RegistryRecord`].
pub trait RegistryLookup: Send + Sync {
    fn lookup_registry(&self, registry_id: &str) -> impl Future<Output = RegistryRecord> + Send;
}

/// Anything that can run a free-text company search. Never fails: every
/// error is folded into the returned [`SearchResult`].
pub trait SearchLookup: Send + Sync {
    fn lookup_search(&self, query: &str) -> impl Future<Output = SearchResult> + Send;
}
