//! Aggregation and fallback orchestration.
//!
//! Decides which provider calls to make for one [`LookupRequest`] and merges
//! the outcomes into a [`ConsolidatedRecord`]:
//!
//! ```text
//! name only         → search(name)
//! registry_id only  → registry(id), then search(name from registry) if one exists
//! both              → search(name) ‖ registry(id)   (concurrent, no fallback)
//! ```
//!
//! Fallback is one-directional: a search hit never triggers a registry
//! lookup. Nothing here returns `Err`; provider failures are data.

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::lookup::{
    ConsolidatedRecord, LookupRequest, RegistryLookup, RegistryRecord, SearchLookup, SearchResult,
};

pub struct Aggregator<R, S> {
    registry: R,
    search: S,
    /// Registry payload fields tried, in order, for fallback derivation.
    name_fields: Vec<String>,
}

impl<R: RegistryLookup, S: SearchLookup> Aggregator<R, S> {
    pub fn new(registry: R, search: S, name_fields: Vec<String>) -> Self {
        Self { registry, search, name_fields }
    }

    /// Run every lookup the request calls for. Always returns a record, even
    /// when every provider call failed.
    pub async fn aggregate(&self, request: &LookupRequest) -> ConsolidatedRecord {
        let request_id = Uuid::new_v4();
        let span = info_span!("aggregate", %request_id);
        async {
            let record = self.collect(request).await;
            log_outcome(&record);
            record
        }
        .instrument(span)
        .await
    }

    async fn collect(&self, request: &LookupRequest) -> ConsolidatedRecord {
        match (request.name(), request.registry_id()) {
            (Some(name), Some(registry_id)) => {
                // An explicit name disables fallback, so the two calls are independent.
                let (search, registry) = tokio::join!(
                    self.search.lookup_search(name),
                    self.registry.lookup_registry(registry_id),
                );
                ConsolidatedRecord { search: Some(search), registry: Some(registry) }
            }
            (Some(name), None) => ConsolidatedRecord {
                search: Some(self.search.lookup_search(name).await),
                registry: None,
            },
            (None, Some(registry_id)) => {
                let registry = self.registry.lookup_registry(registry_id).await;
                let search = match registry.company_name(&self.name_fields) {
                    Some(derived) => {
                        info!(derived_name = %derived, "no name supplied; searching by registry name");
                        Some(self.search.lookup_search(derived).await)
                    }
                    None => None,
                };
                ConsolidatedRecord { search, registry: Some(registry) }
            }
            (None, None) => {
                warn!("lookup request carries neither name nor registry id");
                ConsolidatedRecord::default()
            }
        }
    }
}

fn log_outcome(record: &ConsolidatedRecord) {
    let search = record.search.as_ref().map(|s| match s {
        SearchResult::Ok { results, .. } => format!("ok({})", results.len()),
        SearchResult::Failed(f) => f.kind.to_string(),
    });
    let registry = record.registry.as_ref().map(|r| match r {
        RegistryRecord::Ok { .. } => "ok".to_string(),
        RegistryRecord::Failed(f) => f.kind.to_string(),
    });
    info!(search = ?search, registry = ?registry, "aggregation complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::FailureKind;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeRegistry {
        outcome: RegistryRecord,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRegistry {
        fn returning(outcome: RegistryRecord) -> Self {
            Self { outcome, calls: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RegistryLookup for FakeRegistry {
        async fn lookup_registry(&self, registry_id: &str) -> RegistryRecord {
            self.calls.lock().unwrap().push(registry_id.to_string());
            self.outcome.clone()
        }
    }

    #[derive(Default)]
    struct FakeSearch {
        hits: HashMap<String, usize>,
        unreachable: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSearch {
        fn with_hits(query: &str, count: usize) -> Self {
            let mut hits = HashMap::new();
            hits.insert(query.to_string(), count);
            Self { hits, ..Self::default() }
        }

        fn unreachable() -> Self {
            Self { unreachable: true, ..Self::default() }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SearchLookup for FakeSearch {
        async fn lookup_search(&self, query: &str) -> SearchResult {
            self.calls.lock().unwrap().push(query.to_string());
            if self.unreachable {
                return SearchResult::failed(FailureKind::Transport, "connection refused");
            }
            match self.hits.get(query) {
                Some(&n) => SearchResult::Ok {
                    query: query.to_string(),
                    results: (0..n).map(|i| json!({"position": i + 1, "title": query})).collect(),
                },
                None => SearchResult::failed(FailureKind::NoResults, "nothing found"),
            }
        }
    }

    fn registry_ok(value: Value) -> RegistryRecord {
        let Value::Object(data) = value else { panic!("expected object") };
        RegistryRecord::Ok { data }
    }

    fn fields() -> Vec<String> {
        vec!["nome".to_string(), "razao_social".to_string()]
    }

    fn aggregator(registry: FakeRegistry, search: FakeSearch) -> Aggregator<FakeRegistry, FakeSearch> {
        Aggregator::new(registry, search, fields())
    }

    #[tokio::test]
    async fn name_only_searches_without_registry() {
        let agg = aggregator(
            FakeRegistry::returning(registry_ok(json!({"nome": "unused"}))),
            FakeSearch::with_hits("Acme", 2),
        );

        let record = agg.aggregate(&LookupRequest::by_name("Acme")).await;

        assert_eq!(record.search.as_ref().and_then(|s| s.results()).map(<[Value]>::len), Some(2));
        assert!(record.registry.is_none());
        assert!(agg.registry.calls().is_empty());
    }

    #[tokio::test]
    async fn registry_only_derives_search_from_registry_name() {
        let agg = aggregator(
            FakeRegistry::returning(registry_ok(json!({"nome": "Acme Ltda", "situacao": "ATIVA"}))),
            FakeSearch::with_hits("Acme Ltda", 1),
        );

        let record = agg.aggregate(&LookupRequest::by_registry_id("123")).await;

        assert!(record.registry.as_ref().is_some_and(RegistryRecord::is_ok));
        let Some(SearchResult::Ok { query, results }) = &record.search else {
            panic!("expected derived search, got {:?}", record.search);
        };
        assert_eq!(query, "Acme Ltda");
        assert_eq!(results.len(), 1);
        assert_eq!(agg.registry.calls(), vec!["123"]);
        assert_eq!(agg.search.calls(), vec!["Acme Ltda"]);
    }

    #[tokio::test]
    async fn fallback_uses_corporate_name_field() {
        let agg = aggregator(
            FakeRegistry::returning(registry_ok(json!({"razao_social": "ACME COMERCIO LTDA"}))),
            FakeSearch::with_hits("ACME COMERCIO LTDA", 3),
        );

        let record = agg.aggregate(&LookupRequest::by_registry_id("123")).await;

        assert_eq!(agg.search.calls(), vec!["ACME COMERCIO LTDA"]);
        assert!(record.search.as_ref().is_some_and(SearchResult::is_ok));
    }

    #[tokio::test]
    async fn failed_registry_leaves_search_absent() {
        let agg = aggregator(
            FakeRegistry::returning(RegistryRecord::failed(FailureKind::Transport, "connection refused")),
            FakeSearch::default(),
        );

        let record = agg.aggregate(&LookupRequest::by_registry_id("000")).await;

        assert!(record.search.is_none());
        assert_eq!(
            record.registry.as_ref().and_then(RegistryRecord::failure).map(|f| f.kind),
            Some(FailureKind::Transport)
        );
        assert!(agg.search.calls().is_empty());
    }

    #[tokio::test]
    async fn derived_search_failure_is_kept_in_record() {
        let agg = aggregator(
            FakeRegistry::returning(registry_ok(json!({"nome": "Acme Ltda"}))),
            FakeSearch::unreachable(),
        );

        let record = agg.aggregate(&LookupRequest::by_registry_id("123")).await;

        assert!(record.registry.as_ref().is_some_and(RegistryRecord::is_ok));
        assert_eq!(
            record.search.as_ref().and_then(SearchResult::failure).map(|f| f.kind),
            Some(FailureKind::Transport)
        );
        assert_eq!(agg.search.calls(), vec!["Acme Ltda"]);

        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(wire["search"]["status"], "failed");
        assert_eq!(wire["search"]["kind"], "transport_error");
        assert_eq!(wire["registry"]["status"], "ok");
    }

    #[tokio::test]
    async fn registry_without_usable_name_leaves_search_absent() {
        let agg = aggregator(
            FakeRegistry::returning(registry_ok(json!({"fantasia": "ACME", "nome": ""}))),
            FakeSearch::default(),
        );

        let record = agg.aggregate(&LookupRequest::by_registry_id("123")).await;

        assert!(record.search.is_none());
        assert!(record.registry.is_some());
    }

    #[tokio::test]
    async fn explicit_name_is_never_overridden_by_fallback() {
        let agg = aggregator(
            FakeRegistry::returning(registry_ok(json!({"nome": "Acme Ltda"}))),
            FakeSearch::with_hits("Acme", 2),
        );
        let request = LookupRequest { name: Some("Acme".into()), registry_id: Some("123".into()) };

        let record = agg.aggregate(&request).await;

        assert_eq!(agg.search.calls(), vec!["Acme"]);
        let Some(SearchResult::Ok { query, .. }) = &record.search else { panic!("expected search") };
        assert_eq!(query, "Acme");
        assert!(record.registry.is_some());
    }

    #[tokio::test]
    async fn explicit_name_keeps_both_keys_when_registry_fails() {
        let agg = aggregator(
            FakeRegistry::returning(RegistryRecord::failed(FailureKind::ProviderError, "CNPJ inválido")),
            FakeSearch::default(),
        );
        let request = LookupRequest { name: Some("Acme".into()), registry_id: Some("1".into()) };

        let record = agg.aggregate(&request).await;

        assert_eq!(record.search.as_ref().and_then(SearchResult::failure).map(|f| f.kind), Some(FailureKind::NoResults));
        assert_eq!(
            record.registry.as_ref().and_then(RegistryRecord::failure).map(|f| f.kind),
            Some(FailureKind::ProviderError)
        );
    }

    #[tokio::test]
    async fn blank_name_triggers_fallback() {
        let agg = aggregator(
            FakeRegistry::returning(registry_ok(json!({"nome": "Acme Ltda"}))),
            FakeSearch::with_hits("Acme Ltda", 1),
        );
        let request = LookupRequest { name: Some("  ".into()), registry_id: Some("123".into()) };

        agg.aggregate(&request).await;

        assert_eq!(agg.search.calls(), vec!["Acme Ltda"]);
    }

    #[tokio::test]
    async fn empty_request_yields_empty_record() {
        let agg = aggregator(FakeRegistry::returning(registry_ok(json!({"nome": "x"}))), FakeSearch::default());

        let record = agg.aggregate(&LookupRequest::default()).await;

        assert_eq!(record, ConsolidatedRecord::default());
        assert!(agg.registry.calls().is_empty());
        assert!(agg.search.calls().is_empty());
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_records() {
        let agg = aggregator(
            FakeRegistry::returning(registry_ok(json!({"nome": "Acme Ltda"}))),
            FakeSearch::with_hits("Acme Ltda", 1),
        );
        let request = LookupRequest::by_registry_id("123");

        let first = agg.aggregate(&request).await;
        let second = agg.aggregate(&request).await;

        assert_eq!(first, second);
    }
}
