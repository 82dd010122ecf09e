//! Web-search client (SerpAPI-style `GET <base_url>?q=..&api_key=..`).
//!
//! Queries get a configurable suffix appended so the engine favours
//! company results. An empty `organic_results` list is a valid answer; only
//! the provider's explicit "no results" signal becomes
//! [`FailureKind::NoResults`].

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{FailureKind, SearchLookup, SearchResult};
use crate::config::SearchConfig;
use crate::error::AppError;

/// Marker the provider uses for an empty result page.
const FULLY_EMPTY_STATE: &str = "Fully empty";

/// HTTP client for the search provider. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    base_url: String,
    query_suffix: String,
    country: String,
    language: String,
    api_key: Option<String>,
}

impl SearchClient {
    /// `api_key` comes from `SERPAPI_KEY`; without one the provider is still
    /// called and its own error is surfaced.
    pub fn new(config: &SearchConfig, api_key: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Http(format!("failed to build search client: {e}")))?;

        if api_key.is_none() {
            warn!("SERPAPI_KEY not set; search lookups will be rejected by the provider");
        }

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            query_suffix: config.query_suffix.clone(),
            country: config.country.clone(),
            language: config.language.clone(),
            api_key,
        })
    }

    /// Single attempt, no retries. Every failure comes back as a value.
    pub async fn lookup(&self, query: &str) -> SearchResult {
        let query = query.trim();
        if query.is_empty() {
            return SearchResult::failed(FailureKind::MissingQuery, "search query not provided");
        }

        let full_query = self.biased_query(query);
        debug!(query = %full_query, "search lookup");

        let mut params: Vec<(&str, &str)> = vec![
            ("q", full_query.as_str()),
            ("gl", self.country.as_str()),
            ("hl", self.language.as_str()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.as_str()));
        }

        let response = match self.client.get(&self.base_url).query(&params).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(%query, error = %e, is_timeout = e.is_timeout(), "search request failed (transport)");
                return SearchResult::failed(FailureKind::Transport, format!("search request failed: {e}"));
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => classify_response(query, status, &body),
            Err(e) => SearchResult::failed(FailureKind::Transport, format!("failed to read search body: {e}")),
        }
    }

    fn biased_query(&self, query: &str) -> String {
        if self.query_suffix.is_empty() {
            query.to_string()
        } else {
            format!("{query} {}", self.query_suffix)
        }
    }
}

impl SearchLookup for SearchClient {
    async fn lookup_search(&self, query: &str) -> SearchResult {
        self.lookup(query).await
    }
}

/// Turn a raw provider response into a [`SearchResult`].
fn classify_response(query: &str, status: StatusCode, body: &str) -> SearchResult {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return SearchResult::failed(
                FailureKind::MalformedResponse,
                format!("search provider returned non-JSON body (HTTP {status}): {e}"),
            );
        }
    };

    let Value::Object(mut data) = parsed else {
        return SearchResult::failed(FailureKind::MalformedResponse, "search body is not a JSON object");
    };

    if let Some(error) = data.get("error") {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        let kind = if signals_no_results(&message) {
            FailureKind::NoResults
        } else {
            FailureKind::ProviderError
        };
        return SearchResult::failed(kind, format!("search provider error: {message}"));
    }

    if !status.is_success() {
        return SearchResult::failed(FailureKind::ProviderError, format!("search provider returned HTTP {status}"));
    }

    if is_fully_empty(&data) {
        return SearchResult::failed(FailureKind::NoResults, "search provider found no results");
    }

    match data.remove("organic_results") {
        None => SearchResult::Ok { query: query.to_string(), results: Vec::new() },
        Some(Value::Array(results)) => SearchResult::Ok { query: query.to_string(), results },
        Some(_) => SearchResult::failed(FailureKind::MalformedResponse, "organic_results is not an array"),
    }
}

fn signals_no_results(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("hasn't returned any results") || lower.contains("no results")
}

fn is_fully_empty(data: &Map<String, Value>) -> bool {
    data.get("search_information")
        .and_then(|info| info.get("organic_results_state"))
        .and_then(Value::as_str)
        == Some(FULLY_EMPTY_STATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{Json, Router, extract::Query, routing::get};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    fn client_for(base_url: String, api_key: Option<&str>) -> SearchClient {
        let mut cfg = Config::test_default().search;
        cfg.base_url = base_url;
        cfg.timeout_seconds = 2;
        SearchClient::new(&cfg, api_key.map(str::to_string)).unwrap()
    }

    #[test]
    fn classify_results() {
        let body = json!({"organic_results": [{"title": "Acme"}, {"title": "Acme SA"}]}).to_string();
        let res = classify_response("Acme", StatusCode::OK, &body);
        assert_eq!(res.results().unwrap().len(), 2);
    }

    #[test]
    fn classify_missing_results_is_empty_success() {
        let res = classify_response("Acme", StatusCode::OK, r#"{"search_metadata": {"status": "Success"}}"#);
        assert!(res.is_ok());
        assert!(res.results().unwrap().is_empty());
    }

    #[test]
    fn classify_empty_results_array_is_success() {
        let res = classify_response("Acme", StatusCode::OK, r#"{"organic_results": []}"#);
        assert_eq!(res, SearchResult::Ok { query: "Acme".into(), results: vec![] });
    }

    #[test]
    fn classify_explicit_no_results() {
        let body = r#"{"error": "Google hasn't returned any results for this query."}"#;
        let res = classify_response("Acme", StatusCode::OK, body);
        assert_eq!(res.failure().unwrap().kind, FailureKind::NoResults);
    }

    #[test]
    fn classify_fully_empty_state() {
        let body = r#"{"search_information": {"organic_results_state": "Fully empty"}}"#;
        let res = classify_response("Acme", StatusCode::OK, body);
        assert_eq!(res.failure().unwrap().kind, FailureKind::NoResults);
    }

    #[test]
    fn classify_provider_error() {
        let res = classify_response("Acme", StatusCode::UNAUTHORIZED, r#"{"error": "Invalid API key."}"#);
        let f = res.failure().unwrap();
        assert_eq!(f.kind, FailureKind::ProviderError);
        assert!(f.detail.contains("Invalid API key"));
    }

    #[test]
    fn classify_http_error_without_body_error() {
        let res = classify_response("Acme", StatusCode::BAD_GATEWAY, "{}");
        assert_eq!(res.failure().unwrap().kind, FailureKind::ProviderError);
    }

    #[test]
    fn classify_malformed() {
        let res = classify_response("Acme", StatusCode::OK, "<html>blocked</html>");
        assert_eq!(res.failure().unwrap().kind, FailureKind::MalformedResponse);

        let res = classify_response("Acme", StatusCode::OK, r#"{"organic_results": "nope"}"#);
        assert_eq!(res.failure().unwrap().kind, FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn blank_query_makes_no_call() {
        let client = SearchClient::new(&Config::test_default().search, None).unwrap();
        let res = client.lookup(" ").await;
        assert_eq!(res.failure().unwrap().kind, FailureKind::MissingQuery);
    }

    #[tokio::test]
    async fn lookup_sends_biased_query_and_locale() {
        let router = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!({"organic_results": [{"echo": params}]}))
            }),
        );
        let base = serve(router).await;
        let client = client_for(format!("{base}/search"), Some("secret"));

        let res = client.lookup("Acme Ltda").await;
        let SearchResult::Ok { query, results } = res else { panic!("expected success") };
        assert_eq!(query, "Acme Ltda");
        let echo = &results[0]["echo"];
        assert_eq!(echo["q"], "Acme Ltda empresa");
        assert_eq!(echo["gl"], "br");
        assert_eq!(echo["hl"], "pt");
        assert_eq!(echo["api_key"], "secret");
    }

    #[tokio::test]
    async fn lookup_omits_missing_api_key() {
        let router = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!({"organic_results": [{"had_key": params.contains_key("api_key")}]}))
            }),
        );
        let client = client_for(format!("{}/search", serve(router).await), None);
        let res = client.lookup("Acme").await;
        assert_eq!(res.results().unwrap()[0]["had_key"], false);
    }

    #[tokio::test]
    async fn lookup_transport_error_when_unreachable() {
        let client = SearchClient::new(&Config::test_default().search, None).unwrap();
        let res = client.lookup("Acme").await;
        assert_eq!(res.failure().unwrap().kind, FailureKind::Transport);
    }
}
