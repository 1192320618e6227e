use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{SearchCategory, SearchHit, WebSearch};

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com/search";

const RESULTS_PER_QUERY: &str = "10";

#[derive(Debug, Clone)]
pub struct SerpApiClient {
    client: reqwest::Client,
    verifier: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    verify_urls: bool,
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SerpApiClient {
    pub fn new(
        api_key: Option<&str>,
        base_url: &str,
        timeout: Duration,
        verify_timeout: Duration,
        verify_urls: bool,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build SerpAPI HTTP client")?;
        let verifier = reqwest::Client::builder()
            .timeout(verify_timeout)
            .build()
            .context("Failed to build URL verification client")?;

        Ok(Self {
            client,
            verifier,
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
            verify_urls,
        })
    }

    async fn fetch(&self, api_key: &str, query: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("engine", "google"),
                ("api_key", api_key),
                ("num", RESULTS_PER_QUERY),
            ])
            .send()
            .await
            .context("Failed to send request to SerpAPI")?
            .error_for_status()
            .context("SerpAPI returned an error status")?;

        let data: SerpApiResponse = response
            .json()
            .await
            .context("Failed to parse SerpAPI response")?;

        let mut hits = Vec::new();
        for result in data.organic_results {
            if result.link.is_empty() {
                continue;
            }
            if self.verify_urls && !self.is_reachable(&result.link).await {
                debug!(url = %result.link, "Dropping unreachable search result");
                continue;
            }
            hits.push(SearchHit {
                source: host_of(&result.link),
                title: result.title,
                url: result.link,
                description: result.snippet,
            });
        }
        Ok(hits)
    }

    /// HEAD the URL, following redirects; only a final 200 counts.
    async fn is_reachable(&self, url: &str) -> bool {
        match self.verifier.head(url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(_) => false,
        }
    }
}

#[async_trait]
impl WebSearch for SerpApiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, category: SearchCategory) -> Vec<SearchHit> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };

        let qualified = category.qualify(query);
        match self.fetch(api_key, &qualified).await {
            Ok(hits) => {
                info!(query = %qualified, count = hits.len(), "Web search complete");
                hits
            }
            Err(e) => {
                error!(query = %qualified, error = ?e, "Error in web search");
                Vec::new()
            }
        }
    }
}

/// Network location of a URL (host plus explicit port), empty when unparseable.
fn host_of(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::test_support::serve_mock;

    async fn mock_engine() -> String {
        serve_mock(|base| {
            Router::new()
                .route(
                    "/search",
                    get(move |Query(params): Query<HashMap<String, String>>| {
                        let base = base.clone();
                        async move {
                            assert_eq!(params["engine"], "google");
                            assert_eq!(params["num"], "10");
                            assert_eq!(params["api_key"], "serp-key");
                            Json(json!({
                                "organic_results": [
                                    {"title": "Alive", "link": format!("{base}/alive"), "snippet": "ok"},
                                    {"title": "Gone", "link": format!("{base}/gone"), "snippet": "404"},
                                    {"title": "No link", "snippet": "skipped"}
                                ]
                            }))
                        }
                    }),
                )
                .route("/alive", get(|| async { "here" }))
                .route("/gone", get(|| async { HttpStatus::NOT_FOUND }))
        })
        .await
    }

    fn client(base: &str, verify_urls: bool) -> SerpApiClient {
        SerpApiClient::new(
            Some("serp-key"),
            &format!("{base}/search"),
            Duration::from_secs(5),
            Duration::from_secs(5),
            verify_urls,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn verification_drops_unreachable_results() {
        let base = mock_engine().await;
        let hits = client(&base, true)
            .search("qubits", SearchCategory::General)
            .await;

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Alive");
        assert_eq!(hits[0].description, "ok");
        assert_eq!(hits[0].source, host_of(&base));
    }

    #[tokio::test]
    async fn without_verification_all_linked_results_are_kept() {
        let base = mock_engine().await;
        let hits = client(&base, false)
            .search("qubits", SearchCategory::Documents)
            .await;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].title, "Gone");
    }

    #[tokio::test]
    async fn category_qualifier_reaches_the_engine() {
        let base = serve_mock(|_| {
            Router::new().route(
                "/search",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "organic_results": [
                            {
                                "title": params["q"].clone(),
                                "link": "https://www.linkedin.com/in/someone",
                                "snippet": ""
                            }
                        ]
                    }))
                }),
            )
        })
        .await;

        let hits = client(&base, false)
            .search("quantum professor", SearchCategory::Profiles)
            .await;
        assert_eq!(hits[0].title, "quantum professor site:linkedin.com/in");
        assert_eq!(hits[0].source, "www.linkedin.com");
    }

    #[tokio::test]
    async fn missing_key_or_failure_returns_nothing() {
        let unconfigured = SerpApiClient::new(
            None,
            "http://127.0.0.1:9/search",
            Duration::from_secs(1),
            Duration::from_secs(1),
            true,
        )
        .unwrap();
        assert!(!unconfigured.is_configured());
        assert!(unconfigured
            .search("qubits", SearchCategory::General)
            .await
            .is_empty());

        let base = serve_mock(|_| {
            Router::new().route("/search", get(|| async { HttpStatus::UNAUTHORIZED }))
        })
        .await;
        assert!(client(&base, false)
            .search("qubits", SearchCategory::General)
            .await
            .is_empty());
    }

    #[test]
    fn host_of_keeps_explicit_port() {
        assert_eq!(host_of("https://arxiv.org/abs/1234"), "arxiv.org");
        assert_eq!(host_of("http://127.0.0.1:8080/x"), "127.0.0.1:8080");
        assert_eq!(host_of("not a url"), "");
    }
}
