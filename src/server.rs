use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::export;
use crate::research::types::{AcademicLevel, ResearchData, ResearchRequest, ResearchResult};
use crate::research::Aggregator;

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
    /// Last successful result per session id.
    sessions: Arc<DashMap<String, ResearchData>>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            sessions: Arc::new(DashMap::new()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResearchForm {
    pub topic: String,
    #[serde(default)]
    pub academic_level: AcademicLevel,
    #[serde(default)]
    pub research_area: String,
    #[serde(default)]
    pub keywords: String,
    pub word_count: Option<u32>,
    pub include_videos: Option<bool>,
    pub include_web_search: Option<bool>,
}

impl ResearchForm {
    fn to_request(&self) -> ResearchRequest {
        let mut request = ResearchRequest::new(self.topic.trim());
        request.academic_level = self.academic_level;
        request.research_area = self.research_area.trim().to_string();
        request.keywords = self.keywords.trim().to_string();
        if let Some(word_count) = self.word_count {
            request.word_count = word_count;
        }
        request
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions/:id/research", post(research))
        .route("/sessions/:id/result", get(result).delete(clear))
        .route("/sessions/:id/export/json", get(export_json))
        .route("/sessions/:id/export/summary", get(export_summary))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, aggregator: Aggregator) -> Result<()> {
    let app = router(AppState::new(aggregator));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!("Research assistant listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

#[instrument(skip_all, fields(session = %id))]
async fn research(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<ResearchForm>,
) -> (StatusCode, Json<ResearchResult>) {
    let request = form.to_request();
    if let Err(e) = request.validate() {
        return (StatusCode::BAD_REQUEST, Json(ResearchResult::failure(e.to_string())));
    }

    let settings = state.aggregator.settings();
    let aggregator = state.aggregator.with_toggles(
        form.include_videos.unwrap_or(settings.include_videos),
        form.include_web_search.unwrap_or(settings.include_web_search),
    );

    let result = aggregator.run(&request).await;
    if let Some(data) = &result.data {
        state.sessions.insert(id, data.clone());
    }
    (StatusCode::OK, Json(result))
}

async fn result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResearchData>, StatusCode> {
    state
        .sessions
        .get(&id)
        .map(|entry| Json(entry.value().clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn clear(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.sessions.remove(&id);
    StatusCode::NO_CONTENT
}

async fn export_json(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(data) = state.sessions.get(&id).map(|entry| entry.value().clone()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match export::to_json(&data) {
        Ok(body) => attachment("application/json", &export::json_file_name(&data.topic), body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn export_summary(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(data) = state.sessions.get(&id).map(|entry| entry.value().clone()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    attachment(
        "text/plain; charset=utf-8",
        &export::summary_file_name(&data.topic),
        export::to_summary(&data),
    )
}

fn attachment(content_type: &str, file_name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::llm::{LlmResult, TextGenerator};
    use crate::research::types::{VideoRecord, DEFAULT_WORD_COUNT};
    use crate::research::PipelineSettings;
    use crate::search::{SearchCategory, SearchHit, VideoSearch, WebSearch};
    use crate::test_support::serve_mock;

    struct CannedLlm;

    #[async_trait]
    impl TextGenerator for CannedLlm {
        async fn generate(&self, _prompt: &str, _model: Option<&str>) -> LlmResult {
            LlmResult {
                text: Some(
                    r#"{"content": "Canned research.", "video_search_queries": ["v"]}"#.into(),
                ),
                model_used: "canned".into(),
            }
        }
    }

    struct NoSearch;

    #[async_trait]
    impl VideoSearch for NoSearch {
        fn is_configured(&self) -> bool {
            true
        }

        async fn search_videos(&self, _query: &str, _max_results: u32) -> Vec<VideoRecord> {
            vec![VideoRecord::default()]
        }
    }

    #[async_trait]
    impl WebSearch for NoSearch {
        fn is_configured(&self) -> bool {
            false
        }

        async fn search(&self, _query: &str, _category: SearchCategory) -> Vec<SearchHit> {
            Vec::new()
        }
    }

    async fn start() -> String {
        let aggregator = Aggregator::new(
            Arc::new(CannedLlm),
            Arc::new(NoSearch),
            Arc::new(NoSearch),
            PipelineSettings {
                include_videos: true,
                include_web_search: true,
                use_live_search: true,
                model: None,
                video_delay: Duration::ZERO,
            },
        );
        let state = AppState::new(aggregator);
        serve_mock(move |_| router(state)).await
    }

    #[tokio::test]
    async fn research_stores_result_per_session() {
        let base = start().await;
        let http = reqwest::Client::new();

        let response = http
            .post(format!("{base}/sessions/alice/research"))
            .json(&json!({"topic": "Quantum Computing", "academic_level": "PhD"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let result: Value = response.json().await.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["data"]["content"], "Canned research.");
        assert_eq!(result["data"]["metadata"]["videos_included"], 1);

        let stored = http
            .get(format!("{base}/sessions/alice/result"))
            .send()
            .await
            .unwrap();
        assert_eq!(stored.status(), 200);

        let other = http
            .get(format!("{base}/sessions/bob/result"))
            .send()
            .await
            .unwrap();
        assert_eq!(other.status(), 404);
    }

    #[tokio::test]
    async fn per_request_toggle_disables_videos() {
        let base = start().await;
        let result: Value = reqwest::Client::new()
            .post(format!("{base}/sessions/s/research"))
            .json(&json!({"topic": "Quantum Computing", "include_videos": false}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(result["data"]["videos"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn form_defaults_fill_the_request() {
        let form: ResearchForm =
            serde_json::from_value(json!({"topic": "  Qubits ", "keywords": " noise "})).unwrap();
        let request = form.to_request();
        assert_eq!(request.topic, "Qubits");
        assert_eq!(request.keywords, "noise");
        assert_eq!(request.academic_level, AcademicLevel::Phd);
        assert_eq!(request.word_count, DEFAULT_WORD_COUNT);
    }

    #[tokio::test]
    async fn blank_topic_is_rejected() {
        let base = start().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/sessions/s/research"))
            .json(&json!({"topic": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let result: Value = response.json().await.unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "Please enter a research topic");
        assert!(result["data"].is_null());
    }

    #[tokio::test]
    async fn exports_and_clear() {
        let base = start().await;
        let http = reqwest::Client::new();

        let missing = http
            .get(format!("{base}/sessions/s/export/json"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);

        http.post(format!("{base}/sessions/s/research"))
            .json(&json!({"topic": "Quantum Computing"}))
            .send()
            .await
            .unwrap();

        let json_export = http
            .get(format!("{base}/sessions/s/export/json"))
            .send()
            .await
            .unwrap();
        assert_eq!(
            json_export.headers()[reqwest::header::CONTENT_DISPOSITION],
            "attachment; filename=\"research_Quantum_Computing.json\""
        );
        let body: Value = json_export.json().await.unwrap();
        assert_eq!(body["topic"], "Quantum Computing");

        let summary = http
            .get(format!("{base}/sessions/s/export/summary"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(summary.contains("RESEARCH CONTENT:\nCanned research."));

        let cleared = http
            .delete(format!("{base}/sessions/s/result"))
            .send()
            .await
            .unwrap();
        assert_eq!(cleared.status(), 204);

        let gone = http
            .get(format!("{base}/sessions/s/result"))
            .send()
            .await
            .unwrap();
        assert_eq!(gone.status(), 404);
    }
}
