use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{LlmResult, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Models in priority order. The first one is used unless the caller picks another.
pub const GEMINI_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-flash-latest", "gemini-pro"];

const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 8192;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(&self, prompt: &str, model: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(format!("{}/{}:generateContent", self.base_url, model))
            .query(&[("key", &self.api_key)])
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }

        let api_response: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let candidates = api_response
            .candidates
            .context("Gemini response has no candidates field")?;

        let text = candidates
            .into_iter()
            .next()
            .context("Gemini response has an empty candidate list")?
            .content
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .context("Gemini candidate has no text part")?;

        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("Gemini returned empty text");
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, model: Option<&str>) -> LlmResult {
        let model = model.unwrap_or(GEMINI_MODELS[0]).to_string();
        debug!(model = %model, prompt_chars = prompt.len(), "Calling Gemini");

        match self.request(prompt, &model).await {
            Ok(text) => LlmResult {
                text: Some(text),
                model_used: model,
            },
            Err(e) => {
                error!(model = %model, error = ?e, "Gemini generation failed");
                LlmResult {
                    text: None,
                    model_used: model,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::test_support::serve_mock;

    async fn client_for(router: Router) -> GeminiClient {
        let base = serve_mock(|_| router).await;
        GeminiClient::new("test-key", &format!("{base}/v1beta/models"), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn returns_trimmed_text_of_first_candidate() {
        let router = Router::new().route(
            "/v1beta/models/:action",
            post(
                |Path(action): Path<String>,
                 Query(params): Query<HashMap<String, String>>,
                 Json(body): Json<Value>| async move {
                    assert_eq!(action, "gemini-2.0-flash:generateContent");
                    assert_eq!(params.get("key").map(String::as_str), Some("test-key"));
                    assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
                    assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
                    Json(json!({
                        "candidates": [
                            {"content": {"parts": [{"text": "  {\"content\": \"x\"}\n"}]}},
                            {"content": {"parts": [{"text": "second"}]}}
                        ]
                    }))
                },
            ),
        );

        let result = client_for(router).await.generate("hello", None).await;
        assert_eq!(result.text.as_deref(), Some("{\"content\": \"x\"}"));
        assert_eq!(result.model_used, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn explicit_model_is_used() {
        let router = Router::new().route(
            "/v1beta/models/:action",
            post(|Path(action): Path<String>| async move {
                Json(json!({"candidates": [{"content": {"parts": [{"text": action}]}}]}))
            }),
        );

        let result = client_for(router)
            .await
            .generate("hello", Some("gemini-pro"))
            .await;
        assert_eq!(result.text.as_deref(), Some("gemini-pro:generateContent"));
        assert_eq!(result.model_used, "gemini-pro");
    }

    #[tokio::test]
    async fn error_status_yields_no_text() {
        let router = Router::new().route(
            "/v1beta/models/:action",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );

        let result = client_for(router).await.generate("hello", None).await;
        assert_eq!(result.text, None);
        assert_eq!(result.model_used, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn missing_or_empty_candidates_yield_no_text() {
        for body in [json!({"promptFeedback": {}}), json!({"candidates": []})] {
            let router = Router::new().route(
                "/v1beta/models/:action",
                post(move || {
                    let body = body.clone();
                    async move { Json(body) }
                }),
            );
            let result = client_for(router).await.generate("hello", None).await;
            assert_eq!(result.text, None);
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_no_text() {
        let client =
            GeminiClient::new("k", "http://127.0.0.1:9/v1beta/models", Duration::from_secs(2))
                .unwrap();
        let result = client.generate("hello", None).await;
        assert_eq!(result.text, None);
    }
}
