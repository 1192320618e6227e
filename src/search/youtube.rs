use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

use super::VideoSearch;
use crate::research::types::VideoRecord;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/search";

const DESCRIPTION_LIMIT: usize = 200;
const DATE_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    title: String,
    channel_title: String,
    description: String,
    published_at: String,
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl YouTubeClient {
    pub fn new(api_key: Option<&str>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build YouTube HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
        })
    }

    async fn fetch(
        &self,
        api_key: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoRecord>> {
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("key", api_key),
                ("maxResults", max_results.as_str()),
                ("videoDuration", "long"),
                ("relevanceLanguage", "en"),
            ])
            .send()
            .await
            .context("Failed to send request to YouTube API")?
            .error_for_status()
            .context("YouTube API returned an error status")?;

        let data: SearchResponse = response
            .json()
            .await
            .context("Failed to parse YouTube API response")?;

        Ok(data
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(to_video_record(&video_id, item.snippet, query))
            })
            .collect())
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search_videos(&self, query: &str, max_results: u32) -> Vec<VideoRecord> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };

        match self.fetch(api_key, query, max_results).await {
            Ok(videos) => {
                info!(query, count = videos.len(), "YouTube search complete");
                videos
            }
            Err(e) => {
                error!(query, error = ?e, "Error fetching YouTube videos");
                Vec::new()
            }
        }
    }
}

fn to_video_record(video_id: &str, snippet: Snippet, query: &str) -> VideoRecord {
    VideoRecord {
        title: snippet.title,
        channel: snippet.channel_title,
        url: format!("https://www.youtube.com/watch?v={}", video_id),
        thumbnail: snippet.thumbnails.high.map(|t| t.url).unwrap_or_default(),
        description: truncate_description(&snippet.description),
        published: snippet.published_at.chars().take(DATE_LEN).collect(),
        relevance: format!("Related to: {}", query),
    }
}

/// Keep at most 200 characters, marking a cut with "...".
pub fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => format!("{}...", &description[..cut]),
        None => description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::test_support::serve_mock;

    #[test]
    fn long_descriptions_are_cut_to_203_chars() {
        let long = "a".repeat(250);
        let truncated = truncate_description(&long);
        assert_eq!(truncated.chars().count(), 203);
        assert!(truncated.ends_with("..."));
        assert!(long.starts_with(truncated.trim_end_matches("...")));
    }

    #[test]
    fn short_descriptions_are_unchanged() {
        let exact = "b".repeat(200);
        assert_eq!(truncate_description(&exact), exact);
        assert_eq!(truncate_description("short"), "short");
    }

    #[test]
    fn truncation_respects_multibyte_chars() {
        let long = "é".repeat(201);
        let truncated = truncate_description(&long);
        assert_eq!(truncated.chars().count(), 203);
    }

    #[tokio::test]
    async fn maps_items_into_video_records() {
        let base = serve_mock(|_| {
            Router::new().route(
                "/youtube/v3/search",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params["part"], "snippet");
                    assert_eq!(params["type"], "video");
                    assert_eq!(params["key"], "yt-key");
                    assert_eq!(params["maxResults"], "3");
                    assert_eq!(params["videoDuration"], "long");
                    assert_eq!(params["relevanceLanguage"], "en");
                    Json(json!({
                        "items": [
                            {
                                "id": {"kind": "youtube#video", "videoId": "abc123"},
                                "snippet": {
                                    "title": "Intro to Qubits",
                                    "channelTitle": "Physics Lab",
                                    "description": "x".repeat(300),
                                    "publishedAt": "2023-04-05T12:00:00Z",
                                    "thumbnails": {"high": {"url": "https://img/hq.jpg"}}
                                }
                            },
                            {
                                "id": {"kind": "youtube#video", "videoId": "def456"},
                                "snippet": {
                                    "title": "No thumbnail",
                                    "channelTitle": "Lab",
                                    "description": "short",
                                    "publishedAt": "2022-01-01T00:00:00Z",
                                    "thumbnails": {}
                                }
                            }
                        ]
                    }))
                }),
            )
        })
        .await;

        let client = YouTubeClient::new(
            Some("yt-key"),
            &format!("{base}/youtube/v3/search"),
            Duration::from_secs(5),
        )
        .unwrap();
        let videos = client.search_videos("qubits", 3).await;

        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(videos[0].channel, "Physics Lab");
        assert_eq!(videos[0].thumbnail, "https://img/hq.jpg");
        assert_eq!(videos[0].published, "2023-04-05");
        assert_eq!(videos[0].description.chars().count(), 203);
        assert_eq!(videos[0].relevance, "Related to: qubits");
        assert_eq!(videos[1].thumbnail, "");
        assert_eq!(videos[1].description, "short");
    }

    #[tokio::test]
    async fn missing_key_returns_nothing() {
        let client =
            YouTubeClient::new(None, "http://127.0.0.1:9/search", Duration::from_secs(1)).unwrap();
        assert!(!client.is_configured());
        assert!(client.search_videos("qubits", 3).await.is_empty());
    }

    #[tokio::test]
    async fn error_status_returns_nothing() {
        let base = serve_mock(|_| {
            Router::new().route("/search", get(|| async { StatusCode::FORBIDDEN }))
        })
        .await;

        let client =
            YouTubeClient::new(Some("k"), &format!("{base}/search"), Duration::from_secs(5))
                .unwrap();
        assert!(client.search_videos("qubits", 3).await.is_empty());
    }
}
