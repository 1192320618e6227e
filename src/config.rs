use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::ValidationError;
use crate::llm::gemini;
use crate::search::{serpapi, youtube};

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub youtube_api_key: Option<String>,
    pub serpapi_key: Option<String>,
    pub gemini_base_url: String,
    pub youtube_base_url: String,
    pub serpapi_base_url: String,
    /// Overrides the first entry of the model priority list.
    pub model: Option<String>,
    pub llm_timeout: Duration,
    pub search_timeout: Duration,
    pub verify_timeout: Duration,
    pub video_delay: Duration,
    pub include_videos: bool,
    pub include_web_search: bool,
    pub verify_urls: bool,
    pub use_live_search: bool,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            gemini_api_key: optional("GEMINI_API_KEY").ok_or(ValidationError::MissingLlmKey)?,
            youtube_api_key: optional("YOUTUBE_API_KEY"),
            serpapi_key: optional("SERPAPI_KEY"),
            gemini_base_url: optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.into()),
            youtube_base_url: optional("YOUTUBE_BASE_URL")
                .unwrap_or_else(|| youtube::DEFAULT_BASE_URL.into()),
            serpapi_base_url: optional("SERPAPI_BASE_URL")
                .unwrap_or_else(|| serpapi::DEFAULT_BASE_URL.into()),
            model: optional("GEMINI_MODEL"),
            llm_timeout: Duration::from_secs(parse_or(
                optional("LLM_TIMEOUT_SECS"),
                "LLM_TIMEOUT_SECS",
                90,
            )?),
            search_timeout: Duration::from_secs(parse_or(
                optional("SEARCH_TIMEOUT_SECS"),
                "SEARCH_TIMEOUT_SECS",
                10,
            )?),
            verify_timeout: Duration::from_secs(parse_or(
                optional("VERIFY_TIMEOUT_SECS"),
                "VERIFY_TIMEOUT_SECS",
                5,
            )?),
            video_delay: Duration::from_millis(parse_or(
                optional("VIDEO_DELAY_MS"),
                "VIDEO_DELAY_MS",
                500,
            )?),
            include_videos: parse_flag(optional("INCLUDE_VIDEOS"), "INCLUDE_VIDEOS", true)?,
            include_web_search: parse_flag(
                optional("INCLUDE_WEB_SEARCH"),
                "INCLUDE_WEB_SEARCH",
                true,
            )?,
            verify_urls: parse_flag(optional("VERIFY_URLS"), "VERIFY_URLS", true)?,
            use_live_search: parse_flag(optional("USE_LIVE_SEARCH"), "USE_LIVE_SEARCH", true)?,
            log_dir: optional("LOG_DIR").unwrap_or_else(|| "logs".into()),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v.parse().context(format!("{} must be a number", key)),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    let Some(v) = value else {
        return Ok(default);
    };
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean, got {:?}", key, v),
    }
}
