use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::research::types::{ResearchRequest, ResearchResult};

/// Per-stage wall time and the model that served the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub model: String,
    pub llm_latency_ms: u64,
    pub video_latency_ms: u64,
    pub search_latency_ms: u64,
    pub video_queries: usize,
    pub search_queries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub id: String,
    pub timestamp: String,
    pub topic: String,
    pub academic_level: String,
    pub model: String,
    pub success: bool,
    pub error: Option<String>,
    pub llm_latency_ms: u64,
    pub video_latency_ms: u64,
    pub search_latency_ms: u64,
    pub total_latency_ms: u64,
    pub video_queries: usize,
    pub search_queries: usize,
    pub videos: usize,
    pub documents: usize,
    pub links: usize,
    pub profiles: usize,
}

impl RunLog {
    pub fn new(
        request: &ResearchRequest,
        result: &ResearchResult,
        timings: StageTimings,
        total_latency_ms: u64,
    ) -> Self {
        let data = result.data.as_ref();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            topic: request.topic.clone(),
            academic_level: request.academic_level.to_string(),
            model: timings.model,
            success: result.success,
            error: result.error.clone(),
            llm_latency_ms: timings.llm_latency_ms,
            video_latency_ms: timings.video_latency_ms,
            search_latency_ms: timings.search_latency_ms,
            total_latency_ms,
            video_queries: timings.video_queries,
            search_queries: timings.search_queries,
            videos: data.map_or(0, |d| d.videos.len()),
            documents: data.map_or(0, |d| d.documents.len()),
            links: data.map_or(0, |d| d.links.len()),
            profiles: data.map_or(0, |d| d.linkedin_profiles.len()),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Model: {} | Videos: {} | Documents: {} | Web resources: {} | Profiles: {} | LLM: {:.1}s | Total latency: {:.1}s",
            if self.model.is_empty() { "-" } else { self.model.as_str() },
            self.videos,
            self.documents,
            self.links,
            self.profiles,
            self.llm_latency_ms as f64 / 1000.0,
            self.total_latency_ms as f64 / 1000.0,
        )
    }
}

pub struct RunLogger {
    dir: PathBuf,
}

impl RunLogger {
    pub fn new(dir: &str) -> Result<Self> {
        let dir = PathBuf::from(dir);
        fs::create_dir_all(&dir).context("Failed to create logs directory")?;
        Ok(Self { dir })
    }

    pub fn write(&self, run_log: &RunLog) -> Result<()> {
        let path = self.dir.join("runs.jsonl");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open log file")?;

        // Whole record in a single append.
        let line = format!(
            "{}\n",
            serde_json::to_string(run_log).context("Failed to serialize run log")?
        );
        file.write_all(line.as_bytes()).context("Failed to write log")?;

        Ok(())
    }
}
