pub mod parser;
pub mod prompt;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::instrumentation::{RunLog, RunLogger, StageTimings};
use crate::llm::{GeminiClient, TextGenerator};
use crate::search::{
    SearchCategory, SearchHit, SerpApiClient, VideoSearch, WebSearch, YouTubeClient,
};

use prompt::SourceMode;
use types::{
    ParsedResearchData, ProfileRecord, ResearchData, ResearchMetadata, ResearchRequest,
    ResearchResult, ResourceRecord, SearchQueriesUsed, VideoRecord,
};

pub const LLM_FAILURE_MESSAGE: &str = "Failed to generate content from AI";

/// Video queries actually dispatched, matching the five the prompt asks for.
pub const MAX_VIDEO_QUERIES: usize = 5;
pub const VIDEOS_PER_QUERY: u32 = 3;
pub const MAX_VIDEOS: usize = 15;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub include_videos: bool,
    pub include_web_search: bool,
    pub use_live_search: bool,
    pub model: Option<String>,
    pub video_delay: Duration,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            include_videos: config.include_videos,
            include_web_search: config.include_web_search,
            use_live_search: config.use_live_search,
            model: config.model.clone(),
            video_delay: config.video_delay,
        }
    }
}

#[derive(Debug, Default)]
struct FoundResources {
    documents: Vec<ResourceRecord>,
    links: Vec<ResourceRecord>,
    profiles: Vec<ProfileRecord>,
}

/// Runs the prompt → model → parse → fan-out pipeline for one request at a time.
#[derive(Clone)]
pub struct Aggregator {
    llm: Arc<dyn TextGenerator>,
    videos: Arc<dyn VideoSearch>,
    web: Arc<dyn WebSearch>,
    settings: PipelineSettings,
    logger: Option<Arc<RunLogger>>,
}

impl Aggregator {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        videos: Arc<dyn VideoSearch>,
        web: Arc<dyn WebSearch>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            llm,
            videos,
            web,
            settings,
            logger: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = GeminiClient::new(
            &config.gemini_api_key,
            &config.gemini_base_url,
            config.llm_timeout,
        )?;
        let videos = YouTubeClient::new(
            config.youtube_api_key.as_deref(),
            &config.youtube_base_url,
            config.search_timeout,
        )?;
        let web = SerpApiClient::new(
            config.serpapi_key.as_deref(),
            &config.serpapi_base_url,
            config.search_timeout,
            config.verify_timeout,
            config.verify_urls,
        )?;
        let logger = RunLogger::new(&config.log_dir)?;

        Ok(Self::new(
            Arc::new(llm),
            Arc::new(videos),
            Arc::new(web),
            PipelineSettings::from(config),
        )
        .with_logger(logger))
    }

    pub fn with_logger(mut self, logger: RunLogger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Same clients, different feature toggles.
    pub fn with_toggles(&self, include_videos: bool, include_web_search: bool) -> Self {
        let mut aggregator = self.clone();
        aggregator.settings.include_videos = include_videos;
        aggregator.settings.include_web_search = include_web_search;
        aggregator
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn run(&self, request: &ResearchRequest) -> ResearchResult {
        self.run_with_log(request).await.0
    }

    /// Run the pipeline and record it. A panic anywhere inside becomes a
    /// failure result; nothing gathered before it is kept.
    pub async fn run_with_log(&self, request: &ResearchRequest) -> (ResearchResult, RunLog) {
        let run_start = Instant::now();

        let (result, timings) = match request.validate() {
            Err(e) => (ResearchResult::failure(e.to_string()), StageTimings::default()),
            Ok(()) => {
                let this = self.clone();
                let owned = request.clone();
                match tokio::spawn(async move { this.execute(&owned).await }).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let message = panic_message(e);
                        error!(error = %message, "Research pipeline aborted");
                        (
                            ResearchResult::failure(format!("Internal error: {}", message)),
                            StageTimings::default(),
                        )
                    }
                }
            }
        };

        let run_log = RunLog::new(
            request,
            &result,
            timings,
            run_start.elapsed().as_millis() as u64,
        );
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.write(&run_log) {
                warn!(error = ?e, "Failed to write run log");
            }
        }
        info!(id = %run_log.id, success = run_log.success, "{}", run_log.summary());

        (result, run_log)
    }

    async fn execute(&self, request: &ResearchRequest) -> (ResearchResult, StageTimings) {
        let mut timings = StageTimings::default();
        let mode = SourceMode::from_live_search(self.settings.use_live_search);

        let user_context = request.user_context();
        let research_prompt = prompt::build_prompt(request, &user_context, mode);

        let llm_start = Instant::now();
        let response = self
            .llm
            .generate(&research_prompt, self.settings.model.as_deref())
            .await;
        timings.llm_latency_ms = llm_start.elapsed().as_millis() as u64;
        timings.model = response.model_used.clone();

        let Some(raw_text) = response.text else {
            warn!(model = %response.model_used, "No text from model");
            return (ResearchResult::failure(LLM_FAILURE_MESSAGE), timings);
        };

        let parsed = parser::parse(&raw_text);
        debug!(
            videos = parsed.video_search_queries.len(),
            documents = parsed.document_search_queries.len(),
            web = parsed.web_search_queries.len(),
            linkedin = parsed.linkedin_search_queries.len(),
            "Parsed model response"
        );

        let video_start = Instant::now();
        let (total_videos, videos) = self.collect_videos(&parsed.video_search_queries).await;
        timings.video_latency_ms = video_start.elapsed().as_millis() as u64;
        timings.video_queries = if self.videos_enabled() {
            parsed.video_search_queries.len().min(MAX_VIDEO_QUERIES)
        } else {
            0
        };

        let web_search_enabled = mode == SourceMode::LiveSearch && self.web_search_enabled();
        let search_start = Instant::now();
        let found = if web_search_enabled {
            timings.search_queries = parsed.document_search_queries.len()
                + parsed.web_search_queries.len()
                + parsed.linkedin_search_queries.len();
            self.collect_search_results(&parsed).await
        } else {
            FoundResources::default()
        };
        timings.search_latency_ms = search_start.elapsed().as_millis() as u64;

        let data = assemble(
            request,
            parsed,
            videos,
            total_videos,
            found,
            response.model_used,
            web_search_enabled,
            mode,
        );
        (ResearchResult::success(data), timings)
    }

    fn videos_enabled(&self) -> bool {
        self.settings.include_videos && self.videos.is_configured()
    }

    fn web_search_enabled(&self) -> bool {
        self.settings.include_web_search && self.web.is_configured()
    }

    /// Returns the number fetched before capping and the capped list.
    async fn collect_videos(&self, queries: &[String]) -> (usize, Vec<VideoRecord>) {
        if !self.videos_enabled() || queries.is_empty() {
            return (0, Vec::new());
        }

        let mut videos = Vec::new();
        for (i, query) in queries.iter().take(MAX_VIDEO_QUERIES).enumerate() {
            if i > 0 && !self.settings.video_delay.is_zero() {
                tokio::time::sleep(self.settings.video_delay).await;
            }
            videos.extend(self.videos.search_videos(query, VIDEOS_PER_QUERY).await);
        }

        let total = videos.len();
        videos.truncate(MAX_VIDEOS);
        (total, videos)
    }

    async fn collect_search_results(&self, parsed: &ParsedResearchData) -> FoundResources {
        let mut found = FoundResources::default();

        for query in &parsed.document_search_queries {
            for hit in self.web.search(query, SearchCategory::Documents).await {
                found.documents.push(document_from_hit(hit, query));
            }
        }

        for query in &parsed.web_search_queries {
            for hit in self.web.search(query, SearchCategory::General).await {
                found.links.push(link_from_hit(hit, query));
            }
        }

        for query in &parsed.linkedin_search_queries {
            for hit in self.web.search(query, SearchCategory::Profiles).await {
                found.profiles.push(profile_from_hit(hit, query));
            }
        }

        info!(
            documents = found.documents.len(),
            links = found.links.len(),
            profiles = found.profiles.len(),
            "Live search complete"
        );
        found
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    request: &ResearchRequest,
    parsed: ParsedResearchData,
    videos: Vec<VideoRecord>,
    total_videos: usize,
    found: FoundResources,
    model: String,
    web_search_enabled: bool,
    mode: SourceMode,
) -> ResearchData {
    // Live hits (or the model's own URL lists in direct mode) win over suggestions.
    let (documents, links, profiles) = match mode {
        SourceMode::LiveSearch => (found.documents, found.links, found.profiles),
        SourceMode::Direct => (parsed.documents, parsed.links, parsed.linkedin_profiles),
    };
    let documents = prefer(documents, || {
        parsed.suggested_sources.into_iter().map(ResourceRecord::from).collect()
    });
    let profiles = prefer(profiles, || {
        parsed.suggested_experts.into_iter().map(ProfileRecord::from).collect()
    });

    let metadata = ResearchMetadata {
        ai_model: model,
        generated_at: chrono::Utc::now().to_rfc3339(),
        total_videos,
        videos_included: videos.len(),
        documents_found: documents.len(),
        links_found: links.len(),
        linkedin_profiles_found: profiles.len(),
        web_search_enabled,
        live_search: mode == SourceMode::LiveSearch,
    };

    ResearchData {
        topic: request.topic.clone(),
        academic_level: request.academic_level,
        research_area: request.research_area.clone(),
        keywords: request.keywords.clone(),
        word_count: request.word_count,
        content: parsed.content,
        videos,
        documents,
        links,
        linkedin_profiles: profiles,
        search_queries: SearchQueriesUsed {
            videos: parsed.video_search_queries,
            documents: parsed.document_search_queries,
            web: parsed.web_search_queries,
            linkedin: parsed.linkedin_search_queries,
        },
        metadata,
    }
}

fn prefer<T>(primary: Vec<T>, fallback: impl FnOnce() -> Vec<T>) -> Vec<T> {
    if primary.is_empty() {
        fallback()
    } else {
        primary
    }
}

fn found_via(query: &str) -> String {
    format!("Found via search: {}", query)
}

fn document_from_hit(hit: SearchHit, query: &str) -> ResourceRecord {
    let kind = if hit.url.contains("pdf") {
        "research_paper"
    } else {
        "webpage"
    };
    ResourceRecord {
        title: hit.title,
        url: hit.url,
        description: hit.description,
        source: hit.source,
        kind: kind.to_string(),
        relevance: found_via(query),
        ..Default::default()
    }
}

fn link_from_hit(hit: SearchHit, query: &str) -> ResourceRecord {
    ResourceRecord {
        title: hit.title,
        url: hit.url,
        description: hit.description,
        source: hit.source,
        kind: "resource".to_string(),
        relevance: found_via(query),
        ..Default::default()
    }
}

fn profile_from_hit(hit: SearchHit, query: &str) -> ProfileRecord {
    ProfileRecord {
        name: hit
            .title
            .replace(" | LinkedIn", "")
            .replace(" - LinkedIn", ""),
        linkedin_url: hit.url,
        description: hit.description,
        relevance: found_via(query),
        contact_potential: "Medium".to_string(),
        ..Default::default()
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline panicked".to_string()
    }
}
