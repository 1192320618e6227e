pub mod serpapi;
pub mod youtube;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::research::types::VideoRecord;

pub use serpapi::SerpApiClient;
pub use youtube::YouTubeClient;

/// One organic search result that survived filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub description: String,
    pub source: String,
}

/// Decides which site/filetype qualifier is appended to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCategory {
    Documents,
    Profiles,
    #[allow(dead_code)]
    Academic,
    General,
}

impl SearchCategory {
    pub fn qualifier(self) -> &'static str {
        match self {
            SearchCategory::Documents => {
                " filetype:pdf OR site:arxiv.org OR site:researchgate.net OR site:scholar.google.com"
            }
            SearchCategory::Profiles => " site:linkedin.com/in",
            SearchCategory::Academic => " site:edu OR site:org research",
            SearchCategory::General => "",
        }
    }

    pub fn qualify(self, query: &str) -> String {
        format!("{}{}", query, self.qualifier())
    }
}

#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Whether a credential is configured; searches return nothing without one.
    fn is_configured(&self) -> bool;

    async fn search_videos(&self, query: &str, max_results: u32) -> Vec<VideoRecord>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn search(&self, query: &str, category: SearchCategory) -> Vec<SearchHit>;
}
