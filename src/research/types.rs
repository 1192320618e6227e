use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_WORD_COUNT: u32 = 2000;
pub const WORD_COUNT_RANGE: RangeInclusive<u32> = 1000..=5000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum AcademicLevel {
    #[default]
    #[serde(rename = "PhD", alias = "phd")]
    Phd,
    #[serde(rename = "Master's", alias = "masters")]
    Masters,
    #[serde(rename = "Bachelor's", alias = "bachelors")]
    Bachelors,
    #[serde(rename = "Postdoc", alias = "postdoc")]
    Postdoc,
    #[serde(rename = "Faculty", alias = "faculty")]
    Faculty,
}

impl AcademicLevel {
    pub fn label(self) -> &'static str {
        match self {
            AcademicLevel::Phd => "PhD",
            AcademicLevel::Masters => "Master's",
            AcademicLevel::Bachelors => "Bachelor's",
            AcademicLevel::Postdoc => "Postdoc",
            AcademicLevel::Faculty => "Faculty",
        }
    }
}

impl fmt::Display for AcademicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One user submission. Built once and only read by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub topic: String,
    pub academic_level: AcademicLevel,
    pub research_area: String,
    pub keywords: String,
    pub word_count: u32,
}

impl ResearchRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            academic_level: AcademicLevel::default(),
            research_area: String::new(),
            keywords: String::new(),
            word_count: DEFAULT_WORD_COUNT,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if !WORD_COUNT_RANGE.contains(&self.word_count) {
            return Err(ValidationError::WordCountOutOfRange {
                min: *WORD_COUNT_RANGE.start(),
                max: *WORD_COUNT_RANGE.end(),
                actual: self.word_count,
            });
        }
        Ok(())
    }

    /// Free-text sentence describing who is asking, embedded in the prompt.
    pub fn user_context(&self) -> String {
        format!(
            "A {} student researching {}",
            self.academic_level, self.research_area
        )
    }
}

/// An expert the model proposes when no live profile search ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestedExpert {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub institution: String,
    #[serde(deserialize_with = "lenient_string")]
    pub expertise: String,
    #[serde(deserialize_with = "lenient_string")]
    pub background: String,
    #[serde(deserialize_with = "lenient_string")]
    pub relevance: String,
    #[serde(deserialize_with = "lenient_string")]
    pub search_terms: String,
}

/// A publication the model proposes when no live document search ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestedSource {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub authors: String,
    #[serde(deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub source_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub relevance: String,
    #[serde(deserialize_with = "lenient_string")]
    pub search_terms: String,
}

/// Decoded model output with every contract key present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResearchData {
    pub content: String,
    pub video_search_queries: Vec<String>,
    pub document_search_queries: Vec<String>,
    pub web_search_queries: Vec<String>,
    pub linkedin_search_queries: Vec<String>,
    pub suggested_experts: Vec<SuggestedExpert>,
    pub suggested_sources: Vec<SuggestedSource>,
    pub documents: Vec<ResourceRecord>,
    pub links: Vec<ResourceRecord>,
    pub linkedin_profiles: Vec<ProfileRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub title: String,
    pub channel: String,
    pub url: String,
    pub thumbnail: String,
    pub description: String,
    pub published: String,
    pub relevance: String,
}

/// A document or web link, either found by live search or proposed by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_string")]
    pub relevance: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_string"
    )]
    pub authors: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_string"
    )]
    pub year: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_string"
    )]
    pub search_terms: Option<String>,
}

pub type DocumentRecord = ResourceRecord;
pub type LinkRecord = ResourceRecord;

impl From<SuggestedSource> for ResourceRecord {
    fn from(source: SuggestedSource) -> Self {
        Self {
            title: source.title,
            url: String::new(),
            description: source.description,
            source: source.source,
            kind: source.source_type,
            relevance: source.relevance,
            authors: Some(source.authors),
            year: Some(source.year),
            search_terms: Some(source.search_terms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(alias = "url", deserialize_with = "lenient_string")]
    pub linkedin_url: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_string"
    )]
    pub title: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_string"
    )]
    pub institution: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_string"
    )]
    pub expertise: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub relevance: String,
    #[serde(deserialize_with = "lenient_string")]
    pub contact_potential: String,
}

impl From<SuggestedExpert> for ProfileRecord {
    fn from(expert: SuggestedExpert) -> Self {
        Self {
            name: expert.name,
            linkedin_url: String::new(),
            title: Some(expert.title),
            institution: Some(expert.institution),
            expertise: Some(expert.expertise),
            description: expert.background,
            relevance: expert.relevance,
            contact_potential: "Unverified".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQueriesUsed {
    pub videos: Vec<String>,
    pub documents: Vec<String>,
    pub web: Vec<String>,
    pub linkedin: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchMetadata {
    pub ai_model: String,
    pub generated_at: String,
    pub total_videos: usize,
    pub videos_included: usize,
    pub documents_found: usize,
    pub links_found: usize,
    pub linkedin_profiles_found: usize,
    pub web_search_enabled: bool,
    pub live_search: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchData {
    pub topic: String,
    pub academic_level: AcademicLevel,
    pub research_area: String,
    pub keywords: String,
    pub word_count: u32,
    pub content: String,
    pub videos: Vec<VideoRecord>,
    pub documents: Vec<DocumentRecord>,
    pub links: Vec<LinkRecord>,
    pub linkedin_profiles: Vec<ProfileRecord>,
    pub search_queries: SearchQueriesUsed,
    pub metadata: ResearchMetadata,
}

/// Outcome of one submission. `data` is present exactly when `success` is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub success: bool,
    pub error: Option<String>,
    pub data: Option<ResearchData>,
}

impl ResearchResult {
    pub fn success(data: ResearchData) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
        }
    }
}

// Models sometimes emit `"year": 2023` or `"authors": [..]` instead of a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_string(deserializer)?.unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        other => Some(flatten_text(other)),
    })
}

/// Arrays are joined with ", "; nested objects keep their JSON text.
fn flatten_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(flatten_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
