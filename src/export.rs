use anyhow::{Context, Result};

use crate::research::types::ResearchData;

pub fn to_json(data: &ResearchData) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize research data")
}

pub fn to_summary(data: &ResearchData) -> String {
    format!(
        "Research Topic: {topic}\n\
         Academic Level: {level}\n\
         Research Area: {area}\n\
         Keywords: {keywords}\n\
         Generated: {generated}\n\
         \n\
         RESEARCH CONTENT:\n\
         {content}\n\
         \n\
         RESOURCES FOUND:\n\
         - Videos: {videos}\n\
         - Documents: {documents}\n\
         - Web Resources: {links}\n\
         - Expert Profiles: {profiles}\n",
        topic = or_na(&data.topic),
        level = data.academic_level,
        area = or_na(&data.research_area),
        keywords = or_na(&data.keywords),
        generated = or_na(&data.metadata.generated_at),
        content = if data.content.is_empty() {
            "No content available"
        } else {
            data.content.as_str()
        },
        videos = data.videos.len(),
        documents = data.documents.len(),
        links = data.links.len(),
        profiles = data.linkedin_profiles.len(),
    )
}

pub fn json_file_name(topic: &str) -> String {
    format!("research_{}.json", file_stem(topic))
}

pub fn summary_file_name(topic: &str) -> String {
    format!("research_summary_{}.txt", file_stem(topic))
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Spaces become underscores; anything outside `[A-Za-z0-9._-]` is dropped.
fn file_stem(topic: &str) -> String {
    let stem: String = topic
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => Some(c),
            _ => None,
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem.to_string()
    }
}
