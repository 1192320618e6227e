use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::types::ParsedResearchData;

pub const FALLBACK_CONTENT: &str =
    "Unable to generate research content. Please check your API keys and try again.";

const CONTENT_KEY: &str = "content";

/// Keys that hold arrays in either output contract.
pub const LIST_KEYS: [&str; 9] = [
    "video_search_queries",
    "document_search_queries",
    "web_search_queries",
    "linkedin_search_queries",
    "suggested_experts",
    "suggested_sources",
    "documents",
    "links",
    "linkedin_profiles",
];

impl ParsedResearchData {
    /// What callers get when the model reply has no usable JSON object.
    pub fn fallback() -> Self {
        Self {
            content: FALLBACK_CONTENT.to_string(),
            ..Default::default()
        }
    }
}

/// Extract the research object from a model reply. Never fails: anything
/// unusable yields [`ParsedResearchData::fallback`].
pub fn parse(raw_text: &str) -> ParsedResearchData {
    let text = strip_fences(raw_text);

    let Some(mut object) = extract_object(text) else {
        warn!(
            chars = raw_text.chars().count(),
            "No JSON object found in model response"
        );
        return ParsedResearchData::fallback();
    };

    backfill(&mut object);
    from_object(object)
}

fn strip_fences(raw_text: &str) -> &str {
    let text = raw_text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest =
        rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn extract_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;

    // Decode one value per candidate brace; trailing prose is never read.
    // An object without any contract key (e.g. a `{}` in the preamble) only
    // wins if no later brace starts a real payload.
    let mut first_object = None;
    for (offset, _) in text[start..].match_indices('{') {
        let candidate = &text[start + offset..];
        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) if has_contract_key(&map) => return Some(map),
            Some(Ok(Value::Object(map))) if offset == 0 => first_object = Some(map),
            Some(Err(e)) if offset == 0 => {
                debug!(error = %e, "Streaming decode failed, trying later braces")
            }
            _ => {}
        }
    }
    if first_object.is_some() {
        return first_object;
    }

    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Failed to decode model response");
            None
        }
    }
}

fn has_contract_key(object: &Map<String, Value>) -> bool {
    object.contains_key(CONTENT_KEY) || LIST_KEYS.iter().any(|key| object.contains_key(*key))
}

fn backfill(object: &mut Map<String, Value>) {
    object
        .entry(CONTENT_KEY)
        .or_insert_with(|| Value::String(String::new()));
    for key in LIST_KEYS {
        object
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
    }
}

fn from_object(mut object: Map<String, Value>) -> ParsedResearchData {
    let mut take = |key: &str| object.remove(key).unwrap_or(Value::Null);

    ParsedResearchData {
        content: text_value(take(CONTENT_KEY)),
        video_search_queries: string_list(take("video_search_queries")),
        document_search_queries: string_list(take("document_search_queries")),
        web_search_queries: string_list(take("web_search_queries")),
        linkedin_search_queries: string_list(take("linkedin_search_queries")),
        suggested_experts: record_list(take("suggested_experts")),
        suggested_sources: record_list(take("suggested_sources")),
        documents: record_list(take("documents")),
        links: record_list(take("links")),
        linkedin_profiles: record_list(take("linkedin_profiles")),
    }
}

fn text_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn string_list(value: Value) -> Vec<String> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn record_list<T: DeserializeOwned>(value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, "Skipping unusable record in model response");
                None
            }
        })
        .collect()
}
