use thiserror::Error;

/// Problems that block a submission before any upstream call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a research topic")]
    EmptyTopic,

    #[error("Please provide a Gemini API key (GEMINI_API_KEY)")]
    MissingLlmKey,

    #[error("Word count must be between {min} and {max}, got {actual}")]
    WordCountOutOfRange { min: u32, max: u32, actual: u32 },
}
