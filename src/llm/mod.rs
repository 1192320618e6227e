pub mod gemini;

use async_trait::async_trait;

pub use gemini::{GeminiClient, GEMINI_MODELS};

/// Raw model output. `text` is `None` whenever the call failed for any reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResult {
    pub text: Option<String>,
    pub model_used: String,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one prompt. `model` defaults to the first entry of the priority list.
    async fn generate(&self, prompt: &str, model: Option<&str>) -> LlmResult;
}
