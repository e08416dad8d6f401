// Type definitions shared across the crate

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    Google,
    OpenAI,
    Groq,
}

impl LLMProvider {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "google" | "gemini" => Some(LLMProvider::Google),
            "openai" => Some(LLMProvider::OpenAI),
            "groq" => Some(LLMProvider::Groq),
            _ => None,
        }
    }

    /// Environment variable holding the API key for this provider
    pub fn api_key_var(&self) -> &'static str {
        match self {
            LLMProvider::Google => "GEMINI_API_KEY",
            LLMProvider::OpenAI => "OPENAI_API_KEY",
            LLMProvider::Groq => "GROQ_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LLMProvider::Google => "gemini-2.0-flash",
            LLMProvider::OpenAI => "gpt-4o",
            LLMProvider::Groq => "llama-3.3-70b-versatile",
        }
    }
}

impl fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LLMProvider::Google => write!(f, "google"),
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_instruction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user", "assistant", "system"
    pub content: String,
}

impl LLMMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Document unreadable: {0}")]
    DocumentUnreadable(String),

    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("{stage} stage failed: {message}")]
    Orchestration { stage: String, message: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Analysis timed out after {0} seconds")]
    Timeout(u64),
}

impl AppError {
    pub fn orchestration(stage: impl fmt::Display, message: impl Into<String>) -> Self {
        AppError::Orchestration {
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_id() {
        assert_eq!(LLMProvider::from_id("google"), Some(LLMProvider::Google));
        assert_eq!(LLMProvider::from_id("Gemini"), Some(LLMProvider::Google));
        assert_eq!(LLMProvider::from_id(" openai "), Some(LLMProvider::OpenAI));
        assert_eq!(LLMProvider::from_id("groq"), Some(LLMProvider::Groq));
        assert_eq!(LLMProvider::from_id("anthropic"), None);
    }

    #[test]
    fn test_orchestration_error_message() {
        let err = AppError::orchestration("Analysis", "model returned nothing");
        assert_eq!(err.to_string(), "Analysis stage failed: model returned nothing");
    }
}
