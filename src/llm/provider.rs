use std::sync::Arc;

use async_trait::async_trait;

use crate::config::LLMConfig;
use crate::types::{AppResult, LLMMessage, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Provider-neutral LLM handle with the sampling defaults every agent shares.
#[derive(Clone)]
pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    provider_name: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LLM {
    pub fn from_config(config: &LLMConfig) -> Self {
        let adapter: Arc<dyn LLMAdapter> = match config.provider {
            LLMProvider::Google => Arc::new(crate::llm::google::GoogleAdapter::new(&config.api_key)),
            LLMProvider::OpenAI => Arc::new(crate::llm::openai::OpenAIAdapter::new(&config.api_key)),
            LLMProvider::Groq => Arc::new(crate::llm::groq::GroqAdapter::new(&config.api_key)),
        };

        Self {
            adapter,
            provider_name: config.provider.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Wrap an arbitrary adapter, e.g. a scripted one in tests.
    pub fn with_adapter(adapter: Arc<dyn LLMAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            provider_name: "custom".to_string(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    /// Run a conversation with this handle's model and sampling defaults.
    pub async fn complete(&self, system: &str, messages: Vec<LLMMessage>) -> AppResult<LLMResponse> {
        let request = LLMRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            system_instruction: Some(system.to_string()),
        };
        self.create_chat_completion(&request).await
    }
}
