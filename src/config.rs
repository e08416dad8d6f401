use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::types::{AppError, AppResult, LLMProvider};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

// Keys stay out of the startup log line.
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize)]
pub struct SearchConfig {
    pub serpapi_key: String,
    pub base_url: String,
    pub max_results: usize,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("base_url", &self.base_url)
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub timeout_secs: u64,
    pub max_document_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub staging_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            max_document_chars: 120_000,
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    ///
    /// Missing credentials fail here, before the server binds, rather than
    /// deep inside a pipeline run.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_id = var("LLM_PROVIDER").unwrap_or_else(|| "google".to_string());
        let provider = LLMProvider::from_id(&provider_id).ok_or_else(|| {
            AppError::Configuration(format!("unsupported LLM_PROVIDER '{}'", provider_id))
        })?;

        let api_key = var(provider.api_key_var()).ok_or_else(|| {
            AppError::Configuration(format!(
                "{} must be set for LLM provider '{}'",
                provider.api_key_var(),
                provider
            ))
        })?;

        let serpapi_key = var("SERPAPI_API_KEY").ok_or_else(|| {
            AppError::Configuration("SERPAPI_API_KEY must be set".to_string())
        })?;

        Ok(Self {
            server: ServerConfig {
                port: parse_or(&var, "PORT", 8000)?,
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                cors_allowed_origins: var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            },
            llm: LLMConfig {
                provider,
                model: var("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
                api_key,
                temperature: parse_or(&var, "LLM_TEMPERATURE", 0.2)?,
                max_tokens: parse_or(&var, "LLM_MAX_TOKENS", 2048)?,
            },
            search: SearchConfig {
                serpapi_key,
                base_url: var("SERPAPI_BASE_URL")
                    .unwrap_or_else(|| "https://serpapi.com".to_string()),
                max_results: parse_or(&var, "SEARCH_MAX_RESULTS", 5)?,
            },
            pipeline: PipelineConfig {
                timeout_secs: parse_or(&var, "PIPELINE_TIMEOUT_SECS", 600)?,
                max_document_chars: parse_or(&var, "PIPELINE_MAX_DOCUMENT_CHARS", 120_000)?,
            },
            storage: StorageConfig {
                staging_dir: var("STAGING_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data")),
            },
            logging: LoggingConfig {
                filter: var("RUST_LOG"),
                log_dir: var("LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            AppError::Configuration(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
        None => Ok(default),
    }
}
