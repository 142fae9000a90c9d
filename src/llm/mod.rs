pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// LLM provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProvider {
    OpenAI,
    LMStudio,
}

impl std::str::FromStr for LLMProvider {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "lmstudio" | "lm-studio" => Ok(LLMProvider::LMStudio),
            other => Err(LLMError::Configuration(format!("unknown LLM provider: {}", other))),
        }
    }
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LLMConfig {
    /// Backend to talk to
    pub provider: LLMProvider,

    /// Chat completions endpoint, provider default when unset
    pub endpoint: Option<String>,

    /// API key (required for OpenAI)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Output token limit, omitted from requests when unset
    pub max_tokens: Option<u32>,

    /// Sampling temperature, omitted from requests when unset.
    /// Some models reject any value other than their default.
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            endpoint: None,
            api_key: None,
            model: "gpt-5-mini".to_string(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: 120,
        }
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// JSON schema the backend must follow when structured output is requested
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Raw content, empty when the backend returned none
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Error types for LLM operations
#[derive(thiserror::Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{provider:?} API error {status}: {body}")]
    Api {
        provider: LLMProvider,
        status: u16,
        body: String,
    },

    #[error("LLM response error: {0}")]
    ResponseError(String),
}

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Trait for LLM providers
#[async_trait]
pub trait LLM: Send + Sync {
    /// Send one chat completion request.
    ///
    /// With a `response_schema` the backend is asked for JSON that follows it.
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        response_schema: Option<&ResponseSchema>,
    ) -> Result<LLMResponse>;
    async fn is_available(&self) -> bool;
    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LLMConfig) -> Result<Box<dyn LLM>> {
    match config.provider {
        LLMProvider::OpenAI => Ok(Box::new(providers::OpenAIProvider::new(config.clone())?)),
        LLMProvider::LMStudio => Ok(Box::new(providers::LMStudioProvider::new(config.clone())?)),
    }
}
