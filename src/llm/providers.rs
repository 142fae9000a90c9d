use super::{ChatMessage, LLMConfig, LLMError, LLMProvider, LLMResponse, ResponseSchema, Result, LLM};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const OPENAI_CHAT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const LMSTUDIO_CHAT_ENDPOINT: &str = "http://localhost:1234/v1/chat/completions";

/// Chat completions body shared by OpenAI-compatible backends.
///
/// Optional parameters are left out of the JSON entirely when unset.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

fn json_schema_format(schema: &ResponseSchema) -> serde_json::Value {
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": schema.name,
            "schema": schema.schema,
            "strict": true,
        }
    })
}

/// Model listing URL next to a chat completions URL
fn models_endpoint(chat_endpoint: &str) -> String {
    match chat_endpoint.strip_suffix("/chat/completions") {
        Some(base) => format!("{}/models", base),
        None => chat_endpoint.replace("/chat/completions", "/models"),
    }
}

fn build_client(config: &LLMConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

async fn send_chat_completion(
    client: &reqwest::Client,
    provider: LLMProvider,
    endpoint: &str,
    api_key: Option<&str>,
    request: &ChatCompletionRequest,
) -> Result<LLMResponse> {
    let mut builder = client.post(endpoint).json(request);
    if let Some(key) = api_key {
        builder = builder.bearer_auth(key);
    }

    let response = builder.send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(LLMError::Api { provider, status, body });
    }

    let completion: ChatCompletionResponse = response.json().await?;

    // A missing choice or a null message is reported as empty content
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    Ok(LLMResponse {
        content,
        tokens_used: completion.usage.map(|u| u.total_tokens),
    })
}

/// OpenAI provider implementation
pub struct OpenAIProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(LLMError::Configuration("OpenAI API key required".to_string()));
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(OPENAI_CHAT_ENDPOINT)
    }

    fn request(&self, messages: Vec<ChatMessage>, response_schema: Option<&ResponseSchema>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: None,
            max_completion_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: response_schema.map(json_schema_format),
        }
    }
}

#[async_trait]
impl LLM for OpenAIProvider {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        response_schema: Option<&ResponseSchema>,
    ) -> Result<LLMResponse> {
        let request = self.request(messages, response_schema);

        debug!("Sending request to OpenAI API (model {})", request.model);

        send_chat_completion(
            &self.client,
            LLMProvider::OpenAI,
            self.endpoint(),
            self.config.api_key.as_deref(),
            &request,
        )
        .await
    }

    async fn is_available(&self) -> bool {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return false;
        };

        let url = models_endpoint(self.endpoint());

        match self.client.get(&url).bearer_auth(api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }
}

/// LMStudio provider implementation
pub struct LMStudioProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LMStudioProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(LMSTUDIO_CHAT_ENDPOINT)
    }
}

#[async_trait]
impl LLM for LMStudioProvider {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        response_schema: Option<&ResponseSchema>,
    ) -> Result<LLMResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            max_completion_tokens: None,
            temperature: self.config.temperature,
            response_format: response_schema.map(json_schema_format),
        };

        debug!("Sending request to LMStudio at {}", self.endpoint());

        send_chat_completion(
            &self.client,
            LLMProvider::LMStudio,
            self.endpoint(),
            self.config.api_key.as_deref(),
            &request,
        )
        .await
    }

    async fn is_available(&self) -> bool {
        let url = models_endpoint(self.endpoint());

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}

/// What a [`MockLLMProvider`] answers with
#[derive(Debug, Clone)]
pub enum MockReply {
    Content(String),
    Failure(String),
}

/// A request captured by [`MockLLMProvider`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub response_schema: Option<ResponseSchema>,
}

/// Mock LLM provider for testing
pub struct MockLLMProvider {
    reply: MockReply,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockLLMProvider {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with `content`
    pub fn with_content(content: impl Into<String>) -> Self {
        Self::new(MockReply::Content(content.into()))
    }

    /// Fail every request with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockReply::Failure(message.into()))
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LLM for MockLLMProvider {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        response_schema: Option<&ResponseSchema>,
    ) -> Result<LLMResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedRequest {
                messages,
                response_schema: response_schema.cloned(),
            });

        match &self.reply {
            MockReply::Content(content) => Ok(LLMResponse {
                content: content.clone(),
                tokens_used: Some(10),
            }),
            MockReply::Failure(message) => Err(LLMError::ResponseError(message.clone())),
        }
    }

    async fn is_available(&self) -> bool {
        matches!(self.reply, MockReply::Content(_))
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }
}
