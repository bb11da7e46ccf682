//! LLM backend abstraction
//!
//! Supports Google Gemini, OpenAI-compatible APIs and Anthropic Claude.
//! Every backend takes a single prompt string and returns the generated
//! text; persona instructions are already folded into the prompt.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// LLM backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Empty response")]
    EmptyResponse,
}

/// Generic LLM backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Anthropic API root; the Messages endpoint is `{base}/v1/messages`
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Google Gemini backend configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (sent as the `key` query parameter)
    pub api_key: String,
    /// Base URL of the Generative Language API
    pub base_url: String,
    /// Model name (e.g., gemini-2.5-flash)
    pub model: String,
    /// Temperature; the model default applies when unset
    pub temperature: Option<f32>,
    /// Max output tokens; the model default applies when unset
    pub max_tokens: Option<u32>,
}

impl GeminiConfig {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiPartIn>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartIn {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Concatenated text parts of the first candidate, if any
fn gemini_text(response: GeminiResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Google Gemini backend
pub struct GeminiBackend {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("Gemini API key is empty".to_string()));
        }
        let client = reqwest::Client::new();
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let generation_config = match (self.config.temperature, self.config.max_tokens) {
            (None, None) => None,
            (temperature, max_output_tokens) => Some(GeminiGenerationConfig {
                temperature,
                max_output_tokens,
            }),
        };

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPartOut { text: prompt }],
            }],
            generation_config,
        };

        // The key travels in the URL, so the URL itself is never logged
        debug!("Sending {} chars to Gemini model {}", prompt.len(), self.config.model);
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Api(e.without_url().to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini rate limit hit for model {}", self.config.model);
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<GeminiErrorBody>(&text)
                .map(|body| format!("{} {}", body.error.status, body.error.message))
                .unwrap_or(text);
            return Err(LlmError::Api(format!("Gemini API error {}: {}", status, detail.trim())));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Api(e.without_url().to_string()))?;

        gemini_text(body).ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone)]
pub struct OpenAIBackendConfig {
    /// API key
    pub api_key: String,
    /// Base URL (for OpenRouter, local servers, etc.)
    pub base_url: Option<String>,
    /// Model name
    pub model: String,
    /// Temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Max tokens
    pub max_tokens: u16,
}

impl Default for OpenAIBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

impl OpenAIBackendConfig {
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn openrouter(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: Some("https://openrouter.ai/api/v1".to_string()),
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn local(base_url: &str, model: &str) -> Self {
        Self {
            api_key: "sk-local".to_string(),
            base_url: Some(base_url.to_string()),
            model: model.to_string(),
            ..Default::default()
        }
    }
}

/// OpenAI-compatible LLM backend
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    config: OpenAIBackendConfig,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIBackendConfig) -> Result<Self, LlmError> {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let client = Client::with_config(openai_config);

        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| LlmError::Api(e.to_string()))?,
        )];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Anthropic Claude backend configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key
    pub api_key: String,
    /// API root, without the `/v1/messages` path
    pub base_url: String,
    /// Model name (e.g., claude-3-5-sonnet-20241022)
    pub model: String,
    /// Max tokens
    pub max_tokens: u32,
    /// Temperature; the API default applies when unset
    pub temperature: Option<f32>,
}

impl AnthropicConfig {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            model: model.to_string(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Anthropic Claude backend
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::new();
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let mut request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        });
        if let Some(temperature) = self.config.temperature {
            request_body["temperature"] = serde_json::json!(temperature);
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("Anthropic API error {}: {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        json["content"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|block| block["text"].as_str())
            .map(|s| s.to_string())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Thread-safe reference to an LLM backend
pub type SharedBackend = Arc<dyn LlmBackend>;

/// Create a shared Gemini backend
pub fn create_gemini_backend(config: GeminiConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(GeminiBackend::new(config)?))
}

/// Create a shared OpenAI-compatible backend
pub fn create_backend(config: OpenAIBackendConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(OpenAIBackend::new(config)?))
}

/// Create a shared Anthropic backend
pub fn create_anthropic_backend(config: AnthropicConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(AnthropicBackend::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_request_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPartOut { text: "hello" }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(0.2),
                max_output_tokens: None,
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert!(json["generationConfig"]["temperature"].is_number());
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_gemini_text_joins_parts() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"The Earth "},{"text":"is round."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(gemini_text(body).as_deref(), Some("The Earth is round."));
    }

    #[test]
    fn test_gemini_text_empty_reply() {
        let no_candidates: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(gemini_text(no_candidates).is_none());

        let blocked: GeminiResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(gemini_text(blocked).is_none());
    }

    #[test]
    fn test_gemini_rejects_empty_key() {
        let result = GeminiBackend::new(GeminiConfig::new("  ", DEFAULT_GEMINI_MODEL));
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    fn test_gemini_base_url_trailing_slash() {
        let config = GeminiConfig::new("key", DEFAULT_GEMINI_MODEL)
            .with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(config.base_url, "http://localhost:8080/v1beta");
    }

    fn gemini_for(server: &mockito::ServerGuard) -> GeminiBackend {
        let config = GeminiConfig::new("test-key", DEFAULT_GEMINI_MODEL)
            .with_base_url(&format!("{}/v1beta", server.url()));
        GeminiBackend::new(config).unwrap()
    }

    const GEMINI_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    #[tokio::test]
    async fn test_gemini_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", GEMINI_PATH)
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Round."}]}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let backend = gemini_for(&server);
        let text = backend.generate("Is the earth flat?").await.unwrap();

        assert_eq!(text, "Round.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gemini_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", GEMINI_PATH)
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let result = gemini_for(&server).generate("hi").await;
        assert!(matches!(result, Err(LlmError::RateLimited)));
    }

    #[tokio::test]
    async fn test_gemini_api_error_detail() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", GEMINI_PATH)
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        match gemini_for(&server).generate("hi").await {
            Err(LlmError::Api(detail)) => {
                assert!(detail.contains("INVALID_ARGUMENT"));
                assert!(detail.contains("API key not valid."));
                assert!(!detail.contains("test-key"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    fn anthropic_for(server: &mockito::ServerGuard) -> AnthropicBackend {
        let config = AnthropicConfig::new("anthropic-key", "claude-test").with_base_url(&server.url());
        AnthropicBackend::new(config).unwrap()
    }

    #[test]
    fn test_anthropic_default_base_url() {
        let config = AnthropicConfig::new("key", "claude-test");
        assert_eq!(config.base_url, ANTHROPIC_BASE_URL);

        let config = config.with_base_url("http://localhost:9000/");
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[tokio::test]
    async fn test_anthropic_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "anthropic-key")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "claude-test",
                "messages": [{"role": "user", "content": "Is the earth flat?"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg_1","type":"message","role":"assistant","content":[{"type":"text","text":"No, it is round."}]}"#)
            .expect(1)
            .create_async()
            .await;

        let text = anthropic_for(&server).generate("Is the earth flat?").await.unwrap();

        assert_eq!(text, "No, it is round.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_anthropic_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .create_async()
            .await;

        let result = anthropic_for(&server).generate("hi").await;
        assert!(matches!(result, Err(LlmError::RateLimited)));
    }

    #[tokio::test]
    async fn test_anthropic_empty_content() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[]}"#)
            .create_async()
            .await;

        let result = anthropic_for(&server).generate("hi").await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_openai_compatible_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-local")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "local-model",
                "messages": [{"role": "user", "content": "Is the earth flat?"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "created": 1700000000,
                    "model": "local-model",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "It is round."},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8}
                }"#,
            )
            .expect(1)
            .create_async()
            .await;

        let backend = OpenAIBackend::new(OpenAIBackendConfig::local(&server.url(), "local-model")).unwrap();
        let text = backend.generate("Is the earth flat?").await.unwrap();

        assert_eq!(text, "It is round.");
        assert_eq!(backend.model_name(), "local-model");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_compatible_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"chatcmpl-2","object":"chat.completion","created":1700000000,"model":"local-model","choices":[]}"#)
            .create_async()
            .await;

        let backend = OpenAIBackend::new(OpenAIBackendConfig::local(&server.url(), "local-model")).unwrap();
        let result = backend.generate("hi").await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }
}
