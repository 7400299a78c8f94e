//! Anthropic Messages API client.
//!
//! A thin typed wrapper over the `/v1/messages` endpoint: one system
//! instruction plus one user message in, the first content block's text
//! out. Model fallback lives in [`super::fix`], not here.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Default endpoint for the Messages API.
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// API version header value sent with every request.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token budget requested per completion.
const MAX_TOKENS: u32 = 4096;

/// Priority-ordered model identifiers, fastest and cheapest first.
pub const DEFAULT_MODELS: [&str; 4] = [
    "claude-3-haiku-20240307",
    "claude-3-5-sonnet-20240620",
    "claude-3-sonnet-20240229",
    "claude-3-opus-20240229",
];

/// Trait for completion services that can draft a fix.
///
/// Implemented by [`AnthropicClient`]; tests substitute their own
/// implementations to drive the fallback loop without a network.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for one system instruction + user message pair.
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    /// Base URL for the API.
    api_base: String,
    /// API key, sent as the `x-api-key` header.
    api_key: String,
    /// HTTP client for making API requests.
    http_client: Client,
}

impl AnthropicClient {
    /// Create a new client with an explicit base URL and key.
    ///
    /// The key is trimmed; a trailing newline from an env file would
    /// otherwise corrupt the header value.
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into().trim().to_string(),
            http_client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Create a client from the `ANTHROPIC_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when the variable is not set,
    /// so callers fail fast before issuing any request.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
        Ok(Self::new(DEFAULT_API_BASE, api_key))
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

/// Internal request structure for the Messages API.
#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
    system: &'a str,
}

/// Internal message structure for the request body.
#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Internal response structure from the Messages API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

/// One element of the response content array.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError> {
        let request = ApiRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages: vec![ApiMessage {
                role: "user",
                content: user,
            }],
            system,
        };

        let url = format!("{}/v1/messages", self.api_base);

        let http_response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            let body = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(LlmError::ApiError {
                code: status.as_u16(),
                message: body,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| LlmError::ParseError("No content in API response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_requires_key() {
        // Serialize env mutation against other tests in this binary.
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("ANTHROPIC_API_KEY");
        let err = AnthropicClient::from_env().unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn test_from_env_trims_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("ANTHROPIC_API_KEY", " sk-test-key\n");
        let client = AnthropicClient::from_env().unwrap();
        assert_eq!(client.api_key, "sk-test-key");
        std::env::remove_var("ANTHROPIC_API_KEY");
    }

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[tokio::test]
    async fn test_connection_error_maps_to_request_failed() {
        // A port that is unlikely to have a server behind it.
        let client = AnthropicClient::new("http://localhost:65535", "test-key");
        let result = client.complete("claude-3-haiku-20240307", "system", "user").await;

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), LlmError::RequestFailed(_)));
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ApiRequest {
            model: "claude-3-haiku-20240307",
            max_tokens: MAX_TOKENS,
            messages: vec![ApiMessage {
                role: "user",
                content: "logs here",
            }],
            system: "fix the bug",
        };

        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(json.contains("\"model\":\"claude-3-haiku-20240307\""));
        assert!(json.contains("\"max_tokens\":4096"));
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"system\":\"fix the bug\""));
    }

    #[test]
    fn test_response_first_content_block() {
        let body = r#"{"content": [{"type": "text", "text": "patch text"}, {"type": "text", "text": "ignored"}]}"#;
        let response: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.content.first().unwrap().text, "patch text");
    }

    #[test]
    fn test_default_models_order() {
        // Fastest first; later entries are fallbacks.
        assert_eq!(DEFAULT_MODELS[0], "claude-3-haiku-20240307");
        assert_eq!(DEFAULT_MODELS.len(), 4);
    }
}
