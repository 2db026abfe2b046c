// ABOUTME: Generic OpenAI-compatible LLM provider for local and cloud endpoints
// ABOUTME: Supports Ollama, vLLM, Groq, and any OpenAI-compatible chat completion API
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # `OpenAI`-Compatible Provider
//!
//! Generic implementation for any `OpenAI`-compatible chat completion
//! endpoint. When [`ChatRequest::json_mode`](super::ChatRequest) is set, the
//! request carries `response_format: {"type": "json_object"}`; endpoints that
//! reject that mode produce a distinct
//! [`UnsupportedResponseFormat`](crate::errors::ErrorCode::UnsupportedResponseFormat)
//! error so the invoker can fall back to a plain-text-instructed attempt.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::{ChatMessage, ChatRequest, ChatResponse, LlmProvider, TokenUsage};
use crate::config::LlmConfig;
use crate::errors::AppError;

/// Connection timeout; lenient for local servers
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Request timeout; local inference can be slow
const REQUEST_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// API Request/Response Types (OpenAI-compatible format)
// ============================================================================

/// OpenAI-compatible API request structure
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Structured-output request mode
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

impl ResponseFormat {
    const fn json_object() -> Self {
        Self {
            format_type: "json_object",
        }
    }
}

/// Message structure for OpenAI-compatible API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }
}

/// OpenAI-compatible API response structure
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    model: String,
}

/// Choice in response
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

/// Message in response
#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

/// Usage statistics in response
#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(rename = "prompt_tokens")]
    prompt: u32,
    #[serde(rename = "completion_tokens")]
    completion: u32,
    #[serde(rename = "total_tokens")]
    total: u32,
}

/// API error response
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Configuration for an `OpenAI`-compatible provider instance
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL, e.g. `http://localhost:11434/v1`
    pub base_url: String,
    /// Bearer token, optional for local servers
    pub api_key: Option<String>,
    /// Model used when the request does not specify one
    pub default_model: String,
}

impl From<&LlmConfig> for OpenAiCompatibleConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
        }
    }
}

/// Generic provider for `OpenAI`-compatible chat completion endpoints
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns a config error if the HTTP client cannot be constructed.
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a provider from the service's environment configuration
    ///
    /// # Errors
    ///
    /// Returns a config error if the HTTP client cannot be constructed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::new(OpenAiCompatibleConfig::from(&LlmConfig::from_env()))
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    /// Convert internal messages to the wire format
    fn convert_messages(messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        messages.iter().map(OpenAiMessage::from).collect()
    }

    /// Attach the bearer token when one is configured
    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    /// Whether an error body describes a rejected `response_format` mode
    fn is_response_format_rejection(status: reqwest::StatusCode, message: &str) -> bool {
        if status != reqwest::StatusCode::BAD_REQUEST {
            return false;
        }
        let lower = message.to_lowercase();
        lower.contains("response_format") || lower.contains("json_object")
    }

    /// Parse an error response body into a typed error
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let detail = error_response.error;
            if Self::is_response_format_rejection(status, &detail.message) {
                return AppError::unsupported_response_format(detail.message);
            }
            let error_type = detail.error_type.unwrap_or_else(|| "unknown".to_owned());
            match status.as_u16() {
                401 => AppError::external_service(
                    "llm",
                    format!("authentication failed: {}", detail.message),
                ),
                429 => AppError::external_service(
                    "llm",
                    format!("rate limit exceeded: {}", detail.message),
                ),
                _ => AppError::external_service("llm", format!("{error_type} - {}", detail.message)),
            }
        } else {
            if Self::is_response_format_rejection(status, body) {
                return AppError::unsupported_response_format(
                    body.chars().take(200).collect::<String>(),
                );
            }
            AppError::external_service(
                "llm",
                format!(
                    "API error ({status}): {}",
                    body.chars().take(200).collect::<String>()
                ),
            )
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.config.default_model), json_mode = request.json_mode))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);

        debug!("Sending chat completion request");

        let api_request = OpenAiRequest {
            model: model.to_owned(),
            messages: Self::convert_messages(&request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then(ResponseFormat::json_object),
        };

        let response = self
            .authorize(self.client.post(self.api_url("chat/completions")))
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send request to model endpoint: {}", e);
                AppError::external_service("llm", format!("Failed to connect: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read model endpoint response: {}", e);
            AppError::external_service("llm", format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(Self::parse_error_response(status, &body));
        }

        let api_response: OpenAiResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse model endpoint response: {}", e);
            AppError::external_service("llm", format!("Failed to parse response: {e}"))
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external_service("llm", "API returned no choices"))?;

        let content = choice.message.content.unwrap_or_default();

        debug!(
            "Received response: {} chars, finish_reason: {:?}",
            content.len(),
            choice.finish_reason
        );

        Ok(ChatResponse {
            content,
            model: api_response.model,
            usage: api_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt,
                completion_tokens: u.completion,
                total_tokens: u.total,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, AppError> {
        debug!("Performing model endpoint health check");

        let response = self
            .authorize(self.client.get(self.api_url("models")))
            .send()
            .await
            .map_err(|e| {
                error!("Model endpoint health check failed: {}", e);
                AppError::external_service("llm", format!("Health check failed: {e}"))
            })?;

        let healthy = response.status().is_success();
        if !healthy {
            warn!(
                "Model endpoint health check failed with status: {}",
                response.status()
            );
        }

        Ok(healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_response_format_rejection_detection() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        assert!(OpenAiCompatibleProvider::is_response_format_rejection(
            status,
            "'response_format' is not supported with this model"
        ));
        assert!(OpenAiCompatibleProvider::is_response_format_rejection(
            status,
            "json_object mode unavailable"
        ));
        assert!(!OpenAiCompatibleProvider::is_response_format_rejection(
            status,
            "context length exceeded"
        ));
        assert!(!OpenAiCompatibleProvider::is_response_format_rejection(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "response_format mentioned in a 500"
        ));
    }

    #[test]
    fn test_parse_error_response_classification() {
        let body = r#"{"error":{"message":"response_format is not supported","type":"invalid_request_error"}}"#;
        let err = OpenAiCompatibleProvider::parse_error_response(
            reqwest::StatusCode::BAD_REQUEST,
            body,
        );
        assert_eq!(err.code, ErrorCode::UnsupportedResponseFormat);

        let body = r#"{"error":{"message":"model overloaded","type":"server_error"}}"#;
        let err = OpenAiCompatibleProvider::parse_error_response(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body,
        );
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }

    #[test]
    fn test_api_url_trims_trailing_slash() {
        let provider = OpenAiCompatibleProvider::new(OpenAiCompatibleConfig {
            base_url: "http://localhost:11434/v1/".into(),
            api_key: None,
            default_model: "qwen2.5:14b-instruct".into(),
        })
        .expect("client builds");
        assert_eq!(
            provider.api_url("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }
}
