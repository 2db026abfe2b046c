// ABOUTME: Model Invoker with structured-output attempt and plain-text fallback retry
// ABOUTME: Exactly two attempts: forced-JSON mode, then an instructed plain completion
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Model Invoker
//!
//! A tagged two-branch state machine around the provider call: attempt a
//! completion with the strict-JSON response mode; if the endpoint rejects
//! that mode specifically, retry once with an explicit plain-text JSON
//! instruction appended and the mode flag omitted. Any other failure
//! surfaces as an internal condition with no further retries.

use std::sync::Arc;

use tracing::{error, instrument, warn};

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::llm::{ChatMessage, ChatRequest, ChatResponse, LlmProvider};

/// Appended for the fallback attempt when structured mode is unsupported
const PLAIN_JSON_INSTRUCTION: &str =
    "Return only a JSON object. No markdown fences, no commentary, no text before or after it.";

/// Invocation settings carried alongside the injected provider
#[derive(Debug, Clone, Copy)]
pub struct InvokerSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

impl From<&crate::config::LlmConfig> for InvokerSettings {
    fn from(config: &crate::config::LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Calls the generative model with the two-attempt fallback strategy
#[derive(Clone)]
pub struct ModelInvoker {
    provider: Arc<dyn LlmProvider>,
    settings: InvokerSettings,
}

impl ModelInvoker {
    /// Create an invoker over an injected provider instance
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, settings: InvokerSettings) -> Self {
        Self { provider, settings }
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest::new(messages)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
    }

    /// Invoke the model, preferring the strict-JSON response mode
    ///
    /// # Errors
    ///
    /// Returns an internal error for any provider failure other than the
    /// recognized structured-mode rejection, which triggers the single
    /// fallback attempt.
    #[instrument(skip(self, messages), fields(provider = self.provider.name()))]
    pub async fn invoke(&self, messages: Vec<ChatMessage>) -> AppResult<ChatResponse> {
        let structured = self.request(messages.clone()).with_json_mode();

        match self.provider.complete(&structured).await {
            Ok(response) => Ok(response),
            Err(err) if err.code == ErrorCode::UnsupportedResponseFormat => {
                warn!(
                    provider = self.provider.name(),
                    "structured output mode unsupported, retrying with plain instruction"
                );
                let mut fallback_messages = messages;
                fallback_messages.push(ChatMessage::user(PLAIN_JSON_INSTRUCTION));
                self.provider
                    .complete(&self.request(fallback_messages))
                    .await
                    .map_err(|err| {
                        error!(error = %err, "fallback model invocation failed");
                        AppError::internal("workout model invocation failed").with_source(err)
                    })
            }
            Err(err) => {
                error!(error = %err, "model invocation failed");
                Err(AppError::internal("workout model invocation failed").with_source(err))
            }
        }
    }
}
