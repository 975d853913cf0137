//! Upstream chat-completion API

use crate::chat::ChatMessage;
use crate::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request body sent to the chat-completion endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A chat-completion provider.
///
/// Implementations return the provider's success body exactly as received so
/// the relay can pass it through unchanged.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, ApiError>;
}

/// OpenAI-compatible `/v1/chat/completions` client.
pub struct OpenAiCompletions {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiCompletions {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl CompletionApi for OpenAiCompletions {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.api_base.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Model API returned {}", status);
            return Err(ApiError::upstream(format!(
                "Model API error: {}",
                upstream_error_message(&body)
            )));
        }

        // Reject non-JSON success bodies, but hand back the original text untouched.
        serde_json::from_str::<serde::de::IgnoredAny>(&body)
            .map_err(|e| ApiError::upstream(format!("Model API returned malformed JSON: {e}")))?;

        Ok(body)
    }
}

/// Pulls `error.message` out of a provider error body.
#[must_use]
pub fn upstream_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|detail| detail.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| "Unknown error".to_string())
}
