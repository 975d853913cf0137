//! Chat relay
//!
//! Validates an inbound chat call, augments the conversation when web search
//! is requested and forwards it to the completion provider. The provider's
//! success body is handed back untouched.

use crate::augment::PromptAugmenter;
use crate::chat::ChatRequest;
use crate::config::RelayConfig;
use crate::error::ApiError;
use crate::search::SearchOrigin;
use crate::upstream::{CompletionApi, CompletionRequest};
use std::sync::Arc;

/// Successful relay outcome.
#[derive(Debug, Clone)]
pub struct RelayReply {
    /// Upstream completion payload, byte for byte.
    pub body: String,
    pub search: Option<SearchOrigin>,
}

pub struct ChatRelay {
    completions: Option<Arc<dyn CompletionApi>>,
    augmenter: PromptAugmenter,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatRelay {
    /// `completions` is `None` when no model credential is configured; every
    /// chat call then fails with a configuration error.
    #[must_use]
    pub fn new(
        config: &RelayConfig,
        completions: Option<Arc<dyn CompletionApi>>,
        augmenter: PromptAugmenter,
    ) -> Self {
        Self {
            completions,
            augmenter,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Handles a raw `/api/chat` call.
    ///
    /// # Errors
    ///
    /// `MethodNotAllowed` for anything but POST, `Configuration` when the model
    /// key is missing, `Internal` for an unparsable body, plus everything
    /// [`ChatRelay::relay`] returns.
    pub async fn handle(
        &self,
        method: &str,
        body: &[u8],
    ) -> Result<RelayReply, ApiError> {
        if !method.eq_ignore_ascii_case("POST") {
            return Err(ApiError::MethodNotAllowed);
        }

        self.completions()?;

        let request: ChatRequest = serde_json::from_slice(body)?;
        self.relay(request).await
    }

    /// Augments `request` and sends it to the completion provider.
    ///
    /// # Errors
    ///
    /// `Configuration` without a model key (no network call is made), `Upstream`
    /// when the provider rejects the call, `UpstreamTimeout` when it does not answer.
    pub async fn relay(
        &self,
        request: ChatRequest,
    ) -> Result<RelayReply, ApiError> {
        let completions = self.completions()?;

        let augmentation = self.augmenter.augment_request(request).await;
        if let Some(origin) = &augmentation.search {
            tracing::info!("Augmented conversation with search context ({:?})", origin);
        }

        let completion = CompletionRequest {
            model: self.model.clone(),
            messages: augmentation.messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::info!(
            "Forwarding {} messages to model {}",
            completion.messages.len(),
            completion.model
        );

        let body = completions.complete(&completion).await?;

        Ok(RelayReply {
            body,
            search: augmentation.search,
        })
    }

    fn completions(&self) -> Result<&Arc<dyn CompletionApi>, ApiError> {
        self.completions
            .as_ref()
            .ok_or_else(|| ApiError::configuration("OpenAI API key not configured"))
    }
}
