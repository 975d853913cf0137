use crate::chat::{ChatMessage, ChatRequest};
use crate::search::{SearchOrigin, Searcher};
use crate::template::TemplateEngine;
use std::sync::Arc;
use std::time::Duration;

/// Result of augmenting a conversation.
#[derive(Debug, Clone)]
pub struct Augmentation {
    pub messages: Vec<ChatMessage>,
    /// Origin of the appended search context, `None` when nothing was appended.
    pub search: Option<SearchOrigin>,
}

/// Merges web-search context into a message list before it goes upstream.
pub struct PromptAugmenter {
    searcher: Arc<dyn Searcher>,
    budget: Duration,
}

impl PromptAugmenter {
    #[must_use]
    pub fn new(
        searcher: Arc<dyn Searcher>,
        budget: Duration,
    ) -> Self {
        Self { searcher, budget }
    }

    pub async fn augment_request(
        &self,
        request: ChatRequest,
    ) -> Augmentation {
        self.augment(request.messages, request.enable_web_search, &request.user_query)
            .await
    }

    /// Appends one `system` message with search results for `user_query`.
    ///
    /// Returns `messages` untouched when search is off, the query is blank, or
    /// the searcher fails or runs past the budget. Chat is never blocked by search.
    pub async fn augment(
        &self,
        messages: Vec<ChatMessage>,
        enable_web_search: bool,
        user_query: &str,
    ) -> Augmentation {
        if !enable_web_search || user_query.trim().is_empty() {
            return Augmentation {
                messages,
                search: None,
            };
        }

        let report = match tokio::time::timeout(self.budget, self.searcher.lookup(user_query)).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                tracing::warn!("Web search failed, continuing without search context: {}", e);
                return Augmentation {
                    messages,
                    search: None,
                };
            }
            Err(_) => {
                tracing::warn!(
                    "Web search exceeded {:?}, continuing without search context",
                    self.budget
                );
                return Augmentation {
                    messages,
                    search: None,
                };
            }
        };

        let mut messages = messages;
        messages.push(ChatMessage::system(TemplateEngine::render_search_context(
            user_query,
            &report.text,
        )));

        Augmentation {
            messages,
            search: Some(report.origin),
        }
    }
}
