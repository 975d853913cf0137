//! Client for the relay's HTTP surface
//!
//! This is what a front end uses to talk to a deployed relay: it assembles the
//! conversation, posts it to `/api/chat` and extracts the assistant text.

use crate::chat::{ChatMessage, ChatRequest, SearchRequest, SearchResponse};
use crate::config::DEFAULT_BRAND;
use crate::router::{CHAT_PATH, HEALTH_PATH, SEARCH_PATH};
use crate::template::TemplateEngine;
use serde::Deserialize;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const SEARCH_UNAVAILABLE: &str = "Unable to perform web search at this time. Please try again later.";

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct RelayErrorBody {
    error: Option<serde_json::Value>,
}

pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
    brand: String,
    history: Vec<ChatMessage>,
}

impl RelayClient {
    /// Creates a client for the relay deployed at `base_url`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use beauty_relay::client::RelayClient;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let client = RelayClient::new("https://relay.example.workers.dev");
    /// let answer = client
    ///     .ask("You are a skincare advisor.", "What goes first, serum or moisturizer?", false, true)
    ///     .await?;
    /// println!("{answer}");
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            brand: DEFAULT_BRAND.to_string(),
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_brand(
        mut self,
        brand: impl Into<String>,
    ) -> Self {
        self.brand = brand.into();
        self
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn push_history(
        &mut self,
        message: ChatMessage,
    ) {
        self.history.push(message);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Builds the message list sent to `/api/chat`.
    ///
    /// With web search on, the search instruction is appended to the system
    /// prompt once.
    #[must_use]
    pub fn build_messages(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        include_history: bool,
        enable_web_search: bool,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::new();

        if !system_prompt.is_empty() {
            let mut prompt = system_prompt.to_string();
            if enable_web_search {
                prompt.push_str(&TemplateEngine::render_web_search_instruction(&self.brand));
            }
            messages.push(ChatMessage::system(prompt));
        }

        if include_history {
            messages.extend(self.history.iter().cloned());
        }

        messages.push(ChatMessage::user(user_prompt));
        messages
    }

    /// Asks the relay and returns the assistant's reply text.
    ///
    /// When web search was requested and the relay is unavailable, a canned
    /// advice text is returned instead of an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay fails and web search was not requested.
    pub async fn ask(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        include_history: bool,
        enable_web_search: bool,
    ) -> Result<String, BoxError> {
        let request = ChatRequest {
            messages: self.build_messages(system_prompt, user_prompt, include_history, enable_web_search),
            enable_web_search,
            user_query: user_prompt.to_string(),
        };

        match self.post_chat(&request).await {
            Ok(content) => Ok(content),
            Err(e) if enable_web_search => {
                tracing::warn!("Relay chat failed, answering offline: {}", e);
                Ok(TemplateEngine::render_offline_advice(&self.brand))
            }
            Err(e) => {
                tracing::error!("Relay chat failed: {}", e);
                Err(e)
            }
        }
    }

    async fn post_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<String, BoxError> {
        let response = self
            .http
            .post(format!("{}{CHAT_PATH}", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(format!("Relay error ({status}): {}", relay_error_label(&body)).into());
        }

        extract_reply(&body)
    }

    /// Runs a direct search through the relay, returning a notice text on failure.
    pub async fn search(
        &self,
        query: &str,
    ) -> String {
        match self.post_search(query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Relay search failed: {}", e);
                SEARCH_UNAVAILABLE.to_string()
            }
        }
    }

    async fn post_search(
        &self,
        query: &str,
    ) -> Result<String, BoxError> {
        let response = self
            .http
            .post(format!("{}{SEARCH_PATH}", self.base_url))
            .json(&SearchRequest {
                query: Some(query.to_string()),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("Search API error: {}", response.status()).into());
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }

    /// Returns `true` when the relay answers `GET /health` with a success status.
    pub async fn check_health(&self) -> bool {
        match self.http.get(format!("{}{HEALTH_PATH}", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Relay health check failed: {}", e);
                false
            }
        }
    }
}

/// Reads `choices[0].message.content` from a completion payload.
///
/// # Errors
///
/// Returns an error for an `error` payload or one without choices.
pub fn extract_reply(body: &str) -> Result<String, BoxError> {
    if let Ok(RelayErrorBody { error: Some(error) }) = serde_json::from_str::<RelayErrorBody>(body) {
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .or_else(|| error.as_str())
            .unwrap_or("API Error");
        return Err(message.to_string().into());
    }

    let completion: Completion = serde_json::from_str(body)?;
    completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| "No response from AI model".into())
}

fn relay_error_label(body: &str) -> String {
    serde_json::from_str::<RelayErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|error| error.as_str().map(str::to_string))
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;

    #[test]
    fn test_build_messages_without_search() {
        let client = RelayClient::new("http://localhost:8080/");
        let messages = client.build_messages("You are an advisor.", "Hello", false, false);

        assert_eq!(
            messages,
            vec![ChatMessage::system("You are an advisor."), ChatMessage::user("Hello")]
        );
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_build_messages_appends_instruction_once() {
        let mut client = RelayClient::new("http://localhost:8080");
        client.push_history(ChatMessage::system("Earlier context"));
        let messages = client.build_messages("You are an advisor.", "Best SPF?", true, true);

        assert_eq!(messages.len(), 3);
        assert!(messages[0].content.starts_with("You are an advisor.\n\nIMPORTANT:"));
        assert_eq!(messages[0].content.matches("IMPORTANT:").count(), 1);
        assert_eq!(messages[1].content, "Earlier context");
        assert_eq!(messages[2].role, ChatRole::User);
    }

    #[test]
    fn test_build_messages_skips_empty_system_prompt_and_history() {
        let mut client = RelayClient::new("http://localhost:8080");
        client.push_history(ChatMessage::assistant("Hi!"));

        let messages = client.build_messages("", "Next question", false, true);
        assert_eq!(messages, vec![ChatMessage::user("Next question")]);

        client.clear_history();
        assert!(client.history().is_empty());
    }

    #[test]
    fn test_extract_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Apply serum first."}}]}"#;
        assert_eq!(extract_reply(body).unwrap(), "Apply serum first.");
    }

    #[test]
    fn test_extract_reply_error_payloads() {
        let err = extract_reply(r#"{"error":{"message":"quota exceeded"}}"#).unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");

        let err = extract_reply(r#"{"choices":[]}"#).unwrap_err();
        assert_eq!(err.to_string(), "No response from AI model");
    }

    #[test]
    fn test_relay_error_label() {
        assert_eq!(
            relay_error_label(r#"{"error":"Internal server error","message":"boom"}"#),
            "Internal server error"
        );
        assert_eq!(relay_error_label("Not Found"), "Unknown error");
    }

    #[tokio::test]
    async fn test_unreachable_relay_degrades() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = RelayClient::new("http://127.0.0.1:9");

        assert!(!client.check_health().await);
        assert_eq!(client.search("SPF").await, SEARCH_UNAVAILABLE);

        let offline = client.ask("You are an advisor.", "SPF?", false, true).await.unwrap();
        assert!(offline.contains("trouble accessing current information"));

        assert!(client.ask("You are an advisor.", "SPF?", false, false).await.is_err());
    }
}
