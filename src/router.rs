//! Edge router
//!
//! Framework-neutral request dispatch shared by the standalone server and the
//! serverless handler. Adapters convert their native request into a
//! [`RelayRequest`] and write back the [`RelayResponse`].

use crate::augment::PromptAugmenter;
use crate::chat::{SearchRequest, SearchResponse};
use crate::config::RelayConfig;
use crate::error::ApiError;
use crate::rate_limit::RateLimiter;
use crate::relay::ChatRelay;
use crate::search::SearchProvider;
use crate::upstream::{CompletionApi, OpenAiCompletions};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const CHAT_PATH: &str = "/api/chat";
pub const SEARCH_PATH: &str = "/api/search";
pub const HEALTH_PATH: &str = "/health";

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
];

/// Tracked-client count above which the limiter is swept.
const SWEEP_THRESHOLD: usize = 10_000;

/// Client identity used when nothing better is known.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: String,
    pub path: String,
    pub client_id: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RelayResponse {
    fn new(
        status_code: u16,
        content_type: Option<&str>,
        body: String,
    ) -> Self {
        let mut headers: HashMap<String, String> = CORS_HEADERS
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        if let Some(content_type) = content_type {
            headers.insert("Content-Type".to_string(), content_type.to_string());
        }

        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn json(
        status_code: u16,
        body: &impl Serialize,
    ) -> Self {
        let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
        Self::new(status_code, Some("application/json"), body)
    }

    /// A JSON response whose body is already serialized.
    #[must_use]
    pub fn raw_json(
        status_code: u16,
        body: String,
    ) -> Self {
        Self::new(status_code, Some("application/json"), body)
    }

    #[must_use]
    pub fn text(
        status_code: u16,
        body: &str,
    ) -> Self {
        Self::new(status_code, Some("text/plain"), body.to_string())
    }

    #[must_use]
    pub fn preflight() -> Self {
        let mut response = Self::new(200, None, String::new());
        response
            .headers
            .insert("Access-Control-Max-Age".to_string(), "86400".to_string());
        response
    }

    #[must_use]
    pub fn from_error(
        err: &ApiError,
        label: &str,
    ) -> Self {
        if matches!(err, ApiError::NotFound) {
            return Self::text(404, "Not Found");
        }

        let mut response = Self::json(err.status_code(), &err.error_response(label));
        if let ApiError::RateLimited(window) = err {
            response
                .headers
                .insert("Retry-After".to_string(), window.to_string());
        }
        response
    }

    #[must_use]
    pub fn header(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Resolves the client identity, falling back to the peer address.
///
/// Forwarding headers are only consulted when `trust_proxy_headers` is set.
pub fn client_identity(
    header: impl Fn(&str) -> Option<String>,
    peer: Option<String>,
    trust_proxy_headers: bool,
) -> String {
    let first = |value: String| value.split(',').next().map(str::trim).unwrap_or_default().to_string();

    let forwarded = if trust_proxy_headers {
        header("CF-Connecting-IP")
            .or_else(|| header("X-Forwarded-For").map(first))
            .or_else(|| header("X-Real-IP"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    } else {
        None
    };

    forwarded
        .or(peer)
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

pub struct EdgeRouter {
    chat: ChatRelay,
    search: Arc<SearchProvider>,
    limiter: Option<RateLimiter>,
    trust_proxy_headers: bool,
}

impl EdgeRouter {
    /// Wires the live upstream clients described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|e| ApiError::internal(format!("Failed to build HTTP client: {e}")))?;

        let completions = config.model_api_key.as_ref().map(|key| {
            Arc::new(OpenAiCompletions::new(client.clone(), config.model_api_base.clone(), key.clone()))
                as Arc<dyn CompletionApi>
        });
        if completions.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set, chat requests will fail");
        }

        let search = Arc::new(SearchProvider::from_config(config, client));
        let limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::new(&config.rate_limit));

        Ok(Self::new(config, completions, search, limiter))
    }

    #[must_use]
    pub fn new(
        config: &RelayConfig,
        completions: Option<Arc<dyn CompletionApi>>,
        search: Arc<SearchProvider>,
        limiter: Option<RateLimiter>,
    ) -> Self {
        // Search inside a chat call gets the same budget as any upstream call.
        let augmenter = PromptAugmenter::new(search.clone(), search_budget(config.upstream_timeout));

        Self {
            chat: ChatRelay::new(config, completions, augmenter),
            search,
            limiter,
            trust_proxy_headers: config.trust_proxy_headers,
        }
    }

    /// Whether adapters may derive the client identity from forwarding headers.
    #[must_use]
    pub fn trusts_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    pub async fn handle(
        &self,
        request: RelayRequest,
    ) -> RelayResponse {
        tracing::info!("Received request: {} {}", request.method, request.path);

        if request.method.eq_ignore_ascii_case("OPTIONS") {
            return RelayResponse::preflight();
        }

        match request.path.as_str() {
            HEALTH_PATH => RelayResponse::text(200, "OK"),
            CHAT_PATH => {
                if let Err(e) = self.admit(&request.client_id) {
                    return RelayResponse::from_error(&e, "Internal server error");
                }
                self.handle_chat(&request).await
            }
            SEARCH_PATH => {
                if let Err(e) = self.admit(&request.client_id) {
                    return RelayResponse::from_error(&e, "Search failed");
                }
                self.handle_search(&request).await
            }
            _ => RelayResponse::from_error(&ApiError::NotFound, "Not Found"),
        }
    }

    fn admit(
        &self,
        client_id: &str,
    ) -> Result<(), ApiError> {
        let Some(limiter) = self.limiter.as_ref() else {
            return Ok(());
        };

        if limiter.tracked_clients() > SWEEP_THRESHOLD {
            limiter.sweep();
        }

        if limiter.is_rate_limited(client_id) {
            tracing::warn!("Rate limit exceeded for client {}", client_id);
            return Err(ApiError::RateLimited(limiter.window().as_secs()));
        }
        Ok(())
    }

    async fn handle_chat(
        &self,
        request: &RelayRequest,
    ) -> RelayResponse {
        match self.chat.handle(&request.method, &request.body).await {
            Ok(reply) => RelayResponse::raw_json(200, reply.body),
            Err(e) => {
                tracing::error!("Chat request error: {}", e);
                RelayResponse::from_error(&e, "Internal server error")
            }
        }
    }

    async fn handle_search(
        &self,
        request: &RelayRequest,
    ) -> RelayResponse {
        match self.search_results(&request.method, &request.body).await {
            Ok(results) => RelayResponse::json(200, &SearchResponse { results }),
            Err(e) => {
                tracing::error!("Search request error: {}", e);
                RelayResponse::from_error(&e, "Search failed")
            }
        }
    }

    async fn search_results(
        &self,
        method: &str,
        body: &[u8],
    ) -> Result<String, ApiError> {
        if !method.eq_ignore_ascii_case("POST") {
            return Err(ApiError::MethodNotAllowed);
        }

        let request: SearchRequest = serde_json::from_slice(body)?;
        let query = request
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Query parameter required"))?;

        let report = self.search.search(&query).await;
        tracing::info!("Direct search for {:?} served from {:?}", query, report.origin);
        Ok(report.text)
    }
}

fn search_budget(upstream_timeout: Duration) -> Duration {
    upstream_timeout + Duration::from_secs(1)
}
