//! Web search with a simulated fallback
//!
//! [`SearchProvider`] always produces usable text: live results from the
//! configured [`WebSearch`] backend when it works, otherwise a deterministic
//! simulated block. The [`SearchReport`] it returns records which of the two
//! the caller got.

use crate::config::{RelayConfig, SearchConfig};
use crate::error::ApiError;
use crate::template::TemplateEngine;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// An external web-search API returning ranked results.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        count: u32,
        market: &str,
    ) -> Result<Vec<SearchResult>, ApiError>;
}

/// Bing Web Search v7 client.
pub struct BingSearch {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

#[derive(Deserialize)]
struct BingResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<BingWebPages>,
}

#[derive(Deserialize)]
struct BingWebPages {
    #[serde(default)]
    value: Vec<BingWebPage>,
}

#[derive(Deserialize)]
struct BingWebPage {
    name: String,
    #[serde(default)]
    snippet: String,
    url: String,
}

impl BingSearch {
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
impl WebSearch for BingSearch {
    async fn search(
        &self,
        query: &str,
        count: u32,
        market: &str,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let url = format!("{}/v7.0/search", self.api_base.trim_end_matches('/'));
        let count = count.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("count", count.as_str()), ("mkt", market)])
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::upstream(format!("Bing API error: {}", response.status())));
        }

        let body = response.text().await?;
        let parsed: BingResponse = serde_json::from_str(&body)?;

        Ok(parsed
            .web_pages
            .map(|pages| pages.value)
            .unwrap_or_default()
            .into_iter()
            .map(|page| SearchResult {
                title: page.name,
                snippet: page.snippet,
                url: page.url,
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedReason {
    NotConfigured,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOrigin {
    Live,
    Simulated(SimulatedReason),
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    pub text: String,
    pub origin: SearchOrigin,
}

impl SearchReport {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.origin == SearchOrigin::Live
    }
}

/// Anything that can turn a user query into search text for the prompt.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn lookup(
        &self,
        query: &str,
    ) -> Result<SearchReport, ApiError>;
}

pub struct SearchProvider {
    backend: Option<Arc<dyn WebSearch>>,
    config: SearchConfig,
    today: fn() -> String,
}

impl SearchProvider {
    /// Creates a provider backed by Bing when a search key is configured.
    #[must_use]
    pub fn from_config(
        config: &RelayConfig,
        client: reqwest::Client,
    ) -> Self {
        let backend = config.search_api_key.as_ref().map(|key| {
            Arc::new(BingSearch::new(client, config.search.api_base.clone(), key.clone())) as Arc<dyn WebSearch>
        });

        Self::new(config.search.clone(), backend)
    }

    #[must_use]
    pub fn new(
        config: SearchConfig,
        backend: Option<Arc<dyn WebSearch>>,
    ) -> Self {
        Self {
            backend,
            config,
            today: local_date_label,
        }
    }

    /// Replaces the date source used in simulated results.
    #[must_use]
    pub fn with_date_source(
        mut self,
        today: fn() -> String,
    ) -> Self {
        self.today = today;
        self
    }

    #[must_use]
    pub fn is_live_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Searches the web for `query`, never failing.
    pub async fn search(
        &self,
        query: &str,
    ) -> SearchReport {
        let Some(backend) = self.backend.as_ref() else {
            tracing::info!("No search API key configured, using simulated results for {:?}", query);
            return self.simulated(query, SimulatedReason::NotConfigured);
        };

        let biased_query = self.domain_query(query);
        match backend.search(&biased_query, self.config.count, &self.config.market).await {
            Ok(results) => {
                tracing::info!("Web search for {:?} returned {} results", query, results.len());
                SearchReport {
                    text: format_results(query, &results, self.config.top_results, self.config.max_snippet_chars),
                    origin: SearchOrigin::Live,
                }
            }
            Err(e) => {
                tracing::warn!("Web search failed, falling back to simulated results: {}", e);
                self.simulated(query, SimulatedReason::Failed(e.to_string()))
            }
        }
    }

    /// The query actually sent to the search API, biased towards the brand's domain.
    #[must_use]
    pub fn domain_query(
        &self,
        query: &str,
    ) -> String {
        format!("{} {query} beauty skincare cosmetics", self.config.brand)
    }

    fn simulated(
        &self,
        query: &str,
        reason: SimulatedReason,
    ) -> SearchReport {
        SearchReport {
            text: TemplateEngine::render_simulated_search_results(&self.config.brand, query, &(self.today)()),
            origin: SearchOrigin::Simulated(reason),
        }
    }
}

#[async_trait]
impl Searcher for SearchProvider {
    async fn lookup(
        &self,
        query: &str,
    ) -> Result<SearchReport, ApiError> {
        Ok(self.search(query).await)
    }
}

/// Renders the top results as numbered blocks under a header line.
#[must_use]
pub fn format_results(
    query: &str,
    results: &[SearchResult],
    top: usize,
    max_snippet_chars: usize,
) -> String {
    let mut formatted = format!("🔍 **Current search results for \"{query}\":**\n\n");

    if results.is_empty() {
        formatted.push_str("No matching web results were found.\n");
        return formatted;
    }

    for (index, result) in results.iter().take(top).enumerate() {
        let _ = write!(
            formatted,
            "{}. **{}**\n   {}\n   🔗 Source: {}\n\n",
            index + 1,
            result.title,
            truncate(&result.snippet, max_snippet_chars),
            result.url
        );
    }

    formatted
}

fn truncate(
    text: &str,
    max_chars: usize,
) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

/// Today's date in the `M/D/YYYY` form used by simulated results.
#[must_use]
pub fn local_date_label() -> String {
    chrono::Local::now().format("%-m/%-d/%Y").to_string()
}
