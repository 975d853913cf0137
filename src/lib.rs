//! # beauty-relay
//!
//! An edge relay for a beauty-product advisor chat. It keeps the model-provider
//! credential off the browser, optionally enriches a conversation with
//! web-search snippets, and forwards it to an OpenAI-compatible
//! chat-completion API.
//!
//! ## Features
//!
//! - **Chat relay**: `POST /api/chat` forwards a conversation upstream and returns the provider payload unchanged
//! - **Search augmentation**: with `enableWebSearch`, search results are appended as a `system` message
//! - **Graceful search**: without a search key, or when the search API fails, a simulated result block is used
//! - **Rate limiting**: per-client sliding window with `429` responses
//! - **Two deployments**: a standalone actix-web server and a Vercel serverless function
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! beauty-relay = { version = "0.1", default-features = false }
//! ```
//!
//! ### Routing a request
//!
//! ```rust,no_run
//! use beauty_relay::config::RelayConfig;
//! use beauty_relay::router::{EdgeRouter, RelayRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = RelayConfig::default().with_model_api_key("sk-...");
//!     let router = EdgeRouter::from_config(&config)?;
//!
//!     let response = router
//!         .handle(RelayRequest {
//!             method: "POST".to_string(),
//!             path: "/api/search".to_string(),
//!             client_id: "203.0.113.10".to_string(),
//!             body: br#"{"query":"vitamin C serum"}"#.to_vec(),
//!         })
//!         .await;
//!
//!     println!("{} {}", response.status_code, response.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Server Mode
//!
//! The `server` feature (enabled by default) builds the `beauty-relay` binary:
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run
//! ```

// Core modules - always available
pub mod augment;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod relay;
pub mod router;
pub mod search;
pub mod template;
pub mod upstream;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types for easier access
pub use chat::{ChatMessage, ChatRequest, ChatRole};
pub use client::RelayClient;
pub use config::RelayConfig;
pub use error::{ApiError, ErrorResponse};
pub use router::{EdgeRouter, RelayRequest, RelayResponse};
pub use search::{SearchOrigin, SearchReport, SearchResult};

// Server-specific modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod vercel;
