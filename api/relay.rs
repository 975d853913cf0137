//! Vercel serverless function for the beauty-advisor relay
//!
//! Every path is rewritten to this function; routing happens in [`EdgeRouter`].
//! The router is built once per function instance so the rate limiter keeps
//! its history between invocations served by the same instance.

use beauty_relay::config::RelayConfig;
use beauty_relay::router::EdgeRouter;
use beauty_relay::vercel::{to_relay_request, to_vercel_response};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use vercel_runtime::{run, Body, Error, Request, Response};

static ROUTER: OnceLock<EdgeRouter> = OnceLock::new();

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting beauty-relay serverless function");

    let router = EdgeRouter::from_config(&RelayConfig::from_env())?;
    if ROUTER.set(router).is_err() {
        return Err("relay router initialised twice".into());
    }

    run(handler).await
}

/// Handles incoming HTTP requests for the relay
///
/// # Errors
///
/// Returns an error if the router is not initialised or the response cannot be built
pub async fn handler(req: Request) -> Result<Response<Body>, Error> {
    let router = ROUTER.get().ok_or("relay router not initialised")?;

    let response = router.handle(to_relay_request(&req, router.trusts_proxy_headers())).await;
    tracing::info!("{} {} -> {}", req.method(), req.uri().path(), response.status_code);

    to_vercel_response(response)
}
