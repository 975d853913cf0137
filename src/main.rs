use beauty_relay::config::RelayConfig;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayConfig::from_env();

    if config.search_api_key.is_none() {
        tracing::info!("BING_SEARCH_API_KEY is not set, web search will use simulated results");
    }

    beauty_relay::server::run(config).await
}
