//! Relay configuration
//!
//! All settings are carried in an explicit [`RelayConfig`] value that is handed to
//! component constructors. Credentials are optional here and checked when a
//! request needs them, not at startup.

use std::time::Duration;

pub const DEFAULT_MODEL_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_SEARCH_API_BASE: &str = "https://api.bing.microsoft.com";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BRAND: &str = "L'Oréal";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window: Duration,
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::from_secs(60),
            max_requests: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub api_base: String,
    /// Brand name prefixed to every outgoing search query.
    pub brand: String,
    pub count: u32,
    pub market: String,
    pub top_results: usize,
    pub max_snippet_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_SEARCH_API_BASE.to_string(),
            brand: DEFAULT_BRAND.to_string(),
            count: 5,
            market: "en-US".to_string(),
            top_results: 3,
            max_snippet_chars: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Model-provider key; chat requests fail with a configuration error without it.
    pub model_api_key: Option<String>,
    /// Web-search key; search degrades to simulated results without it.
    pub search_api_key: Option<String>,
    pub model_api_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub upstream_timeout: Duration,
    pub search: SearchConfig,
    pub rate_limit: RateLimitConfig,
    pub bind_address: String,
    /// Take the client address from `CF-Connecting-IP` / `X-Forwarded-For` /
    /// `X-Real-IP`. Only safe behind a proxy that sets these itself.
    pub trust_proxy_headers: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model_api_key: None,
            search_api_key: None,
            model_api_base: DEFAULT_MODEL_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1500,
            temperature: 0.7,
            upstream_timeout: Duration::from_secs(30),
            search: SearchConfig::default(),
            rate_limit: RateLimitConfig::default(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            trust_proxy_headers: false,
        }
    }
}

impl RelayConfig {
    /// Reads the configuration from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. Numeric values that fail to parse keep
    /// their defaults and log a warning.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let rate_limit = RateLimitConfig {
            enabled: parse_flag(get("RATE_LIMIT_ENABLED"), "RATE_LIMIT_ENABLED", defaults.rate_limit.enabled),
            window: Duration::from_secs(parse_or(
                get("RATE_LIMIT_WINDOW_SECS"),
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit.window.as_secs(),
            )),
            max_requests: parse_or(
                get("RATE_LIMIT_MAX_REQUESTS"),
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit.max_requests,
            ),
        };

        let search = SearchConfig {
            api_base: get("SEARCH_API_BASE").unwrap_or(defaults.search.api_base),
            brand: get("RELAY_BRAND").unwrap_or(defaults.search.brand),
            ..defaults.search
        };

        Self {
            model_api_key: get("OPENAI_API_KEY"),
            search_api_key: get("BING_SEARCH_API_KEY"),
            model_api_base: get("MODEL_API_BASE").unwrap_or(defaults.model_api_base),
            model: get("DEFAULT_MODEL").unwrap_or(defaults.model),
            upstream_timeout: Duration::from_secs(parse_or(
                get("UPSTREAM_TIMEOUT_SECS"),
                "UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
            )),
            search,
            rate_limit,
            bind_address: get("RELAY_BIND").unwrap_or(defaults.bind_address),
            trust_proxy_headers: parse_flag(
                get("RELAY_TRUST_PROXY_HEADERS"),
                "RELAY_TRUST_PROXY_HEADERS",
                defaults.trust_proxy_headers,
            ),
            ..defaults
        }
    }

    #[must_use]
    pub fn with_model_api_key(
        mut self,
        key: impl Into<String>,
    ) -> Self {
        self.model_api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_search_api_key(
        mut self,
        key: impl Into<String>,
    ) -> Self {
        self.search_api_key = Some(key.into());
        self
    }
}

fn parse_or<T: std::str::FromStr + Copy>(
    value: Option<String>,
    key: &str,
    default: T,
) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, key);
            default
        }),
        None => default,
    }
}

fn parse_flag(
    value: Option<String>,
    key: &str,
    default: bool,
) -> bool {
    match value.map(|raw| raw.to_ascii_lowercase()) {
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!("Ignoring invalid value {:?} for {}", raw, key);
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> RelayConfig {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        RelayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_from(&[]);

        assert_eq!(config, RelayConfig::default());
        assert!(config.model_api_key.is_none());
        assert!(config.search_api_key.is_none());
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 1500);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.search.count, 5);
        assert_eq!(config.search.top_results, 3);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.rate_limit.max_requests, 30);
    }

    #[test]
    fn test_credentials_are_read() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test"), ("BING_SEARCH_API_KEY", "bing-test")]);

        assert_eq!(config.model_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.search_api_key.as_deref(), Some("bing-test"));
    }

    #[test]
    fn test_empty_credential_counts_as_missing() {
        let config = config_from(&[("OPENAI_API_KEY", "  ")]);
        assert!(config.model_api_key.is_none());
    }

    #[test]
    fn test_rate_limit_overrides() {
        let config = config_from(&[
            ("RATE_LIMIT_ENABLED", "off"),
            ("RATE_LIMIT_WINDOW_SECS", "10"),
            ("RATE_LIMIT_MAX_REQUESTS", "5"),
        ]);

        assert!(!config.rate_limit.enabled);
        assert_eq!(config.rate_limit.window, Duration::from_secs(10));
        assert_eq!(config.rate_limit.max_requests, 5);
    }

    #[test]
    fn test_proxy_headers_untrusted_unless_enabled() {
        assert!(!config_from(&[]).trust_proxy_headers);
        assert!(config_from(&[("RELAY_TRUST_PROXY_HEADERS", "true")]).trust_proxy_headers);
        assert!(config_from(&[("RELAY_TRUST_PROXY_HEADERS", "ON")]).trust_proxy_headers);
        assert!(!config_from(&[("RELAY_TRUST_PROXY_HEADERS", "maybe")]).trust_proxy_headers);
        assert!(config_from(&[("RATE_LIMIT_ENABLED", "maybe")]).rate_limit.enabled);
    }

    #[test]
    fn test_invalid_number_keeps_default() {
        let config = config_from(&[("UPSTREAM_TIMEOUT_SECS", "soon")]);
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_brand_and_bases() {
        let config = config_from(&[
            ("RELAY_BRAND", "Maybelline"),
            ("MODEL_API_BASE", "http://localhost:9000"),
            ("SEARCH_API_BASE", "http://localhost:9001"),
        ]);

        assert_eq!(config.search.brand, "Maybelline");
        assert_eq!(config.model_api_base, "http://localhost:9000");
        assert_eq!(config.search.api_base, "http://localhost:9001");
    }
}
