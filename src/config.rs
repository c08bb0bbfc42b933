use crate::search::DEFAULT_SEARCH_ENDPOINT;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub search_endpoint: String,
    /// Bearer token for the business search API (None = search disabled)
    pub search_api_key: Option<String>,
    pub reaper_interval_secs: u64,
}

impl Config {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8000);

        let search_endpoint = std::env::var("SEARCH_ENDPOINT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SEARCH_ENDPOINT.to_string());

        let search_api_key = std::env::var("SEARCH_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let reaper_interval_secs = std::env::var("REAPER_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        Self {
            port,
            search_endpoint,
            search_api_key,
            reaper_interval_secs,
        }
    }
}
