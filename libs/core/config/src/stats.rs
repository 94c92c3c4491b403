use crate::{env_or_default, env_parse_or, ConfigError, FromEnv};
use std::time::Duration;

/// Connection settings for the view-statistics service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsConfig {
    /// Base URL, without trailing slash (e.g. `http://stats-server:9090`)
    pub server_url: String,
    /// Value sent as `app` on every recorded hit
    pub app_name: String,
    /// Per-request timeout toward the stats service
    pub timeout: Duration,
}

impl FromEnv for StatsConfig {
    /// Reads:
    /// - STATS_SERVER_URL: defaults to http://localhost:9090
    /// - STATS_APP_NAME: defaults to ewm-main-service
    /// - STATS_TIMEOUT_MS: defaults to 2000
    fn from_env() -> Result<Self, ConfigError> {
        let server_url = env_or_default("STATS_SERVER_URL", "http://localhost:9090")
            .trim_end_matches('/')
            .to_string();
        let app_name = env_or_default("STATS_APP_NAME", "ewm-main-service");
        let timeout_ms: u64 = env_parse_or("STATS_TIMEOUT_MS", 2000)?;

        Ok(Self {
            server_url,
            app_name,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9090".to_string(),
            app_name: "ewm-main-service".to_string(),
            timeout: Duration::from_millis(2000),
        }
    }
}
