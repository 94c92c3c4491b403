//! Configuration for the EWM API

use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig, stats::StatsConfig};

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub stats: StatsConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            server: ServerConfig::from_env()?,
            stats: StatsConfig::from_env()?,
            environment: Environment::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_reads_stats_and_server() {
        temp_env::with_vars(
            [
                ("PORT", Some("8181")),
                ("STATS_SERVER_URL", Some("http://stats:9090")),
                ("STATS_APP_NAME", Some("ewm-test")),
                ("APP_ENV", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.server.port, 8181);
                assert_eq!(config.stats.server_url, "http://stats:9090");
                assert_eq!(config.stats.app_name, "ewm-test");
                assert_eq!(config.environment, Environment::Development);
                assert_eq!(config.app.name, "ewm_api");
            },
        );
    }

    #[test]
    fn test_config_rejects_bad_port() {
        temp_env::with_var("PORT", Some("eighty"), || {
            assert!(Config::from_env().is_err());
        });
    }
}
