//! Client side of the view-statistics service.
//!
//! The service records page hits and reports hit counts per URI over a time
//! window. Timestamps travel as `yyyy-MM-dd HH:mm:ss` (UTC).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{EventError, EventResult};

pub const STATS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

mod stats_time {
    use super::STATS_TIME_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(STATS_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, STATS_TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// One recorded page view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointHit {
    pub app: String,
    pub uri: String,
    pub ip: String,
    #[serde(with = "stats_time")]
    pub timestamp: DateTime<Utc>,
}

/// Hit count for one URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStats {
    pub app: String,
    pub uri: String,
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Count distinct client IPs instead of raw hits
    pub unique: bool,
    /// Empty means every URI
    pub uris: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsClient: Send + Sync {
    async fn record_hit(&self, hit: EndpointHit) -> EventResult<()>;

    /// Counts ordered by hits, highest first.
    async fn query_counts(&self, query: StatsQuery) -> EventResult<Vec<ViewStats>>;
}

/// HTTP client for a remote stats service
#[derive(Debug, Clone)]
pub struct HttpStatsClient {
    client: Client,
    base_url: String,
}

impl HttpStatsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> EventResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EventError::Internal(format!("Failed to build stats client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StatsClient for HttpStatsClient {
    async fn record_hit(&self, hit: EndpointHit) -> EventResult<()> {
        let url = format!("{}/hit", self.base_url);
        debug!(uri = %hit.uri, ip = %hit.ip, "Recording hit");

        let response = self.client.post(&url).json(&hit).send().await?;

        if !response.status().is_success() {
            return Err(EventError::StatsUnavailable(format!(
                "POST /hit returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn query_counts(&self, query: StatsQuery) -> EventResult<Vec<ViewStats>> {
        let url = format!("{}/stats", self.base_url);
        let params = [
            ("start", query.start.format(STATS_TIME_FORMAT).to_string()),
            ("end", query.end.format(STATS_TIME_FORMAT).to_string()),
            ("unique", query.unique.to_string()),
            ("uris", query.uris.join(",")),
        ];

        let response = self.client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(EventError::StatsUnavailable(format!(
                "GET /stats returned {}",
                response.status()
            )));
        }

        let stats: Vec<ViewStats> = response.json().await?;
        debug!(uris = query.uris.len(), results = stats.len(), "Fetched view stats");
        Ok(stats)
    }
}

/// Stats service kept in process (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryStatsClient {
    hits: Arc<RwLock<Vec<EndpointHit>>>,
}

impl InMemoryStatsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn hits(&self) -> Vec<EndpointHit> {
        self.hits.read().await.clone()
    }
}

#[async_trait]
impl StatsClient for InMemoryStatsClient {
    async fn record_hit(&self, hit: EndpointHit) -> EventResult<()> {
        self.hits.write().await.push(hit);
        Ok(())
    }

    async fn query_counts(&self, query: StatsQuery) -> EventResult<Vec<ViewStats>> {
        if query.start > query.end {
            return Err(EventError::Validation(
                "start must not be after end".to_string(),
            ));
        }

        let hits = self.hits.read().await;
        let mut grouped: HashMap<(&str, &str), Vec<&str>> = HashMap::new();
        for hit in hits.iter() {
            if hit.timestamp < query.start || hit.timestamp > query.end {
                continue;
            }
            if !query.uris.is_empty() && !query.uris.iter().any(|u| u == &hit.uri) {
                continue;
            }
            grouped
                .entry((hit.app.as_str(), hit.uri.as_str()))
                .or_default()
                .push(hit.ip.as_str());
        }

        let mut stats: Vec<ViewStats> = grouped
            .into_iter()
            .map(|((app, uri), ips)| {
                let hits = if query.unique {
                    ips.iter().collect::<HashSet<_>>().len()
                } else {
                    ips.len()
                };
                ViewStats {
                    app: app.to_string(),
                    uri: uri.to_string(),
                    hits: hits as u64,
                }
            })
            .collect();
        stats.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.uri.cmp(&b.uri)));
        Ok(stats)
    }
}
