//! Joins events with their confirmed-request and view counters.
//!
//! Counters are only reported for published events; every other event is
//! projected with zeros. View counts come from the stats service and degrade
//! to zero when it cannot be reached.

use chrono::TimeDelta;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::clock::Clock;
use crate::context::EventContext;
use crate::error::EventResult;
use crate::models::{Event, EventProjection, RequestStatus};
use crate::repository::RequestRepository;
use crate::stats::{EndpointHit, StatsClient, StatsQuery};

/// URI under which views of an event are counted.
pub fn canonical_uri(event_id: Uuid) -> String {
    format!("/events/{}", event_id)
}

/// URI of the public event listing.
pub const LISTING_URI: &str = "/events";

#[derive(Clone)]
pub struct ProjectionBuilder {
    requests: Arc<dyn RequestRepository>,
    stats: Arc<dyn StatsClient>,
    clock: Arc<dyn Clock>,
    app_name: String,
}

impl ProjectionBuilder {
    pub fn new(ctx: &EventContext) -> Self {
        Self {
            requests: ctx.requests.clone(),
            stats: ctx.stats.clone(),
            clock: ctx.clock.clone(),
            app_name: ctx.app_name.clone(),
        }
    }

    /// Records a hit; failures are logged and swallowed.
    pub async fn record_hit(&self, uri: String, ip: String) {
        let hit = EndpointHit {
            app: self.app_name.clone(),
            uri,
            ip,
            timestamp: self.clock.now(),
        };
        if let Err(e) = self.stats.record_hit(hit).await {
            warn!(error = %e, "Failed to record hit");
        }
    }

    /// Projects a batch with one confirmed-count query and one stats query.
    pub async fn build(&self, events: Vec<Event>) -> EventResult<Vec<EventProjection>> {
        let published: Vec<&Event> = events.iter().filter(|e| e.is_published()).collect();
        if published.is_empty() {
            return Ok(events.into_iter().map(EventProjection::with_zero_counters).collect());
        }

        let ids: Vec<Uuid> = published.iter().map(|e| e.id).collect();
        let uris: Vec<String> = ids.iter().map(|id| canonical_uri(*id)).collect();
        let start = events.iter().map(|e| e.created_on).min();

        let confirmed = self.requests.count_confirmed_by_events(ids).await?;
        let views = match start {
            Some(start) => self.views_for(start, uris).await,
            None => HashMap::new(),
        };

        Ok(events
            .into_iter()
            .map(|event| {
                if !event.is_published() {
                    return EventProjection::with_zero_counters(event);
                }
                let confirmed_requests = confirmed.get(&event.id).copied().unwrap_or(0);
                let views = views.get(&canonical_uri(event.id)).copied().unwrap_or(0);
                EventProjection {
                    event,
                    confirmed_requests,
                    views,
                }
            })
            .collect())
    }

    /// Projects one event for a detail view.
    ///
    /// With `client_ip`, a hit for the event's URI is recorded before the view
    /// count is read, so the count includes this read.
    pub async fn build_single(&self, event: Event, client_ip: Option<String>) -> EventResult<EventProjection> {
        let uri = canonical_uri(event.id);
        if let Some(ip) = client_ip {
            self.record_hit(uri.clone(), ip).await;
        }

        if !event.is_published() {
            return Ok(EventProjection::with_zero_counters(event));
        }

        let confirmed_requests = self
            .requests
            .count_by_event_and_status(event.id, RequestStatus::Confirmed)
            .await?;
        let views = self
            .views_for(event.created_on, vec![uri.clone()])
            .await
            .get(&uri)
            .copied()
            .unwrap_or(0);

        Ok(EventProjection {
            event,
            confirmed_requests,
            views,
        })
    }

    async fn views_for(&self, start: chrono::DateTime<chrono::Utc>, uris: Vec<String>) -> HashMap<String, u64> {
        let query = StatsQuery {
            start,
            end: self.clock.now() + TimeDelta::minutes(1),
            unique: true,
            uris,
        };

        match self.stats.query_counts(query).await {
            Ok(stats) => stats.into_iter().map(|s| (s.uri, s.hits)).collect(),
            Err(e) => {
                warn!(error = %e, "Stats unavailable, reporting zero views");
                HashMap::new()
            }
        }
    }
}
