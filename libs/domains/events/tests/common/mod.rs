#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use domain_events::models::{AdminStateAction, LocationInput, UpdateEventAdminRequest};
use domain_events::*;
use std::sync::Arc;
use uuid::Uuid;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 4, 1, 10, 0, 0).unwrap()
}

/// In-memory wiring with a frozen clock.
pub struct Fixture {
    pub ctx: EventContext,
    pub clock: Arc<FixedClock>,
    pub stats: Arc<InMemoryStatsClient>,
    pub events: EventService,
    pub participation: ParticipationService,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_requests(Arc::new(InMemoryRequestRepository::new()))
    }

    /// Same wiring around a caller-supplied request store.
    pub fn with_requests(requests: Arc<dyn RequestRepository>) -> Self {
        let clock = Arc::new(FixedClock::new(start_time()));
        let stats = Arc::new(InMemoryStatsClient::new());
        let ctx = EventContext::new(
            Arc::new(InMemoryEventRepository::new()),
            requests,
            Arc::new(InMemoryDirectory::new()),
            stats.clone(),
        )
        .with_clock(clock.clone());

        Self {
            events: EventService::new(ctx.clone()),
            participation: ParticipationService::new(ctx.clone()),
            ctx,
            clock,
            stats,
        }
    }

    pub async fn user(&self) -> User {
        let tag = Uuid::new_v4().simple().to_string();
        self.events
            .register_user(NewUser {
                name: format!("user-{}", &tag[..8]),
                email: format!("{}@example.com", tag),
            })
            .await
            .unwrap()
    }

    pub async fn category(&self) -> Category {
        self.events
            .register_category(NewCategory {
                name: format!("cat-{}", Uuid::new_v4().simple()),
            })
            .await
            .unwrap()
    }

    pub fn draft(&self, category: Uuid, participant_limit: u32, request_moderation: bool) -> NewEvent {
        NewEvent {
            annotation: "Evening of talks about systems programming".to_string(),
            category,
            description: "Three talks on ownership, async runtimes and embedded targets".to_string(),
            event_date: self.clock.now() + TimeDelta::days(3),
            location: LocationInput {
                lat: Some(59.93),
                lon: Some(30.31),
            },
            paid: false,
            participant_limit,
            request_moderation,
            title: "Rust evening".to_string(),
        }
    }

    pub async fn pending_event(&self, owner: Uuid, participant_limit: u32, request_moderation: bool) -> Event {
        let category = self.category().await;
        self.events
            .create_event(owner, self.draft(category.id, participant_limit, request_moderation))
            .await
            .unwrap()
            .event
    }

    pub async fn published_event(&self, owner: Uuid, participant_limit: u32, request_moderation: bool) -> Event {
        let event = self
            .pending_event(owner, participant_limit, request_moderation)
            .await;
        self.events
            .update_by_admin(
                event.id,
                UpdateEventAdminRequest {
                    state_action: Some(AdminStateAction::PublishEvent),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .event
    }

    /// A fresh user with a request on `event_id`.
    pub async fn request(&self, event_id: Uuid) -> ParticipationRequestDto {
        let user = self.user().await;
        self.participation
            .request_participation(user.id, event_id)
            .await
            .unwrap()
    }
}
