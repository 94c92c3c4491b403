use std::cmp::Reverse;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::context::EventContext;
use crate::directory::{Category, NewCategory, NewUser, User};
use crate::error::{EventError, EventResult};
use crate::lifecycle;
use crate::models::{
    AdminEventQuery, Event, EventProjection, EventShortDto, EventSort, NewEvent, PageRequest, PublicEventQuery,
    UpdateEventAdminRequest, UpdateEventUserRequest,
};
use crate::projection::{LISTING_URI, ProjectionBuilder};

/// Event lifecycle and read operations
#[derive(Clone)]
pub struct EventService {
    ctx: EventContext,
    projections: ProjectionBuilder,
}

impl EventService {
    pub fn new(ctx: EventContext) -> Self {
        let projections = ProjectionBuilder::new(&ctx);
        Self { ctx, projections }
    }

    async fn require_user(&self, user_id: Uuid) -> EventResult<User> {
        self.ctx
            .directory
            .get_user(user_id)
            .await?
            .ok_or(EventError::UserNotFound(user_id))
    }

    async fn require_category(&self, category_id: Uuid) -> EventResult<Category> {
        self.ctx
            .directory
            .get_category(category_id)
            .await?
            .ok_or(EventError::CategoryNotFound(category_id))
    }

    async fn require_event(&self, event_id: Uuid) -> EventResult<Event> {
        self.ctx
            .events
            .get_by_id(event_id)
            .await?
            .ok_or(EventError::EventNotFound(event_id))
    }

    /// Creates a `PENDING` event owned by `user_id`.
    #[instrument(skip(self, draft), fields(user_id = %user_id))]
    pub async fn create_event(&self, user_id: Uuid, draft: NewEvent) -> EventResult<EventProjection> {
        draft.validate()?;
        self.require_user(user_id).await?;
        self.require_category(draft.category).await?;
        let location = draft.location.resolve()?;

        let now = self.ctx.clock.now();
        lifecycle::ensure_lead_time(draft.event_date, now, lifecycle::OWNER_LEAD_HOURS)?;

        let event = self
            .ctx
            .events
            .create(Event::new(user_id, location, draft, now))
            .await?;
        info!(event_id = %event.id, "Event created");
        Ok(EventProjection::with_zero_counters(event))
    }

    #[instrument(skip(self))]
    pub async fn get_owner_event(&self, user_id: Uuid, event_id: Uuid) -> EventResult<EventProjection> {
        self.require_user(user_id).await?;
        let event = self.require_event(event_id).await?;
        lifecycle::ensure_initiator(&event, user_id)?;
        self.projections.build_single(event, None).await
    }

    #[instrument(skip(self))]
    pub async fn list_owner_events(&self, user_id: Uuid, page: PageRequest) -> EventResult<Vec<EventShortDto>> {
        page.validate()?;
        self.require_user(user_id).await?;
        let events = self.ctx.events.list_by_initiator(user_id, page).await?;
        let projections = self.projections.build(events).await?;
        Ok(projections.into_iter().map(EventShortDto::from).collect())
    }

    /// Owner edit; only `PENDING` events can be changed.
    #[instrument(skip(self, body))]
    pub async fn update_by_owner(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        body: UpdateEventUserRequest,
    ) -> EventResult<EventProjection> {
        body.validate()?;
        self.require_user(user_id).await?;
        let stored = self.require_event(event_id).await?;

        let category_changed = body.patch.category.as_set().copied();
        let mut event = stored.clone();
        lifecycle::update_by_owner(&mut event, user_id, body.patch, body.state_action, self.ctx.clock.now())?;
        if let Some(category_id) = category_changed.filter(|c| *c != stored.category_id) {
            self.require_category(category_id).await?;
        }

        let event = self.ctx.events.save(event).await?;
        info!(event_id = %event.id, state = %event.state, "Event updated by owner");
        Ok(EventProjection::with_zero_counters(event))
    }

    /// Admin review; publishes, rejects or edits a `PENDING` event.
    #[instrument(skip(self, body))]
    pub async fn update_by_admin(&self, event_id: Uuid, body: UpdateEventAdminRequest) -> EventResult<EventProjection> {
        body.validate()?;
        let stored = self.require_event(event_id).await?;

        let category_changed = body.patch.category.as_set().copied();
        let mut event = stored.clone();
        lifecycle::update_by_admin(&mut event, body.patch, body.state_action, self.ctx.clock.now())?;
        if let Some(category_id) = category_changed.filter(|c| *c != stored.category_id) {
            self.require_category(category_id).await?;
        }

        let event = self.ctx.events.save(event).await?;
        info!(event_id = %event.id, state = %event.state, "Event updated by admin");
        Ok(EventProjection::with_zero_counters(event))
    }

    #[instrument(skip(self))]
    pub async fn search_events(&self, query: AdminEventQuery) -> EventResult<Vec<EventProjection>> {
        let (criteria, page) = query.into_parts()?;
        criteria.check_range()?;
        let events = self.ctx.events.search(criteria, Some(page)).await?;
        self.projections.build(events).await
    }

    /// Public detail view; records a hit for the event.
    #[instrument(skip(self))]
    pub async fn get_published_event(&self, event_id: Uuid, client_ip: String) -> EventResult<EventProjection> {
        let event = self
            .ctx
            .events
            .get_by_id(event_id)
            .await?
            .filter(Event::is_published)
            .ok_or(EventError::EventNotFound(event_id))?;
        self.projections.build_single(event, Some(client_ip)).await
    }

    /// Public listing; records one hit for the listing itself.
    #[instrument(skip(self))]
    pub async fn search_published_events(
        &self,
        query: PublicEventQuery,
        client_ip: String,
    ) -> EventResult<Vec<EventShortDto>> {
        let mut search = query.into_search()?;
        if search.criteria.range_start.is_none() {
            search.criteria.range_start = Some(self.ctx.clock.now());
        }
        search.criteria.check_range()?;

        let events = self.ctx.events.search(search.criteria, None).await?;
        self.projections.record_hit(LISTING_URI.to_string(), client_ip).await;

        let mut projections: Vec<EventProjection> = self
            .projections
            .build(events)
            .await?
            .into_iter()
            .filter(|p| {
                !search.only_available
                    || p.event.has_unlimited_capacity()
                    || u64::from(p.event.participant_limit) > p.confirmed_requests
            })
            .collect();

        match search.sort {
            Some(EventSort::EventDate) => projections.sort_by_key(|p| p.event.event_date),
            Some(EventSort::Views) => projections.sort_by_key(|p| Reverse(p.views)),
            None => {}
        }

        Ok(search
            .page
            .apply(projections)
            .into_iter()
            .map(EventShortDto::from)
            .collect())
    }

    #[instrument(skip(self, input))]
    pub async fn register_user(&self, input: NewUser) -> EventResult<User> {
        input.validate()?;
        self.ctx.directory.register_user(input).await
    }

    #[instrument(skip(self, input))]
    pub async fn register_category(&self, input: NewCategory) -> EventResult<Category> {
        input.validate()?;
        self.ctx.directory.register_category(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::directory::MockDirectory;
    use crate::models::{EventPatch, EventState, Location, LocationInput, OwnerStateAction, Patch};
    use crate::repository::{MockEventRepository, MockRequestRepository};
    use crate::stats::MockStatsClient;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 1, 9, 0, 0).unwrap()
    }

    fn known_user(directory: &mut MockDirectory, user_id: Uuid) {
        directory.expect_get_user().returning(move |id| {
            Ok((id == user_id).then(|| User {
                id,
                name: "Owner".to_string(),
                email: "owner@example.com".to_string(),
            }))
        });
    }

    fn service(events: MockEventRepository, directory: MockDirectory) -> EventService {
        let ctx = EventContext::new(
            Arc::new(events),
            Arc::new(MockRequestRepository::new()),
            Arc::new(directory),
            Arc::new(MockStatsClient::new()),
        )
        .with_clock(Arc::new(FixedClock::new(now())));
        EventService::new(ctx)
    }

    fn draft(event_date: DateTime<Utc>) -> NewEvent {
        NewEvent {
            annotation: "Annotation long enough for rules".to_string(),
            category: Uuid::now_v7(),
            description: "Description long enough for rules".to_string(),
            event_date,
            location: LocationInput {
                lat: Some(1.0),
                lon: Some(2.0),
            },
            paid: false,
            participant_limit: 0,
            request_moderation: true,
            title: "Service".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_too_soon_never_writes() {
        let user_id = Uuid::now_v7();
        let mut directory = MockDirectory::new();
        known_user(&mut directory, user_id);
        directory
            .expect_get_category()
            .returning(|id| Ok(Some(Category { id, name: "Talks".to_string() })));

        let mut events = MockEventRepository::new();
        events.expect_create().never();

        let err = service(events, directory)
            .create_event(user_id, draft(now() + TimeDelta::hours(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::InvalidTiming(_)));
    }

    #[tokio::test]
    async fn test_create_with_unknown_category_is_not_found() {
        let user_id = Uuid::now_v7();
        let mut directory = MockDirectory::new();
        known_user(&mut directory, user_id);
        directory.expect_get_category().returning(|_| Ok(None));

        let mut events = MockEventRepository::new();
        events.expect_create().never();

        let err = service(events, directory)
            .create_event(user_id, draft(now() + TimeDelta::days(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_with_missing_coordinate_is_invalid_input() {
        let user_id = Uuid::now_v7();
        let mut directory = MockDirectory::new();
        known_user(&mut directory, user_id);
        directory
            .expect_get_category()
            .returning(|id| Ok(Some(Category { id, name: "Talks".to_string() })));

        let mut events = MockEventRepository::new();
        events.expect_create().never();

        let mut input = draft(now() + TimeDelta::days(1));
        input.location.lon = None;
        let err = service(events, directory)
            .create_event(user_id, input)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Validation(ref m) if m.contains("lon")));
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_owner_update_of_published_event_never_writes() {
        let user_id = Uuid::now_v7();
        let mut directory = MockDirectory::new();
        known_user(&mut directory, user_id);

        let mut stored = Event::new(user_id, Location { lat: 0.0, lon: 0.0 }, draft(now() + TimeDelta::days(3)), now());
        stored.state = EventState::Published;
        let event_id = stored.id;

        let mut events = MockEventRepository::new();
        events
            .expect_get_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        events.expect_save().never();

        let body = UpdateEventUserRequest {
            patch: EventPatch {
                title: Patch::Set("New title".to_string()),
                ..Default::default()
            },
            state_action: Some(OwnerStateAction::SendToReview),
        };
        let err = service(events, directory)
            .update_by_owner(user_id, event_id, body)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EventError::StateConflict {
                state: EventState::Published,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_admin_review_surfaces_conflict() {
        let stored = Event::new(
            Uuid::now_v7(),
            Location { lat: 0.0, lon: 0.0 },
            draft(now() + TimeDelta::days(3)),
            now(),
        );
        let event_id = stored.id;

        let mut events = MockEventRepository::new();
        events
            .expect_get_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        events
            .expect_save()
            .times(1)
            .returning(|e| Err(EventError::ConcurrentModification(e.id)));

        let body = UpdateEventAdminRequest {
            patch: EventPatch::default(),
            state_action: Some(crate::models::AdminStateAction::PublishEvent),
        };
        let err = service(events, MockDirectory::new())
            .update_by_admin(event_id, body)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::ConcurrentModification(id) if id == event_id));
    }
}
