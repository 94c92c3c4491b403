use std::collections::HashSet;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::admission;
use crate::context::EventContext;
use crate::error::{EventError, EventResult};
use crate::lifecycle;
use crate::models::{
    DecisionStatus, Event, EventRequestStatusUpdateRequest, EventRequestStatusUpdateResult, ParticipationRequest,
    ParticipationRequestDto, RequestStatus,
};

/// Participation requests: creation, cancellation and owner decisions
#[derive(Clone)]
pub struct ParticipationService {
    ctx: EventContext,
}

impl ParticipationService {
    pub fn new(ctx: EventContext) -> Self {
        Self { ctx }
    }

    async fn require_user(&self, user_id: Uuid) -> EventResult<()> {
        self.ctx
            .directory
            .get_user(user_id)
            .await?
            .map(|_| ())
            .ok_or(EventError::UserNotFound(user_id))
    }

    async fn require_event(&self, event_id: Uuid) -> EventResult<Event> {
        self.ctx
            .events
            .get_by_id(event_id)
            .await?
            .ok_or(EventError::EventNotFound(event_id))
    }

    async fn confirmed_count(&self, event_id: Uuid) -> EventResult<u64> {
        self.ctx
            .requests
            .count_by_event_and_status(event_id, RequestStatus::Confirmed)
            .await
    }

    /// Files a request; auto-confirmed when the event needs no moderation.
    #[instrument(skip(self))]
    pub async fn request_participation(&self, user_id: Uuid, event_id: Uuid) -> EventResult<ParticipationRequestDto> {
        self.require_user(user_id).await?;
        let event = self.require_event(event_id).await?;

        let confirmed = self.confirmed_count(event_id).await?;
        admission::ensure_can_request(&event, user_id, confirmed)?;

        let request = ParticipationRequest::new(
            event_id,
            user_id,
            admission::initial_status(&event),
            self.ctx.clock.now(),
        );
        let request = self.ctx.requests.insert(request, event.participant_limit).await?;

        info!(request_id = %request.id, status = %request.status, "Participation requested");
        Ok(request.into())
    }

    #[instrument(skip(self))]
    pub async fn list_user_requests(&self, user_id: Uuid) -> EventResult<Vec<ParticipationRequestDto>> {
        self.require_user(user_id).await?;
        let requests = self.ctx.requests.find_by_requester(user_id).await?;
        Ok(requests.into_iter().map(Into::into).collect())
    }

    /// Sets the request to `CANCELED` from any status.
    ///
    /// A confirmed seat given up this way is not handed to a pending request.
    #[instrument(skip(self))]
    pub async fn cancel_request(&self, user_id: Uuid, request_id: Uuid) -> EventResult<ParticipationRequestDto> {
        self.require_user(user_id).await?;
        let mut request = self
            .ctx
            .requests
            .get_by_id(request_id)
            .await?
            .ok_or(EventError::RequestNotFound(request_id))?;

        if request.requester_id != user_id {
            return Err(EventError::forbidden(user_id, format!("request {}", request_id)));
        }

        request.status = RequestStatus::Canceled;
        let request = self.ctx.requests.save(request).await?;

        info!(request_id = %request.id, "Participation request canceled");
        Ok(request.into())
    }

    /// Every request filed against the owner's event.
    #[instrument(skip(self))]
    pub async fn list_event_requests(&self, user_id: Uuid, event_id: Uuid) -> EventResult<Vec<ParticipationRequestDto>> {
        self.require_user(user_id).await?;
        let event = self.require_event(event_id).await?;
        lifecycle::ensure_initiator(&event, user_id)?;

        let requests = self.ctx.requests.find_by_event(event_id).await?;
        Ok(requests.into_iter().map(Into::into).collect())
    }

    /// Confirms or rejects a batch of pending requests.
    ///
    /// The batch is all-or-nothing: an unknown id, a request of another
    /// event, a non-pending request or a full event fails it without writes.
    /// For confirm batches the confirmed count read here is re-checked by the
    /// store when the decisions are written, so two concurrent batches cannot
    /// overbook. Reject batches skip that check.
    #[instrument(skip(self, body), fields(batch = body.request_ids.len(), status = %body.status))]
    pub async fn bulk_update_status(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        body: EventRequestStatusUpdateRequest,
    ) -> EventResult<EventRequestStatusUpdateResult> {
        body.validate()?;
        self.require_user(user_id).await?;
        let event = self.require_event(event_id).await?;
        lifecycle::ensure_initiator(&event, user_id)?;

        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = body
            .request_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        let requests = self.ctx.requests.find_by_ids(ids.clone()).await?;
        if requests.len() != ids.len() {
            let found: HashSet<Uuid> = requests.iter().map(|r| r.id).collect();
            if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
                return Err(EventError::RequestNotFound(*missing));
            }
        }
        if let Some(foreign) = requests.iter().find(|r| r.event_id != event_id) {
            return Err(EventError::RequestEventMismatch {
                request_id: foreign.id,
                event_id,
            });
        }

        let already_confirmed = self.confirmed_count(event_id).await?;
        let plan = admission::plan_decisions(&event, requests, body.status, already_confirmed)?;
        let expected_confirmed = match body.status {
            DecisionStatus::Confirmed => Some(already_confirmed),
            DecisionStatus::Rejected => None,
        };

        let result = EventRequestStatusUpdateResult {
            confirmed_requests: plan.confirmed.iter().cloned().map(Into::into).collect(),
            rejected_requests: plan.rejected.iter().cloned().map(Into::into).collect(),
        };

        self.ctx
            .requests
            .save_all_guarded(event_id, expected_confirmed, plan.into_batch())
            .await?;

        info!(
            confirmed = result.confirmed_requests.len(),
            rejected = result.rejected_requests.len(),
            "Participation requests decided"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::directory::{MockDirectory, User};
    use crate::models::{EventState, Location, LocationInput, NewEvent};
    use crate::repository::{MockEventRepository, MockRequestRepository};
    use crate::stats::MockStatsClient;
    use chrono::{TimeDelta, Utc};
    use std::sync::Arc;

    fn any_user() -> MockDirectory {
        let mut directory = MockDirectory::new();
        directory.expect_get_user().returning(|id| {
            Ok(Some(User {
                id,
                name: "User".to_string(),
                email: "user@example.com".to_string(),
            }))
        });
        directory
    }

    fn published_event(owner: Uuid, limit: u32) -> Event {
        let now = Utc::now();
        let draft = NewEvent {
            annotation: "Annotation long enough for rules".to_string(),
            category: Uuid::now_v7(),
            description: "Description long enough for rules".to_string(),
            event_date: now + TimeDelta::days(7),
            location: LocationInput::default(),
            paid: false,
            participant_limit: limit,
            request_moderation: true,
            title: "Participation".to_string(),
        };
        let mut event = Event::new(owner, Location { lat: 0.0, lon: 0.0 }, draft, now);
        event.state = EventState::Published;
        event
    }

    fn service(events: MockEventRepository, requests: MockRequestRepository) -> ParticipationService {
        let ctx = EventContext::new(
            Arc::new(events),
            Arc::new(requests),
            Arc::new(any_user()),
            Arc::new(MockStatsClient::new()),
        )
        .with_clock(Arc::new(FixedClock::new(Utc::now())));
        ParticipationService::new(ctx)
    }

    fn events_returning(event: Event) -> MockEventRepository {
        let mut events = MockEventRepository::new();
        events
            .expect_get_by_id()
            .returning(move |_| Ok(Some(event.clone())));
        events
    }

    #[tokio::test]
    async fn test_bulk_confirm_on_full_event_never_writes() {
        let owner = Uuid::now_v7();
        let event = published_event(owner, 2);
        let event_id = event.id;
        let pending = ParticipationRequest::new(event_id, Uuid::now_v7(), RequestStatus::Pending, Utc::now());
        let pending_id = pending.id;

        let mut requests = MockRequestRepository::new();
        requests
            .expect_find_by_ids()
            .returning(move |_| Ok(vec![pending.clone()]));
        requests
            .expect_count_by_event_and_status()
            .returning(|_, _| Ok(2));
        requests.expect_save_all_guarded().never();

        let err = service(events_returning(event), requests)
            .bulk_update_status(
                owner,
                event_id,
                EventRequestStatusUpdateRequest {
                    request_ids: vec![pending_id],
                    status: DecisionStatus::Confirmed,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::ParticipantLimitReached(_)));
    }

    #[tokio::test]
    async fn test_bulk_with_non_pending_request_never_writes() {
        let owner = Uuid::now_v7();
        let event = published_event(owner, 0);
        let event_id = event.id;
        let pending = ParticipationRequest::new(event_id, Uuid::now_v7(), RequestStatus::Pending, Utc::now());
        let confirmed = ParticipationRequest::new(event_id, Uuid::now_v7(), RequestStatus::Confirmed, Utc::now());
        let ids = vec![pending.id, confirmed.id];

        let mut requests = MockRequestRepository::new();
        requests
            .expect_find_by_ids()
            .returning(move |_| Ok(vec![pending.clone(), confirmed.clone()]));
        requests
            .expect_count_by_event_and_status()
            .returning(|_, _| Ok(1));
        requests.expect_save_all_guarded().never();

        let err = service(events_returning(event), requests)
            .bulk_update_status(
                owner,
                event_id,
                EventRequestStatusUpdateRequest {
                    request_ids: ids,
                    status: DecisionStatus::Rejected,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::RequestNotPending { .. }));
    }

    #[tokio::test]
    async fn test_bulk_unknown_request_is_not_found() {
        let owner = Uuid::now_v7();
        let event = published_event(owner, 0);
        let event_id = event.id;
        let missing = Uuid::now_v7();

        let mut requests = MockRequestRepository::new();
        requests.expect_find_by_ids().returning(|_| Ok(vec![]));
        requests.expect_save_all_guarded().never();

        let err = service(events_returning(event), requests)
            .bulk_update_status(
                owner,
                event_id,
                EventRequestStatusUpdateRequest {
                    request_ids: vec![missing],
                    status: DecisionStatus::Confirmed,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::RequestNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_bulk_passes_observed_count_to_guarded_write() {
        let owner = Uuid::now_v7();
        let event = published_event(owner, 3);
        let event_id = event.id;
        let a = ParticipationRequest::new(event_id, Uuid::now_v7(), RequestStatus::Pending, Utc::now());
        let b = ParticipationRequest::new(event_id, Uuid::now_v7(), RequestStatus::Pending, Utc::now());
        let ids = vec![a.id, b.id, a.id];

        let mut requests = MockRequestRepository::new();
        requests
            .expect_find_by_ids()
            .withf(|ids| ids.len() == 2)
            .returning(move |_| Ok(vec![a.clone(), b.clone()]));
        requests
            .expect_count_by_event_and_status()
            .returning(|_, _| Ok(2));
        requests
            .expect_save_all_guarded()
            .times(1)
            .withf(move |id, expected, batch| *id == event_id && *expected == Some(2) && batch.len() == 2)
            .returning(|_, _, batch| Ok(batch));

        let result = service(events_returning(event), requests)
            .bulk_update_status(
                owner,
                event_id,
                EventRequestStatusUpdateRequest {
                    request_ids: ids,
                    status: DecisionStatus::Confirmed,
                },
            )
            .await
            .unwrap();
        assert_eq!(result.confirmed_requests.len(), 1);
        assert_eq!(result.rejected_requests.len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_reject_skips_count_guard() {
        let owner = Uuid::now_v7();
        let event = published_event(owner, 1);
        let event_id = event.id;
        let pending = ParticipationRequest::new(event_id, Uuid::now_v7(), RequestStatus::Pending, Utc::now());
        let pending_id = pending.id;

        let mut requests = MockRequestRepository::new();
        requests
            .expect_find_by_ids()
            .returning(move |_| Ok(vec![pending.clone()]));
        requests
            .expect_count_by_event_and_status()
            .returning(|_, _| Ok(0));
        requests
            .expect_save_all_guarded()
            .times(1)
            .withf(|_, expected, batch| expected.is_none() && batch[0].status == RequestStatus::Rejected)
            .returning(|_, _, batch| Ok(batch));

        let result = service(events_returning(event), requests)
            .bulk_update_status(
                owner,
                event_id,
                EventRequestStatusUpdateRequest {
                    request_ids: vec![pending_id],
                    status: DecisionStatus::Rejected,
                },
            )
            .await
            .unwrap();
        assert_eq!(result.rejected_requests.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_by_other_user_is_forbidden() {
        let request = ParticipationRequest::new(Uuid::now_v7(), Uuid::now_v7(), RequestStatus::Pending, Utc::now());
        let request_id = request.id;

        let mut requests = MockRequestRepository::new();
        requests
            .expect_get_by_id()
            .returning(move |_| Ok(Some(request.clone())));
        requests.expect_save().never();

        let err = service(MockEventRepository::new(), requests)
            .cancel_request(Uuid::now_v7(), request_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_own_event_request_never_writes() {
        let owner = Uuid::now_v7();
        let event = published_event(owner, 0);
        let event_id = event.id;

        let mut requests = MockRequestRepository::new();
        requests
            .expect_count_by_event_and_status()
            .returning(|_, _| Ok(0));
        requests.expect_insert().never();

        let err = service(events_returning(event), requests)
            .request_participation(owner, event_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::OwnRequest(_)));
    }
}
