use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{EventError, EventResult};
use crate::models::{Event, EventCriteria, PageRequest, ParticipationRequest, RequestStatus};

/// Event persistence.
///
/// Listing methods return events ordered by creation time, oldest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: Event) -> EventResult<Event>;

    async fn get_by_id(&self, id: Uuid) -> EventResult<Option<Event>>;

    /// Compare-and-swap on `event.version`.
    ///
    /// Fails with `ConcurrentModification` when the stored version differs
    /// from the incoming one; on success the returned event carries the
    /// incremented version.
    async fn save(&self, event: Event) -> EventResult<Event>;

    async fn list_by_initiator(&self, initiator_id: Uuid, page: PageRequest) -> EventResult<Vec<Event>>;

    /// Events matching `criteria`; all of them when `page` is `None`.
    async fn search(&self, criteria: EventCriteria, page: Option<PageRequest>) -> EventResult<Vec<Event>>;
}

/// Participation request persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> EventResult<Option<ParticipationRequest>>;

    /// Requests with the given ids, in the order of `ids`; unknown ids are skipped.
    async fn find_by_ids(&self, ids: Vec<Uuid>) -> EventResult<Vec<ParticipationRequest>>;

    async fn find_by_event(&self, event_id: Uuid) -> EventResult<Vec<ParticipationRequest>>;

    async fn find_by_requester(&self, requester_id: Uuid) -> EventResult<Vec<ParticipationRequest>>;

    async fn count_by_event_and_status(&self, event_id: Uuid, status: RequestStatus) -> EventResult<u64>;

    /// Confirmed counts keyed by event id; events without confirmations are absent.
    async fn count_confirmed_by_events(&self, event_ids: Vec<Uuid>) -> EventResult<HashMap<Uuid, u64>>;

    /// Stores a new request in one atomic step.
    ///
    /// Fails with `DuplicateRequest` if the requester already has a request for
    /// the event, and with `ParticipantLimitReached` if `participant_limit > 0`
    /// and the confirmed count has already reached it.
    async fn insert(&self, request: ParticipationRequest, participant_limit: u32) -> EventResult<ParticipationRequest>;

    async fn save(&self, request: ParticipationRequest) -> EventResult<ParticipationRequest>;

    /// Writes a batch of decisions for one event atomically.
    ///
    /// Nothing is written unless every stored request in the batch is still
    /// `PENDING` (`RequestNotPending`) and, when `expected_confirmed` is set,
    /// the event's confirmed count still equals it (`ConcurrentModification`).
    /// Reject-only batches pass `None`.
    async fn save_all_guarded(
        &self,
        event_id: Uuid,
        expected_confirmed: Option<u64>,
        requests: Vec<ParticipationRequest>,
    ) -> EventResult<Vec<ParticipationRequest>>;
}

fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.created_on.cmp(&b.created_on).then(a.id.cmp(&b.id)));
}

fn sort_requests(requests: &mut [ParticipationRequest]) {
    requests.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
}

/// In-memory implementation of EventRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventRepository {
    events: Arc<RwLock<HashMap<Uuid, Event>>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn create(&self, event: Event) -> EventResult<Event> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Err(EventError::AlreadyExists(format!("Event {}", event.id)));
        }
        events.insert(event.id, event.clone());

        tracing::info!(event_id = %event.id, initiator_id = %event.initiator_id, "Created event");
        Ok(event)
    }

    async fn get_by_id(&self, id: Uuid) -> EventResult<Option<Event>> {
        let events = self.events.read().await;
        Ok(events.get(&id).cloned())
    }

    async fn save(&self, mut event: Event) -> EventResult<Event> {
        let mut events = self.events.write().await;
        let stored = events
            .get_mut(&event.id)
            .ok_or(EventError::EventNotFound(event.id))?;

        if stored.version != event.version {
            tracing::warn!(
                event_id = %event.id,
                stored_version = stored.version,
                incoming_version = event.version,
                "Rejected stale event write"
            );
            return Err(EventError::ConcurrentModification(event.id));
        }

        event.version += 1;
        *stored = event.clone();

        tracing::info!(event_id = %event.id, state = %event.state, version = event.version, "Saved event");
        Ok(event)
    }

    async fn list_by_initiator(&self, initiator_id: Uuid, page: PageRequest) -> EventResult<Vec<Event>> {
        let events = self.events.read().await;
        let mut result: Vec<Event> = events
            .values()
            .filter(|e| e.initiator_id == initiator_id)
            .cloned()
            .collect();
        sort_events(&mut result);
        Ok(page.apply(result))
    }

    async fn search(&self, criteria: EventCriteria, page: Option<PageRequest>) -> EventResult<Vec<Event>> {
        let events = self.events.read().await;
        let mut result: Vec<Event> = events
            .values()
            .filter(|e| criteria.matches(e))
            .cloned()
            .collect();
        sort_events(&mut result);
        Ok(match page {
            Some(page) => page.apply(result),
            None => result,
        })
    }
}

/// In-memory implementation of RequestRepository (for development/testing)
///
/// Every write takes the single write lock, so the check-then-write
/// sequences of `insert` and `save_all_guarded` are atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRequestRepository {
    requests: Arc<RwLock<HashMap<Uuid, ParticipationRequest>>>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn confirmed_count(requests: &HashMap<Uuid, ParticipationRequest>, event_id: Uuid) -> u64 {
    requests
        .values()
        .filter(|r| r.event_id == event_id && r.status == RequestStatus::Confirmed)
        .count() as u64
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn get_by_id(&self, id: Uuid) -> EventResult<Option<ParticipationRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> EventResult<Vec<ParticipationRequest>> {
        let requests = self.requests.read().await;
        Ok(ids.iter().filter_map(|id| requests.get(id).cloned()).collect())
    }

    async fn find_by_event(&self, event_id: Uuid) -> EventResult<Vec<ParticipationRequest>> {
        let requests = self.requests.read().await;
        let mut result: Vec<ParticipationRequest> = requests
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        sort_requests(&mut result);
        Ok(result)
    }

    async fn find_by_requester(&self, requester_id: Uuid) -> EventResult<Vec<ParticipationRequest>> {
        let requests = self.requests.read().await;
        let mut result: Vec<ParticipationRequest> = requests
            .values()
            .filter(|r| r.requester_id == requester_id)
            .cloned()
            .collect();
        sort_requests(&mut result);
        Ok(result)
    }

    async fn count_by_event_and_status(&self, event_id: Uuid, status: RequestStatus) -> EventResult<u64> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| r.event_id == event_id && r.status == status)
            .count() as u64)
    }

    async fn count_confirmed_by_events(&self, event_ids: Vec<Uuid>) -> EventResult<HashMap<Uuid, u64>> {
        let requests = self.requests.read().await;
        let mut counts = HashMap::new();
        for request in requests.values() {
            if request.status == RequestStatus::Confirmed && event_ids.contains(&request.event_id) {
                *counts.entry(request.event_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn insert(&self, request: ParticipationRequest, participant_limit: u32) -> EventResult<ParticipationRequest> {
        let mut requests = self.requests.write().await;

        let duplicate = requests
            .values()
            .any(|r| r.event_id == request.event_id && r.requester_id == request.requester_id);
        if duplicate {
            return Err(EventError::DuplicateRequest {
                requester_id: request.requester_id,
                event_id: request.event_id,
            });
        }

        if participant_limit > 0 && confirmed_count(&requests, request.event_id) >= u64::from(participant_limit) {
            return Err(EventError::ParticipantLimitReached(request.event_id));
        }

        requests.insert(request.id, request.clone());

        tracing::info!(
            request_id = %request.id,
            event_id = %request.event_id,
            status = %request.status,
            "Created participation request"
        );
        Ok(request)
    }

    async fn save(&self, request: ParticipationRequest) -> EventResult<ParticipationRequest> {
        let mut requests = self.requests.write().await;
        if !requests.contains_key(&request.id) {
            return Err(EventError::RequestNotFound(request.id));
        }
        requests.insert(request.id, request.clone());

        tracing::info!(request_id = %request.id, status = %request.status, "Saved participation request");
        Ok(request)
    }

    async fn save_all_guarded(
        &self,
        event_id: Uuid,
        expected_confirmed: Option<u64>,
        batch: Vec<ParticipationRequest>,
    ) -> EventResult<Vec<ParticipationRequest>> {
        let mut requests = self.requests.write().await;

        if let Some(expected) = expected_confirmed {
            let confirmed = confirmed_count(&requests, event_id);
            if confirmed != expected {
                tracing::warn!(
                    event_id = %event_id,
                    expected_confirmed = expected,
                    confirmed,
                    "Confirmed count changed before batch write"
                );
                return Err(EventError::ConcurrentModification(event_id));
            }
        }

        for request in &batch {
            let stored = requests
                .get(&request.id)
                .ok_or(EventError::RequestNotFound(request.id))?;
            if stored.event_id != event_id {
                return Err(EventError::RequestEventMismatch {
                    request_id: request.id,
                    event_id,
                });
            }
            if stored.status != RequestStatus::Pending {
                return Err(EventError::RequestNotPending {
                    request_id: request.id,
                    status: stored.status,
                });
            }
        }

        for request in &batch {
            requests.insert(request.id, request.clone());
        }

        tracing::info!(event_id = %event_id, count = batch.len(), "Saved request decisions");
        Ok(batch)
    }
}
