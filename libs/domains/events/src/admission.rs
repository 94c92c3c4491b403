//! Admission control: who gets a seat, and in which order.

use uuid::Uuid;

use crate::error::{EventError, EventResult};
use crate::models::{DecisionStatus, Event, ParticipationRequest, RequestStatus};

/// Seats left, or `None` when the event has no limit.
pub fn remaining_capacity(participant_limit: u32, confirmed: u64) -> Option<u64> {
    if participant_limit == 0 {
        None
    } else {
        Some(u64::from(participant_limit).saturating_sub(confirmed))
    }
}

pub fn is_saturated(event: &Event, confirmed: u64) -> bool {
    remaining_capacity(event.participant_limit, confirmed) == Some(0)
}

/// Checks a new participation request against the event.
pub fn ensure_can_request(event: &Event, requester_id: Uuid, confirmed: u64) -> EventResult<()> {
    if !event.is_published() {
        return Err(EventError::EventNotPublished(event.id));
    }
    if event.initiator_id == requester_id {
        return Err(EventError::OwnRequest(event.id));
    }
    if is_saturated(event, confirmed) {
        return Err(EventError::ParticipantLimitReached(event.id));
    }
    Ok(())
}

/// Requests skip moderation when the event has no limit or moderation is off.
pub fn initial_status(event: &Event) -> RequestStatus {
    if !event.request_moderation || event.has_unlimited_capacity() {
        RequestStatus::Confirmed
    } else {
        RequestStatus::Pending
    }
}

/// Outcome of a bulk decision, in the order the requests were supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionPlan {
    pub confirmed: Vec<ParticipationRequest>,
    pub rejected: Vec<ParticipationRequest>,
}

impl DecisionPlan {
    pub fn into_batch(self) -> Vec<ParticipationRequest> {
        self.confirmed.into_iter().chain(self.rejected).collect()
    }
}

/// Decides every request of a batch.
///
/// All requests must be `PENDING`. Confirming fails outright when the event
/// is already full; otherwise requests are confirmed in input order while
/// seats remain and the rest are rejected.
pub fn plan_decisions(
    event: &Event,
    requests: Vec<ParticipationRequest>,
    target: DecisionStatus,
    already_confirmed: u64,
) -> EventResult<DecisionPlan> {
    if let Some(request) = requests.iter().find(|r| r.status != RequestStatus::Pending) {
        return Err(EventError::RequestNotPending {
            request_id: request.id,
            status: request.status,
        });
    }

    let mut plan = DecisionPlan::default();

    match target {
        DecisionStatus::Rejected => {
            plan.rejected = requests
                .into_iter()
                .map(|mut r| {
                    r.status = RequestStatus::Rejected;
                    r
                })
                .collect();
        }
        DecisionStatus::Confirmed => {
            if is_saturated(event, already_confirmed) {
                return Err(EventError::ParticipantLimitReached(event.id));
            }

            let mut remaining = remaining_capacity(event.participant_limit, already_confirmed);
            for mut request in requests {
                match remaining {
                    None => {
                        request.status = RequestStatus::Confirmed;
                        plan.confirmed.push(request);
                    }
                    Some(left) if left > 0 => {
                        request.status = RequestStatus::Confirmed;
                        plan.confirmed.push(request);
                        remaining = Some(left - 1);
                    }
                    Some(_) => {
                        request.status = RequestStatus::Rejected;
                        plan.rejected.push(request);
                    }
                }
            }
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventState, Location, LocationInput, NewEvent};
    use chrono::{TimeDelta, Utc};

    fn published(limit: u32, moderation: bool) -> Event {
        let now = Utc::now();
        let draft = NewEvent {
            annotation: "Annotation long enough for rules".to_string(),
            category: Uuid::now_v7(),
            description: "Description long enough for rules".to_string(),
            event_date: now + TimeDelta::days(7),
            location: LocationInput::default(),
            paid: false,
            participant_limit: limit,
            request_moderation: moderation,
            title: "Capacity".to_string(),
        };
        let mut event = Event::new(Uuid::now_v7(), Location { lat: 0.0, lon: 0.0 }, draft, now);
        event.state = EventState::Published;
        event
    }

    fn pending_batch(event: &Event, n: usize) -> Vec<ParticipationRequest> {
        (0..n)
            .map(|_| ParticipationRequest::new(event.id, Uuid::now_v7(), RequestStatus::Pending, Utc::now()))
            .collect()
    }

    fn ids(requests: &[ParticipationRequest]) -> Vec<Uuid> {
        requests.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(initial_status(&published(0, true)), RequestStatus::Confirmed);
        assert_eq!(initial_status(&published(5, false)), RequestStatus::Confirmed);
        assert_eq!(initial_status(&published(5, true)), RequestStatus::Pending);
    }

    #[test]
    fn test_request_rules() {
        let event = published(1, true);
        assert!(ensure_can_request(&event, Uuid::now_v7(), 0).is_ok());
        assert!(matches!(
            ensure_can_request(&event, event.initiator_id, 0),
            Err(EventError::OwnRequest(_))
        ));
        assert!(matches!(
            ensure_can_request(&event, Uuid::now_v7(), 1),
            Err(EventError::ParticipantLimitReached(_))
        ));

        let mut draft = published(1, true);
        draft.state = EventState::Pending;
        assert!(matches!(
            ensure_can_request(&draft, Uuid::now_v7(), 0),
            Err(EventError::EventNotPublished(_))
        ));
    }

    #[test]
    fn test_limit_two_confirms_first_two_in_input_order() {
        let event = published(2, true);
        let batch = pending_batch(&event, 3);
        let order = ids(&batch);

        let plan = plan_decisions(&event, batch, DecisionStatus::Confirmed, 0).unwrap();

        assert_eq!(ids(&plan.confirmed), order[..2].to_vec());
        assert_eq!(ids(&plan.rejected), order[2..].to_vec());
        assert!(plan.confirmed.iter().all(|r| r.status == RequestStatus::Confirmed));
        assert!(plan.rejected.iter().all(|r| r.status == RequestStatus::Rejected));
    }

    #[test]
    fn test_remaining_capacity_counts_existing_confirmations() {
        let event = published(5, true);
        for remaining in 0..=4u64 {
            let batch = pending_batch(&event, 4);
            let confirmed = 5 - remaining;
            let result = plan_decisions(&event, batch, DecisionStatus::Confirmed, confirmed);
            if remaining == 0 {
                assert!(matches!(result, Err(EventError::ParticipantLimitReached(_))));
            } else {
                let plan = result.unwrap();
                assert_eq!(plan.confirmed.len() as u64, remaining.min(4));
                assert_eq!(plan.confirmed.len() + plan.rejected.len(), 4);
            }
        }
    }

    #[test]
    fn test_unlimited_confirms_everything() {
        let event = published(0, true);
        let plan = plan_decisions(&event, pending_batch(&event, 7), DecisionStatus::Confirmed, 100).unwrap();
        assert_eq!(plan.confirmed.len(), 7);
        assert!(plan.rejected.is_empty());
    }

    #[test]
    fn test_reject_ignores_capacity() {
        let event = published(1, true);
        let plan = plan_decisions(&event, pending_batch(&event, 2), DecisionStatus::Rejected, 1).unwrap();
        assert!(plan.confirmed.is_empty());
        assert_eq!(plan.rejected.len(), 2);
    }

    #[test]
    fn test_any_non_pending_request_fails_the_batch() {
        let event = published(10, true);
        let mut batch = pending_batch(&event, 3);
        batch[1].status = RequestStatus::Canceled;
        let bad = batch[1].id;

        let err = plan_decisions(&event, batch, DecisionStatus::Rejected, 0).unwrap_err();
        assert!(matches!(
            err,
            EventError::RequestNotPending { request_id, status: RequestStatus::Canceled } if request_id == bad
        ));
    }
}
