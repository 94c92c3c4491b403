//! Event state transitions and field mutation rules.
//!
//! Everything here is synchronous and side-effect free: callers load the
//! event, run a rule against a mutable copy and persist it only on `Ok`.

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::error::{EventError, EventResult};
use crate::models::{AdminStateAction, Event, EventPatch, EventState, OwnerStateAction};

/// Minimum distance between now and the event date on the owner paths.
pub const OWNER_LEAD_HOURS: i64 = 2;
/// Minimum distance on the admin path.
pub const ADMIN_LEAD_HOURS: i64 = 1;

pub fn ensure_lead_time(event_date: DateTime<Utc>, now: DateTime<Utc>, hours: i64) -> EventResult<()> {
    if event_date < now + TimeDelta::hours(hours) {
        return Err(EventError::InvalidTiming(format!(
            "Field: eventDate. Error: must be at least {} hour(s) after the current time. Value: {}",
            hours, event_date
        )));
    }
    Ok(())
}

pub fn ensure_initiator(event: &Event, user_id: Uuid) -> EventResult<()> {
    if event.initiator_id != user_id {
        return Err(EventError::forbidden(user_id, format!("event {}", event.id)));
    }
    Ok(())
}

fn ensure_pending(event: &Event) -> EventResult<()> {
    if event.state != EventState::Pending {
        return Err(EventError::StateConflict {
            event_id: event.id,
            state: event.state,
        });
    }
    Ok(())
}

/// Applies the present fields of `patch`; absent ones are left untouched.
///
/// Validates every field before writing any, so a failing patch leaves
/// `event` as it was.
pub fn apply_patch(event: &mut Event, patch: EventPatch) -> EventResult<()> {
    let annotation = patch.annotation.into_update("annotation")?;
    let category = patch.category.into_update("category")?;
    let description = patch.description.into_update("description")?;
    let event_date = patch.event_date.into_update("eventDate")?;
    let location = patch
        .location
        .into_update("location")?
        .map(|l| l.resolve())
        .transpose()?;
    let paid = patch.paid.into_update("paid")?;
    let participant_limit = patch.participant_limit.into_update("participantLimit")?;
    let request_moderation = patch.request_moderation.into_update("requestModeration")?;
    let title = patch.title.into_update("title")?;

    if let Some(annotation) = annotation {
        event.annotation = annotation;
    }
    if let Some(category) = category {
        event.category_id = category;
    }
    if let Some(description) = description {
        event.description = description;
    }
    if let Some(event_date) = event_date {
        event.event_date = event_date;
    }
    if let Some(location) = location {
        event.location = location;
    }
    if let Some(paid) = paid {
        event.paid = paid;
    }
    if let Some(participant_limit) = participant_limit {
        event.participant_limit = participant_limit;
    }
    if let Some(request_moderation) = request_moderation {
        event.request_moderation = request_moderation;
    }
    if let Some(title) = title {
        event.title = title;
    }
    Ok(())
}

/// Owner edit of an unpublished event.
pub fn update_by_owner(
    event: &mut Event,
    user_id: Uuid,
    patch: EventPatch,
    action: Option<OwnerStateAction>,
    now: DateTime<Utc>,
) -> EventResult<()> {
    ensure_initiator(event, user_id)?;
    ensure_pending(event)?;
    if let Some(date) = patch.event_date.as_set() {
        ensure_lead_time(*date, now, OWNER_LEAD_HOURS)?;
    }

    apply_patch(event, patch)?;

    match action {
        Some(OwnerStateAction::SendToReview) => event.state = EventState::Pending,
        Some(OwnerStateAction::CancelReview) => event.state = EventState::Canceled,
        None => {}
    }
    Ok(())
}

/// Admin review of a pending event.
pub fn update_by_admin(
    event: &mut Event,
    patch: EventPatch,
    action: Option<AdminStateAction>,
    now: DateTime<Utc>,
) -> EventResult<()> {
    ensure_pending(event)?;
    if let Some(date) = patch.event_date.as_set() {
        ensure_lead_time(*date, now, ADMIN_LEAD_HOURS)?;
    }

    apply_patch(event, patch)?;

    match action {
        Some(AdminStateAction::PublishEvent) => {
            event.state = EventState::Published;
            event.published_on = Some(now);
        }
        Some(AdminStateAction::RejectEvent) => event.state = EventState::Canceled,
        None => {}
    }
    Ok(())
}
