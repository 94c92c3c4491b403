use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::str::FromStr;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{EventError, EventResult};

pub const ANNOTATION_LEN: (u64, u64) = (20, 2000);
pub const DESCRIPTION_LEN: (u64, u64) = (20, 7000);
pub const TITLE_LEN: (u64, u64) = (3, 120);

/// Publication state of an event.
///
/// `PENDING` moves to `PUBLISHED` or `CANCELED`; both are final.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventState {
    #[default]
    Pending,
    Published,
    Canceled,
}

/// Status of a participation request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// Location as submitted by clients; both coordinates are required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationInput {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LocationInput {
    pub fn resolve(self) -> EventResult<Location> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Location { lat, lon }),
            (None, _) => Err(EventError::Validation("location.lat must not be null".into())),
            (_, None) => Err(EventError::Validation("location.lon must not be null".into())),
        }
    }
}

/// Event entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub initiator_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub annotation: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub location: Location,
    pub paid: bool,
    /// 0 means unlimited
    pub participant_limit: u32,
    pub request_moderation: bool,
    pub created_on: DateTime<Utc>,
    pub published_on: Option<DateTime<Utc>>,
    pub state: EventState,
    /// Optimistic-lock counter, bumped by every successful save
    #[serde(skip)]
    pub version: u64,
}

impl Event {
    pub fn new(initiator_id: Uuid, location: Location, draft: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            initiator_id,
            category_id: draft.category,
            title: draft.title,
            annotation: draft.annotation,
            description: draft.description,
            event_date: draft.event_date,
            location,
            paid: draft.paid,
            participant_limit: draft.participant_limit,
            request_moderation: draft.request_moderation,
            created_on: now,
            published_on: None,
            state: EventState::Pending,
            version: 0,
        }
    }

    pub fn is_published(&self) -> bool {
        self.state == EventState::Published
    }

    pub fn has_unlimited_capacity(&self) -> bool {
        self.participant_limit == 0
    }
}

fn default_true() -> bool {
    true
}

/// Draft submitted by an initiator to create an event
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewEvent {
    #[validate(length(min = 20, max = 2000))]
    pub annotation: String,
    pub category: Uuid,
    #[validate(length(min = 20, max = 7000))]
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub location: LocationInput,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub participant_limit: u32,
    #[serde(default = "default_true")]
    pub request_moderation: bool,
    #[validate(length(min = 3, max = 120))]
    pub title: String,
}

/// A field of a partial update.
///
/// A missing key deserializes to `Absent` (with `#[serde(default)]`), an
/// explicit `null` to `Clear`, anything else to `Set`.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Absent,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }

    /// `Set` becomes `Some`, `Absent` becomes `None`, `Clear` is an error naming `field`.
    pub fn into_update(self, field: &str) -> EventResult<Option<T>> {
        match self {
            Patch::Absent => Ok(None),
            Patch::Set(value) => Ok(Some(value)),
            Patch::Clear => Err(EventError::Validation(format!(
                "Field: {}. Error: must not be null",
                field
            ))),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

/// Fields shared by owner and admin updates.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EventPatch {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub annotation: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<Uuid>)]
    pub category: Patch<Uuid>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub description: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub event_date: Patch<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Option<LocationInput>)]
    pub location: Patch<LocationInput>,
    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub paid: Patch<bool>,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub participant_limit: Patch<u32>,
    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub request_moderation: Patch<bool>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub title: Patch<String>,
}

fn check_length(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &Patch<String>,
    (min, max): (u64, u64),
) {
    let Some(value) = value.as_set() else {
        return;
    };
    let len = value.chars().count() as u64;
    if len < min || len > max {
        let mut error = ValidationError::new("length");
        error.add_param(Cow::from("min"), &min);
        error.add_param(Cow::from("max"), &max);
        error.add_param(Cow::from("value"), value);
        errors.add(field, error);
    }
}

impl Validate for EventPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_length(&mut errors, "annotation", &self.annotation, ANNOTATION_LEN);
        check_length(&mut errors, "description", &self.description, DESCRIPTION_LEN);
        check_length(&mut errors, "title", &self.title, TITLE_LEN);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerStateAction {
    SendToReview,
    CancelReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminStateAction {
    PublishEvent,
    RejectEvent,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateEventUserRequest {
    #[serde(flatten)]
    pub patch: EventPatch,
    pub state_action: Option<OwnerStateAction>,
}

impl Validate for UpdateEventUserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.patch.validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateEventAdminRequest {
    #[serde(flatten)]
    pub patch: EventPatch,
    pub state_action: Option<AdminStateAction>,
}

impl Validate for UpdateEventAdminRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.patch.validate()
    }
}

/// Participation request entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRequest {
    pub id: Uuid,
    pub event_id: Uuid,
    pub requester_id: Uuid,
    pub created: DateTime<Utc>,
    pub status: RequestStatus,
}

impl ParticipationRequest {
    pub fn new(event_id: Uuid, requester_id: Uuid, status: RequestStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_id,
            requester_id,
            created: now,
            status,
        }
    }
}

/// Public shape of a participation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParticipationRequestDto {
    pub id: Uuid,
    pub event: Uuid,
    pub requester: Uuid,
    pub created: DateTime<Utc>,
    pub status: RequestStatus,
}

impl From<ParticipationRequest> for ParticipationRequestDto {
    fn from(request: ParticipationRequest) -> Self {
        Self {
            id: request.id,
            event: request.event_id,
            requester: request.requester_id,
            created: request.created,
            status: request.status,
        }
    }
}

/// Target status of an owner's bulk decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Confirmed,
    Rejected,
}

impl From<DecisionStatus> for RequestStatus {
    fn from(status: DecisionStatus) -> Self {
        match status {
            DecisionStatus::Confirmed => RequestStatus::Confirmed,
            DecisionStatus::Rejected => RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EventRequestStatusUpdateRequest {
    #[validate(length(min = 1))]
    pub request_ids: Vec<Uuid>,
    pub status: DecisionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventRequestStatusUpdateResult {
    pub confirmed_requests: Vec<ParticipationRequestDto>,
    pub rejected_requests: Vec<ParticipationRequestDto>,
}

/// Event with its confirmed-request and view counters
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EventProjection {
    #[serde(flatten)]
    pub event: Event,
    pub confirmed_requests: u64,
    pub views: u64,
}

impl EventProjection {
    /// Both counters at zero, as reported for unpublished or just-written events.
    pub fn with_zero_counters(event: Event) -> Self {
        Self {
            event,
            confirmed_requests: 0,
            views: 0,
        }
    }
}

/// Listing shape of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventShortDto {
    pub id: Uuid,
    pub title: String,
    pub annotation: String,
    pub category_id: Uuid,
    pub initiator_id: Uuid,
    pub event_date: DateTime<Utc>,
    pub paid: bool,
    pub confirmed_requests: u64,
    pub views: u64,
}

impl From<EventProjection> for EventShortDto {
    fn from(projection: EventProjection) -> Self {
        let event = projection.event;
        Self {
            id: event.id,
            title: event.title,
            annotation: event.annotation,
            category_id: event.category_id,
            initiator_id: event.initiator_id,
            event_date: event.event_date,
            paid: event.paid,
            confirmed_requests: projection.confirmed_requests,
            views: projection.views,
        }
    }
}

fn default_page_size() -> usize {
    10
}

/// Offset pagination: `from` items are skipped, at most `size` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1))]
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            from: 0,
            size: default_page_size(),
        }
    }
}

impl PageRequest {
    pub fn new(from: usize, size: usize) -> Self {
        Self { from, size }
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.from).take(self.size).collect()
    }
}

/// Filter for event searches. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCriteria {
    pub initiators: Option<Vec<Uuid>>,
    pub states: Option<Vec<EventState>>,
    pub categories: Option<Vec<Uuid>>,
    /// Case-insensitive substring of annotation or description
    pub text: Option<String>,
    pub paid: Option<bool>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
}

impl EventCriteria {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(initiators) = &self.initiators {
            if !initiators.contains(&event.initiator_id) {
                return false;
            }
        }
        if let Some(states) = &self.states {
            if !states.contains(&event.state) {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            if !categories.contains(&event.category_id) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !event.annotation.to_lowercase().contains(&needle)
                && !event.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(paid) = self.paid {
            if event.paid != paid {
                return false;
            }
        }
        if let Some(start) = self.range_start {
            if event.event_date < start {
                return false;
            }
        }
        if let Some(end) = self.range_end {
            if event.event_date > end {
                return false;
            }
        }
        true
    }

    pub fn check_range(&self) -> EventResult<()> {
        match (self.range_start, self.range_end) {
            (Some(start), Some(end)) if start > end => Err(EventError::Validation(
                "rangeStart must not be after rangeEnd".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Parses a comma-separated query value; an empty string yields `None`.
fn parse_list<T>(field: &str, raw: Option<&str>) -> EventResult<Option<Vec<T>>>
where
    T: FromStr,
{
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.split(',')
        .map(|item| {
            item.trim()
                .parse::<T>()
                .map_err(|_| EventError::Validation(format!("Invalid value '{}' for {}", item, field)))
        })
        .collect::<EventResult<Vec<T>>>()
        .map(Some)
}

/// Admin search parameters. List values are comma-separated.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminEventQuery {
    /// Initiator ids
    pub users: Option<String>,
    /// e.g. `PENDING,PUBLISHED`
    pub states: Option<String>,
    /// Category ids
    pub categories: Option<String>,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

impl AdminEventQuery {
    pub fn into_parts(self) -> EventResult<(EventCriteria, PageRequest)> {
        let criteria = EventCriteria {
            initiators: parse_list("users", self.users.as_deref())?,
            states: parse_list("states", self.states.as_deref())?,
            categories: parse_list("categories", self.categories.as_deref())?,
            range_start: self.range_start,
            range_end: self.range_end,
            ..Default::default()
        };
        let page = PageRequest::new(self.from, self.size);
        page.validate()?;
        Ok((criteria, page))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSort {
    /// Soonest first
    EventDate,
    /// Most viewed first
    Views,
}

/// Public search parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicEventQuery {
    pub text: Option<String>,
    /// Category ids, comma-separated
    pub categories: Option<String>,
    pub paid: Option<bool>,
    /// Defaults to the current time
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub only_available: bool,
    pub sort: Option<EventSort>,
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

/// Parsed public search
#[derive(Debug, Clone, PartialEq)]
pub struct PublicSearch {
    pub criteria: EventCriteria,
    pub only_available: bool,
    pub sort: Option<EventSort>,
    pub page: PageRequest,
}

impl PublicEventQuery {
    pub fn into_search(self) -> EventResult<PublicSearch> {
        let criteria = EventCriteria {
            states: Some(vec![EventState::Published]),
            categories: parse_list("categories", self.categories.as_deref())?,
            text: self.text.filter(|t| !t.trim().is_empty()),
            paid: self.paid,
            range_start: self.range_start,
            range_end: self.range_end,
            ..Default::default()
        };
        let page = PageRequest::new(self.from, self.size);
        page.validate()?;
        Ok(PublicSearch {
            criteria,
            only_available: self.only_available,
            sort: self.sort,
            page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_distinguishes_absent_null_and_value() {
        let patch: EventPatch = serde_json::from_value(json!({
            "title": "Rust meetup",
            "annotation": null
        }))
        .unwrap();

        assert_eq!(patch.title, Patch::Set("Rust meetup".to_string()));
        assert_eq!(patch.annotation, Patch::Clear);
        assert!(patch.description.is_absent());
        assert!(patch.paid.is_absent());
    }

    #[test]
    fn test_clear_is_rejected_on_update() {
        let err = Patch::<String>::Clear.into_update("title").unwrap_err();
        assert!(matches!(err, EventError::Validation(ref m) if m.contains("title")));
        assert_eq!(Patch::Set(5u32).into_update("limit").unwrap(), Some(5));
        assert_eq!(Patch::<u32>::Absent.into_update("limit").unwrap(), None);
    }

    #[test]
    fn test_patch_length_validation() {
        let patch = EventPatch {
            title: Patch::Set("ab".to_string()),
            annotation: Patch::Set("short".to_string()),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("annotation"));
        assert!(!fields.contains_key("description"));
    }

    #[test]
    fn test_owner_update_body_parses_state_action() {
        let body: UpdateEventUserRequest = serde_json::from_value(json!({
            "state_action": "CANCEL_REVIEW",
            "paid": true
        }))
        .unwrap();
        assert_eq!(body.state_action, Some(OwnerStateAction::CancelReview));
        assert_eq!(body.patch.paid, Patch::Set(true));

        let admin: Result<UpdateEventAdminRequest, _> =
            serde_json::from_value(json!({ "state_action": "SEND_TO_REVIEW" }));
        assert!(admin.is_err());
    }

    #[test]
    fn test_new_event_defaults() {
        let draft: NewEvent = serde_json::from_value(json!({
            "annotation": "An evening of systems programming talks",
            "category": Uuid::now_v7(),
            "description": "Talks about ownership, lifetimes and async runtimes",
            "event_date": "2030-01-01T18:00:00Z",
            "location": { "lat": 55.75, "lon": 37.62 },
            "title": "Rust evening"
        }))
        .unwrap();

        assert!(!draft.paid);
        assert_eq!(draft.participant_limit, 0);
        assert!(draft.request_moderation);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_location_requires_both_coordinates() {
        let missing = LocationInput {
            lat: Some(1.0),
            lon: None,
        };
        assert!(matches!(missing.resolve(), Err(EventError::Validation(_))));
    }

    #[test]
    fn test_admin_query_parses_comma_lists() {
        let user = Uuid::now_v7();
        let query = AdminEventQuery {
            users: Some(user.to_string()),
            states: Some("PENDING, PUBLISHED".to_string()),
            size: 10,
            ..Default::default()
        };
        let (criteria, page) = query.into_parts().unwrap();
        assert_eq!(criteria.initiators, Some(vec![user]));
        assert_eq!(
            criteria.states,
            Some(vec![EventState::Pending, EventState::Published])
        );
        assert_eq!(criteria.categories, None);
        assert_eq!(page, PageRequest::new(0, 10));

        let bad = AdminEventQuery {
            states: Some("DRAFT".to_string()),
            size: 10,
            ..Default::default()
        };
        assert!(matches!(bad.into_parts(), Err(EventError::Validation(_))));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let query = PublicEventQuery {
            size: 0,
            ..Default::default()
        };
        assert!(query.into_search().is_err());
    }

    #[test]
    fn test_page_apply() {
        let page = PageRequest::new(2, 2);
        assert_eq!(page.apply(vec![1, 2, 3, 4, 5]), vec![3, 4]);
    }
}
