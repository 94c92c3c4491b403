use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{EventState, RequestStatus};

/// Failure classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidInput,
    InvalidTiming,
    Unavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event with id={0} was not found")]
    EventNotFound(Uuid),

    #[error("Request with id={0} was not found")]
    RequestNotFound(Uuid),

    #[error("User with id={0} was not found")]
    UserNotFound(Uuid),

    #[error("Category with id={0} was not found")]
    CategoryNotFound(Uuid),

    #[error("User {user_id} has no rights over {resource}")]
    Forbidden { user_id: Uuid, resource: String },

    #[error("Event {event_id} is {state} and cannot be changed")]
    StateConflict { event_id: Uuid, state: EventState },

    #[error("Event {0} is not published")]
    EventNotPublished(Uuid),

    #[error("Initiator cannot request participation in own event {0}")]
    OwnRequest(Uuid),

    #[error("Participant limit reached for event {0}")]
    ParticipantLimitReached(Uuid),

    #[error("User {requester_id} already has a request for event {event_id}")]
    DuplicateRequest { requester_id: Uuid, event_id: Uuid },

    #[error("Request {request_id} is {status}, only PENDING requests can be updated")]
    RequestNotPending {
        request_id: Uuid,
        status: RequestStatus,
    },

    #[error("Request {request_id} does not belong to event {event_id}")]
    RequestEventMismatch { request_id: Uuid, event_id: Uuid },

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Event {0} was modified concurrently, retry the operation")]
    ConcurrentModification(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    InvalidTiming(String),

    #[error("Stats service unavailable: {0}")]
    StatsUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EventResult<T> = Result<T, EventError>;

impl EventError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EventError::EventNotFound(_)
            | EventError::RequestNotFound(_)
            | EventError::UserNotFound(_)
            | EventError::CategoryNotFound(_) => ErrorKind::NotFound,
            EventError::Forbidden { .. } => ErrorKind::Forbidden,
            EventError::StateConflict { .. }
            | EventError::EventNotPublished(_)
            | EventError::OwnRequest(_)
            | EventError::ParticipantLimitReached(_)
            | EventError::DuplicateRequest { .. }
            | EventError::RequestNotPending { .. }
            | EventError::RequestEventMismatch { .. }
            | EventError::AlreadyExists(_)
            | EventError::ConcurrentModification(_) => ErrorKind::Conflict,
            EventError::Validation(_) => ErrorKind::InvalidInput,
            EventError::InvalidTiming(_) => ErrorKind::InvalidTiming,
            EventError::StatsUnavailable(_) => ErrorKind::Unavailable,
            EventError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn forbidden(user_id: Uuid, resource: impl Into<String>) -> Self {
        EventError::Forbidden {
            user_id,
            resource: resource.into(),
        }
    }
}

impl From<validator::ValidationErrors> for EventError {
    fn from(err: validator::ValidationErrors) -> Self {
        EventError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for EventError {
    fn from(err: reqwest::Error) -> Self {
        EventError::StatsUnavailable(err.to_string())
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::Forbidden => AppError::Forbidden(message),
            ErrorKind::Conflict => AppError::Conflict(message),
            ErrorKind::InvalidInput | ErrorKind::InvalidTiming => AppError::BadRequest(message),
            ErrorKind::Unavailable => AppError::ServiceUnavailable(message),
            ErrorKind::Internal => AppError::InternalServerError(message),
        }
    }
}

impl IntoResponse for EventError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_kinds_map_to_http_status() {
        let id = Uuid::now_v7();
        let cases = [
            (EventError::EventNotFound(id), StatusCode::NOT_FOUND),
            (EventError::forbidden(id, "event"), StatusCode::FORBIDDEN),
            (EventError::ParticipantLimitReached(id), StatusCode::CONFLICT),
            (EventError::ConcurrentModification(id), StatusCode::CONFLICT),
            (EventError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (EventError::InvalidTiming("x".into()), StatusCode::BAD_REQUEST),
            (EventError::StatsUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (EventError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_request_not_pending_message() {
        let id = Uuid::now_v7();
        let err = EventError::RequestNotPending {
            request_id: id,
            status: RequestStatus::Confirmed,
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("CONFIRMED"));
    }
}
