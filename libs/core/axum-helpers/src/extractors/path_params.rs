//! Multi-segment path extractor.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Like `Path<T>`, but a malformed segment becomes the standard JSON 400.
///
/// ```ignore
/// async fn get_owner_event(PathParams((user_id, event_id)): PathParams<(Uuid, Uuid)>) { .. }
/// ```
pub struct PathParams<T>(pub T);

impl<T, S> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PathParams(value))
            .map_err(|e| AppError::BadRequest(e.body_text()).into_response())
    }
}
