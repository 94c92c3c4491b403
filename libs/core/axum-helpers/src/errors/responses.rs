//! Reusable OpenAPI response types.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "code": 1005,
        "error": "INTERNAL_ERROR",
        "status": "INTERNAL_SERVER_ERROR",
        "reason": "An unexpected error occurred.",
        "message": "Internal error",
        "timestamp": "2025-01-01T12:00:00Z"
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - validation failed or the input breaks a timing rule",
    content_type = "application/json",
    example = json!({
        "code": 1001,
        "error": "VALIDATION_ERROR",
        "status": "BAD_REQUEST",
        "reason": "Incorrectly made request.",
        "message": "Request validation failed",
        "timestamp": "2025-01-01T12:00:00Z",
        "details": {
            "title": [{"code": "length", "message": null, "params": {"min": 3, "max": 120, "value": "ab"}}]
        }
    })
)]
pub struct BadRequestResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({
        "code": 1004,
        "error": "NOT_FOUND",
        "status": "NOT_FOUND",
        "reason": "The required object was not found.",
        "message": "Event not found: 0190b3a4-8c1e-7cc2-9d55-3e0a6b1f2c11",
        "timestamp": "2025-01-01T12:00:00Z"
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Forbidden - caller does not own the resource",
    content_type = "application/json",
    example = json!({
        "code": 1007,
        "error": "FORBIDDEN",
        "status": "FORBIDDEN",
        "reason": "For the requested operation the conditions are not met.",
        "message": "User 0190... is not the initiator of event 0190...",
        "timestamp": "2025-01-01T12:00:00Z"
    })
)]
pub struct ForbiddenResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Conflict - lifecycle state or capacity rule violated",
    content_type = "application/json",
    example = json!({
        "code": 1008,
        "error": "CONFLICT",
        "status": "CONFLICT",
        "reason": "Integrity constraint has been violated.",
        "message": "Participant limit reached for event 0190...",
        "timestamp": "2025-01-01T12:00:00Z"
    })
)]
pub struct ConflictResponse(pub ErrorResponse);
