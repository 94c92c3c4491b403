use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use axum_helpers::{
    ClientIp, PathParams, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestResponse, ConflictResponse, ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi};
use uuid::Uuid;

use crate::context::EventContext;
use crate::directory::{Category, NewCategory, NewUser, User};
use crate::error::EventResult;
use crate::models::{
    AdminEventQuery, AdminStateAction, DecisionStatus, Event, EventPatch, EventProjection,
    EventRequestStatusUpdateRequest, EventRequestStatusUpdateResult, EventShortDto, EventSort, EventState, Location,
    LocationInput, NewEvent, OwnerStateAction, PageRequest, ParticipationRequestDto, PublicEventQuery, RequestStatus,
    UpdateEventAdminRequest, UpdateEventUserRequest,
};
use crate::participation::ParticipationService;
use crate::service::EventService;

pub const TAG_PRIVATE: &str = "events: private";
pub const TAG_ADMIN: &str = "events: admin";
pub const TAG_PUBLIC: &str = "events: public";

/// OpenAPI documentation for the event endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        create_event,
        list_owner_events,
        get_owner_event,
        update_owner_event,
        list_event_requests,
        update_request_statuses,
        create_request,
        list_user_requests,
        cancel_request,
        search_events,
        update_admin_event,
        register_user,
        register_category,
        list_published_events,
        get_published_event,
    ),
    components(
        schemas(
            Event,
            EventState,
            EventProjection,
            EventShortDto,
            EventSort,
            Location,
            LocationInput,
            NewEvent,
            EventPatch,
            UpdateEventUserRequest,
            UpdateEventAdminRequest,
            OwnerStateAction,
            AdminStateAction,
            ParticipationRequestDto,
            RequestStatus,
            DecisionStatus,
            EventRequestStatusUpdateRequest,
            EventRequestStatusUpdateResult,
            User,
            NewUser,
            Category,
            NewCategory,
        ),
        responses(
            BadRequestResponse,
            ForbiddenResponse,
            NotFoundResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG_PRIVATE, description = "Event owner and requester endpoints"),
        (name = TAG_ADMIN, description = "Event review and directory seeding"),
        (name = TAG_PUBLIC, description = "Published events")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct EventsState {
    pub events: EventService,
    pub participation: ParticipationService,
}

type AppState = Arc<EventsState>;

/// Create the events router with all HTTP endpoints
pub fn router(ctx: EventContext) -> Router {
    let state = Arc::new(EventsState {
        events: EventService::new(ctx.clone()),
        participation: ParticipationService::new(ctx),
    });

    Router::new()
        .route("/users/{user_id}/events", get(list_owner_events).post(create_event))
        .route(
            "/users/{user_id}/events/{event_id}",
            get(get_owner_event).patch(update_owner_event),
        )
        .route(
            "/users/{user_id}/events/{event_id}/requests",
            get(list_event_requests).patch(update_request_statuses),
        )
        .route("/users/{user_id}/requests", get(list_user_requests).post(create_request))
        .route("/users/{user_id}/requests/{request_id}/cancel", patch(cancel_request))
        .route("/admin/events", get(search_events))
        .route("/admin/events/{event_id}", patch(update_admin_event))
        .route("/admin/users", post(register_user))
        .route("/admin/categories", post(register_category))
        .route("/events", get(list_published_events))
        .route("/events/{event_id}", get(get_published_event))
        .with_state(state)
}

/// Create an event; it starts in `PENDING`
#[utoipa::path(
    post,
    path = "/users/{user_id}/events",
    tag = TAG_PRIVATE,
    params(("user_id" = Uuid, Path, description = "Initiator ID")),
    request_body = NewEvent,
    responses(
        (status = 201, description = "Event created", body = EventProjection),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_event(
    State(state): State<AppState>,
    UuidPath(user_id): UuidPath,
    ValidatedJson(draft): ValidatedJson<NewEvent>,
) -> EventResult<impl IntoResponse> {
    let event = state.events.create_event(user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events created by the user
#[utoipa::path(
    get,
    path = "/users/{user_id}/events",
    tag = TAG_PRIVATE,
    params(("user_id" = Uuid, Path, description = "Initiator ID"), PageRequest),
    responses(
        (status = 200, description = "Events of the user", body = Vec<EventShortDto>),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn list_owner_events(
    State(state): State<AppState>,
    UuidPath(user_id): UuidPath,
    Query(page): Query<PageRequest>,
) -> EventResult<Json<Vec<EventShortDto>>> {
    let events = state.events.list_owner_events(user_id, page).await?;
    Ok(Json(events))
}

/// Get one of the user's events
#[utoipa::path(
    get,
    path = "/users/{user_id}/events/{event_id}",
    tag = TAG_PRIVATE,
    params(
        ("user_id" = Uuid, Path, description = "Initiator ID"),
        ("event_id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event found", body = EventProjection),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_owner_event(
    State(state): State<AppState>,
    PathParams((user_id, event_id)): PathParams<(Uuid, Uuid)>,
) -> EventResult<Json<EventProjection>> {
    let event = state.events.get_owner_event(user_id, event_id).await?;
    Ok(Json(event))
}

/// Edit an unpublished event, or send it to / withdraw it from review
#[utoipa::path(
    patch,
    path = "/users/{user_id}/events/{event_id}",
    tag = TAG_PRIVATE,
    params(
        ("user_id" = Uuid, Path, description = "Initiator ID"),
        ("event_id" = Uuid, Path, description = "Event ID")
    ),
    request_body = UpdateEventUserRequest,
    responses(
        (status = 200, description = "Event updated", body = EventProjection),
        (status = 400, response = BadRequestResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn update_owner_event(
    State(state): State<AppState>,
    PathParams((user_id, event_id)): PathParams<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<UpdateEventUserRequest>,
) -> EventResult<Json<EventProjection>> {
    let event = state.events.update_by_owner(user_id, event_id, body).await?;
    Ok(Json(event))
}

/// Participation requests filed against the user's event
#[utoipa::path(
    get,
    path = "/users/{user_id}/events/{event_id}/requests",
    tag = TAG_PRIVATE,
    params(
        ("user_id" = Uuid, Path, description = "Initiator ID"),
        ("event_id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Requests for the event", body = Vec<ParticipationRequestDto>),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn list_event_requests(
    State(state): State<AppState>,
    PathParams((user_id, event_id)): PathParams<(Uuid, Uuid)>,
) -> EventResult<Json<Vec<ParticipationRequestDto>>> {
    let requests = state.participation.list_event_requests(user_id, event_id).await?;
    Ok(Json(requests))
}

/// Confirm or reject pending requests in one batch
#[utoipa::path(
    patch,
    path = "/users/{user_id}/events/{event_id}/requests",
    tag = TAG_PRIVATE,
    params(
        ("user_id" = Uuid, Path, description = "Initiator ID"),
        ("event_id" = Uuid, Path, description = "Event ID")
    ),
    request_body = EventRequestStatusUpdateRequest,
    responses(
        (status = 200, description = "Decisions applied", body = EventRequestStatusUpdateResult),
        (status = 400, response = BadRequestResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn update_request_statuses(
    State(state): State<AppState>,
    PathParams((user_id, event_id)): PathParams<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<EventRequestStatusUpdateRequest>,
) -> EventResult<Json<EventRequestStatusUpdateResult>> {
    let result = state
        .participation
        .bulk_update_status(user_id, event_id, body)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NewRequestQuery {
    /// Event to join
    pub event_id: Uuid,
}

/// Request participation in a published event
#[utoipa::path(
    post,
    path = "/users/{user_id}/requests",
    tag = TAG_PRIVATE,
    params(("user_id" = Uuid, Path, description = "Requester ID"), NewRequestQuery),
    responses(
        (status = 201, description = "Request filed", body = ParticipationRequestDto),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn create_request(
    State(state): State<AppState>,
    UuidPath(user_id): UuidPath,
    Query(query): Query<NewRequestQuery>,
) -> EventResult<impl IntoResponse> {
    let request = state
        .participation
        .request_participation(user_id, query.event_id)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Requests filed by the user
#[utoipa::path(
    get,
    path = "/users/{user_id}/requests",
    tag = TAG_PRIVATE,
    params(("user_id" = Uuid, Path, description = "Requester ID")),
    responses(
        (status = 200, description = "Requests of the user", body = Vec<ParticipationRequestDto>),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn list_user_requests(
    State(state): State<AppState>,
    UuidPath(user_id): UuidPath,
) -> EventResult<Json<Vec<ParticipationRequestDto>>> {
    let requests = state.participation.list_user_requests(user_id).await?;
    Ok(Json(requests))
}

/// Cancel one of the user's requests
#[utoipa::path(
    patch,
    path = "/users/{user_id}/requests/{request_id}/cancel",
    tag = TAG_PRIVATE,
    params(
        ("user_id" = Uuid, Path, description = "Requester ID"),
        ("request_id" = Uuid, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request canceled", body = ParticipationRequestDto),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn cancel_request(
    State(state): State<AppState>,
    PathParams((user_id, request_id)): PathParams<(Uuid, Uuid)>,
) -> EventResult<Json<ParticipationRequestDto>> {
    let request = state.participation.cancel_request(user_id, request_id).await?;
    Ok(Json(request))
}

/// Search all events
#[utoipa::path(
    get,
    path = "/admin/events",
    tag = TAG_ADMIN,
    params(AdminEventQuery),
    responses(
        (status = 200, description = "Matching events", body = Vec<EventProjection>),
        (status = 400, response = BadRequestResponse)
    )
)]
async fn search_events(
    State(state): State<AppState>,
    Query(query): Query<AdminEventQuery>,
) -> EventResult<Json<Vec<EventProjection>>> {
    let events = state.events.search_events(query).await?;
    Ok(Json(events))
}

/// Edit, publish or reject a pending event
#[utoipa::path(
    patch,
    path = "/admin/events/{event_id}",
    tag = TAG_ADMIN,
    params(("event_id" = Uuid, Path, description = "Event ID")),
    request_body = UpdateEventAdminRequest,
    responses(
        (status = 200, description = "Event updated", body = EventProjection),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn update_admin_event(
    State(state): State<AppState>,
    UuidPath(event_id): UuidPath,
    ValidatedJson(body): ValidatedJson<UpdateEventAdminRequest>,
) -> EventResult<Json<EventProjection>> {
    let event = state.events.update_by_admin(event_id, body).await?;
    Ok(Json(event))
}

/// Register a user
#[utoipa::path(
    post,
    path = "/admin/users",
    tag = TAG_ADMIN,
    request_body = NewUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, response = BadRequestResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewUser>,
) -> EventResult<impl IntoResponse> {
    let user = state.events.register_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Register a category
#[utoipa::path(
    post,
    path = "/admin/categories",
    tag = TAG_ADMIN,
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category registered", body = Category),
        (status = 400, response = BadRequestResponse),
        (status = 409, response = ConflictResponse)
    )
)]
async fn register_category(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewCategory>,
) -> EventResult<impl IntoResponse> {
    let category = state.events.register_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Search published events
#[utoipa::path(
    get,
    path = "/events",
    tag = TAG_PUBLIC,
    params(PublicEventQuery),
    responses(
        (status = 200, description = "Matching published events", body = Vec<EventShortDto>),
        (status = 400, response = BadRequestResponse)
    )
)]
async fn list_published_events(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<PublicEventQuery>,
) -> EventResult<Json<Vec<EventShortDto>>> {
    let events = state.events.search_published_events(query, ip).await?;
    Ok(Json(events))
}

/// Get a published event
#[utoipa::path(
    get,
    path = "/events/{event_id}",
    tag = TAG_PUBLIC,
    params(("event_id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = EventProjection),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_published_event(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    UuidPath(event_id): UuidPath,
) -> EventResult<Json<EventProjection>> {
    let event = state.events.get_published_event(event_id, ip).await?;
    Ok(Json(event))
}
