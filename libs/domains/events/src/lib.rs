//! Events Domain
//!
//! Event publication lifecycle, participation-request admission control and
//! the projections that join events with confirmed-request and view counts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, OpenAPI
//! └──────┬──────┘
//!        │
//! ┌──────▼─────────────────────────┐
//! │ EventService  ParticipationSvc │  ← orchestration, store calls
//! └──────┬─────────────────────────┘
//!        │
//! ┌──────▼─────────────────────────┐
//! │ lifecycle  admission projection│  ← rules (pure) and counter joins
//! └──────┬─────────────────────────┘
//!        │
//! ┌──────▼─────────────────────────┐
//! │ repositories  directory  stats │  ← collaborators (trait + in-memory)
//! └────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_events::{EventContext, InMemoryStatsClient, handlers};
//!
//! let ctx = EventContext::in_memory(Arc::new(InMemoryStatsClient::new()));
//! let router = handlers::router(ctx);
//! ```

pub mod admission;
pub mod clock;
pub mod context;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod participation;
pub mod projection;
pub mod repository;
pub mod service;
pub mod stats;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::EventContext;
pub use directory::{Category, Directory, InMemoryDirectory, NewCategory, NewUser, User};
pub use error::{ErrorKind, EventError, EventResult};
pub use handlers::ApiDoc;
pub use models::{
    Event, EventPatch, EventProjection, EventShortDto, EventState, NewEvent, Patch, ParticipationRequest,
    ParticipationRequestDto, RequestStatus,
};
pub use participation::ParticipationService;
pub use projection::ProjectionBuilder;
pub use repository::{EventRepository, InMemoryEventRepository, InMemoryRequestRepository, RequestRepository};
pub use service::EventService;
pub use stats::{HttpStatsClient, InMemoryStatsClient, StatsClient};
