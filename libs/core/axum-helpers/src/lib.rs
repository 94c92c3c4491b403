//! # Axum Helpers
//!
//! Shared HTTP plumbing for the event-listing services.
//!
//! ## Modules
//!
//! - **[`errors`]**: `AppError` and the JSON error body every endpoint returns
//! - **[`extractors`]**: validated JSON bodies, path parameters, client address
//! - **[`http`]**: client IP extraction, security headers
//! - **[`server`]**: router assembly, `/health`, graceful shutdown
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum_helpers::server::{create_app, create_router, health_router};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let router = create_router::<ApiDoc>(api_routes).merge(health_router(app_info!()));
//! create_app(router, &ServerConfig::default()).await?;
//! ```

pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::{ClientIp, PathParams, UuidPath, ValidatedJson};
pub use http::{extract_ip_from_headers, security_headers};
pub use server::{create_app, create_router, health_router, shutdown_signal};
