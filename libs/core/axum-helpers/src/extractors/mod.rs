//! Custom extractors for Axum handlers.

pub mod client_ip;
pub mod path_params;
pub mod uuid_path;
pub mod validated_json;

pub use client_ip::ClientIp;
pub use path_params::PathParams;
pub use uuid_path::UuidPath;
pub use validated_json::ValidatedJson;
