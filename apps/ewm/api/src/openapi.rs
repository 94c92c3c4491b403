//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for the EWM API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Explore With Me API",
        version = "0.1.0",
        description = "Event publication, participation requests and public event listings"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api", api = domain_events::ApiDoc)
    )
)]
pub struct ApiDoc;
