//! `OpenAPI` document generation

use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use utoipa::OpenApi;

/// Path the document is served from
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// `OpenAPI` documentation for the GitSecureOps API
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::search::search_code_get,
        crate::routes::search::search_code_post,
        crate::routes::health::health_check,
    ),
    components(
        schemas(
            crate::routes::search::SearchCodeBody,
            crate::routes::search::RepositoryParam,
            crate::routes::search::SearchCodeResponse,
            crate::routes::search::SearchMetadata,
            crate::error::ApiErrorResponse,
        )
    ),
    tags(
        (name = "search", description = "Cross-repository code search"),
        (name = "health", description = "Service liveness"),
    ),
    info(
        title = "GitSecureOps API",
        description = "Aggregated GitHub code search across a user's repositories and organizations",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:7071", description = "Local development server")
    )
)]
pub struct ApiDoc;

pub fn routes() -> Router<AppState> {
    Router::new().route(OPENAPI_PATH, get(openapi_json))
}

/// Returns the `OpenAPI` JSON document
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
