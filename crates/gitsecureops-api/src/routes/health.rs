use crate::middleware::RequestContext;
use crate::state::AppState;
use axum::{Extension, Json, Router, routing::get};
use gitsecureops_common::CorrelationId;
use serde_json::json;
use tracing::{debug, instrument};

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness probe
///
/// Does not call GitHub: upstream health depends on each caller's token.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is running"))
)]
#[instrument(skip_all, fields(correlation_id))]
pub async fn health_check(context: Option<Extension<RequestContext>>) -> Json<serde_json::Value> {
    let correlation_id = context
        .as_ref()
        .map_or_else(CorrelationId::new, |ctx| ctx.correlation_id.clone());

    tracing::Span::current().record("correlation_id", correlation_id.to_string());
    debug!(correlation_id = %correlation_id, "Health check request");

    Json(json!({
        "status": "healthy",
        "service": "gitsecureops-api",
        "version": env!("CARGO_PKG_VERSION"),
        "correlation_id": correlation_id.to_string()
    }))
}
