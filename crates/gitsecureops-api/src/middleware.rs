//! Request middleware

use crate::error::CORRELATION_ID_HEADER;
use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use gitsecureops_common::CorrelationId;

/// Per-request context inserted by [`correlation_id_middleware`]
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: CorrelationId,
}

/// Adopt the caller's `X-Correlation-ID` (or mint one) and echo it back
///
/// Values that are not UUIDs are replaced with a fresh id.
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(CorrelationId::new, CorrelationId::from);

    request.extensions_mut().insert(RequestContext {
        correlation_id: correlation_id.clone(),
    });

    let mut response = next.run(request).await;
    if !response.headers().contains_key(CORRELATION_ID_HEADER)
        && let Ok(value) = HeaderValue::from_str(&correlation_id.to_string())
    {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
