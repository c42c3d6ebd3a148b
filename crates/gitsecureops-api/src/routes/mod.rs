pub mod health;
pub mod search;

use crate::state::AppState;
use axum::{Router, middleware};

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(health::routes())
        .merge(search::routes());

    if state.config.api.enable_docs {
        router = router.merge(crate::openapi::routes());
    }

    router
        .layer(middleware::from_fn(
            crate::middleware::correlation_id_middleware,
        ))
        .with_state(state)
}
