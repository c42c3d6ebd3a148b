//! Health, `OpenAPI` document and correlation-id middleware

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]


use axum::body::Body;
use axum::http::{Request, StatusCode};
use gitsecureops_api::create_router;
use gitsecureops_api::openapi::OPENAPI_PATH;
use gitsecureops_config::{ApiConfig, ApplicationConfig, GitHubConfig};
use gitsecureops_search::SearchScope;
use gitsecureops_search::test_mocks::MockSearch;
use serde_json::json;
use test_utils::{app_with_service, get, get_test_runtime, send, test_config};

fn idle_service() -> MockSearch {
    MockSearch::with_result(gitsecureops_search::SearchResult {
        query: "unused".into(),
        scope: SearchScope::User,
        total_results: 0,
        repositories_searched: 0,
        hits: Vec::new(),
        failed_repositories: Vec::new(),
        failed_organizations: Vec::new(),
    })
}

fn config_with_docs(enable_docs: bool) -> ApplicationConfig {
    ApplicationConfig {
        api: ApiConfig {
            enable_docs,
            ..ApiConfig::default()
        },
        ..test_config(GitHubConfig::default())
    }
}

#[test]
fn health_reports_healthy_with_correlation_id() {
    get_test_runtime().block_on(async {
        let app = app_with_service(idle_service(), config_with_docs(true));

        let response = send(app, get("/health", None)).await;

        assert_eq!(response.status, StatusCode::OK);
        let body = response.json();
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(
            body["correlation_id"].as_str(),
            response.header("x-correlation-id")
        );
    });
}

#[test]
fn garbage_correlation_id_is_replaced() {
    get_test_runtime().block_on(async {
        let app = app_with_service(idle_service(), config_with_docs(true));
        let request = Request::builder()
            .uri("/health")
            .header("x-correlation-id", "not a uuid")
            .body(Body::empty())
            .unwrap();

        let response = send(app, request).await;

        let echoed = response.header("x-correlation-id").unwrap();
        assert_ne!(echoed, "not a uuid");
        assert_eq!(echoed.len(), 36);
    });
}

#[test]
fn openapi_document_lists_search_endpoint() {
    get_test_runtime().block_on(async {
        let app = app_with_service(idle_service(), config_with_docs(true));

        let response = send(app, get(OPENAPI_PATH, None)).await;

        assert_eq!(response.status, StatusCode::OK);
        let document = response.json();
        let search = &document["paths"]["/search-code"];
        assert!(search.get("get").is_some());
        assert!(search.get("post").is_some());
        assert!(document["components"]["schemas"]["SearchCodeResponse"].is_object());
    });
}

#[test]
fn openapi_document_can_be_disabled() {
    get_test_runtime().block_on(async {
        let app = app_with_service(idle_service(), config_with_docs(false));

        let response = send(app, get(OPENAPI_PATH, None)).await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
    });
}

#[test]
fn production_state_builds_from_defaults() {
    let state = gitsecureops_api::bootstrap::initialize_app_state(ApplicationConfig::default());
    assert!(state.is_ok());
    let _router = create_router(state.unwrap());
}
