//! `/search-code` in streaming mode

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]


use axum::http::StatusCode;
use gitsecureops_config::GitHubConfig;
use gitsecureops_github::GitHubError;
use gitsecureops_search::test_mocks::MockSearch;
use gitsecureops_search::{ProgressEvent, SearchError, SearchEvent, SearchResult, SearchScope};
use gitsecureops_test_utils::{FakeGitHub, code_item_json};
use serde_json::{Value, json};
use test_utils::{
    TOKEN, app_for, app_with_service, get, get_test_runtime, post_json, send, test_config,
};

fn parse_frames(payloads: &[String]) -> Vec<Value> {
    let (done, events) = payloads.split_last().expect("stream produced no frames");
    assert_eq!(done, "[DONE]");
    events
        .iter()
        .map(|payload| serde_json::from_str(payload).unwrap())
        .collect()
}

#[test]
fn stream_emits_progress_then_complete_then_done() {
    get_test_runtime().block_on(async {
        let github = FakeGitHub::start().await;
        github
            .mount_search(
                "acme/api",
                vec![code_item_json("acme/api", ".env.example", "a1", Some(3.0))],
            )
            .await;
        github.mount_search("acme/empty", Vec::new()).await;
        github
            .mount_search(
                "acme/web",
                vec![
                    code_item_json("acme/web", "config.js", "w1", Some(6.0)),
                    code_item_json("acme/web", "deploy.yml", "w2", Some(4.0)),
                ],
            )
            .await;
        github
            .mount_file("acme/api", ".env.example", "API_KEY=changeme\n")
            .await;
        github
            .mount_file("acme/web", "config.js", "export const API_KEY = '';\n")
            .await;
        github
            .mount_file("acme/web", "deploy.yml", "env:\n  API_KEY: x\n")
            .await;

        let response = send(
            app_for(&github),
            post_json(
                &json!({
                    "q": "API_KEY",
                    "repositories": ["acme/api", "acme/empty", "acme/web"],
                    "stream": true
                }),
                Some(TOKEN),
            ),
        )
        .await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(
            response
                .header("content-type")
                .unwrap()
                .starts_with("text/event-stream")
        );

        let frames = parse_frames(&response.sse_payloads());
        let types: Vec<&str> = frames
            .iter()
            .map(|frame| frame["type"].as_str().unwrap())
            .collect();
        // acme/empty produced nothing, so it has no progress frame
        assert_eq!(types, vec!["progress", "progress", "complete"]);

        assert_eq!(frames[0]["repository"], json!("acme/api"));
        assert_eq!(frames[0]["totalHitsSoFar"], json!(1));
        assert_eq!(frames[1]["repository"], json!("acme/web"));
        assert_eq!(frames[1]["newHits"].as_array().unwrap().len(), 2);
        assert_eq!(frames[1]["totalHitsSoFar"], json!(3));
        assert_eq!(frames[1]["percent"], json!(100));

        let complete = &frames[2];
        assert_eq!(complete["totalResults"], json!(3));
        assert_eq!(complete["repositoriesSearched"], json!(3));
        assert_eq!(complete["hits"][0]["filePath"], json!("config.js"));
    });
}

#[test]
fn failed_stream_ends_with_error_frame() {
    get_test_runtime().block_on(async {
        let service = MockSearch::with_error(SearchError::UpstreamFatal {
            source: GitHubError::Unauthorized {
                endpoint: "/search/code".into(),
            },
        });
        let app = app_with_service(service, test_config(GitHubConfig::default()));

        let response = send(
            app,
            get("/search-code?q=TODO&org=acme&stream=true", Some(TOKEN)),
        )
        .await;

        assert_eq!(response.status, StatusCode::OK);
        let frames = parse_frames(&response.sse_payloads());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], json!("error"));
        assert_eq!(
            frames[0]["message"],
            json!("GitHub rejected the supplied credentials")
        );
    });
}

#[test]
fn scripted_progress_is_forwarded_in_order() {
    get_test_runtime().block_on(async {
        let result = SearchResult {
            query: "TODO".into(),
            scope: SearchScope::org("acme").unwrap(),
            total_results: 0,
            repositories_searched: 1,
            hits: Vec::new(),
            failed_repositories: Vec::new(),
            failed_organizations: Vec::new(),
        };
        let service = MockSearch::with_result(result).with_progress(vec![SearchEvent::Progress(
            ProgressEvent::new("acme/api", Vec::new(), 0, 1, 1),
        )]);

        let response = send(
            app_with_service(service.clone(), test_config(GitHubConfig::default())),
            post_json(&json!({ "q": "TODO", "org": "acme", "stream": true }), Some(TOKEN)),
        )
        .await;

        let frames = parse_frames(&response.sse_payloads());
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["type"], json!("progress"));
        assert_eq!(frames[0]["repository"], json!("acme/api"));
        assert_eq!(frames[1]["type"], json!("complete"));
        assert_eq!(frames[1]["repositoriesSearched"], json!(1));
        assert_eq!(service.requests()[0].scope, SearchScope::org("acme").unwrap());
    });
}

#[test]
fn invalid_streaming_request_is_rejected_as_json() {
    get_test_runtime().block_on(async {
        let github = FakeGitHub::start().await;

        let response = send(
            app_for(&github),
            post_json(&json!({ "q": "", "stream": true }), Some(TOKEN)),
        )
        .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(
            response
                .header("content-type")
                .unwrap()
                .starts_with("application/json")
        );
        assert!(github.received_requests().await.is_empty());
    });
}
