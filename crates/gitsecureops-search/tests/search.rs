//! End-to-end search behaviour against the in-memory GitHub

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use gitsecureops_common::CorrelationId;
use gitsecureops_config::{ResolverConfig, SearchConfig};
use gitsecureops_github::mock::{FIXTURE_COMMIT, code_item, repositories};
use gitsecureops_github::{GitHubError, MockCall, MockGitHub};
use gitsecureops_search::{
    CONTENT_UNAVAILABLE, RepoRef, Search, SearchError, SearchEvent, SearchFilters, SearchRequest,
    SearchScope, SearchService,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const README: &str = "# widgets\n\nTODO: write docs\nmore text\n";

fn search_config() -> SearchConfig {
    SearchConfig {
        inter_repository_delay_ms: 0,
        ..SearchConfig::default()
    }
}

fn service(mock: &MockGitHub) -> Search {
    Search::new(
        Arc::new(mock.clone()),
        ResolverConfig {
            inter_organization_delay_ms: 0,
            ..ResolverConfig::default()
        },
        search_config(),
    )
}

/// Three acme repositories; svc-0002 has no hits
fn acme_fixture() -> MockGitHub {
    MockGitHub::new()
        .with_org_repos("acme", repositories("acme", "svc", 3))
        .with_search_items(
            "acme/svc-0001",
            vec![
                code_item("acme/svc-0001", "README.md", "a1", Some(2.0)),
                code_item("acme/svc-0001", "src/lib.rs", "a2", Some(7.5)),
            ],
        )
        .with_search_items(
            "acme/svc-0003",
            vec![
                code_item("acme/svc-0003", "README.md", "c1", None),
                code_item("acme/svc-0003", "main.go", "c2", Some(4.0)),
            ],
        )
        .with_file("acme/svc-0001", "README.md", README)
        .with_file("acme/svc-0001", "src/lib.rs", "// TODO remove\nfn f() {}\n")
        .with_file("acme/svc-0003", "README.md", README)
        .with_file("acme/svc-0003", "main.go", "package main // todo\n")
}

fn org_request(query: &str) -> SearchRequest {
    SearchRequest::new(query, SearchScope::org("acme").unwrap())
}

async fn collect(mut receiver: tokio::sync::mpsc::Receiver<SearchEvent>) -> Vec<SearchEvent> {
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn file_content_is_read_at_the_matching_commit() {
    let mock = acme_fixture();

    let result = service(&mock)
        .search(org_request("TODO"), &CorrelationId::new())
        .await
        .unwrap();

    let content_refs: Vec<Option<String>> = mock
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            MockCall::GetFileContent { git_ref, .. } => Some(git_ref),
            _ => None,
        })
        .collect();
    assert_eq!(content_refs.len(), 4);
    assert!(
        content_refs
            .iter()
            .all(|git_ref| git_ref.as_deref() == Some(FIXTURE_COMMIT))
    );
    assert!(
        result
            .hits
            .iter()
            .flat_map(|hit| &hit.matches)
            .all(|snippet| snippet.text != CONTENT_UNAVAILABLE)
    );
}

#[tokio::test]
async fn explicit_repository_scope_issues_one_search_and_no_listing() {
    let mock = MockGitHub::new()
        .with_search_items(
            "acme/widgets",
            vec![code_item("acme/widgets", "README.md", "sha1", Some(3.0))],
        )
        .with_file("acme/widgets", "README.md", README);
    let request = SearchRequest::new(
        "TODO",
        SearchScope::repos(vec![RepoRef::new("acme", "widgets")]).unwrap(),
    );

    let result = service(&mock)
        .search(request, &CorrelationId::new())
        .await
        .unwrap();

    assert_eq!(mock.search_call_count(), 1);
    assert_eq!(mock.listing_call_count(), 0);
    assert_eq!(result.repositories_searched, 1);
    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].matches[0].line_number, 3);
    match &mock.calls()[0] {
        MockCall::SearchCode { query, per_page } => {
            assert_eq!(query, "TODO repo:acme/widgets");
            assert_eq!(*per_page, 10);
        }
        other => panic!("unexpected first call {other:?}"),
    }
}

#[tokio::test]
async fn failing_repository_still_counts_as_searched() {
    let mock = acme_fixture().with_search_failure("acme/svc-0002");

    let result = service(&mock)
        .search(org_request("TODO"), &CorrelationId::new())
        .await
        .unwrap();

    assert_eq!(result.repositories_searched, 3);
    assert_eq!(result.total_results, 4);
    assert_eq!(result.failed_repositories, vec!["acme/svc-0002".to_string()]);
    assert!(result.is_partial());
    let repos: Vec<&str> = result
        .hits
        .iter()
        .map(|hit| hit.repository.full_name.as_str())
        .collect();
    assert!(repos.contains(&"acme/svc-0001"));
    assert!(repos.contains(&"acme/svc-0003"));
}

#[tokio::test]
async fn content_failure_keeps_hit_with_placeholder() {
    let mock = acme_fixture().with_content_failure("acme/svc-0001", "src/lib.rs");

    let result = service(&mock)
        .search(org_request("TODO"), &CorrelationId::new())
        .await
        .unwrap();

    let hit = result
        .hits
        .iter()
        .find(|hit| hit.file_path == "src/lib.rs")
        .expect("hit must not be dropped");
    assert_eq!(hit.matches.len(), 1);
    assert_eq!(hit.matches[0].text, CONTENT_UNAVAILABLE);
    assert!(!result.is_partial());
}

#[tokio::test]
async fn hits_are_ranked_and_truncated() {
    let mock = acme_fixture();

    let result = service(&mock)
        .search(org_request("TODO").with_max_results(3), &CorrelationId::new())
        .await
        .unwrap();

    assert_eq!(result.total_results, 4);
    assert_eq!(result.hits.len(), 3);
    assert!(result.hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
    assert_eq!(result.hits[0].file_path, "src/lib.rs");
    // Missing upstream score ranks as 1.0
    assert!(result.hits.iter().all(|hit| hit.score >= 1.0));
}

#[tokio::test]
async fn organization_scope_requests_more_results_per_repository() {
    let mock = acme_fixture();

    service(&mock)
        .search(org_request("TODO"), &CorrelationId::new())
        .await
        .unwrap();

    let per_page: Vec<usize> = mock
        .calls()
        .iter()
        .filter_map(|call| match call {
            MockCall::SearchCode { per_page, .. } => Some(*per_page),
            _ => None,
        })
        .collect();
    assert_eq!(per_page, vec![30, 30, 30]);
}

#[tokio::test]
async fn filters_are_forwarded_in_the_query() {
    let mock = acme_fixture();
    let request = org_request("TODO").with_filters(SearchFilters {
        language: Some("go".into()),
        extension: Some(".go".into()),
    });

    service(&mock)
        .search(request, &CorrelationId::new())
        .await
        .unwrap();

    assert!(mock.calls().iter().any(|call| matches!(
        call,
        MockCall::SearchCode { query, .. }
            if query == "TODO language:go extension:go repo:acme/svc-0001"
    )));
}

#[tokio::test]
async fn repeated_searches_are_identical() {
    let mock = acme_fixture();
    let search = service(&mock);

    let first = search
        .search(org_request("TODO"), &CorrelationId::new())
        .await
        .unwrap();
    let second = search
        .search(org_request("TODO"), &CorrelationId::new())
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn empty_scope_completes_without_error() {
    let mock = MockGitHub::new().with_org_repos("acme", Vec::new());

    let result = service(&mock)
        .search(org_request("TODO"), &CorrelationId::new())
        .await
        .unwrap();

    assert_eq!(result.repositories_searched, 0);
    assert!(result.hits.is_empty());
    assert_eq!(mock.search_call_count(), 0);
}

#[tokio::test]
async fn blank_query_fails_before_any_upstream_call() {
    let mock = acme_fixture();

    let error = service(&mock)
        .search(org_request("  "), &CorrelationId::new())
        .await
        .unwrap_err();

    assert!(error.is_client_error());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn zero_result_cap_fails_before_any_upstream_call() {
    let mock = acme_fixture();

    let error = service(&mock)
        .search(org_request("TODO").with_max_results(0), &CorrelationId::new())
        .await
        .unwrap_err();

    assert!(error.is_client_error());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn requested_cap_is_never_raised() {
    let mock = acme_fixture();

    let result = service(&mock)
        .search(org_request("TODO").with_max_results(1), &CorrelationId::new())
        .await
        .unwrap();

    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.total_results, 4);
}

#[tokio::test]
async fn rejected_credentials_on_first_search_fail_the_request() {
    let mock = MockGitHub::new().with_unauthorized();
    let request = SearchRequest::new(
        "TODO",
        SearchScope::repos(vec![RepoRef::new("acme", "api"), RepoRef::new("acme", "web")])
            .unwrap(),
    );

    let error = service(&mock)
        .search(request, &CorrelationId::new())
        .await
        .unwrap_err();

    assert!(matches!(error, SearchError::UpstreamFatal { .. }));
    assert_eq!(mock.search_call_count(), 1);
}

#[tokio::test]
async fn rejected_credentials_after_first_call_degrade_to_failed_repository() {
    let mock = acme_fixture().with_search_error(
        "acme/svc-0003",
        GitHubError::Unauthorized {
            endpoint: "/search/code".into(),
        },
    );

    let result = service(&mock)
        .search(org_request("TODO"), &CorrelationId::new())
        .await
        .unwrap();

    assert_eq!(result.failed_repositories, vec!["acme/svc-0003".to_string()]);
    assert_eq!(result.repositories_searched, 3);
}

#[tokio::test]
async fn stream_totals_never_decrease_and_end_with_complete() {
    let mock = acme_fixture();

    let receiver = service(&mock)
        .search_stream(
            org_request("TODO").with_max_results(1),
            CancellationToken::new(),
            &CorrelationId::new(),
        )
        .await
        .unwrap();
    let events = collect(receiver).await;

    // svc-0002 produced nothing, so only two progress events
    assert_eq!(events.len(), 3);
    let totals: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            SearchEvent::Progress(progress) => Some(progress.total_hits_so_far),
            _ => None,
        })
        .collect();
    assert_eq!(totals, vec![2, 4]);

    match &events[1] {
        SearchEvent::Progress(progress) => {
            assert_eq!(progress.repository, "acme/svc-0003");
            assert_eq!(progress.new_hits.len(), 2);
            assert_eq!(progress.current, 3);
            assert_eq!(progress.percent, 100);
        }
        other => panic!("expected progress, got {other:?}"),
    }

    match events.last().unwrap() {
        SearchEvent::Complete(result) => {
            assert!(result.total_results >= *totals.last().unwrap());
            assert_eq!(result.hits.len(), 1);
        }
        other => panic!("expected complete, got {other:?}"),
    }
    assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
}

#[tokio::test]
async fn cancelled_stream_stops_dispatching_searches() {
    let mock = acme_fixture();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let receiver = service(&mock)
        .search_stream(org_request("TODO"), cancel, &CorrelationId::new())
        .await
        .unwrap();
    let events = collect(receiver).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], SearchEvent::Failed { message } if message == "Search cancelled"));
    assert_eq!(mock.search_call_count(), 0);
}

#[tokio::test]
async fn cancelled_stream_stops_resolving_organizations() {
    let mock = acme_fixture().with_org_repos("beta", repositories("beta", "lib", 2));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let receiver = service(&mock)
        .search_stream(
            SearchRequest::new("TODO", SearchScope::orgs(["acme", "beta"]).unwrap()),
            cancel,
            &CorrelationId::new(),
        )
        .await
        .unwrap();
    let events = collect(receiver).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], SearchEvent::Failed { message } if message == "Search cancelled"));
    assert_eq!(mock.listing_call_count(), 0);
    assert_eq!(mock.search_call_count(), 0);
}

#[tokio::test]
async fn dropped_receiver_stops_the_search() {
    let many = repositories("acme", "svc", 40);
    let mut mock = MockGitHub::new().with_org_repos("acme", many.clone());
    for repo in &many {
        mock = mock.with_search_items(
            &repo.full_name,
            vec![code_item(&repo.full_name, "a.txt", "s", None)],
        );
    }
    let slow = Search::new(
        Arc::new(mock.clone()),
        ResolverConfig::default(),
        SearchConfig {
            inter_repository_delay_ms: 20,
            ..SearchConfig::default()
        },
    );

    let mut receiver = slow
        .search_stream(org_request("x"), CancellationToken::new(), &CorrelationId::new())
        .await
        .unwrap();
    let first = receiver.recv().await;
    assert!(matches!(first, Some(SearchEvent::Progress(_))));
    drop(receiver);

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let searched = mock.search_call_count();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    assert!(searched < 40);
    assert_eq!(mock.search_call_count(), searched);
}
