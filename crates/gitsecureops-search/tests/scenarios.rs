//! Full stack over HTTP: `GitHubClient` talking to a fake GitHub

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use gitsecureops_common::CorrelationId;
use gitsecureops_config::{ResolverConfig, SearchConfig};
use gitsecureops_github::{GitHubClient, build_http_client};
use gitsecureops_search::{
    CONTENT_UNAVAILABLE, RepoRef, Search, SearchError, SearchRequest, SearchScope, SearchService,
};
use gitsecureops_test_utils::{FakeGitHub, code_item_json, get_test_runtime};
use std::sync::Arc;

fn search_over(github: &FakeGitHub) -> Search {
    let config = github.config();
    let http = build_http_client(&config).unwrap();
    let client = GitHubClient::new(http, &config, "test-token");

    Search::new(
        Arc::new(client),
        ResolverConfig {
            inter_organization_delay_ms: 0,
            ..ResolverConfig::default()
        },
        SearchConfig {
            inter_repository_delay_ms: 0,
            ..SearchConfig::default()
        },
    )
}

#[test]
fn large_organization_is_listed_in_three_pages() {
    get_test_runtime().block_on(async {
        let github = FakeGitHub::start().await;
        github.mount_org_repos("acme", 250).await;
        github
            .mount_search(
                "acme/repo-0250",
                vec![code_item_json("acme/repo-0250", "deploy.sh", "d1", Some(9.0))],
            )
            .await;
        github
            .mount_file("acme/repo-0250", "deploy.sh", "#!/bin/sh\nexport SECRET=1\n")
            .await;
        github.mount_empty_search().await;

        let result = search_over(&github)
            .search(
                SearchRequest::new("SECRET", SearchScope::org("acme").unwrap()),
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        let listing = github.requests_to("/orgs/acme/repos").await;
        assert_eq!(listing.len(), 3);
        assert_eq!(github.requests_to("/search/code").await.len(), 250);

        assert_eq!(result.repositories_searched, 250);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].repository.full_name, "acme/repo-0250");
        assert_eq!(result.hits[0].matches[0].line_number, 2);
        assert!(result.failed_repositories.is_empty());
    });
}

#[test]
fn repository_search_over_http_merges_and_ranks() {
    get_test_runtime().block_on(async {
        let github = FakeGitHub::start().await;
        github
            .mount_search(
                "acme/api",
                vec![
                    code_item_json("acme/api", "src/auth.rs", "a1", Some(1.5)),
                    code_item_json("acme/api", "src/token.rs", "a2", Some(6.0)),
                ],
            )
            .await;
        github
            .mount_search(
                "beta/web",
                vec![code_item_json("beta/web", "config/app.yml", "b1", None)],
            )
            .await;
        github
            .mount_file("acme/api", "src/auth.rs", "fn check(token: &str) {}\n")
            .await;
        github
            .mount_file("acme/api", "src/token.rs", "// token rotation\n")
            .await;
        github.mount_file_failure("beta/web", "config/app.yml", 500).await;

        let scope = SearchScope::repos(vec![
            RepoRef::parse("acme/api").unwrap(),
            RepoRef::parse("beta/web").unwrap(),
        ])
        .unwrap();
        let result = search_over(&github)
            .search(SearchRequest::new("token", scope), &CorrelationId::new())
            .await
            .unwrap();

        assert!(github.requests_to("/orgs/acme/repos").await.is_empty());
        assert_eq!(result.total_results, 3);
        let paths: Vec<&str> = result.hits.iter().map(|hit| hit.file_path.as_str()).collect();
        assert_eq!(paths, vec!["src/token.rs", "src/auth.rs", "config/app.yml"]);
        assert_eq!(result.hits[2].matches[0].text, CONTENT_UNAVAILABLE);
        assert!(!result.is_partial());

        let search = &github.requests_to("/search/code").await[0];
        let auth = search.headers.get("authorization").unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer test-token");
    });
}

#[test]
fn bad_credentials_fail_the_whole_search() {
    get_test_runtime().block_on(async {
        let github = FakeGitHub::start().await;
        github.mount_unauthorized().await;

        let error = search_over(&github)
            .search(
                SearchRequest::new("TODO", SearchScope::User),
                &CorrelationId::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, SearchError::UpstreamFatal { .. }));
        assert_eq!(github.received_requests().await.len(), 1);
    });
}
