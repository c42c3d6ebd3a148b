//! Turn a [`SearchScope`] into a concrete repository list

use crate::error::SearchError;
use crate::ledger::CallLedger;
use crate::model::{RepoRef, SearchScope, dedup_repositories};
use gitsecureops_config::ResolverConfig;
use gitsecureops_github::{GitHubApi, GitHubError, GitHubResult, Repository};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Repositories to search plus the organizations that could not be listed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub repositories: Vec<RepoRef>,
    pub failed_organizations: Vec<String>,
}

/// Which listing endpoint to page through
#[derive(Debug, Clone, Copy)]
enum Listing<'a> {
    User,
    Organization(&'a str),
}

/// Why a page loop stopped early
enum PageLoopError {
    /// First-call credential rejection; fails the request
    Fatal(SearchError),
    /// The very first page failed; nothing was collected
    Empty(GitHubError),
}

/// Resolves scopes by paging the GitHub listing endpoints
pub struct Resolver {
    github: Arc<dyn GitHubApi>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(github: Arc<dyn GitHubApi>, config: ResolverConfig) -> Self {
        Self { github, config }
    }

    /// Resolve `scope` into a deduplicated repository list
    ///
    /// Organization failures are recorded in the resolution, not returned.
    /// `cancel` is checked before each organization.
    ///
    /// # Errors
    /// Returns `SearchError::UpstreamFatal` if the first upstream call is
    /// rejected for bad credentials, or `SearchError::Cancelled` once
    /// `cancel` fires between organizations
    #[tracing::instrument(skip(self, scope, ledger, cancel), fields(scope = scope.kind()))]
    pub async fn resolve(
        &self,
        scope: &SearchScope,
        ledger: &mut CallLedger,
        cancel: &CancellationToken,
    ) -> Result<Resolution, SearchError> {
        let mut resolution = Resolution::default();

        match scope {
            SearchScope::User => {
                match self
                    .paginate(Listing::User, self.config.max_user_repositories, ledger)
                    .await
                {
                    Ok(repos) => resolution.repositories = repos,
                    Err(PageLoopError::Fatal(error)) => return Err(error),
                    Err(PageLoopError::Empty(error)) => {
                        tracing::warn!(error = %error, "Listing user repositories failed");
                    }
                }
            }
            SearchScope::Org { org } => {
                self.resolve_organization(org, ledger, &mut resolution).await?;
            }
            SearchScope::Orgs { orgs } => {
                for (index, org) in orgs.iter().enumerate() {
                    if index > 0 {
                        tokio::select! {
                            () = tokio::time::sleep(self.config.inter_organization_delay()) => {}
                            () = cancel.cancelled() => {}
                        }
                    }
                    if cancel.is_cancelled() {
                        tracing::debug!(resolved_organizations = index, "Resolution cancelled");
                        return Err(SearchError::Cancelled);
                    }
                    self.resolve_organization(org, ledger, &mut resolution).await?;
                }
            }
            SearchScope::Repos { repos } => resolution.repositories.clone_from(repos),
        }

        resolution.repositories = dedup_repositories(resolution.repositories);

        tracing::debug!(
            repositories = resolution.repositories.len(),
            failed_organizations = resolution.failed_organizations.len(),
            "Scope resolved"
        );

        Ok(resolution)
    }

    async fn resolve_organization(
        &self,
        org: &str,
        ledger: &mut CallLedger,
        resolution: &mut Resolution,
    ) -> Result<(), SearchError> {
        match self
            .paginate(
                Listing::Organization(org),
                self.config.max_org_repositories,
                ledger,
            )
            .await
        {
            Ok(repos) => {
                resolution.repositories.extend(repos);
                Ok(())
            }
            Err(PageLoopError::Fatal(error)) => Err(error),
            Err(PageLoopError::Empty(source)) => {
                let error = SearchError::ScopeResolution {
                    organization: org.to_string(),
                    source,
                };
                tracing::warn!(organization = org, error = %error, "Skipping organization");
                resolution.failed_organizations.push(org.to_string());
                Ok(())
            }
        }
    }

    /// Page through a listing until a short page or `cap` repositories
    ///
    /// A failed page ends the loop; what was collected so far is kept.
    async fn paginate(
        &self,
        listing: Listing<'_>,
        cap: usize,
        ledger: &mut CallLedger,
    ) -> Result<Vec<RepoRef>, PageLoopError> {
        let page_size = self.config.page_size.max(1);
        let mut collected: Vec<RepoRef> = Vec::new();
        let mut page: u32 = 1;

        while collected.len() < cap {
            let first_call = ledger.record();
            let batch = match self.fetch_page(listing, page, page_size).await {
                Ok(batch) => batch,
                Err(error) => {
                    if let Some(fatal) = CallLedger::fatal(first_call, &error) {
                        return Err(PageLoopError::Fatal(fatal));
                    }
                    if page == 1 {
                        return Err(PageLoopError::Empty(error));
                    }
                    tracing::warn!(
                        ?listing,
                        page,
                        kept = collected.len(),
                        error = %error,
                        "Listing page failed; keeping what was collected"
                    );
                    break;
                }
            };

            let short_page = batch.len() < page_size;
            let room = cap.saturating_sub(collected.len());
            collected.extend(batch.iter().take(room).map(RepoRef::from));

            if short_page {
                break;
            }
            page = page.saturating_add(1);
        }

        Ok(collected)
    }

    async fn fetch_page(
        &self,
        listing: Listing<'_>,
        page: u32,
        per_page: usize,
    ) -> GitHubResult<Vec<Repository>> {
        match listing {
            Listing::User => self.github.list_user_repos(page, per_page).await,
            Listing::Organization(org) => self.github.list_org_repos(org, page, per_page).await,
        }
    }
}
