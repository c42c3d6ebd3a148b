//! Command-line arguments

use crate::format::OutputFormat;
use clap::{Args as ClapArgs, Parser, Subcommand};
use gitsecureops_search::{RepoRef, SearchError, SearchFilters, SearchRequest, SearchScope};
use std::path::PathBuf;

/// Search code across many GitHub repositories and organizations at once
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// GitHub token used for every upstream call
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Optional configuration file path (TOML or YAML)
    #[arg(long, short = 'c', env = "GITSECUREOPS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log directory path (defaults to OS-specific location)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Mirror log events to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a code search
    Search(SearchArgs),
    /// List the repositories a scope resolves to
    Repos(ReposArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SearchArgs {
    /// Search text, GitHub code search syntax
    pub query: String,

    /// Organization to search; repeat for several
    #[arg(long = "org", value_name = "ORG")]
    pub orgs: Vec<String>,

    /// Repository to search; repeat for several. Overrides --org
    #[arg(long = "repo", value_name = "OWNER/NAME")]
    pub repos: Vec<String>,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub extension: Option<String>,

    /// Cap on returned hits (the configured limit applies when omitted)
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Print progress per repository while searching
    #[arg(long)]
    pub stream: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReposArgs {
    /// Organization to list; repeat for several. Lists your own when omitted
    #[arg(long = "org", value_name = "ORG")]
    pub orgs: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Repositories win over organizations; no selector means the user's own
///
/// # Errors
/// Returns `SearchError::InvalidRequest` for a malformed repository name
/// or a list of blank organizations
pub fn build_scope(orgs: &[String], repos: &[String]) -> Result<SearchScope, SearchError> {
    if !repos.is_empty() {
        let repos = repos
            .iter()
            .map(|repo| RepoRef::parse(repo))
            .collect::<Result<Vec<_>, _>>()?;
        return SearchScope::repos(repos);
    }

    match orgs {
        [] => Ok(SearchScope::User),
        [org] => SearchScope::org(org),
        _ => SearchScope::orgs(orgs),
    }
}

impl SearchArgs {
    /// # Errors
    /// Returns `SearchError::InvalidRequest` when the scope is malformed
    pub fn to_request(&self) -> Result<SearchRequest, SearchError> {
        let scope = build_scope(&self.orgs, &self.repos)?;
        let mut request = SearchRequest::new(self.query.clone(), scope).with_filters(
            SearchFilters {
                language: self.language.clone(),
                extension: self.extension.clone(),
            },
        );
        request.max_results = self.max_results;
        Ok(request)
    }
}
