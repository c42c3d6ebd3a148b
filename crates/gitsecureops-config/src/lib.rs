//! Centralized configuration management for GitSecureOps
//!
//! This crate provides a unified configuration system for the search
//! aggregator, the HTTP API and the command-line front-end, with type-safe,
//! validated configuration loaded from multiple sources.
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Configuration file (TOML or YAML) when one is given
//! 3. Environment variable overrides
//! 4. Runtime validation

pub mod error;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use source::{
    ConfigurationLoader, ConfigurationSource, EnvironmentSource, TomlFileSource, YamlFileSource,
    file_source,
};

use std::time::Duration;

// =============================================================================
// SAFE DEFAULTS - Work for any environment (dev, staging, prod, test)
// =============================================================================

// Upstream GitHub API
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_USER_AGENT: &str = "gitsecureops";
const DEFAULT_GITHUB_LIST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_GITHUB_SEARCH_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_GITHUB_CONTENT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_GITHUB_CONNECT_TIMEOUT_SECONDS: u64 = 10;

// Repository resolution
const DEFAULT_RESOLVER_PAGE_SIZE: usize = 100; // GitHub's per_page ceiling
const DEFAULT_MAX_USER_REPOSITORIES: usize = 100;
const DEFAULT_MAX_ORG_REPOSITORIES: usize = 1000; // Org audits need completeness
const DEFAULT_INTER_ORGANIZATION_DELAY_MS: u64 = 1000;

// Search execution
const DEFAULT_RESULTS_PER_REPOSITORY: usize = 10;
const DEFAULT_ORG_RESULTS_PER_REPOSITORY: usize = 30;
const DEFAULT_INTER_REPOSITORY_DELAY_MS: u64 = 200;
const DEFAULT_CONTEXT_LINES: usize = 3;
const DEFAULT_MAX_SNIPPETS_PER_HIT: usize = 5;
const DEFAULT_MAX_RESULTS: usize = 100;
const DEFAULT_MAX_RESULTS_LIMIT: usize = 1000;
const DEFAULT_RATE_LIMIT_RESERVE: u32 = 5;
const DEFAULT_MAX_RATE_LIMIT_WAIT_SECONDS: u64 = 60;
const DEFAULT_STREAM_CHANNEL_CAPACITY: usize = 32;

// API Server Configuration
const DEFAULT_API_HOST: &str = "127.0.0.1"; // Localhost only for security
const DEFAULT_API_PORT: u16 = 7071;
const DEFAULT_API_TIMEOUT_SECONDS: u64 = 300; // Whole-org searches are slow
const DEFAULT_API_ENABLE_DOCS: bool = true;

// Telemetry Configuration
const DEFAULT_TRACING_LEVEL: &str = "info";
const DEFAULT_JSON_LOGS: bool = false;
const DEFAULT_TELEMETRY_SERVICE_NAME: &str = "gitsecureops";
const DEFAULT_TELEMETRY_ENVIRONMENT: &str = "development";

/// Core configuration for the entire GitSecureOps application
///
/// All settings have safe defaults and can be overridden via environment variables.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Upstream GitHub API client configuration
    pub github: GitHubConfig,

    /// Repository scope resolution configuration
    pub resolver: ResolverConfig,

    /// Search execution, pacing and ranking configuration
    pub search: SearchConfig,

    /// API server configuration
    pub api: ApiConfig,

    /// Logging configuration
    pub telemetry: TelemetryConfig,
}

/// Upstream GitHub REST/Search API client configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Base URL of the REST API (GitHub Enterprise uses `https://host/api/v3`)
    pub api_url: String,

    /// `User-Agent` header; GitHub rejects requests without one
    pub user_agent: String,

    /// Timeout for repository listing calls
    pub list_timeout_seconds: u64,

    /// Timeout for code search calls
    pub search_timeout_seconds: u64,

    /// Timeout for raw file content calls
    pub content_timeout_seconds: u64,

    /// TCP connect timeout shared by all calls
    pub connect_timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            user_agent: DEFAULT_GITHUB_USER_AGENT.to_string(),
            list_timeout_seconds: DEFAULT_GITHUB_LIST_TIMEOUT_SECONDS,
            search_timeout_seconds: DEFAULT_GITHUB_SEARCH_TIMEOUT_SECONDS,
            content_timeout_seconds: DEFAULT_GITHUB_CONTENT_TIMEOUT_SECONDS,
            connect_timeout_seconds: DEFAULT_GITHUB_CONNECT_TIMEOUT_SECONDS,
        }
    }
}

impl GitHubConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let api_url = std::env::var("GITSECUREOPS_GITHUB_API_URL")
            .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string());

        let user_agent = std::env::var("GITSECUREOPS_GITHUB_USER_AGENT")
            .unwrap_or_else(|_| DEFAULT_GITHUB_USER_AGENT.to_string());

        let list_timeout_seconds = std::env::var("GITSECUREOPS_GITHUB_LIST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_GITHUB_LIST_TIMEOUT_SECONDS);

        let search_timeout_seconds = std::env::var("GITSECUREOPS_GITHUB_SEARCH_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_GITHUB_SEARCH_TIMEOUT_SECONDS);

        let content_timeout_seconds =
            std::env::var("GITSECUREOPS_GITHUB_CONTENT_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_GITHUB_CONTENT_TIMEOUT_SECONDS);

        let connect_timeout_seconds =
            std::env::var("GITSECUREOPS_GITHUB_CONNECT_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_GITHUB_CONNECT_TIMEOUT_SECONDS);

        Self {
            api_url,
            user_agent,
            list_timeout_seconds,
            search_timeout_seconds,
            content_timeout_seconds,
            connect_timeout_seconds,
        }
    }

    pub const fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_seconds)
    }

    pub const fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_seconds)
    }

    pub const fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_seconds)
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl validation::Validate for GitHubConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_url(&self.api_url, "github.api_url")?;
        validation::validate_non_empty(&self.user_agent, "github.user_agent")?;
        validation::validate_range(self.list_timeout_seconds, 1, 600, "github.list_timeout_seconds")?;
        validation::validate_range(
            self.search_timeout_seconds,
            1,
            600,
            "github.search_timeout_seconds",
        )?;
        validation::validate_range(
            self.content_timeout_seconds,
            1,
            600,
            "github.content_timeout_seconds",
        )?;
        validation::validate_range(
            self.connect_timeout_seconds,
            1,
            120,
            "github.connect_timeout_seconds",
        )?;
        Ok(())
    }
}

/// Repository scope resolution configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Repositories requested per listing page (GitHub allows at most 100)
    pub page_size: usize,

    /// Cap for the authenticated user's own repositories
    pub max_user_repositories: usize,

    /// Cap per organization; deliberately larger than the user cap
    pub max_org_repositories: usize,

    /// Pause between organizations when resolving a multi-org scope
    pub inter_organization_delay_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_RESOLVER_PAGE_SIZE,
            max_user_repositories: DEFAULT_MAX_USER_REPOSITORIES,
            max_org_repositories: DEFAULT_MAX_ORG_REPOSITORIES,
            inter_organization_delay_ms: DEFAULT_INTER_ORGANIZATION_DELAY_MS,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let page_size = std::env::var("GITSECUREOPS_RESOLVER_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RESOLVER_PAGE_SIZE);

        let max_user_repositories = std::env::var("GITSECUREOPS_RESOLVER_MAX_USER_REPOSITORIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_USER_REPOSITORIES);

        let max_org_repositories = std::env::var("GITSECUREOPS_RESOLVER_MAX_ORG_REPOSITORIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_ORG_REPOSITORIES);

        let inter_organization_delay_ms =
            std::env::var("GITSECUREOPS_RESOLVER_INTER_ORGANIZATION_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_INTER_ORGANIZATION_DELAY_MS);

        Self {
            page_size,
            max_user_repositories,
            max_org_repositories,
            inter_organization_delay_ms,
        }
    }

    pub const fn inter_organization_delay(&self) -> Duration {
        Duration::from_millis(self.inter_organization_delay_ms)
    }
}

impl validation::Validate for ResolverConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_count(self.page_size, 1, 100, "resolver.page_size")?;
        validation::validate_count(
            self.max_user_repositories,
            1,
            100_000,
            "resolver.max_user_repositories",
        )?;
        validation::validate_count(
            self.max_org_repositories,
            1,
            100_000,
            "resolver.max_org_repositories",
        )?;
        validation::validate_range(
            self.inter_organization_delay_ms,
            0,
            60_000,
            "resolver.inter_organization_delay_ms",
        )?;
        Ok(())
    }
}

/// Search execution, pacing and ranking configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upstream results requested per repository for user/explicit scopes
    pub results_per_repository: usize,

    /// Upstream results requested per repository for organization scopes
    pub org_results_per_repository: usize,

    /// Minimum spacing between per-repository search calls
    pub inter_repository_delay_ms: u64,

    /// Lines of context captured before and after each matching line
    pub context_lines: usize,

    /// Snippets kept per hit
    pub max_snippets_per_hit: usize,

    /// Final result cap when the caller does not ask for one
    pub default_max_results: usize,

    /// Upper bound on a caller-provided result cap
    pub max_results_limit: usize,

    /// Wait for the rate-limit window to reset once remaining calls drop to this
    pub rate_limit_reserve: u32,

    /// Longest single wait for a rate-limit reset
    pub max_rate_limit_wait_seconds: u64,

    /// Buffered progress events before the executor waits on a slow reader
    pub stream_channel_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            results_per_repository: DEFAULT_RESULTS_PER_REPOSITORY,
            org_results_per_repository: DEFAULT_ORG_RESULTS_PER_REPOSITORY,
            inter_repository_delay_ms: DEFAULT_INTER_REPOSITORY_DELAY_MS,
            context_lines: DEFAULT_CONTEXT_LINES,
            max_snippets_per_hit: DEFAULT_MAX_SNIPPETS_PER_HIT,
            default_max_results: DEFAULT_MAX_RESULTS,
            max_results_limit: DEFAULT_MAX_RESULTS_LIMIT,
            rate_limit_reserve: DEFAULT_RATE_LIMIT_RESERVE,
            max_rate_limit_wait_seconds: DEFAULT_MAX_RATE_LIMIT_WAIT_SECONDS,
            stream_channel_capacity: DEFAULT_STREAM_CHANNEL_CAPACITY,
        }
    }
}

impl SearchConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let results_per_repository = std::env::var("GITSECUREOPS_SEARCH_RESULTS_PER_REPOSITORY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RESULTS_PER_REPOSITORY);

        let org_results_per_repository =
            std::env::var("GITSECUREOPS_SEARCH_ORG_RESULTS_PER_REPOSITORY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ORG_RESULTS_PER_REPOSITORY);

        let inter_repository_delay_ms =
            std::env::var("GITSECUREOPS_SEARCH_INTER_REPOSITORY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_INTER_REPOSITORY_DELAY_MS);

        let context_lines = std::env::var("GITSECUREOPS_SEARCH_CONTEXT_LINES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONTEXT_LINES);

        let max_snippets_per_hit = std::env::var("GITSECUREOPS_SEARCH_MAX_SNIPPETS_PER_HIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_SNIPPETS_PER_HIT);

        let default_max_results = std::env::var("GITSECUREOPS_SEARCH_DEFAULT_MAX_RESULTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let max_results_limit = std::env::var("GITSECUREOPS_SEARCH_MAX_RESULTS_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RESULTS_LIMIT);

        let rate_limit_reserve = std::env::var("GITSECUREOPS_SEARCH_RATE_LIMIT_RESERVE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_RESERVE);

        let max_rate_limit_wait_seconds =
            std::env::var("GITSECUREOPS_SEARCH_MAX_RATE_LIMIT_WAIT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_RATE_LIMIT_WAIT_SECONDS);

        let stream_channel_capacity = std::env::var("GITSECUREOPS_SEARCH_STREAM_CHANNEL_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_STREAM_CHANNEL_CAPACITY);

        Self {
            results_per_repository,
            org_results_per_repository,
            inter_repository_delay_ms,
            context_lines,
            max_snippets_per_hit,
            default_max_results,
            max_results_limit,
            rate_limit_reserve,
            max_rate_limit_wait_seconds,
            stream_channel_capacity,
        }
    }

    pub const fn inter_repository_delay(&self) -> Duration {
        Duration::from_millis(self.inter_repository_delay_ms)
    }

    pub const fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.max_rate_limit_wait_seconds)
    }

    /// Cap a caller-provided result limit at `max_results_limit`
    ///
    /// A request is only ever lowered, never raised.
    pub fn effective_max_results(&self, requested: Option<usize>) -> usize {
        let limit = self.max_results_limit.max(1);
        requested.map_or_else(
            || self.default_max_results.clamp(1, limit),
            |requested| requested.min(limit),
        )
    }
}

impl validation::Validate for SearchConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_count(
            self.results_per_repository,
            1,
            100,
            "search.results_per_repository",
        )?;
        validation::validate_count(
            self.org_results_per_repository,
            1,
            100,
            "search.org_results_per_repository",
        )?;
        validation::validate_range(
            self.inter_repository_delay_ms,
            0,
            60_000,
            "search.inter_repository_delay_ms",
        )?;
        validation::validate_count(self.context_lines, 0, 50, "search.context_lines")?;
        validation::validate_count(
            self.max_snippets_per_hit,
            1,
            100,
            "search.max_snippets_per_hit",
        )?;
        validation::validate_count(
            self.stream_channel_capacity,
            1,
            10_000,
            "search.stream_channel_capacity",
        )?;

        if self.default_max_results == 0 || self.default_max_results > self.max_results_limit {
            return Err(ConfigError::Generic {
                message: format!(
                    "search.default_max_results ({}) must be between 1 and search.max_results_limit ({})",
                    self.default_max_results, self.max_results_limit
                ),
            });
        }

        Ok(())
    }
}

/// API server configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Request timeout in seconds (non-streaming responses only)
    pub timeout_seconds: u64,

    /// Serve the OpenAPI document
    pub enable_docs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.to_string(),
            port: DEFAULT_API_PORT,
            timeout_seconds: DEFAULT_API_TIMEOUT_SECONDS,
            enable_docs: DEFAULT_API_ENABLE_DOCS,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let host = std::env::var("GITSECUREOPS_API_HOST")
            .unwrap_or_else(|_| DEFAULT_API_HOST.to_string());

        let port = std::env::var("GITSECUREOPS_API_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_PORT);

        let timeout_seconds = std::env::var("GITSECUREOPS_API_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECONDS);

        let enable_docs = std::env::var("GITSECUREOPS_API_ENABLE_DOCS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_ENABLE_DOCS);

        Self {
            host,
            port,
            timeout_seconds,
            enable_docs,
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl validation::Validate for ApiConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.host, "api.host")?;
        validation::validate_port(self.port)?;
        validation::validate_range(self.timeout_seconds, 1, 3600, "api.timeout_seconds")?;
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Tracing level (trace, debug, info, warn, error)
    pub tracing_level: String,

    /// Emit JSON log lines instead of human readable ones
    pub json_logs: bool,

    /// Service name attached to startup logs
    pub service_name: String,

    /// Environment label attached to startup logs
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            tracing_level: DEFAULT_TRACING_LEVEL.to_string(),
            json_logs: DEFAULT_JSON_LOGS,
            service_name: DEFAULT_TELEMETRY_SERVICE_NAME.to_string(),
            environment: DEFAULT_TELEMETRY_ENVIRONMENT.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let tracing_level = std::env::var("GITSECUREOPS_TELEMETRY_TRACING_LEVEL")
            .unwrap_or_else(|_| DEFAULT_TRACING_LEVEL.to_string());

        let json_logs = std::env::var("GITSECUREOPS_TELEMETRY_JSON_LOGS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_JSON_LOGS);

        let service_name = std::env::var("GITSECUREOPS_TELEMETRY_SERVICE_NAME")
            .unwrap_or_else(|_| DEFAULT_TELEMETRY_SERVICE_NAME.to_string());

        let environment = std::env::var("GITSECUREOPS_TELEMETRY_ENVIRONMENT")
            .unwrap_or_else(|_| DEFAULT_TELEMETRY_ENVIRONMENT.to_string());

        Self {
            tracing_level,
            json_logs,
            service_name,
            environment,
        }
    }
}

impl validation::Validate for TelemetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.service_name, "telemetry.service_name")?;
        validation::validate_non_empty(&self.environment, "telemetry.environment")?;

        match self.tracing_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Generic {
                message: format!("Invalid tracing level: {}", self.tracing_level),
            }),
        }
    }
}

impl ApplicationConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self {
            github: GitHubConfig::from_env(),
            resolver: ResolverConfig::from_env(),
            search: SearchConfig::from_env(),
            api: ApiConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }
}

impl validation::Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.github.validate()?;
        self.resolver.validate()?;
        self.search.validate()?;
        self.api.validate()?;
        self.telemetry.validate()?;

        // The org cap is the completeness escape hatch; it may not be smaller
        // than what a plain user listing is allowed to return.
        if self.resolver.max_org_repositories < self.resolver.max_user_repositories {
            return Err(ConfigError::Generic {
                message: format!(
                    "resolver.max_org_repositories ({}) must not be below resolver.max_user_repositories ({})",
                    self.resolver.max_org_repositories, self.resolver.max_user_repositories
                ),
            });
        }

        Ok(())
    }
}
