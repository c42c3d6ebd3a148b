//! Application bootstrap and service initialization
//!
//! Separates configuration loading and state construction from the server
//! entry point so tests can build the same state.

use crate::state::{AppState, GitHubSearchFactory};
use gitsecureops_config::{ApplicationConfig, ConfigurationLoader, EnvironmentSource, file_source};
use gitsecureops_github::build_http_client;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Bootstrap result type
pub type BootstrapResult<T> = anyhow::Result<T>;

/// Environment variable naming an optional TOML or YAML configuration file
pub const CONFIG_FILE_ENV: &str = "GITSECUREOPS_CONFIG";

/// Load configuration: defaults, then the optional file, then environment
///
/// # Errors
///
/// Returns error if the file cannot be read or the result fails validation
pub fn load_config(config_file: Option<&Path>) -> BootstrapResult<ApplicationConfig> {
    let mut loader = ConfigurationLoader::new().add_source(Box::new(EnvironmentSource));
    if let Some(path) = config_file {
        info!(path = %path.display(), "Loading configuration file");
        loader = loader.add_source(file_source(path)?);
    }
    Ok(loader.load()?)
}

/// Build the application state from validated configuration
///
/// # Errors
///
/// Returns error if the upstream HTTP client cannot be built
pub fn initialize_app_state(config: ApplicationConfig) -> BootstrapResult<AppState> {
    info!(upstream = %config.github.api_url, "Initializing GitHub client...");
    let http = build_http_client(&config.github)?;

    let config = Arc::new(config);
    let factory = GitHubSearchFactory::new(http, Arc::clone(&config));
    let state = AppState::new(Arc::new(factory), config);

    info!("Application state initialized successfully");
    Ok(state)
}
