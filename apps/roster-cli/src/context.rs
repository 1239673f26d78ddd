use roster_config::{ConfigError, Settings};
use roster_remote::{GitLabClient, GitLabConfig};
use roster_store_sqlite::SqliteStore;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

/// Connection settings from the config file, with flags and env on top.
pub fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    // Flags and env can stand in for a config file that has no home to live in.
    let saved = match settings_path(cli).and_then(Settings::load_from) {
        Ok(settings) => Some(settings),
        Err(ConfigError::NotFound | ConfigError::NoHomeDir) => None,
        Err(e) => return Err(e.into()),
    };

    let base_url = cli
        .base_url
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.base_url.clone()));
    let token = cli
        .token
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.token.clone()));

    match (base_url, token) {
        (Some(base_url), Some(token)) => {
            let mut settings = Settings::new(&base_url, &token)?;
            settings.timeout_secs = saved.and_then(|s| s.timeout_secs);
            Ok(settings)
        }
        _ => Err(ConfigError::NotFound.into()),
    }
}

pub fn settings_path(cli: &Cli) -> Result<PathBuf, ConfigError> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Settings::default_path(),
    }
}

pub fn setup_client(cli: &Cli) -> Result<GitLabClient, Box<dyn std::error::Error>> {
    let settings = load_settings(cli)?;
    let mut config = GitLabConfig::new(settings.base_url, settings.token);
    if let Some(secs) = settings.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(GitLabClient::new(config)?)
}

pub async fn open_store(cli: &Cli) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    let store = match &cli.database_url {
        Some(url) => SqliteStore::open(url).await?,
        None => SqliteStore::open_default().await?,
    };
    Ok(store)
}
