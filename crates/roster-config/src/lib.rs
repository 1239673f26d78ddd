use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found. Run 'roster config set' first.")]
    NotFound,
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Could not determine the home directory; pass --config")]
    NoHomeDir,
}

/// Connection settings stored in ~/.roster/config.json
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub token: String,
    /// Request timeout in seconds; the client default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Build validated settings: both fields non-blank, trailing slashes
    /// stripped from the base URL.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let token = token.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid("base URL is empty".into()));
        }
        if token.is_empty() {
            return Err(ConfigError::Invalid("token is empty".into()));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            token: token.to_string(),
            timeout_secs: None,
        })
    }

    /// Load settings from default path (~/.roster/config.json)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path()?)
    }

    /// Load settings from custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save settings to default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Save settings to custom path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Get default settings path (~/.roster/config.json)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Self::path_under(dirs::home_dir())
    }

    fn path_under(home: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        let home = home.ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".roster").join("config.json"))
    }

    /// Token with all but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}
