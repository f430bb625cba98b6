//! Deployment settings.
//!
//! Loaded from an optional JSON file, then overlaid with `FEDIT_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::{Deserialize, Serialize};

use fedit_codec::{CodecConfig, ConfigError};

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("cannot read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeditSettings {
    pub codec: CodecConfig,
    /// Prefix of the edit endpoint routes.
    pub url_prefix: String,
    /// Prefix of admin edit pages, used by admin-link buttons.
    pub admin_url_prefix: String,
}

impl Default for FeditSettings {
    fn default() -> Self {
        Self {
            codec: CodecConfig::default(),
            url_prefix: "/fedit".to_string(),
            admin_url_prefix: "/admin".to_string(),
        }
    }
}

impl FeditSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.normalized())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::default().apply_env()
    }

    pub fn apply_env(self) -> Result<Self, SettingsError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.codec = self.codec.apply_env_with(&lookup)?;
        if let Some(prefix) = lookup("FEDIT_URL_PREFIX") {
            self.url_prefix = prefix;
        }
        if let Some(prefix) = lookup("FEDIT_ADMIN_URL_PREFIX") {
            self.admin_url_prefix = prefix;
        }
        Ok(self.normalized())
    }

    fn normalized(mut self) -> Self {
        self.url_prefix = normalize_prefix(&self.url_prefix);
        self.admin_url_prefix = normalize_prefix(&self.admin_url_prefix);
        self
    }
}

/// `fedit/` and `/fedit/` both become `/fedit`; empty stays empty.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
