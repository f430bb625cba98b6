//! Codec configuration.
//!
//! Read from a settings file by the front ends and then overlaid with
//! `FEDIT_*` environment variables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}

/// Which codec a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Signed,
    Plain,
    Session,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CodecKind::Signed => "signed",
            CodecKind::Plain => "plain",
            CodecKind::Session => "session",
        })
    }
}

impl FromStr for CodecKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signed" => Ok(CodecKind::Signed),
            "plain" | "base85" => Ok(CodecKind::Plain),
            "session" => Ok(CodecKind::Session),
            _ => Err(ConfigError::InvalidValue {
                name: "mode".into(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub mode: CodecKind,
    pub secret_key: String,
    pub salt: String,
    /// zlib-compress signed payloads when that makes them shorter.
    pub compress: bool,
    /// Signed tokens older than this are rejected. `None` never expires.
    pub max_age_secs: Option<u64>,
    pub session_ttl_secs: u64,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            mode: CodecKind::Signed,
            secret_key: String::new(),
            salt: "fedit.shared_context".to_string(),
            compress: true,
            max_age_secs: None,
            session_ttl_secs: 3600,
        }
    }
}

impl CodecConfig {
    pub fn signed(secret_key: impl Into<String>) -> Self {
        Self {
            mode: CodecKind::Signed,
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    pub fn plain() -> Self {
        Self {
            mode: CodecKind::Plain,
            ..Self::default()
        }
    }

    /// Overlay the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Overlay variables looked up through `lookup`.
    ///
    /// `FEDIT_SIGN_SHARED_CONTEXT` is the older on/off switch between signed
    /// and plain tokens; `FEDIT_SHARED_CONTEXT_MODE` wins when both are set.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("FEDIT_SIGN_SHARED_CONTEXT") {
            self.mode = if parse_bool("FEDIT_SIGN_SHARED_CONTEXT", &value)? {
                CodecKind::Signed
            } else {
                CodecKind::Plain
            };
        }
        if let Some(value) = lookup("FEDIT_SHARED_CONTEXT_MODE") {
            self.mode = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "FEDIT_SHARED_CONTEXT_MODE".into(),
                value,
            })?;
        }
        if let Some(value) = lookup("FEDIT_SECRET_KEY") {
            self.secret_key = value;
        }
        if let Some(value) = lookup("FEDIT_SHARED_CONTEXT_MAX_AGE") {
            self.max_age_secs = if value.trim().is_empty() {
                None
            } else {
                Some(parse_u64("FEDIT_SHARED_CONTEXT_MAX_AGE", &value)?)
            };
        }
        if let Some(value) = lookup("FEDIT_SESSION_TTL") {
            self.session_ttl_secs = parse_u64("FEDIT_SESSION_TTL", &value)?;
        }
        Ok(self)
    }
}

fn parse_u64(name: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
