//! Command implementations. Each returns the text to print so the binary
//! stays a thin argument-parsing layer.

use serde_json::Value as JsonValue;

use fedit_adapters::SettingsError;
use fedit_codec::{CodecConfig, CodecError, CodecKind, CodecMode, CodecScope, SharedContextCodec};
use fedit_core::{Kwargs, Registry, RegistryError};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shared context must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("Session-backed shared context only lives inside the serving process")]
    SessionMode,
}

const PREAMBLE: &[&str] = &[
    "Registered Adapters",
    "====================",
    " * The first argument is the identifier of the adapter.",
    " * The second argument is the object and/or field to edit: instance.field or instance.",
    " * Absolute arguments (no equal sign) are optional and treated as booleans.",
    " * Keyword arguments wrapped in square brackets are optional. [key=value]",
    " * Keyword values must be serializable to JSON and should stay small;",
    "   they travel inside the edit URLs.",
];

const INDENT: &str = "    ";

/// Usage of every registered adapter, or only of `identifier`.
pub fn adapter_help(registry: &Registry, identifier: Option<&str>) -> Result<String, CliError> {
    let entries = match identifier {
        Some(identifier) => vec![registry.lookup(identifier)?],
        None => registry.iter().collect(),
    };

    let mut lines: Vec<String> = PREAMBLE.iter().map(|s| s.to_string()).collect();
    for entry in entries {
        lines.push("==========".into());
        lines.push(String::new());
        lines.push(format!("{}{}", INDENT, entry.usage()));

        let help = format!("{}  ", INDENT);
        let description = entry.kind().usage_description();
        if !description.is_empty() {
            lines.push(format!("{}{}", help, description));
        }
        for keyword in entry.schema().display_order() {
            if !keyword.help_text().is_empty() {
                lines.push(format!("{} * {}: {}", help, keyword.name(), keyword.help_text()));
            }
        }
        lines.push(String::new());
    }
    Ok(lines.join("\n"))
}

fn offline_codec(config: &CodecConfig) -> Result<CodecMode, CliError> {
    if config.mode == CodecKind::Session {
        return Err(CliError::SessionMode);
    }
    Ok(CodecMode::from_config(config))
}

/// Token for a JSON object of kwargs.
pub fn encode_context(config: &CodecConfig, json: &str) -> Result<String, CliError> {
    let kwargs: Kwargs = match serde_json::from_str(json)? {
        JsonValue::Object(map) => map,
        other => return Err(CliError::NotAnObject(other.to_string())),
    };
    let codec = offline_codec(config)?;
    log::debug!("encoding {} keys with the {} codec", kwargs.len(), config.mode);
    Ok(codec.encode(&kwargs, &CodecScope::default())?)
}

/// Pretty-printed kwargs behind `token`.
pub fn decode_context(config: &CodecConfig, token: &str) -> Result<String, CliError> {
    let codec = offline_codec(config)?;
    let kwargs = codec.decode(token.trim(), &CodecScope::default())?;
    Ok(serde_json::to_string_pretty(&JsonValue::Object(kwargs))?)
}
