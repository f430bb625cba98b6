//! Shared-context codecs.
//!
//! The keyword arguments an adapter was bound with travel from the rendered
//! page to the edit endpoint as a single opaque token. Three strategies
//! produce that token:
//!
//! - [`SignedCodec`]: JSON, optionally zlib-compressed, with a keyed BLAKE3
//!   signature and timestamp. Tampered or expired tokens are rejected.
//! - [`PlainCodec`]: base85-encoded JSON. Not tamper-evident; malformed
//!   tokens decode to an empty mapping.
//! - [`SessionCodec`]: the mapping stays server-side in a [`SessionStore`]
//!   and the token is only its key. Unknown or expired keys decode to an
//!   empty mapping.
//!
//! [`CodecMode`] picks one of them once, at startup, from a [`CodecConfig`].
//!
//! # Example
//!
//! ```rust
//! use fedit_codec::{CodecConfig, CodecMode, CodecScope, SharedContextCodec};
//! use serde_json::json;
//!
//! let codec = CodecMode::from_config(&CodecConfig::signed("not-a-real-secret"));
//! let kwargs = json!({"block_id": "b-1", "admin": true}).as_object().cloned().unwrap();
//!
//! let token = codec.encode(&kwargs, &CodecScope::default()).unwrap();
//! assert_eq!(codec.decode(&token, &CodecScope::default()).unwrap(), kwargs);
//! ```

pub mod base85;
mod config;
mod plain;
mod session;
mod signed;

use fedit_core::Kwargs;

pub use config::{CodecConfig, CodecKind, ConfigError};
pub use plain::PlainCodec;
pub use session::{SessionCodec, SessionStore};
pub use signed::SignedCodec;

/// Codec failures. Only the signed codec and session encoding produce them;
/// the lenient decoders fall back to an empty mapping instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("shared context signature does not match")]
    Tampered,

    #[error("shared context expired {age}s ago (max age {max_age}s)")]
    Expired { age: u64, max_age: u64 },

    #[error("cannot serialize shared context: {0}")]
    Serialize(String),

    #[error("session-backed shared context needs a session")]
    NoSession,
}

impl CodecError {
    /// Rejections that should be reported as "forbidden" rather than as a
    /// malformed request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CodecError::Tampered | CodecError::Expired { .. })
    }
}

/// Request-side information a codec may need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecScope<'a> {
    /// The caller's session key.
    pub session_key: Option<&'a str>,
    /// A stable element id; session tokens reuse it as their key.
    pub element_id: Option<&'a str>,
}

impl<'a> CodecScope<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn session(mut self, key: &'a str) -> Self {
        self.session_key = Some(key);
        self
    }

    #[must_use]
    pub fn element(mut self, element_id: &'a str) -> Self {
        self.element_id = Some(element_id);
        self
    }
}

/// Turns a kwargs mapping into a token and back.
pub trait SharedContextCodec: Send + Sync {
    fn encode(&self, kwargs: &Kwargs, scope: &CodecScope<'_>) -> Result<String, CodecError>;

    fn decode(&self, token: &str, scope: &CodecScope<'_>) -> Result<Kwargs, CodecError>;
}

/// The codec a deployment runs with.
pub enum CodecMode {
    Signed(SignedCodec),
    Plain(PlainCodec),
    Session(SessionCodec),
}

impl CodecMode {
    pub fn from_config(config: &CodecConfig) -> Self {
        match config.mode {
            CodecKind::Signed => {
                let mut codec = SignedCodec::new(&config.secret_key)
                    .salt(&config.salt)
                    .compress(config.compress);
                if let Some(max_age) = config.max_age_secs {
                    codec = codec.max_age(max_age);
                }
                CodecMode::Signed(codec)
            }
            CodecKind::Plain => CodecMode::Plain(PlainCodec),
            CodecKind::Session => CodecMode::Session(SessionCodec::new(
                std::sync::Arc::new(SessionStore::new()),
                config.session_ttl_secs,
            )),
        }
    }

    pub fn kind(&self) -> CodecKind {
        match self {
            CodecMode::Signed(_) => CodecKind::Signed,
            CodecMode::Plain(_) => CodecKind::Plain,
            CodecMode::Session(_) => CodecKind::Session,
        }
    }

    fn inner(&self) -> &dyn SharedContextCodec {
        match self {
            CodecMode::Signed(c) => c,
            CodecMode::Plain(c) => c,
            CodecMode::Session(c) => c,
        }
    }
}

impl std::fmt::Debug for CodecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CodecMode").field(&self.kind()).finish()
    }
}

impl SharedContextCodec for CodecMode {
    fn encode(&self, kwargs: &Kwargs, scope: &CodecScope<'_>) -> Result<String, CodecError> {
        self.inner().encode(kwargs, scope)
    }

    fn decode(&self, token: &str, scope: &CodecScope<'_>) -> Result<Kwargs, CodecError> {
        self.inner().decode(token, scope)
    }
}
