//! Signed tokens.
//!
//! Layout: `<payload>:<timestamp>:<signature>`.
//!
//! - `payload` is the URL-safe base64 of the JSON mapping. When zlib makes
//!   it shorter, the compressed bytes are used and the payload gets a `.`
//!   prefix.
//! - `timestamp` is seconds since the Unix epoch, in decimal.
//! - `signature` is the URL-safe base64 of a keyed BLAKE3 hash over
//!   `salt:payload:timestamp`. The key is derived from the secret.
//!
//! None of the three parts can contain `:`.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use fedit_core::Kwargs;

use crate::{CodecError, CodecScope, SharedContextCodec};

const KEY_CONTEXT: &str = "fedit 2024 shared-context signer v1";
const DEFAULT_SALT: &str = "fedit.shared_context";

/// Tamper-evident, self-contained tokens.
#[derive(Clone)]
pub struct SignedCodec {
    key: [u8; 32],
    salt: String,
    compress: bool,
    max_age: Option<u64>,
}

impl std::fmt::Debug for SignedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedCodec")
            .field("salt", &self.salt)
            .field("compress", &self.compress)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl SignedCodec {
    pub fn new(secret: &str) -> Self {
        if secret.is_empty() {
            log::warn!("signing shared context with an empty secret key");
        }
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
            salt: DEFAULT_SALT.to_string(),
            compress: true,
            max_age: None,
        }
    }

    #[must_use]
    pub fn salt(mut self, salt: &str) -> Self {
        self.salt = salt.to_string();
        self
    }

    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Reject tokens older than `seconds`.
    #[must_use]
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    fn signature(&self, payload: &str, timestamp: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(self.salt.as_bytes());
        hasher.update(b":");
        hasher.update(payload.as_bytes());
        hasher.update(b":");
        hasher.update(timestamp.as_bytes());
        hasher.finalize()
    }

    /// Sign with an explicit timestamp.
    pub fn encode_at(&self, kwargs: &Kwargs, timestamp: i64) -> Result<String, CodecError> {
        let json = serde_json::to_vec(kwargs).map_err(|e| CodecError::Serialize(e.to_string()))?;

        let mut payload = URL_SAFE_NO_PAD.encode(&json);
        if self.compress {
            let compressed = zlib(&json).map_err(|e| CodecError::Serialize(e.to_string()))?;
            // One extra character for the marker.
            if compressed.len() < json.len().saturating_sub(1) {
                payload = format!(".{}", URL_SAFE_NO_PAD.encode(&compressed));
            }
        }

        let timestamp = timestamp.to_string();
        let signature = URL_SAFE_NO_PAD.encode(self.signature(&payload, &timestamp).as_bytes());
        Ok(format!("{}:{}:{}", payload, timestamp, signature))
    }

    /// Verify against an explicit "now".
    pub fn decode_at(&self, token: &str, now: i64) -> Result<Kwargs, CodecError> {
        let mut parts = token.split(':');
        let (Some(payload), Some(timestamp), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            log::warn!("rejecting malformed signed shared context");
            return Err(CodecError::Tampered);
        };

        let given: [u8; 32] = URL_SAFE_NO_PAD
            .decode(signature)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(CodecError::Tampered)?;
        // `Hash` equality is constant-time.
        if blake3::Hash::from_bytes(given) != self.signature(payload, timestamp) {
            log::warn!("rejecting shared context with a bad signature");
            return Err(CodecError::Tampered);
        }

        let signed_at: i64 = timestamp.parse().map_err(|_| CodecError::Tampered)?;
        if let Some(max_age) = self.max_age {
            let age = u64::try_from(now.saturating_sub(signed_at)).unwrap_or(0);
            if age > max_age {
                log::info!("shared context expired: {}s old, max {}s", age, max_age);
                return Err(CodecError::Expired {
                    age: age - max_age,
                    max_age,
                });
            }
        }

        let (compressed, data) = match payload.strip_prefix('.') {
            Some(rest) => (true, rest),
            None => (false, payload),
        };
        let mut bytes = URL_SAFE_NO_PAD.decode(data).map_err(|_| CodecError::Tampered)?;
        if compressed {
            bytes = unzlib(&bytes).map_err(|_| CodecError::Tampered)?;
        }
        serde_json::from_slice::<Kwargs>(&bytes).map_err(|_| CodecError::Tampered)
    }
}

fn zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn unzlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

impl SharedContextCodec for SignedCodec {
    fn encode(&self, kwargs: &Kwargs, _scope: &CodecScope<'_>) -> Result<String, CodecError> {
        if kwargs.is_empty() {
            return Ok(String::new());
        }
        self.encode_at(kwargs, Utc::now().timestamp())
    }

    fn decode(&self, token: &str, _scope: &CodecScope<'_>) -> Result<Kwargs, CodecError> {
        if token.is_empty() {
            return Ok(Kwargs::new());
        }
        self.decode_at(token, Utc::now().timestamp())
    }
}
