//! Base85-over-JSON tokens.
//!
//! Reversible but not tamper-evident. Anything that does not decode to a
//! JSON object is treated as "no shared context".

use fedit_core::Kwargs;

use crate::base85;
use crate::{CodecError, CodecScope, SharedContextCodec};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl SharedContextCodec for PlainCodec {
    fn encode(&self, kwargs: &Kwargs, _scope: &CodecScope<'_>) -> Result<String, CodecError> {
        let json = serde_json::to_vec(kwargs).map_err(|e| CodecError::Serialize(e.to_string()))?;
        Ok(base85::encode(&json))
    }

    fn decode(&self, token: &str, _scope: &CodecScope<'_>) -> Result<Kwargs, CodecError> {
        if token.is_empty() {
            return Ok(Kwargs::new());
        }

        let bytes = match base85::decode(token) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("ignoring undecodable shared context: {}", e);
                return Ok(Kwargs::new());
            }
        };

        match serde_json::from_slice::<Kwargs>(&bytes) {
            Ok(kwargs) => Ok(kwargs),
            Err(e) => {
                log::debug!("ignoring shared context that is not a JSON object: {}", e);
                Ok(Kwargs::new())
            }
        }
    }
}
