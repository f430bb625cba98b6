use fedit_codec::CodecError;
use fedit_core::{AdapterError, ParseError, RegistryError};

use crate::routes::RouteError;
use crate::settings::SettingsError;

/// Errors surfaced by the template-tag front end and environment setup.
#[derive(thiserror::Error, Debug)]
pub enum FeditError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Route(#[from] RouteError),
}

impl FeditError {
    /// Failures caused by the call site rather than the deployment.
    pub fn is_call_site(&self) -> bool {
        matches!(self, FeditError::Parse(_) | FeditError::Adapter(_))
    }
}
