//! Crate-wide error type.

use crate::adapter::AdapterError;
use crate::keyword::KeywordError;
use crate::mutator::{InsertError, MoveError};
use crate::parser::ParseError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// Any failure raised by this crate.
///
/// Each module has its own error; this wraps them for callers that do not
/// care which layer failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Keyword(#[from] KeywordError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Insert(#[from] InsertError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Whether the failure came from bad caller input rather than from the
    /// server's configuration.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Error::Parse(_) | Error::Adapter(_) | Error::Move(_) | Error::Insert(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_transparent() {
        let e: Error = ParseError::MissingRequired { name: "test".into() }.into();
        assert_eq!(e.to_string(), "Missing required keyword argument test");
        assert!(e.is_bad_request());

        let e: Error = RegistryError::Duplicate { identifier: "block".into() }.into();
        assert!(e.to_string().contains("block"));
        assert!(!e.is_bad_request());
    }
}
