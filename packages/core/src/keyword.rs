//! Declarative keyword descriptors.
//!
//! A [`Keyword`] describes one named parameter an adapter accepts at its
//! invocation site. Keywords come in three flavours:
//!
//! - **required**: the call site must bind a value (`test='v'`)
//! - **optional**: carries a default used when the call site omits it
//! - **absolute**: a bare flag token with no value (`admin`)
//!
//! Invalid combinations are rejected by [`KeywordBuilder::build`]. They are
//! configuration errors and surface when an adapter type is declared, never
//! at request time.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value as JsonValue;

/// Errors raised while declaring a keyword.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeywordError {
    #[error("keyword '{name}' cannot be absolute and carry a default")]
    AbsoluteWithDefault { name: String },

    #[error("keyword '{name}' cannot carry a default unless it is optional")]
    DefaultWithoutOptional { name: String },

    #[error("keyword '{name}' cannot be both absolute and optional")]
    AbsoluteAndOptional { name: String },

    #[error("invalid keyword name '{name}': {message}")]
    InvalidName { name: String, message: String },
}

/// How a keyword is bound at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeywordClass {
    /// Bare flag token, `false` when absent.
    Absolute,
    /// Falls back to its default when omitted.
    Optional,
    /// Must be bound by the caller.
    Required,
}

/// A single declared adapter parameter.
///
/// Equality and hashing only consider the name, so a derived adapter can
/// replace an inherited keyword by declaring one with the same name.
#[derive(Debug, Clone)]
pub struct Keyword {
    name: String,
    optional: bool,
    absolute: bool,
    default: Option<JsonValue>,
    help_text: String,
    type_hint: Option<String>,
}

impl Keyword {
    /// Start declaring a keyword. Without further calls it is required.
    pub fn builder(name: impl Into<String>) -> KeywordBuilder {
        KeywordBuilder {
            name: name.into(),
            optional: false,
            absolute: false,
            default: None,
            help_text: String::new(),
            type_hint: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// The declared default. Optional keywords without an explicit default
    /// report `null`.
    pub fn default_value(&self) -> Option<&JsonValue> {
        self.default.as_ref()
    }

    pub fn help_text(&self) -> &str {
        &self.help_text
    }

    pub fn type_hint(&self) -> Option<&str> {
        self.type_hint.as_deref()
    }

    /// Bucket used by schema resolution. Absolute wins over optional.
    pub fn class(&self) -> KeywordClass {
        if self.absolute {
            KeywordClass::Absolute
        } else if self.optional {
            KeywordClass::Optional
        } else {
            KeywordClass::Required
        }
    }

    /// Human-readable call-site form of this keyword.
    pub fn usage(&self) -> String {
        let hint = self.type_hint.as_deref().unwrap_or("value");
        match self.class() {
            KeywordClass::Absolute => format!("[{}]", self.name),
            KeywordClass::Optional => format!("[{}=<{}>]", self.name, hint),
            KeywordClass::Required => format!("{}=<{}>", self.name, hint),
        }
    }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Keyword {}

impl Hash for Keyword {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.usage())
    }
}

/// Builder for [`Keyword`]; validation happens in [`KeywordBuilder::build`].
#[derive(Debug, Clone)]
pub struct KeywordBuilder {
    name: String,
    optional: bool,
    absolute: bool,
    default: Option<JsonValue>,
    help_text: String,
    type_hint: Option<String>,
}

impl KeywordBuilder {
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn absolute(mut self) -> Self {
        self.absolute = true;
        self
    }

    pub fn default(mut self, value: impl Into<JsonValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    pub fn type_hint(mut self, hint: impl Into<String>) -> Self {
        self.type_hint = Some(hint.into());
        self
    }

    /// Validate the declaration.
    pub fn build(self) -> Result<Keyword, KeywordError> {
        validate_name(&self.name)?;

        if self.default.is_some() && self.absolute {
            return Err(KeywordError::AbsoluteWithDefault { name: self.name });
        }
        if self.default.is_some() && !self.optional {
            return Err(KeywordError::DefaultWithoutOptional { name: self.name });
        }
        if self.optional && self.absolute {
            return Err(KeywordError::AbsoluteAndOptional { name: self.name });
        }

        let default = if self.optional {
            Some(self.default.unwrap_or(JsonValue::Null))
        } else {
            None
        };

        Ok(Keyword {
            name: self.name,
            optional: self.optional,
            absolute: self.absolute,
            default,
            help_text: self.help_text,
            type_hint: self.type_hint,
        })
    }
}

/// Keyword names must be usable as bare tokens, so they follow the same
/// identifier rules as template variables.
fn validate_name(name: &str) -> Result<(), KeywordError> {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => {
            return Err(KeywordError::InvalidName {
                name: name.to_string(),
                message: "empty name".to_string(),
            })
        }
    };

    if !(unicode_ident::is_xid_start(first) || first == '_') {
        return Err(KeywordError::InvalidName {
            name: name.to_string(),
            message: "must start with a letter or underscore".to_string(),
        });
    }

    if let Some(c) = chars.find(|c| !unicode_ident::is_xid_continue(*c)) {
        return Err(KeywordError::InvalidName {
            name: name.to_string(),
            message: format!("invalid character '{}'", c),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn plain_keyword_is_required() {
        let kw = Keyword::builder("test").build().unwrap();
        assert_eq!(kw.class(), KeywordClass::Required);
        assert_eq!(kw.default_value(), None);
        assert_eq!(kw.usage(), "test=<value>");
    }

    #[test]
    fn optional_without_default_defaults_to_null() {
        let kw = Keyword::builder("block_id").optional().build().unwrap();
        assert_eq!(kw.class(), KeywordClass::Optional);
        assert_eq!(kw.default_value(), Some(&JsonValue::Null));
    }

    #[test]
    fn optional_with_default() {
        let kw = Keyword::builder("filter_spec")
            .optional()
            .default("original")
            .type_hint("str")
            .build()
            .unwrap();
        assert_eq!(kw.default_value(), Some(&json!("original")));
        assert_eq!(kw.usage(), "[filter_spec=<str>]");
    }

    #[test]
    fn absolute_with_default_is_rejected() {
        let err = Keyword::builder("admin")
            .absolute()
            .default("x")
            .build()
            .unwrap_err();
        assert!(matches!(err, KeywordError::AbsoluteWithDefault { .. }));
    }

    #[test]
    fn optional_and_absolute_is_rejected() {
        let err = Keyword::builder("admin")
            .absolute()
            .optional()
            .build()
            .unwrap_err();
        assert!(matches!(err, KeywordError::AbsoluteAndOptional { .. }));
    }

    #[test]
    fn default_without_optional_is_rejected() {
        let err = Keyword::builder("target").default("x").build().unwrap_err();
        assert!(matches!(err, KeywordError::DefaultWithoutOptional { .. }));
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(Keyword::builder("").build().is_err());
        assert!(Keyword::builder("1abc").build().is_err());
        assert!(Keyword::builder("foo-bar").build().is_err());
        assert!(Keyword::builder("_private").build().is_ok());
    }

    #[test]
    fn identity_is_by_name() {
        let a = Keyword::builder("id").build().unwrap();
        let b = Keyword::builder("id")
            .optional()
            .help_text("other")
            .build()
            .unwrap();
        assert_eq!(a, b);

        let set: HashSet<Keyword> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
