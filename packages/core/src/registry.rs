//! Identifier to adapter-type mapping.
//!
//! The registry is filled once at startup and then only read. Every entry
//! keeps the adapter's schema, described at registration, so parsing a call
//! site never re-derives it.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapter::{Adapter, AdapterBase, AdapterError, AdapterKind, Target};
use crate::context::{Caller, TemplateContext};
use crate::parser::{parse_kwargs, ParseError};
use crate::schema::AdapterSchema;
use crate::Kwargs;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Adapter with identifier '{identifier}' is already registered")]
    Duplicate { identifier: String },

    #[error("No adapter registered with identifier '{identifier}'")]
    NotFound { identifier: String },

    #[error("Invalid adapter '{identifier}': {reason}")]
    InvalidAdapter { identifier: String, reason: String },
}

/// One registered adapter type together with its schema.
#[derive(Clone)]
pub struct RegisteredAdapter {
    kind: Arc<dyn AdapterKind>,
    schema: AdapterSchema,
}

impl std::fmt::Debug for RegisteredAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredAdapter")
            .field("identifier", &self.kind.identifier())
            .field("schema", &self.schema)
            .finish()
    }
}

impl RegisteredAdapter {
    pub fn identifier(&self) -> &str {
        self.kind.identifier()
    }

    pub fn kind(&self) -> &dyn AdapterKind {
        self.kind.as_ref()
    }

    pub fn schema(&self) -> &AdapterSchema {
        &self.schema
    }

    /// Bind call-site tokens against this adapter's schema.
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S], context: &TemplateContext) -> Result<Kwargs, ParseError> {
        parse_kwargs(&self.schema, tokens, context)
    }

    /// Build the adapter for one request.
    pub fn construct(&self, target: Target, caller: Caller, kwargs: Kwargs) -> Result<Box<dyn Adapter>, AdapterError> {
        let base = AdapterBase::new(
            self.identifier(),
            &self.schema,
            self.kind.field_required(),
            target,
            caller,
            kwargs,
        )?;
        log::debug!("binding adapter {} to {}", self.identifier(), base.object.key);
        self.kind.bind(base)
    }

    /// Call-site form, e.g. `{% fedit field instance.title [admin] %}`.
    pub fn usage(&self) -> String {
        let target = if self.kind.field_required() {
            "instance.field"
        } else {
            "instance"
        };
        let keywords = self.schema.usage();
        if keywords.is_empty() {
            format!("{{% fedit {} {} %}}", self.identifier(), target)
        } else {
            format!("{{% fedit {} {} {} %}}", self.identifier(), target, keywords)
        }
    }
}

/// Registered adapters, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    adapters: BTreeMap<String, RegisteredAdapter>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<K: AdapterKind + 'static>(&mut self, kind: K) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(kind))
    }

    /// Register an adapter type. Its keywords are validated and described
    /// here, so a bad declaration fails at startup.
    pub fn register_arc(&mut self, kind: Arc<dyn AdapterKind>) -> Result<(), RegistryError> {
        let identifier = kind.identifier().to_string();
        validate_identifier(&identifier)?;

        if self.adapters.contains_key(&identifier) {
            return Err(RegistryError::Duplicate { identifier });
        }

        let keywords = kind.keywords().map_err(|e| RegistryError::InvalidAdapter {
            identifier: identifier.clone(),
            reason: e.to_string(),
        })?;
        let schema = AdapterSchema::describe(keywords);

        log::debug!("registered adapter {}", identifier);
        self.adapters.insert(identifier, RegisteredAdapter { kind, schema });
        Ok(())
    }

    pub fn lookup(&self, identifier: &str) -> Result<&RegisteredAdapter, RegistryError> {
        self.adapters
            .get(identifier)
            .ok_or_else(|| RegistryError::NotFound {
                identifier: identifier.to_string(),
            })
    }

    pub fn unregister(&mut self, identifier: &str) -> Result<RegisteredAdapter, RegistryError> {
        self.adapters
            .remove(identifier)
            .ok_or_else(|| RegistryError::NotFound {
                identifier: identifier.to_string(),
            })
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.adapters.contains_key(identifier)
    }

    /// Identifiers in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredAdapter> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

fn validate_identifier(identifier: &str) -> Result<(), RegistryError> {
    let reason = if identifier.is_empty() {
        "identifier is empty"
    } else if !identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        "identifier may only contain letters, digits, '-' and '_'"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidAdapter {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterForm, Cleaned};
    use crate::forms::EditForm;
    use crate::keyword::{Keyword, KeywordError};
    use crate::store::ContentStore;

    struct Dummy {
        identifier: &'static str,
        broken: bool,
    }

    struct DummyAdapter(AdapterBase);

    impl Adapter for DummyAdapter {
        fn base(&self) -> &AdapterBase {
            &self.0
        }

        fn base_mut(&mut self) -> &mut AdapterBase {
            &mut self.0
        }

        fn element_id(&self) -> String {
            "dummy".into()
        }

        fn form(&self) -> AdapterForm {
            AdapterForm::Fields(EditForm::default())
        }

        fn form_valid(&mut self, _store: &dyn ContentStore, _cleaned: Cleaned) -> Result<(), AdapterError> {
            Ok(())
        }

        fn render_content(&self, _context: &TemplateContext) -> String {
            String::new()
        }
    }

    impl AdapterKind for Dummy {
        fn identifier(&self) -> &str {
            self.identifier
        }

        fn keywords(&self) -> Result<Vec<Keyword>, KeywordError> {
            let mut keywords = vec![Keyword::builder("admin").absolute().build()?];
            if self.broken {
                keywords.push(Keyword::builder("bad").absolute().optional().build()?);
            }
            Ok(keywords)
        }

        fn field_required(&self) -> bool {
            false
        }

        fn bind(&self, base: AdapterBase) -> Result<Box<dyn Adapter>, AdapterError> {
            Ok(Box::new(DummyAdapter(base)))
        }
    }

    fn dummy(identifier: &'static str) -> Dummy {
        Dummy {
            identifier,
            broken: false,
        }
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        let mut registry = Registry::new();
        registry.register(dummy("block")).unwrap();
        let err = registry.register(dummy("block")).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate { identifier: "block".into() });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_and_unregister() {
        let mut registry = Registry::new();
        registry.register(dummy("block")).unwrap();
        assert_eq!(registry.lookup("block").unwrap().identifier(), "block");

        assert!(matches!(
            registry.lookup("nonexistent"),
            Err(RegistryError::NotFound { .. })
        ));

        registry.unregister("block").unwrap();
        assert!(matches!(registry.lookup("block"), Err(RegistryError::NotFound { .. })));
        assert!(matches!(
            registry.unregister("block"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        let mut registry = Registry::new();
        registry.register(dummy("Block")).unwrap();
        registry.register(dummy("block")).unwrap();
        assert_eq!(registry.identifiers().collect::<Vec<_>>(), vec!["Block", "block"]);
    }

    #[test]
    fn invalid_adapters_are_rejected() {
        let mut registry = Registry::new();
        let err = registry.register(dummy("")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAdapter { .. }));

        let err = registry.register(dummy("has space")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAdapter { .. }));

        let err = registry
            .register(Dummy {
                identifier: "broken",
                broken: true,
            })
            .unwrap_err();
        match err {
            RegistryError::InvalidAdapter { reason, .. } => assert!(reason.contains("absolute and optional")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn schema_is_described_on_registration() {
        let mut registry = Registry::new();
        registry.register(dummy("model")).unwrap();
        let entry = registry.lookup("model").unwrap();
        assert!(entry.schema().is_absolute("admin"));
        assert_eq!(entry.usage(), "{% fedit model instance [admin] %}");

        let kwargs = entry.parse(&["admin"], &TemplateContext::new()).unwrap();
        assert_eq!(kwargs.get("admin"), Some(&serde_json::json!(true)));
    }
}
