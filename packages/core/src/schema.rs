//! Adapter schemas derived from keyword declarations.
//!
//! An adapter type declares a flat list of [`Keyword`]s (its own plus the
//! ones it inherits). [`AdapterSchema::describe`] collapses that list once,
//! when the adapter type is registered, into three disjoint buckets:
//!
//! - `required_kwargs`: names the caller must bind, in declaration order
//! - `absolute_tokens`: flag names, `false` unless present
//! - `defaults`: optional names with their default values
//!
//! Re-declaring a name later in the list replaces the earlier declaration
//! (the derived adapter wins) while keeping the original position.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;

use crate::keyword::{Keyword, KeywordClass};
use crate::Kwargs;

/// The resolved keyword schema of one adapter type. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct AdapterSchema {
    keywords: Vec<Keyword>,
    required_kwargs: Vec<String>,
    absolute_tokens: BTreeSet<String>,
    defaults: BTreeMap<String, JsonValue>,
}

impl AdapterSchema {
    /// Classify a sequence of declarations. Last declaration of a name wins.
    pub fn describe(declared: impl IntoIterator<Item = Keyword>) -> Self {
        let mut keywords: Vec<Keyword> = Vec::new();
        for keyword in declared {
            match keywords.iter_mut().find(|k| k.name() == keyword.name()) {
                Some(existing) => *existing = keyword,
                None => keywords.push(keyword),
            }
        }

        let mut required_kwargs = Vec::new();
        let mut absolute_tokens = BTreeSet::new();
        let mut defaults = BTreeMap::new();

        for keyword in &keywords {
            match keyword.class() {
                KeywordClass::Absolute => {
                    absolute_tokens.insert(keyword.name().to_string());
                }
                KeywordClass::Optional => {
                    let default = keyword.default_value().cloned().unwrap_or(JsonValue::Null);
                    defaults.insert(keyword.name().to_string(), default);
                }
                KeywordClass::Required => required_kwargs.push(keyword.name().to_string()),
            }
        }

        log::debug!(
            "described schema: {} required, {} flags, {} optional",
            required_kwargs.len(),
            absolute_tokens.len(),
            defaults.len()
        );

        Self {
            keywords,
            required_kwargs,
            absolute_tokens,
            defaults,
        }
    }

    /// All keywords after de-duplication, in declaration order.
    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub fn get(&self, name: &str) -> Option<&Keyword> {
        self.keywords.iter().find(|k| k.name() == name)
    }

    /// Names the caller must bind, in the order positional tokens fill them.
    pub fn required_kwargs(&self) -> &[String] {
        &self.required_kwargs
    }

    pub fn absolute_tokens(&self) -> &BTreeSet<String> {
        &self.absolute_tokens
    }

    pub fn defaults(&self) -> &BTreeMap<String, JsonValue> {
        &self.defaults
    }

    pub fn is_absolute(&self, name: &str) -> bool {
        self.absolute_tokens.contains(name)
    }

    /// Which bucket a declared name landed in.
    pub fn class_of(&self, name: &str) -> Option<KeywordClass> {
        self.get(name).map(Keyword::class)
    }

    /// The starting point for an adapter's kwargs: every flag `false` and
    /// every optional keyword at its default.
    pub fn initial_kwargs(&self) -> Kwargs {
        let mut kwargs = Kwargs::new();
        for flag in &self.absolute_tokens {
            kwargs.insert(flag.clone(), JsonValue::Bool(false));
        }
        for (name, default) in &self.defaults {
            kwargs.insert(name.clone(), default.clone());
        }
        kwargs
    }

    /// Keywords in display order: flags, then optional, then required, each
    /// bucket sorted by name. Only used for usage strings.
    pub fn display_order(&self) -> Vec<&Keyword> {
        let mut sorted: Vec<&Keyword> = self.keywords.iter().collect();
        sorted.sort_by(|a, b| a.class().cmp(&b.class()).then_with(|| a.name().cmp(b.name())));
        sorted
    }

    /// One-line usage string, e.g. `[admin] [block_id=<str>] test=<value>`.
    pub fn usage(&self) -> String {
        self.display_order()
            .iter()
            .map(|k| k.usage())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn required(name: &str) -> Keyword {
        Keyword::builder(name).build().unwrap()
    }

    fn optional(name: &str, default: JsonValue) -> Keyword {
        Keyword::builder(name).optional().default(default).build().unwrap()
    }

    fn flag(name: &str) -> Keyword {
        Keyword::builder(name).absolute().build().unwrap()
    }

    #[test]
    fn buckets_are_disjoint() {
        let schema = AdapterSchema::describe(vec![
            required("test"),
            flag("admin"),
            optional("block_id", JsonValue::Null),
        ]);

        assert_eq!(schema.required_kwargs(), &["test".to_string()]);
        assert!(schema.is_absolute("admin"));
        assert_eq!(schema.defaults().get("block_id"), Some(&JsonValue::Null));
        assert_eq!(schema.class_of("test"), Some(KeywordClass::Required));
        assert_eq!(schema.class_of("missing"), None);
    }

    #[test]
    fn redeclaration_overrides_base() {
        let base = vec![required("target"), optional("size", json!("small"))];
        let derived = vec![optional("target", json!("#main")), flag("size")];

        let schema = AdapterSchema::describe(base.into_iter().chain(derived));

        assert_eq!(schema.keywords().len(), 2);
        assert!(schema.required_kwargs().is_empty());
        assert_eq!(schema.defaults().get("target"), Some(&json!("#main")));
        assert!(schema.is_absolute("size"));
        assert!(!schema.defaults().contains_key("size"));
    }

    #[test]
    fn required_order_follows_declaration() {
        let schema = AdapterSchema::describe(vec![required("zeta"), required("alpha")]);
        assert_eq!(
            schema.required_kwargs(),
            &["zeta".to_string(), "alpha".to_string()]
        );
    }

    #[test]
    fn usage_sorts_flags_then_optional_then_required() {
        let schema = AdapterSchema::describe(vec![
            required("target"),
            required("name"),
            optional("filter", json!("original")),
            flag("preserve"),
            flag("admin"),
        ]);

        assert_eq!(
            schema.usage(),
            "[admin] [preserve] [filter=<value>] name=<value> target=<value>"
        );
    }

    #[test]
    fn initial_kwargs_hold_flags_and_defaults() {
        let schema = AdapterSchema::describe(vec![
            required("test"),
            flag("admin"),
            optional("css", json!("background-image")),
        ]);

        let kwargs = schema.initial_kwargs();
        assert_eq!(kwargs.get("admin"), Some(&json!(false)));
        assert_eq!(kwargs.get("css"), Some(&json!("background-image")));
        assert!(!kwargs.contains_key("test"));
    }

    fn arb_keyword() -> impl Strategy<Value = Keyword> {
        ("[a-e]", 0u8..3).prop_map(|(name, class)| match class {
            0 => Keyword::builder(name).build().unwrap(),
            1 => Keyword::builder(name).optional().build().unwrap(),
            _ => Keyword::builder(name).absolute().build().unwrap(),
        })
    }

    proptest! {
        #[test]
        fn every_name_lands_in_exactly_one_bucket(decls in prop::collection::vec(arb_keyword(), 0..12)) {
            let schema = AdapterSchema::describe(decls.clone());

            let names: BTreeSet<String> = decls.iter().map(|k| k.name().to_string()).collect();
            prop_assert_eq!(schema.keywords().len(), names.len());

            for name in &names {
                let hits = usize::from(schema.required_kwargs().contains(name))
                    + usize::from(schema.absolute_tokens().contains(name))
                    + usize::from(schema.defaults().contains_key(name));
                prop_assert_eq!(hits, 1);

                // The last declaration decides the bucket.
                let last = decls.iter().rev().find(|k| k.name() == name).unwrap();
                prop_assert_eq!(schema.class_of(name), Some(last.class()));
            }
        }
    }
}
