//! Request-scoped inputs: the template variable scope and the caller.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Kwargs;

/// Permission every editing surface requires in addition to the
/// model-specific change permission.
pub const ACCESS_ADMIN: &str = "admin.access_admin";

/// Variables visible to a template-tag invocation.
///
/// Lookups use dotted paths (`block.id`, `items.0.title`); a numeric
/// component indexes into arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateContext {
    vars: Kwargs,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(vars: Kwargs) -> Self {
        Self { vars }
    }

    /// Build a context from a JSON object. Non-objects yield an empty scope.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(vars) => Self { vars },
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.vars.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Resolve a dotted variable path.
    pub fn resolve(&self, path: &str) -> Option<&JsonValue> {
        let mut parts = path.split('.');
        let mut current = self.vars.get(parts.next()?)?;
        for part in parts {
            current = match current {
                JsonValue::Object(map) => map.get(part)?,
                JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// A copy of this scope with `extra` layered on top.
    pub fn merged(&self, extra: &Kwargs) -> Self {
        let mut vars = self.vars.clone();
        for (k, v) in extra {
            vars.insert(k.clone(), v.clone());
        }
        Self { vars }
    }

    pub fn as_map(&self) -> &Kwargs {
        &self.vars
    }
}

/// The actor behind a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// `None` for anonymous callers.
    pub username: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    /// Key of the caller's server-side session, if one exists.
    #[serde(default)]
    pub session_key: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    /// An authenticated superuser; holds every permission.
    pub fn superuser(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            is_superuser: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    #[must_use]
    pub fn with_session(mut self, key: impl Into<String>) -> Self {
        self.session_key = Some(key.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn has_perm(&self, permission: &str) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        self.is_superuser || self.permissions.contains(permission)
    }

    pub fn has_perms<'a>(&self, permissions: impl IntoIterator<Item = &'a str>) -> bool {
        permissions.into_iter().all(|p| self.has_perm(p))
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_dotted_paths() {
        let ctx = TemplateContext::from_json(json!({
            "block": {"id": "abc", "value": {"items": ["x", "y"]}},
            "title": "Hello"
        }));

        assert_eq!(ctx.resolve("title"), Some(&json!("Hello")));
        assert_eq!(ctx.resolve("block.id"), Some(&json!("abc")));
        assert_eq!(ctx.resolve("block.value.items.1"), Some(&json!("y")));
        assert_eq!(ctx.resolve("block.missing"), None);
        assert_eq!(ctx.resolve("title.length"), None);
    }

    #[test]
    fn merged_layers_extra_on_top() {
        let ctx = TemplateContext::new().with("a", 1).with("b", 2);
        let mut extra = Kwargs::new();
        extra.insert("b".to_string(), json!(3));

        let merged = ctx.merged(&extra);
        assert_eq!(merged.get("a"), Some(&json!(1)));
        assert_eq!(merged.get("b"), Some(&json!(3)));
        assert_eq!(ctx.get("b"), Some(&json!(2)));
    }

    #[test]
    fn anonymous_caller_has_no_permissions() {
        let caller = Caller::anonymous().with_permission(ACCESS_ADMIN);
        assert!(!caller.is_authenticated());
        assert!(!caller.has_perm(ACCESS_ADMIN));
    }

    #[test]
    fn superuser_has_every_permission() {
        let caller = Caller::superuser("admin");
        assert!(caller.has_perms([ACCESS_ADMIN, "pages.change_page"]));
    }

    #[test]
    fn regular_user_needs_explicit_permissions() {
        let caller = Caller::user("editor").with_permission(ACCESS_ADMIN);
        assert!(caller.has_perm(ACCESS_ADMIN));
        assert!(!caller.has_perms([ACCESS_ADMIN, "pages.change_page"]));
    }
}
