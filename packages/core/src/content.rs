//! The content model the adapters edit.
//!
//! A [`ModelKind`] describes a type of content object: its fields, which of
//! them hold block trees, and whether saves go to a draft revision or
//! straight to the live object. [`ContentObject`] is one loaded instance.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::block::BlockValue;

/// The value type of a field, which also decides its form validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    RichText,
    Integer,
    Boolean,
    Blocks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub verbose_name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Block types allowed at the top level of a `Blocks` field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_types: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            verbose_name: name.replace('_', " "),
            name,
            kind,
            required: false,
            block_types: Vec::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    #[must_use]
    pub fn block_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_blocks(&self) -> bool {
        self.kind == FieldKind::Blocks
    }
}

/// Per block-type editing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub label: String,
    /// `false` hides the edit affordance for blocks of this type.
    #[serde(default = "default_true")]
    pub feditable: bool,
    /// Size hint for the editing form (`"large"`, `"full"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_size: Option<String>,
}

fn default_true() -> bool {
    true
}

impl BlockDefinition {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            feditable: true,
            form_size: None,
        }
    }

    #[must_use]
    pub fn not_feditable(mut self) -> Self {
        self.feditable = false;
        self
    }

    #[must_use]
    pub fn form_size(mut self, size: impl Into<String>) -> Self {
        self.form_size = Some(size.into());
        self
    }
}

/// A type of content object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelKind {
    pub app_label: String,
    pub model_name: String,
    pub verbose_name: String,
    /// Saves create or update a draft revision instead of the live object.
    #[serde(default)]
    pub supports_drafts: bool,
    pub fields: Vec<FieldSpec>,
    /// Fields offered by the object-level editor; empty means all.
    #[serde(default)]
    pub edit_fields: Vec<String>,
    #[serde(default)]
    pub block_definitions: BTreeMap<String, BlockDefinition>,
}

impl ModelKind {
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        Self {
            app_label: app_label.into(),
            verbose_name: model_name.clone(),
            model_name,
            supports_drafts: false,
            fields: Vec::new(),
            edit_fields: Vec::new(),
            block_definitions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    #[must_use]
    pub fn with_drafts(mut self) -> Self {
        self.supports_drafts = true;
        self
    }

    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    #[must_use]
    pub fn edit_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edit_fields = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn block(mut self, block_type: impl Into<String>, definition: BlockDefinition) -> Self {
        self.block_definitions.insert(block_type.into(), definition);
        self
    }

    /// `app_label.model_name`
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// The permission a caller needs to change objects of this kind.
    pub fn change_permission(&self) -> String {
        format!("{}.change_{}", self.app_label, self.model_name)
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Definition for a block type; unknown types get a default one labelled
    /// with the type name.
    pub fn block_definition(&self, block_type: &str) -> BlockDefinition {
        self.block_definitions
            .get(block_type)
            .cloned()
            .unwrap_or_else(|| BlockDefinition::new(block_type))
    }

    /// Specs of the fields the object-level editor shows.
    pub fn editable_fields(&self) -> Vec<&FieldSpec> {
        if self.edit_fields.is_empty() {
            return self.fields.iter().collect();
        }
        self.edit_fields
            .iter()
            .filter_map(|name| self.get_field(name))
            .collect()
    }
}

/// Identity of one content object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub app_label: String,
    pub model_name: String,
    pub pk: String,
}

impl ObjectKey {
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>, pk: impl fmt::Display) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into(),
            pk: pk.to_string(),
        }
    }

    pub fn of(kind: &ModelKind, pk: impl fmt::Display) -> Self {
        Self::new(kind.app_label.clone(), kind.model_name.clone(), pk)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.app_label, self.model_name, self.pk)
    }
}

/// Stored value of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Blocks(BlockValue),
    Value(JsonValue),
}

impl FieldValue {
    pub fn as_blocks(&self) -> Option<&BlockValue> {
        match self {
            FieldValue::Blocks(b) => Some(b),
            FieldValue::Value(_) => None,
        }
    }

    /// Text used for the fallback rendering and for audit entries.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Blocks(b) => b.render(),
            FieldValue::Value(JsonValue::Null) => String::new(),
            FieldValue::Value(JsonValue::String(s)) => s.clone(),
            FieldValue::Value(v) => v.to_string(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Blocks(b) => serde_json::to_value(b).unwrap_or(JsonValue::Null),
            FieldValue::Value(v) => v.clone(),
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        FieldValue::Value(value)
    }
}

impl From<BlockValue> for FieldValue {
    fn from(value: BlockValue) -> Self {
        FieldValue::Blocks(value)
    }
}

/// One loaded content object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentObject {
    pub key: ObjectKey,
    pub title: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl ContentObject {
    pub fn new(key: ObjectKey, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn blocks(&self, field: &str) -> Option<&BlockValue> {
        self.fields.get(field).and_then(FieldValue::as_blocks)
    }

    pub fn blocks_mut(&mut self, field: &str) -> Option<&mut BlockValue> {
        match self.fields.get_mut(field)? {
            FieldValue::Blocks(b) => Some(b),
            FieldValue::Value(_) => None,
        }
    }

    /// Plain rendering of one field; missing fields render empty.
    pub fn render_field(&self, field: &str) -> String {
        self.fields.get(field).map(FieldValue::render).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use serde_json::json;

    fn page_kind() -> ModelKind {
        ModelKind::new("pages", "blogpage")
            .verbose_name("blog page")
            .with_drafts()
            .field(FieldSpec::new("title", FieldKind::Text { max_length: Some(20) }).required())
            .field(FieldSpec::new("body", FieldKind::Blocks).block_types(["heading", "text"]))
            .edit_fields(["title"])
            .block("heading", BlockDefinition::new("Heading").form_size("large"))
    }

    #[test]
    fn kind_labels_and_permissions() {
        let kind = page_kind();
        assert_eq!(kind.label(), "pages.blogpage");
        assert_eq!(kind.change_permission(), "pages.change_blogpage");
        assert_eq!(kind.get_field("body").unwrap().block_types, vec!["heading", "text"]);
        assert_eq!(kind.editable_fields().len(), 1);
    }

    #[test]
    fn unknown_block_types_get_default_definition() {
        let kind = page_kind();
        assert_eq!(kind.block_definition("heading").form_size.as_deref(), Some("large"));
        let fallback = kind.block_definition("quote");
        assert_eq!(fallback.label, "quote");
        assert!(fallback.feditable);
    }

    #[test]
    fn field_values_deserialize_untagged() {
        let blocks: FieldValue =
            serde_json::from_value(json!({"kind": "stream", "value": []})).unwrap();
        assert_eq!(blocks, FieldValue::Blocks(BlockValue::Stream(vec![])));

        let scalar: FieldValue = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(scalar, FieldValue::Value(json!("hello")));
    }

    #[test]
    fn render_field() {
        let object = ContentObject::new(ObjectKey::new("pages", "blogpage", 1), "Post")
            .with_field("title", json!("Hello"))
            .with_field("views", json!(12))
            .with_field(
                "body",
                BlockValue::Stream(vec![Block::leaf("a", "text", "Para")]),
            );

        assert_eq!(object.render_field("title"), "Hello");
        assert_eq!(object.render_field("views"), "12");
        assert_eq!(object.render_field("body"), "Para");
        assert_eq!(object.render_field("missing"), "");
        assert_eq!(object.key.to_string(), "pages.blogpage:1");
    }
}
