//! Edit forms.
//!
//! Forms are built from [`FieldSpec`]s with the object's current values as
//! initial data. Validation turns submitted JSON into typed
//! [`FieldValue`]s or a [`FormErrors`] map that the caller sends back so the
//! editor can show errors inline.
//!
//! Block submissions are checked against the shape of the block they
//! replace: a leaf stays a leaf, struct fields keep their names and ordered
//! children keep their ids. Submitted children without a known id are new
//! blocks and get fresh ids.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::block::{Block, BlockValue};
use crate::content::{BlockDefinition, ContentObject, FieldKind, FieldSpec, FieldValue};
use crate::Kwargs;

/// Field name to error messages.
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// Validated values keyed by field name.
pub type CleanedData = BTreeMap<String, FieldValue>;

fn add_error(errors: &mut FormErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

fn error_count(errors: &FormErrors) -> usize {
    errors.values().map(Vec::len).sum()
}

fn capfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub initial: Option<FieldValue>,
}

impl FormField {
    pub fn from_spec(spec: &FieldSpec, initial: Option<FieldValue>) -> Self {
        Self {
            name: spec.name.clone(),
            label: capfirst(&spec.verbose_name),
            kind: spec.kind.clone(),
            required: spec.required,
            initial,
        }
    }

    fn required_message(&self) -> String {
        format!("{} is required", self.label)
    }

    fn invalid_message(&self) -> String {
        format!("Invalid {}", self.name)
    }

    /// Validate one submitted value. `None` means the key was not submitted.
    pub fn clean(&self, raw: Option<&JsonValue>, errors: &mut FormErrors) -> Option<FieldValue> {
        match &self.kind {
            FieldKind::Text { max_length } => {
                let text = self.clean_text(raw, errors)?;
                if let Some(max) = max_length {
                    if text.chars().count() > *max {
                        add_error(
                            errors,
                            &self.name,
                            format!("Ensure this value has at most {} characters", max),
                        );
                        return None;
                    }
                }
                Some(FieldValue::Value(JsonValue::String(text)))
            }
            FieldKind::RichText => self
                .clean_text(raw, errors)
                .map(|text| FieldValue::Value(JsonValue::String(text))),
            FieldKind::Integer => self.clean_integer(raw, errors),
            FieldKind::Boolean => self.clean_boolean(raw, errors),
            FieldKind::Blocks => self.clean_blocks(raw, errors),
        }
    }

    fn clean_text(&self, raw: Option<&JsonValue>, errors: &mut FormErrors) -> Option<String> {
        let text = match raw {
            None | Some(JsonValue::Null) => String::new(),
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            Some(JsonValue::Bool(b)) => b.to_string(),
            Some(_) => {
                add_error(errors, &self.name, self.invalid_message());
                return None;
            }
        };
        if self.required && text.trim().is_empty() {
            add_error(errors, &self.name, self.required_message());
            return None;
        }
        Some(text)
    }

    fn clean_integer(&self, raw: Option<&JsonValue>, errors: &mut FormErrors) -> Option<FieldValue> {
        let parsed = match raw {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) if s.trim().is_empty() => None,
            Some(JsonValue::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Some(i),
                Err(_) => {
                    add_error(errors, &self.name, self.invalid_message());
                    return None;
                }
            },
            Some(JsonValue::Number(n)) => match n.as_i64() {
                Some(i) => Some(i),
                None => {
                    add_error(errors, &self.name, self.invalid_message());
                    return None;
                }
            },
            Some(_) => {
                add_error(errors, &self.name, self.invalid_message());
                return None;
            }
        };

        match parsed {
            Some(i) => Some(FieldValue::Value(JsonValue::from(i))),
            None if self.required => {
                add_error(errors, &self.name, self.required_message());
                None
            }
            None => Some(FieldValue::Value(JsonValue::Null)),
        }
    }

    fn clean_boolean(&self, raw: Option<&JsonValue>, errors: &mut FormErrors) -> Option<FieldValue> {
        let value = match raw {
            None | Some(JsonValue::Null) => false,
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => true,
                "false" | "off" | "0" | "" => false,
                _ => {
                    add_error(errors, &self.name, self.invalid_message());
                    return None;
                }
            },
            Some(_) => {
                add_error(errors, &self.name, self.invalid_message());
                return None;
            }
        };
        if self.required && !value {
            add_error(errors, &self.name, self.required_message());
            return None;
        }
        Some(FieldValue::Value(JsonValue::Bool(value)))
    }

    fn clean_blocks(&self, raw: Option<&JsonValue>, errors: &mut FormErrors) -> Option<FieldValue> {
        let existing = self.initial.as_ref().and_then(FieldValue::as_blocks);
        let raw = match raw {
            None | Some(JsonValue::Null) => {
                return match existing {
                    Some(blocks) if !(self.required && blocks.is_empty()) => {
                        Some(FieldValue::Blocks(blocks.clone()))
                    }
                    _ if self.required => {
                        add_error(errors, &self.name, self.required_message());
                        None
                    }
                    _ => Some(FieldValue::Blocks(BlockValue::Stream(Vec::new()))),
                };
            }
            Some(raw) => raw,
        };

        let before = error_count(errors);
        let cleaned = match existing {
            Some(shape) => clean_block_value(shape, raw, &self.name, errors),
            None => match serde_json::from_value::<BlockValue>(raw.clone()) {
                Ok(mut value) => {
                    value.assign_missing_ids();
                    value
                }
                Err(_) => {
                    add_error(errors, &self.name, self.invalid_message());
                    return None;
                }
            },
        };
        (error_count(errors) == before).then_some(FieldValue::Blocks(cleaned))
    }
}

/// A form over one or more model fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditForm {
    pub fields: Vec<FormField>,
    /// Rendering hints such as the form size.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl EditForm {
    /// A form for `specs`, initialised from `object`.
    pub fn for_fields<'a>(specs: impl IntoIterator<Item = &'a FieldSpec>, object: &ContentObject) -> Self {
        let fields = specs
            .into_iter()
            .map(|spec| FormField::from_spec(spec, object.get(&spec.name).cloned()))
            .collect();
        Self {
            fields,
            attrs: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate submitted data. Every field is checked so the error map is
    /// complete.
    pub fn validate(&self, data: &Kwargs) -> Result<CleanedData, FormErrors> {
        let mut errors = FormErrors::new();
        let mut cleaned = CleanedData::new();
        for field in &self.fields {
            if let Some(value) = field.clean(data.get(&field.name), &mut errors) {
                cleaned.insert(field.name.clone(), value);
            }
        }
        if errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(errors)
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// A form editing a single block in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockForm {
    pub block: Block,
    pub definition: BlockDefinition,
}

impl BlockForm {
    pub fn new(block: Block, definition: BlockDefinition) -> Self {
        Self { block, definition }
    }

    /// Validate `data["value"]` against the block's current shape. The id
    /// and type of the block are kept.
    pub fn validate(&self, data: &Kwargs) -> Result<Block, FormErrors> {
        let mut errors = FormErrors::new();
        let Some(raw) = data.get("value") else {
            add_error(&mut errors, "value", format!("{} is required", capfirst(&self.definition.label)));
            return Err(errors);
        };

        let value = clean_block_value(&self.block.value, raw, "value", &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Block {
            value,
            ..self.block.clone()
        })
    }

    pub fn to_json(&self) -> JsonValue {
        let mut json = serde_json::to_value(self).unwrap_or(JsonValue::Null);
        if let (Some(size), Some(map)) = (&self.definition.form_size, json.as_object_mut()) {
            map.insert("form_size".into(), JsonValue::String(size.clone()));
        }
        json
    }
}

/// Parse blocks submitted for insertion.
///
/// `data["blocks"]` is a list of serialized blocks (a single block is
/// accepted too). Types must be in `allowed` unless it is empty. Ids are
/// always generated.
pub fn new_blocks_from(data: &Kwargs, allowed: &[String]) -> Result<Vec<Block>, FormErrors> {
    let mut errors = FormErrors::new();
    let items = match data.get("blocks") {
        Some(JsonValue::Array(items)) => items.clone(),
        Some(item @ JsonValue::Object(_)) => vec![item.clone()],
        _ => {
            add_error(&mut errors, "blocks", "Blocks is required");
            return Err(errors);
        }
    };
    if items.is_empty() {
        add_error(&mut errors, "blocks", "Blocks is required");
        return Err(errors);
    }

    let mut blocks = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let key = format!("blocks.{}", i);
        match serde_json::from_value::<Block>(item) {
            Ok(mut block) => {
                if !allowed.is_empty() && !allowed.contains(&block.block_type) {
                    add_error(&mut errors, &key, format!("Invalid block type {}", block.block_type));
                    continue;
                }
                block.id = Some(Block::generate_id());
                block.assign_missing_ids();
                blocks.push(block);
            }
            Err(e) => add_error(&mut errors, &key, format!("Invalid block: {}", e)),
        }
    }

    if errors.is_empty() {
        Ok(blocks)
    } else {
        Err(errors)
    }
}

/// Accept both the bare and the tagged (`{"kind": .., "value": ..}`) form.
fn untag<'a>(submitted: &'a JsonValue, kind: &str) -> &'a JsonValue {
    match submitted {
        JsonValue::Object(map) if map.get("kind").and_then(JsonValue::as_str) == Some(kind) => {
            map.get("value").unwrap_or(&JsonValue::Null)
        }
        _ => submitted,
    }
}

/// Validate `submitted` against the shape of `existing`.
///
/// Errors are recorded under `path` (dotted); the returned value is only
/// meaningful when nothing was added to `errors`.
pub fn clean_block_value(
    existing: &BlockValue,
    submitted: &JsonValue,
    path: &str,
    errors: &mut FormErrors,
) -> BlockValue {
    match existing {
        BlockValue::Leaf(_) => match untag(submitted, "leaf") {
            JsonValue::Object(_) | JsonValue::Array(_) => {
                add_error(errors, path, format!("Invalid {}", path));
                existing.clone()
            }
            scalar => BlockValue::Leaf(scalar.clone()),
        },

        BlockValue::Struct(fields) => {
            let by_name: BTreeMap<String, JsonValue> = match untag(submitted, "struct") {
                JsonValue::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                JsonValue::Array(items) => items
                    .iter()
                    .filter_map(|item| {
                        let name = item.get("type")?.as_str()?;
                        Some((name.to_string(), item.get("value")?.clone()))
                    })
                    .collect(),
                _ => {
                    add_error(errors, path, format!("Invalid {}", path));
                    return existing.clone();
                }
            };

            BlockValue::Struct(
                fields
                    .iter()
                    .map(|field| {
                        let value = match by_name.get(&field.block_type) {
                            Some(sub) => clean_block_value(
                                &field.value,
                                sub,
                                &format!("{}.{}", path, field.block_type),
                                errors,
                            ),
                            None => field.value.clone(),
                        };
                        Block {
                            value,
                            ..field.clone()
                        }
                    })
                    .collect(),
            )
        }

        BlockValue::List(children) | BlockValue::Stream(children) => {
            let tag = if matches!(existing, BlockValue::List(_)) { "list" } else { "stream" };
            let JsonValue::Array(items) = untag(submitted, tag) else {
                add_error(errors, path, format!("Invalid {}", path));
                return existing.clone();
            };

            let mut cleaned = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                let known = item
                    .get("id")
                    .and_then(JsonValue::as_str)
                    .and_then(|id| children.iter().find(|c| c.id.as_deref() == Some(id)));

                match known {
                    Some(child) => {
                        let sub = item.get("value").unwrap_or(&JsonValue::Null);
                        cleaned.push(Block {
                            value: clean_block_value(&child.value, sub, &item_path, errors),
                            ..child.clone()
                        });
                    }
                    None => match serde_json::from_value::<Block>(item.clone()) {
                        Ok(mut block) => {
                            block.id = Some(Block::generate_id());
                            block.assign_missing_ids();
                            cleaned.push(block);
                        }
                        Err(_) => add_error(errors, &item_path, format!("Invalid {}", item_path)),
                    },
                }
            }

            match existing {
                BlockValue::List(_) => BlockValue::List(cleaned),
                _ => BlockValue::Stream(cleaned),
            }
        }
    }
}
