//! Adapter contracts.
//!
//! An adapter type ([`AdapterKind`]) is registered once and describes the
//! keywords it accepts. For every request it binds a target (object plus an
//! optional field) into an [`Adapter`] instance, which owns the request's
//! state and is dropped with the response.
//!
//! Shared behaviour lives in [`AdapterBase`]; concrete adapters embed one and
//! hand it out through [`Adapter::base`], so the default methods of the
//! trait can build on it.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::block::Block;
use crate::content::{ContentObject, FieldSpec, FieldValue, ModelKind};
use crate::context::{Caller, TemplateContext, ACCESS_ADMIN};
use crate::forms::{BlockForm, CleanedData, EditForm, FormErrors};
use crate::keyword::{Keyword, KeywordError};
use crate::mutator::{InsertError, MoveError};
use crate::schema::AdapterSchema;
use crate::store::{ContentStore, StoreError};
use crate::Kwargs;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Adapter {identifier} requires a field name")]
    FieldRequired { identifier: String },

    #[error("Field {field} does not exist on {model}")]
    UnknownField { field: String, model: String },

    #[error("Missing required keyword argument {name}")]
    MissingKeyword { name: String },

    #[error("Block ID is required")]
    BlockIdRequired,

    #[error("Block not found; did you provide the correct block ID?")]
    BlockNotFound { id: String },

    #[error("Invalid block: {message}")]
    InvalidBlock { message: String },

    #[error("Cannot render {identifier} from kwargs")]
    CannotRenderFromKwargs { identifier: String },

    #[error("Invalid form")]
    Invalid { errors: FormErrors },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Insert(#[from] InsertError),
}

lazy_static! {
    static ref SLUG_STRIP: Regex = Regex::new(r"[^\w\s-]").expect("static regex");
    static ref SLUG_DASH: Regex = Regex::new(r"[-\s]+").expect("static regex");
}

/// ASCII slug: lowercase, punctuation dropped, whitespace runs as `-`.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.chars().filter(char::is_ascii).collect();
    let stripped = SLUG_STRIP.replace_all(&ascii, "");
    let lowered = stripped.trim().to_lowercase();
    SLUG_DASH
        .replace_all(&lowered, "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

/// Join slugified parts with `-`; the building block of element ids.
pub fn content_id_from_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| slugify(p.as_ref()))
        .collect::<Vec<_>>()
        .join("-")
}

/// What a toolbar button does once clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Edit,
    AdminLink,
    MoveUp,
    MoveDown,
    Add,
}

/// One entry of the edit affordance's toolbar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarButton {
    pub action: ButtonAction,
    pub label: String,
    /// Every permission the caller needs to see this button.
    pub permissions: Vec<String>,
}

impl ToolbarButton {
    pub fn new(action: ButtonAction, label: impl Into<String>) -> Self {
        Self {
            action,
            label: label.into(),
            permissions: vec![ACCESS_ADMIN.to_string()],
        }
    }

    pub fn visible_to(&self, caller: &Caller) -> bool {
        caller.has_perms(self.permissions.iter().map(String::as_str))
    }
}

/// The form an adapter edits through.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterForm {
    Fields(EditForm),
    Block(BlockForm),
}

/// Validated output of an [`AdapterForm`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cleaned {
    Fields(CleanedData),
    Block(Block),
}

impl AdapterForm {
    pub fn validate(&self, data: &Kwargs) -> Result<Cleaned, FormErrors> {
        match self {
            AdapterForm::Fields(form) => form.validate(data).map(Cleaned::Fields),
            AdapterForm::Block(form) => form.validate(data).map(Cleaned::Block),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            AdapterForm::Fields(form) => form.to_json(),
            AdapterForm::Block(form) => form.to_json(),
        }
    }
}

/// The object and field an adapter is bound to.
#[derive(Debug, Clone)]
pub struct Target {
    pub model: ModelKind,
    pub object: ContentObject,
    pub field_name: Option<String>,
}

impl Target {
    pub fn new(model: ModelKind, object: ContentObject, field_name: Option<String>) -> Self {
        Self {
            model,
            object,
            field_name,
        }
    }
}

/// A block an adapter edits, located in (or handed to) its field.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTarget {
    pub block_id: String,
    pub block: Block,
    /// Empty when the block was passed in directly instead of located.
    pub content_path: Vec<String>,
    pub index: Option<usize>,
}

/// State every bound adapter carries.
#[derive(Debug, Clone)]
pub struct AdapterBase {
    pub identifier: String,
    pub model: ModelKind,
    pub object: ContentObject,
    pub field_name: Option<String>,
    pub field: Option<FieldSpec>,
    pub caller: Caller,
    /// Schema defaults overlaid with the call-site values.
    pub kwargs: Kwargs,
}

impl AdapterBase {
    /// Merge defaults with `explicit` and resolve the field when the adapter
    /// type needs one.
    pub fn new(
        identifier: impl Into<String>,
        schema: &AdapterSchema,
        field_required: bool,
        target: Target,
        caller: Caller,
        explicit: Kwargs,
    ) -> Result<Self, AdapterError> {
        let identifier = identifier.into();
        let Target {
            model,
            object,
            field_name,
        } = target;

        let mut kwargs = schema.initial_kwargs();
        for (name, value) in explicit {
            kwargs.insert(name, value);
        }

        let (field_name, field) = if field_required {
            let name = field_name
                .filter(|n| !n.is_empty())
                .ok_or_else(|| AdapterError::FieldRequired {
                    identifier: identifier.clone(),
                })?;
            let spec = model
                .get_field(&name)
                .cloned()
                .ok_or_else(|| AdapterError::UnknownField {
                    field: name.clone(),
                    model: model.label(),
                })?;
            (Some(name), Some(spec))
        } else {
            (None, None)
        };

        Ok(Self {
            identifier,
            model,
            object,
            field_name,
            field,
            caller,
            kwargs,
        })
    }

    pub fn field_value(&self) -> Option<&FieldValue> {
        self.object.get(self.field_name.as_deref()?)
    }

    pub fn kwarg(&self, name: &str) -> Option<&JsonValue> {
        self.kwargs.get(name).filter(|v| !v.is_null())
    }

    /// Flag lookup; anything but `true` is off.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.kwargs.get(name), Some(JsonValue::Bool(true)))
    }

    /// Authenticated, with admin access and change permission on the kind.
    pub fn check_permissions(&self) -> bool {
        let change = self.model.change_permission();
        self.caller.has_perms([ACCESS_ADMIN, change.as_str()])
    }

    /// Identity of the owning object.
    pub fn model_data(&self) -> JsonValue {
        json!({
            "pk": self.object.key.pk,
            "app_label": self.model.app_label,
            "model_name": self.model.model_name,
            "verbose_name": self.model.verbose_name,
        })
    }

    pub fn field_verbose_name(&self) -> String {
        self.field
            .as_ref()
            .map(|f| f.verbose_name.clone())
            .unwrap_or_default()
    }
}

/// The registered, request-independent side of an adapter.
pub trait AdapterKind: Send + Sync {
    /// Registry key. Case-sensitive.
    fn identifier(&self) -> &str;

    /// Declared keywords, inherited ones first.
    fn keywords(&self) -> Result<Vec<Keyword>, KeywordError>;

    /// Object-level adapters return `false`.
    fn field_required(&self) -> bool {
        true
    }

    fn usage_description(&self) -> &str {
        ""
    }

    /// Name of the frontend editor that drives this adapter.
    fn js_constructor(&self) -> &str {
        "fedit.editors.BaseEditor"
    }

    /// Turn a prepared base into a live adapter.
    fn bind(&self, base: AdapterBase) -> Result<Box<dyn Adapter>, AdapterError>;

    /// Render content straight from kwargs when no target can be bound.
    fn render_from_kwargs(
        &self,
        _context: &TemplateContext,
        _kwargs: &Kwargs,
    ) -> Result<String, AdapterError> {
        Err(AdapterError::CannotRenderFromKwargs {
            identifier: self.identifier().to_string(),
        })
    }
}

/// A bound adapter.
pub trait Adapter: Send {
    fn base(&self) -> &AdapterBase;

    fn base_mut(&mut self) -> &mut AdapterBase;

    fn identifier(&self) -> &str {
        &self.base().identifier
    }

    /// `false` means render read-only content without the edit affordance.
    fn check_permissions(&self) -> bool {
        self.base().check_permissions()
    }

    /// DOM anchor the frontend patches after a successful edit.
    fn element_id(&self) -> String;

    fn header_title(&self) -> String {
        let base = self.base();
        format!("Edit {} '{}'", base.model.verbose_name, base.object.title)
    }

    /// CSS selector of an existing element to position the editor over.
    fn target_selector(&self) -> Option<String> {
        None
    }

    fn form(&self) -> AdapterForm;

    /// Apply validated data: persist and record the change.
    fn form_valid(&mut self, store: &dyn ContentStore, cleaned: Cleaned) -> Result<(), AdapterError>;

    /// Validate `data` and save it.
    fn submit(&mut self, store: &dyn ContentStore, data: &Kwargs) -> Result<(), AdapterError> {
        let cleaned = self
            .form()
            .validate(data)
            .map_err(|errors| AdapterError::Invalid { errors })?;
        self.form_valid(store, cleaned)
    }

    /// The plain content fragment, identical whether or not editing is allowed.
    fn render_content(&self, context: &TemplateContext) -> String;

    /// What the frontend needs to patch the page after an edit: which
    /// adapter, which element, which object, and the fresh content.
    fn response_data(&self, context: &TemplateContext) -> Kwargs {
        let mut data = Kwargs::new();
        data.insert("identifier".into(), JsonValue::String(self.identifier().to_string()));
        data.insert("element_id".into(), JsonValue::String(self.element_id()));
        data.insert("model".into(), self.base().model_data());
        data.insert("html".into(), JsonValue::String(self.render_content(context)));
        data
    }

    fn toolbar_buttons(&self) -> Vec<ToolbarButton> {
        vec![ToolbarButton::new(ButtonAction::Edit, "Edit")]
    }

    /// The located block, for adapters editing one.
    fn block_target(&self) -> Option<&BlockTarget> {
        None
    }
}
