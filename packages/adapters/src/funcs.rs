//! Function adapters.
//!
//! [`FuncAdapterKind`] wraps another adapter type. After a successful edit
//! the frontend calls a named function on a target element instead of
//! swapping content, so the response carries `func: {name, target}`.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{json, Value as JsonValue};

use fedit_core::{
    slugify, Adapter, AdapterBase, AdapterError, AdapterForm, AdapterKind, BlockTarget, Cleaned, ContentObject,
    ContentStore, Keyword, KeywordError, Kwargs, TemplateContext, ToolbarButton,
};

lazy_static! {
    static ref OBJECT_PLACEHOLDER: Regex = Regex::new(r"\{object\.(\w+)\}").expect("static regex");
}

/// Substitute `{object.pk}`, `{object.title}` and `{object.<field>}`.
fn format_target(target: &str, object: &ContentObject) -> String {
    OBJECT_PLACEHOLDER
        .replace_all(target, |caps: &Captures<'_>| match &caps[1] {
            "pk" => object.key.pk.clone(),
            "title" => object.title.clone(),
            "app_label" => object.key.app_label.clone(),
            "model_name" => object.key.model_name.clone(),
            field => object.render_field(field),
        })
        .into_owned()
}

pub struct FuncAdapterKind<K> {
    inner: K,
    identifier: String,
    js_function: Option<String>,
}

impl<K: AdapterKind> FuncAdapterKind<K> {
    /// `<inner>_func`, with the function named at the call site.
    pub fn new(inner: K) -> Self {
        Self {
            identifier: format!("{}_func", inner.identifier()),
            inner,
            js_function: None,
        }
    }

    /// Fix the function; call sites then only pass a `target`.
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.js_function = Some(name.into());
        self
    }
}

fn required_str(base: &AdapterBase, name: &str) -> Result<String, AdapterError> {
    match base.kwarg(name) {
        Some(JsonValue::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(other) if !other.is_string() => Ok(other.to_string()),
        _ => Err(AdapterError::MissingKeyword { name: name.to_string() }),
    }
}

impl<K: AdapterKind> AdapterKind for FuncAdapterKind<K> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn keywords(&self) -> Result<Vec<Keyword>, KeywordError> {
        let mut keywords = self.inner.keywords()?;
        if self.js_function.is_none() {
            keywords.push(
                Keyword::builder("name")
                    .help_text("the name of the javascript function to call")
                    .type_hint("str")
                    .build()?,
            );
        }
        keywords.push(
            Keyword::builder("target")
                .help_text("the target element to apply the function to")
                .type_hint("str")
                .build()?,
        );
        Ok(keywords)
    }

    fn field_required(&self) -> bool {
        self.inner.field_required()
    }

    fn usage_description(&self) -> &str {
        "This adapter calls a javascript function on a target element after a successful edit."
    }

    fn js_constructor(&self) -> &str {
        "fedit.editors.BaseFuncEditor"
    }

    fn bind(&self, base: AdapterBase) -> Result<Box<dyn Adapter>, AdapterError> {
        let name = match &self.js_function {
            Some(name) => name.clone(),
            None => required_str(&base, "name")?,
        };
        let target = required_str(&base, "target")?;
        let inner = self.inner.bind(base)?;
        Ok(Box::new(FuncAdapter { inner, name, target }))
    }

    fn render_from_kwargs(&self, context: &TemplateContext, kwargs: &Kwargs) -> Result<String, AdapterError> {
        self.inner.render_from_kwargs(context, kwargs)
    }
}

pub struct FuncAdapter {
    inner: Box<dyn Adapter>,
    name: String,
    target: String,
}

impl Adapter for FuncAdapter {
    fn base(&self) -> &AdapterBase {
        self.inner.base()
    }

    fn base_mut(&mut self) -> &mut AdapterBase {
        self.inner.base_mut()
    }

    fn check_permissions(&self) -> bool {
        self.inner.check_permissions()
    }

    fn element_id(&self) -> String {
        format!("{}-{}", self.inner.element_id(), slugify(&self.target))
    }

    fn header_title(&self) -> String {
        self.inner.header_title()
    }

    fn target_selector(&self) -> Option<String> {
        self.inner.target_selector()
    }

    fn form(&self) -> AdapterForm {
        self.inner.form()
    }

    fn form_valid(&mut self, store: &dyn ContentStore, cleaned: Cleaned) -> Result<(), AdapterError> {
        self.inner.form_valid(store, cleaned)
    }

    fn render_content(&self, context: &TemplateContext) -> String {
        self.inner.render_content(context)
    }

    fn response_data(&self, context: &TemplateContext) -> Kwargs {
        let mut data = self.inner.response_data(context);
        data.insert("element_id".into(), JsonValue::String(self.element_id()));
        data.insert(
            "func".into(),
            json!({
                "name": self.name,
                "target": format_target(&self.target, &self.base().object),
            }),
        );
        if let Some(target) = self.inner.block_target() {
            data.insert(
                "block".into(),
                serde_json::to_value(&target.block).unwrap_or(JsonValue::Null),
            );
        }
        data
    }

    fn toolbar_buttons(&self) -> Vec<ToolbarButton> {
        self.inner.toolbar_buttons()
    }

    fn block_target(&self) -> Option<&BlockTarget> {
        self.inner.block_target()
    }
}
