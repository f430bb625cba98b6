//! The `field` adapter: edits one field of an object.

use serde_json::json;

use fedit_core::{
    persist, Adapter, AdapterBase, AdapterError, AdapterForm, AdapterKind, Cleaned, ContentStore, EditForm,
    FieldValue, Keyword, KeywordError, LogEntry, TemplateContext,
};

pub const FIELD_IDENTIFIER: &str = "field";

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldAdapterKind;

impl AdapterKind for FieldAdapterKind {
    fn identifier(&self) -> &str {
        FIELD_IDENTIFIER
    }

    fn keywords(&self) -> Result<Vec<Keyword>, KeywordError> {
        Ok(Vec::new())
    }

    fn usage_description(&self) -> &str {
        "This adapter is used to edit a single field of a model instance."
    }

    fn js_constructor(&self) -> &str {
        "fedit.editors.FieldEditor"
    }

    fn bind(&self, base: AdapterBase) -> Result<Box<dyn Adapter>, AdapterError> {
        Ok(Box::new(FieldAdapter::new(base)))
    }
}

pub struct FieldAdapter {
    base: AdapterBase,
    /// Value at bind time, recorded as `old` in the audit log.
    initial: Option<FieldValue>,
}

impl FieldAdapter {
    pub fn new(base: AdapterBase) -> Self {
        let initial = base.field_value().cloned();
        Self { base, initial }
    }

    fn field_name(&self) -> &str {
        self.base.field_name.as_deref().unwrap_or_default()
    }
}

impl Adapter for FieldAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AdapterBase {
        &mut self.base
    }

    fn element_id(&self) -> String {
        let key = &self.base.object.key;
        format!(
            "field-{}-{}-{}-{}",
            self.field_name(),
            key.app_label,
            key.model_name,
            key.pk
        )
    }

    fn header_title(&self) -> String {
        format!(
            "Edit field {} for {} '{}'",
            self.base.field_verbose_name(),
            self.base.model.verbose_name,
            self.base.object.title
        )
    }

    fn form(&self) -> AdapterForm {
        let mut form = EditForm::for_fields(self.base.field.iter(), &self.base.object);
        if let Some(spec) = &self.base.field {
            if matches!(spec.kind, fedit_core::FieldKind::RichText | fedit_core::FieldKind::Blocks) {
                form = form.attr("form_size", "large");
            }
        }
        AdapterForm::Fields(form)
    }

    fn form_valid(&mut self, store: &dyn ContentStore, cleaned: Cleaned) -> Result<(), AdapterError> {
        let Cleaned::Fields(mut data) = cleaned else {
            return Err(AdapterError::InvalidBlock {
                message: "field adapters take field data".into(),
            });
        };
        let name = self.field_name().to_string();
        let Some(value) = data.remove(&name) else {
            return Ok(());
        };

        let old = self.initial.as_ref().map(FieldValue::render).unwrap_or_default();
        let new = value.render();
        self.base.object.set(name.clone(), value);
        let persisted = persist(store, &self.base.model, &self.base.object, &self.base.caller)?;

        let key = self.base.object.key.clone();
        let entry = LogEntry::new("fedit.edit_field", key.clone(), &self.base.caller)
            .title(self.header_title())
            .data(json!({
                "verbose_field_name": self.base.field_verbose_name(),
                "field_name": name,
                "model_id": key.pk,
                "model_name": key.model_name,
                "app_label": key.app_label,
                "model_verbose": self.base.model.verbose_name,
                "model_string": self.base.object.title,
                "old": old,
                "new": new,
            }))
            .revision(persisted.revision());
        store.log_action(entry)?;
        log::info!("field {} of {} edited by {}", name, key, self.base.caller.username());

        self.initial = self.base.field_value().cloned();
        Ok(())
    }

    fn render_content(&self, _context: &TemplateContext) -> String {
        self.base.object.render_field(self.field_name())
    }
}
