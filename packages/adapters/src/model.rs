//! The `model` adapter: edits an object as a whole.

use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};

use fedit_core::{
    persist, Adapter, AdapterBase, AdapterError, AdapterForm, AdapterKind, Cleaned, ContentStore, EditForm,
    Keyword, KeywordError, LogEntry, TemplateContext,
};

pub const MODEL_IDENTIFIER: &str = "model";

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelAdapterKind;

impl AdapterKind for ModelAdapterKind {
    fn identifier(&self) -> &str {
        MODEL_IDENTIFIER
    }

    fn keywords(&self) -> Result<Vec<Keyword>, KeywordError> {
        Ok(Vec::new())
    }

    fn field_required(&self) -> bool {
        false
    }

    fn usage_description(&self) -> &str {
        "This adapter is used for directly editing a model instance."
    }

    fn bind(&self, base: AdapterBase) -> Result<Box<dyn Adapter>, AdapterError> {
        Ok(Box::new(ModelAdapter { base }))
    }
}

pub struct ModelAdapter {
    base: AdapterBase,
}

impl Adapter for ModelAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AdapterBase {
        &mut self.base
    }

    fn element_id(&self) -> String {
        let key = &self.base.object.key;
        format!("model-{}-{}-{}", key.app_label, key.model_name, key.pk)
    }

    fn header_title(&self) -> String {
        format!("Edit model {} '{}'", self.base.model.verbose_name, self.base.object.title)
    }

    fn form(&self) -> AdapterForm {
        let fields = self.base.model.editable_fields();
        let size = if fields.len() > 4 { "large" } else { "medium" };
        AdapterForm::Fields(EditForm::for_fields(fields, &self.base.object).attr("form_size", size))
    }

    fn form_valid(&mut self, store: &dyn ContentStore, cleaned: Cleaned) -> Result<(), AdapterError> {
        let Cleaned::Fields(data) = cleaned else {
            return Err(AdapterError::InvalidBlock {
                message: "model adapters take field data".into(),
            });
        };

        let mut changed = BTreeMap::new();
        for (name, value) in data {
            if self.base.object.get(&name) != Some(&value) {
                changed.insert(name.clone(), JsonValue::String(value.render()));
            }
            self.base.object.set(name, value);
        }

        let persisted = persist(store, &self.base.model, &self.base.object, &self.base.caller)?;
        let key = self.base.object.key.clone();
        let entry = LogEntry::new("fedit.edit_model", key.clone(), &self.base.caller)
            .title(self.header_title())
            .data(json!({
                "model_id": key.pk,
                "model_name": key.model_name,
                "app_label": key.app_label,
                "model_verbose": self.base.model.verbose_name,
                "changed": changed,
            }))
            .revision(persisted.revision());
        store.log_action(entry)?;
        log::info!("{} edited by {}", key, self.base.caller.username());
        Ok(())
    }

    /// The title followed by each editable field, one per line.
    fn render_content(&self, _context: &TemplateContext) -> String {
        let mut lines = vec![self.base.object.title.clone()];
        lines.extend(
            self.base
                .model
                .editable_fields()
                .into_iter()
                .map(|f| self.base.object.render_field(&f.name))
                .filter(|s| !s.is_empty()),
        );
        lines.join("\n")
    }
}
