//! The `block` and `dom-block` adapters: edit one block of a block-tree
//! field.
//!
//! The block is either handed over as the `block` keyword or located by
//! `block_id` in the bound field. Located blocks know their parent, so the
//! endpoint can move them or insert siblings after them.

use serde_json::{json, Value as JsonValue};

use fedit_core::{
    find_block, persist, Adapter, AdapterBase, AdapterError, AdapterForm, AdapterKind, Block, BlockDefinition,
    BlockForm, BlockTarget, ButtonAction, Cleaned, ContentStore, Keyword, KeywordError, Kwargs, LogEntry,
    TemplateContext, ToolbarButton,
};

pub const BLOCK_IDENTIFIER: &str = "block";
pub const DOM_BLOCK_IDENTIFIER: &str = "dom-block";

pub(crate) fn block_keywords() -> Result<Vec<Keyword>, KeywordError> {
    Ok(vec![
        Keyword::builder("block")
            .optional()
            .help_text("the block to edit; located through block_id when omitted")
            .type_hint("Block")
            .build()?,
        Keyword::builder("block_id")
            .optional()
            .help_text("the id of the block to edit, required if block is not given or has no id")
            .type_hint("str")
            .build()?,
        Keyword::builder("admin")
            .absolute()
            .help_text("if passed, adds a link to the block in the admin")
            .build()?,
        Keyword::builder("movable")
            .absolute()
            .help_text("if passed, adds buttons to move the block up and down")
            .build()?,
        Keyword::builder("addable")
            .absolute()
            .help_text("if passed, adds a button to insert new blocks after this one")
            .build()?,
    ])
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockAdapterKind {
    dom_positioned: bool,
}

impl BlockAdapterKind {
    /// Wraps the rendered block.
    pub fn inline() -> Self {
        Self { dom_positioned: false }
    }

    /// Positions the editor over an element the page already renders.
    pub fn dom_positioned() -> Self {
        Self { dom_positioned: true }
    }
}

impl AdapterKind for BlockAdapterKind {
    fn identifier(&self) -> &str {
        if self.dom_positioned {
            DOM_BLOCK_IDENTIFIER
        } else {
            BLOCK_IDENTIFIER
        }
    }

    fn keywords(&self) -> Result<Vec<Keyword>, KeywordError> {
        block_keywords()
    }

    fn usage_description(&self) -> &str {
        if self.dom_positioned {
            "This adapter is used to edit a block that is already rendered on the page."
        } else {
            "This adapter is used to edit a block of a block-tree field."
        }
    }

    fn js_constructor(&self) -> &str {
        if self.dom_positioned {
            "fedit.editors.DomPositionedBlockEditor"
        } else {
            "fedit.editors.BlockEditor"
        }
    }

    fn bind(&self, base: AdapterBase) -> Result<Box<dyn Adapter>, AdapterError> {
        Ok(Box::new(BlockAdapter::new(base, self.dom_positioned)?))
    }

    fn render_from_kwargs(&self, _context: &TemplateContext, kwargs: &Kwargs) -> Result<String, AdapterError> {
        let raw = kwargs
            .get("block")
            .filter(|v| !v.is_null())
            .ok_or_else(|| AdapterError::InvalidBlock {
                message: "Block is required".into(),
            })?;
        Ok(parse_block(raw)?.render())
    }
}

fn parse_block(raw: &JsonValue) -> Result<Block, AdapterError> {
    serde_json::from_value(raw.clone()).map_err(|e| AdapterError::InvalidBlock {
        message: e.to_string(),
    })
}

fn id_from(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct BlockAdapter {
    base: AdapterBase,
    target: BlockTarget,
    definition: BlockDefinition,
    dom_positioned: bool,
}

impl BlockAdapter {
    pub fn new(mut base: AdapterBase, dom_positioned: bool) -> Result<Self, AdapterError> {
        let field_name = base.field_name.clone().unwrap_or_default();
        if !base.field.as_ref().is_some_and(|f| f.is_blocks()) {
            return Err(AdapterError::InvalidBlock {
                message: format!("{} is not a block field", field_name),
            });
        }

        let given = match base.kwargs.remove("block").filter(|v| !v.is_null()) {
            Some(raw) => Some(parse_block(&raw)?),
            None => None,
        };
        let block_id = given
            .as_ref()
            .and_then(|b| b.id.clone())
            .or_else(|| id_from(base.kwargs.get("block_id")));

        let target = match (given, block_id) {
            (_, None) => return Err(AdapterError::BlockIdRequired),
            (given, Some(id)) => {
                let located = base.object.blocks(&field_name).and_then(|root| find_block(&id, root));
                match (located, given) {
                    (Some(found), _) => BlockTarget {
                        block_id: id,
                        block: found.block.clone(),
                        content_path: found.content_path,
                        index: Some(found.index),
                    },
                    (None, Some(block)) => BlockTarget {
                        block_id: id,
                        block,
                        content_path: Vec::new(),
                        index: None,
                    },
                    (None, None) => return Err(AdapterError::BlockNotFound { id }),
                }
            }
        };

        base.kwargs
            .insert("block_id".into(), JsonValue::String(target.block_id.clone()));
        let definition = base.model.block_definition(&target.block.block_type);

        Ok(Self {
            base,
            target,
            definition,
            dom_positioned,
        })
    }

    pub fn definition(&self) -> &BlockDefinition {
        &self.definition
    }

    fn field_name(&self) -> &str {
        self.base.field_name.as_deref().unwrap_or_default()
    }
}

impl Adapter for BlockAdapter {
    fn base(&self) -> &AdapterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AdapterBase {
        &mut self.base
    }

    fn check_permissions(&self) -> bool {
        self.base.check_permissions() && self.definition.feditable
    }

    fn element_id(&self) -> String {
        format!("block-{}-section", self.target.block_id)
    }

    fn header_title(&self) -> String {
        format!(
            "Edit block {} for {} '{}'",
            self.definition.label, self.base.model.verbose_name, self.base.object.title
        )
    }

    fn target_selector(&self) -> Option<String> {
        self.dom_positioned.then(|| format!("#{}", self.element_id()))
    }

    fn form(&self) -> AdapterForm {
        AdapterForm::Block(BlockForm::new(self.target.block.clone(), self.definition.clone()))
    }

    fn form_valid(&mut self, store: &dyn ContentStore, cleaned: Cleaned) -> Result<(), AdapterError> {
        let Cleaned::Block(block) = cleaned else {
            return Err(AdapterError::InvalidBlock {
                message: "block adapters take block data".into(),
            });
        };
        let id = self.target.block_id.clone();
        let field_name = self.field_name().to_string();

        let root = self
            .base
            .object
            .blocks_mut(&field_name)
            .ok_or_else(|| AdapterError::BlockNotFound { id: id.clone() })?;
        let address = find_block(&id, root)
            .ok_or_else(|| AdapterError::BlockNotFound { id: id.clone() })?
            .address;
        let slot = address
            .block_mut(root)
            .ok_or_else(|| AdapterError::BlockNotFound { id: id.clone() })?;
        *slot = block.clone();
        self.target.block = block;

        let persisted = persist(store, &self.base.model, &self.base.object, &self.base.caller)?;
        let key = self.base.object.key.clone();
        let entry = LogEntry::new("fedit.edit_block", key.clone(), &self.base.caller)
            .title(self.header_title())
            .data(json!({
                "block_id": id,
                "field_name": field_name,
                "model_id": key.pk,
                "model_name": key.model_name,
                "app_label": key.app_label,
                "verbose_field_name": self.base.field_verbose_name(),
                "block_label": self.definition.label,
            }))
            .revision(persisted.revision());
        store.log_action(entry)?;
        log::info!("block {} of {} edited by {}", id, key, self.base.caller.username());
        Ok(())
    }

    fn render_content(&self, _context: &TemplateContext) -> String {
        self.target.block.render()
    }

    fn toolbar_buttons(&self) -> Vec<ToolbarButton> {
        let mut buttons = vec![ToolbarButton::new(ButtonAction::Edit, "Edit")];
        if self.base.flag("admin") {
            buttons.push(ToolbarButton::new(ButtonAction::AdminLink, "Edit in admin"));
        }
        if self.base.flag("movable") {
            buttons.push(ToolbarButton::new(ButtonAction::MoveUp, "Move up"));
            buttons.push(ToolbarButton::new(ButtonAction::MoveDown, "Move down"));
        }
        if self.base.flag("addable") {
            buttons.push(ToolbarButton::new(ButtonAction::Add, "Add block"));
        }
        buttons
    }

    fn block_target(&self) -> Option<&BlockTarget> {
        Some(&self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedit_core::{
        AdapterSchema, BlockValue, Caller, ContentObject, FieldKind, FieldSpec, ModelKind, ObjectKey, Target,
        ACCESS_ADMIN,
    };

    fn kind() -> ModelKind {
        ModelKind::new("pages", "page")
            .field(FieldSpec::new("title", FieldKind::Text { max_length: None }))
            .field(FieldSpec::new("body", FieldKind::Blocks))
            .block("text", BlockDefinition::new("Text"))
            .block("raw", BlockDefinition::new("Raw HTML").not_feditable())
    }

    fn object() -> ContentObject {
        ContentObject::new(ObjectKey::new("pages", "page", 1), "Home").with_field(
            "body",
            BlockValue::Stream(vec![
                Block::leaf("a", "text", "First"),
                Block::leaf("b", "raw", "<b>x</b>"),
            ]),
        )
    }

    fn bind(field: &str, kwargs: serde_json::Value, caller: Caller) -> Result<BlockAdapter, AdapterError> {
        let kind = BlockAdapterKind::inline();
        let explicit = kwargs.as_object().cloned().unwrap_or_default();
        let base = AdapterBase::new(
            kind.identifier(),
            &AdapterSchema::describe(kind.keywords().unwrap()),
            true,
            Target::new(self::kind(), object(), Some(field.into())),
            caller,
            explicit,
        )?;
        BlockAdapter::new(base, false)
    }

    fn editor() -> Caller {
        Caller::user("ed")
            .with_permission(ACCESS_ADMIN)
            .with_permission("pages.change_page")
    }

    #[test]
    fn locates_block_by_id() {
        let adapter = bind("body", json!({"block_id": "a"}), editor()).unwrap();
        let target = adapter.block_target().unwrap();
        assert_eq!(target.index, Some(0));
        assert_eq!(target.content_path, vec!["a".to_string()]);
        assert_eq!(adapter.element_id(), "block-a-section");
        assert_eq!(adapter.render_content(&TemplateContext::new()), "First");
        assert_eq!(adapter.header_title(), "Edit block Text for page 'Home'");
        assert!(adapter.check_permissions());
    }

    #[test]
    fn missing_or_unknown_ids() {
        assert_eq!(bind("body", json!({}), editor()).err(), Some(AdapterError::BlockIdRequired));
        assert_eq!(
            bind("body", json!({"block_id": "zzz"}), editor()).err(),
            Some(AdapterError::BlockNotFound { id: "zzz".into() })
        );
        assert!(matches!(
            bind("title", json!({"block_id": "a"}), editor()),
            Err(AdapterError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn given_block_takes_its_id_and_leaves_shared_context() {
        let block = json!({"id": "b", "type": "raw", "value": {"kind": "leaf", "value": "<b>x</b>"}});
        let adapter = bind("body", json!({"block": block}), editor()).unwrap();
        assert_eq!(adapter.base().kwargs.get("block_id"), Some(&json!("b")));
        assert!(!adapter.base().kwargs.contains_key("block"));
        assert_eq!(adapter.block_target().unwrap().index, Some(1));
        assert!(!adapter.check_permissions(), "raw blocks are not feditable");
    }

    #[test]
    fn toolbar_follows_flags() {
        let plain = bind("body", json!({"block_id": "a"}), editor()).unwrap();
        assert_eq!(plain.toolbar_buttons().len(), 1);

        let full = bind(
            "body",
            json!({"block_id": "a", "admin": true, "movable": true, "addable": true}),
            editor(),
        )
        .unwrap();
        let actions: Vec<_> = full.toolbar_buttons().into_iter().map(|b| b.action).collect();
        assert_eq!(
            actions,
            vec![
                ButtonAction::Edit,
                ButtonAction::AdminLink,
                ButtonAction::MoveUp,
                ButtonAction::MoveDown,
                ButtonAction::Add
            ]
        );
    }

    #[test]
    fn renders_from_kwargs() {
        let kind = BlockAdapterKind::inline();
        let mut kwargs = Kwargs::new();
        kwargs.insert("block".into(), json!({"type": "text", "value": {"kind": "leaf", "value": "Loose"}}));
        assert_eq!(kind.render_from_kwargs(&TemplateContext::new(), &kwargs).unwrap(), "Loose");
        assert!(kind.render_from_kwargs(&TemplateContext::new(), &Kwargs::new()).is_err());
    }

    #[test]
    fn dom_positioned_has_selector() {
        let kind = BlockAdapterKind::dom_positioned();
        assert_eq!(kind.identifier(), DOM_BLOCK_IDENTIFIER);
        let base = AdapterBase::new(
            kind.identifier(),
            &AdapterSchema::describe(kind.keywords().unwrap()),
            true,
            Target::new(self::kind(), object(), Some("body".into())),
            editor(),
            json!({"block_id": "a"}).as_object().cloned().unwrap(),
        )
        .unwrap();
        let adapter = kind.bind(base).unwrap();
        assert_eq!(adapter.target_selector().as_deref(), Some("#block-a-section"));
    }
}
