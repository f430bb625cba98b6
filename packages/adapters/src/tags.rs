//! The template-tag front end.
//!
//! A call site such as `{% fedit block page.body block_id=b.id movable %}`
//! arrives here as a [`TagInvocation`]: the adapter identifier, the resolved
//! target and the raw keyword tokens. [`render_tag`] binds the adapter and
//! returns either the plain content or the content inside an edit wrapper.
//! Callers without permission only ever see the plain content, and the
//! wrapper's inner content is the same string byte for byte.

use fedit_codec::{CodecScope, SharedContextCodec};
use fedit_core::{split_contents, Adapter, Caller, Kwargs, RegisteredAdapter, Target, TemplateContext};

use crate::env::FeditEnv;
use crate::error::FeditError;
use crate::html::attr;
use crate::routes::{AdapterPath, Route};
use crate::toolbar::{render_toolbar, toolbar_items};

/// One evaluated call site.
#[derive(Debug, Clone)]
pub struct TagInvocation {
    pub identifier: String,
    /// `None` when the call site names no object, e.g. a bare `block=...`.
    pub target: Option<Target>,
    pub tokens: Vec<String>,
    pub caller: Caller,
}

impl TagInvocation {
    pub fn new(identifier: impl Into<String>, caller: Caller) -> Self {
        Self {
            identifier: identifier.into(),
            target: None,
            tokens: Vec::new(),
            caller,
        }
    }

    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Tokens from the raw keyword part of a tag, split the way templates
    /// split them (quoted strings stay whole).
    #[must_use]
    pub fn source(self, raw: &str) -> Self {
        self.tokens(split_contents(raw))
    }
}

/// Render one call site.
pub fn render_tag(env: &FeditEnv, invocation: &TagInvocation, context: &TemplateContext) -> Result<String, FeditError> {
    let entry = env.registry.lookup(&invocation.identifier)?;
    let kwargs = entry.parse(&invocation.tokens, context)?;

    let Some(target) = invocation.target.clone() else {
        return Ok(entry.kind().render_from_kwargs(context, &kwargs)?);
    };

    let adapter = match entry.construct(target, invocation.caller.clone(), kwargs.clone()) {
        Ok(adapter) => adapter,
        Err(err) => return render_fallback(entry, context, &kwargs, err.into()),
    };

    let content = adapter.render_content(context);
    if !adapter.check_permissions() {
        return Ok(content);
    }
    wrap(env, adapter.as_ref(), &content)
}

fn render_fallback(
    entry: &RegisteredAdapter,
    context: &TemplateContext,
    kwargs: &Kwargs,
    err: FeditError,
) -> Result<String, FeditError> {
    match entry.kind().render_from_kwargs(context, kwargs) {
        Ok(content) => {
            log::debug!("{} rendered from kwargs after bind failure: {}", entry.identifier(), err);
            Ok(content)
        }
        Err(_) => Err(err),
    }
}

/// The shared-context token for a bound adapter.
pub fn encode_shared_context(env: &FeditEnv, adapter: &dyn Adapter) -> Result<String, FeditError> {
    let base = adapter.base();
    let element_id = adapter.element_id();
    let scope = CodecScope {
        session_key: base.caller.session_key.as_deref(),
        element_id: Some(&element_id),
    };
    Ok(env.codec.encode(&base.kwargs, &scope)?)
}

fn wrap(env: &FeditEnv, adapter: &dyn Adapter, content: &str) -> Result<String, FeditError> {
    let shared_context = encode_shared_context(env, adapter)?;
    let base = adapter.base();
    let prefix = env.settings.url_prefix.as_str();
    let path = AdapterPath::new(
        Route::Edit,
        adapter.identifier(),
        &base.object.key,
        base.field_name.as_deref(),
    );
    let query = [("shared_context", shared_context.as_str())];
    let js_constructor = env
        .registry
        .lookup(adapter.identifier())
        .map(|entry| entry.kind().js_constructor().to_string())
        .unwrap_or_default();

    let mut out = String::from("<div class=\"fedit-adapter\"");
    out.push_str(&attr("id", &adapter.element_id()));
    out.push_str(&attr("data-fedit-adapter", adapter.identifier()));
    out.push_str(&attr("data-js-constructor", &js_constructor));
    out.push_str(&attr("data-edit-url", &path.to_url_with_query(prefix, &query)));
    out.push_str(&attr(
        "data-refetch-url",
        &path.with_route(Route::Refetch).to_url_with_query(prefix, &query),
    ));
    if let Some(selector) = adapter.target_selector() {
        out.push_str(&attr("data-target-selector", &selector));
    }
    out.push_str(&attr("title", &adapter.header_title()));
    out.push('>');
    out.push_str(&render_toolbar(&toolbar_items(adapter, &env.settings, &shared_context)));
    out.push_str("<div class=\"fedit-adapter__content\">");
    out.push_str(content);
    out.push_str("</div></div>");

    log::debug!("wrapped {} for {}", adapter.element_id(), base.caller.username());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::FeditSettings;
    use fedit_codec::CodecConfig;
    use fedit_core::{
        AdapterError, Block, BlockValue, ContentObject, FieldKind, FieldSpec, ModelKind, ObjectKey, ACCESS_ADMIN,
    };
    use serde_json::json;

    fn env() -> FeditEnv {
        FeditEnv::new(FeditSettings {
            codec: CodecConfig::plain(),
            ..FeditSettings::default()
        })
        .unwrap()
    }

    fn target(field: &str) -> Target {
        let kind = ModelKind::new("pages", "page")
            .field(FieldSpec::new("title", FieldKind::Text { max_length: None }))
            .field(FieldSpec::new("body", FieldKind::Blocks));
        let object = ContentObject::new(ObjectKey::new("pages", "page", 2), "About")
            .with_field("title", json!("About <us>"))
            .with_field("body", BlockValue::Stream(vec![Block::leaf("b1", "text", "Hello")]));
        Target::new(kind, object, Some(field.into()))
    }

    fn editor() -> Caller {
        Caller::user("ed")
            .with_permission(ACCESS_ADMIN)
            .with_permission("pages.change_page")
    }

    #[test]
    fn anonymous_callers_get_plain_content() {
        let invocation = TagInvocation::new("field", Caller::anonymous()).target(target("title"));
        let html = render_tag(&env(), &invocation, &TemplateContext::new()).unwrap();
        assert_eq!(html, "About <us>");
    }

    #[test]
    fn editors_get_the_wrapper() {
        let invocation = TagInvocation::new("block", editor())
            .target(target("body"))
            .source("block_id='b1' movable");
        let html = render_tag(&env(), &invocation, &TemplateContext::new()).unwrap();

        assert!(html.starts_with("<div class=\"fedit-adapter\" id=\"block-b1-section\" data-fedit-adapter=\"block\""));
        assert!(html.contains("data-js-constructor=\"fedit.editors.BlockEditor\""));
        assert!(html.contains("data-edit-url=\"/fedit/edit/block/pages/page/2/body/?shared_context="));
        assert!(html.contains("data-refetch-url=\"/fedit/refetch/block/pages/page/2/body/?shared_context="));
        assert!(html.contains("fedit-toolbar__move-up"));
        assert!(html.ends_with("<div class=\"fedit-adapter__content\">Hello</div></div>"));
    }

    #[test]
    fn unbound_block_renders_from_kwargs() {
        let context = TemplateContext::new().with(
            "b",
            json!({"id": "x", "type": "text", "value": {"kind": "leaf", "value": "Loose"}}),
        );
        let invocation = TagInvocation::new("block", editor()).source("block=b");
        assert_eq!(render_tag(&env(), &invocation, &context).unwrap(), "Loose");

        // `title` is not a block field, so binding fails and the kwargs win.
        let invocation = TagInvocation::new("block", editor())
            .target(target("title"))
            .source("block=b");
        assert_eq!(render_tag(&env(), &invocation, &context).unwrap(), "Loose");
    }

    #[test]
    fn bind_errors_surface_when_no_fallback_exists() {
        let invocation = TagInvocation::new("block", editor()).target(target("body"));
        let err = render_tag(&env(), &invocation, &TemplateContext::new()).unwrap_err();
        assert!(matches!(err, FeditError::Adapter(AdapterError::BlockIdRequired)));
        assert!(err.is_call_site());

        let invocation = TagInvocation::new("nope", editor());
        assert!(matches!(
            render_tag(&env(), &invocation, &TemplateContext::new()),
            Err(FeditError::Registry(_))
        ));
    }
}
