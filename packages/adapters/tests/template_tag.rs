mod common;

use http::Method;
use serde_json::json;

use common::*;
use fedit_adapters::{build_registry, render_tag, FeditEnv, FeditError, FeditSettings, Route, TagInvocation};
use fedit_codec::{CodecConfig, CodecKind};
use fedit_core::{
    content_id_from_parts, Adapter, AdapterBase, AdapterError, AdapterForm, AdapterKind, Caller, Cleaned,
    ContentStore, EditForm, Keyword, KeywordError, ParseError, Target, TemplateContext,
};

/// Minimal adapter with one required keyword, rendering its field.
struct TestAdapterKind;

struct TestAdapter(AdapterBase);

impl AdapterKind for TestAdapterKind {
    fn identifier(&self) -> &str {
        "test"
    }

    fn keywords(&self) -> Result<Vec<Keyword>, KeywordError> {
        Ok(vec![
            Keyword::builder("test").build()?,
            Keyword::builder("id").optional().build()?,
        ])
    }

    fn bind(&self, base: AdapterBase) -> Result<Box<dyn Adapter>, AdapterError> {
        Ok(Box::new(TestAdapter(base)))
    }
}

impl Adapter for TestAdapter {
    fn base(&self) -> &AdapterBase {
        &self.0
    }

    fn base_mut(&mut self) -> &mut AdapterBase {
        &mut self.0
    }

    fn element_id(&self) -> String {
        let key = &self.0.object.key;
        let id = self.0.kwarg("id").map(|v| v.to_string()).unwrap_or_default();
        content_id_from_parts([
            "test",
            self.0.field_name.as_deref().unwrap_or_default(),
            key.app_label.as_str(),
            key.model_name.as_str(),
            key.pk.as_str(),
            id.as_str(),
        ])
    }

    fn form(&self) -> AdapterForm {
        AdapterForm::Fields(EditForm::for_fields(self.0.field.iter(), &self.0.object))
    }

    fn form_valid(&mut self, _store: &dyn ContentStore, _cleaned: Cleaned) -> Result<(), AdapterError> {
        Ok(())
    }

    fn render_content(&self, _context: &TemplateContext) -> String {
        let field = self.0.field_name.as_deref().unwrap_or_default();
        format!("TestAdapter: {}", self.0.object.render_field(field))
    }
}

fn env_with_test_adapter() -> FeditEnv {
    let mut registry = build_registry().unwrap();
    registry.register(TestAdapterKind).unwrap();
    FeditEnv::with_registry(
        registry,
        FeditSettings {
            codec: CodecConfig::signed(SECRET),
            ..FeditSettings::default()
        },
    )
}

fn title_target() -> Target {
    Target::new(page_kind(), home(), Some("title".into()))
}

const CONTENT_OPEN: &str = "<div class=\"fedit-adapter__content\">";

fn inner_content(html: &str) -> &str {
    let start = html.find(CONTENT_OPEN).unwrap() + CONTENT_OPEN.len();
    let end = html.len() - "</div></div>".len();
    &html[start..end]
}

#[test]
fn response_data_identifies_adapter_element_and_object() {
    let env = env_with_test_adapter();
    let entry = env.registry.lookup("test").unwrap();
    let kwargs = entry.parse(&["test='t'", "id=1"], &TemplateContext::new()).unwrap();
    assert_eq!(kwargs["test"], json!("t"));
    assert_eq!(kwargs["id"], json!(1));

    let adapter = entry.construct(title_target(), editor(), kwargs).unwrap();
    let data = adapter.response_data(&TemplateContext::new());

    assert_eq!(data["identifier"], json!("test"));
    assert_eq!(data["element_id"], json!("test-title-pages-page-1-1"));
    assert_eq!(data["model"]["pk"], json!("1"));
    assert_eq!(data["model"]["app_label"], json!("pages"));
    assert_eq!(data["model"]["model_name"], json!("page"));
    assert_eq!(data["html"], json!("TestAdapter: Home"));
}

#[test]
fn plain_content_matches_wrapped_content_byte_for_byte() {
    let env = env_with_test_adapter();
    let context = TemplateContext::new();

    let anonymous = TagInvocation::new("test", Caller::anonymous())
        .target(title_target())
        .source("test='t' id=1");
    let plain = render_tag(&env, &anonymous, &context).unwrap();
    assert_eq!(plain, "TestAdapter: Home");

    let permitted = TagInvocation::new("test", editor())
        .target(title_target())
        .source("test='t' id=1");
    let wrapped = render_tag(&env, &permitted, &context).unwrap();
    assert_ne!(wrapped, plain);
    assert!(wrapped.contains("id=\"test-title-pages-page-1-1\""));
    assert_eq!(inner_content(&wrapped), plain);
}

#[test]
fn missing_required_keyword_is_a_call_site_error() {
    let env = env_with_test_adapter();
    let invocation = TagInvocation::new("test", editor())
        .target(title_target())
        .source("id=2");
    let err = render_tag(&env, &invocation, &TemplateContext::new()).unwrap_err();
    assert!(matches!(
        &err,
        FeditError::Parse(ParseError::MissingRequired { name }) if name == "test"
    ));
    assert_eq!(err.to_string(), "Missing required keyword argument test");
}

#[test]
fn keyword_values_resolve_through_the_template_context() {
    let env = env_with_test_adapter();
    let context = TemplateContext::new().with("page", json!({"ref": 7}));
    let invocation = TagInvocation::new("test", editor())
        .target(title_target())
        .source("test=page.ref id=page.ref");
    let html = render_tag(&env, &invocation, &context).unwrap();
    assert!(html.contains("id=\"test-title-pages-page-1-7\""));
}

#[test]
fn func_adapters_report_their_function_and_target() {
    let env = env_with_test_adapter();
    let invocation = TagInvocation::new("field_func", editor())
        .target(title_target())
        .source("name='highlight' target='#page-{object.pk}'");
    let html = render_tag(&env, &invocation, &TemplateContext::new()).unwrap();
    assert!(html.contains("data-js-constructor=\"fedit.editors.BaseFuncEditor\""));
    assert!(html.contains("id=\"field-title-pages-page-1-page-objectpk\""));
    assert_eq!(inner_content(&html), "Home");
}

#[test]
fn session_tokens_round_trip_through_the_endpoint() {
    let env = FeditEnv::new(FeditSettings {
        codec: CodecConfig {
            mode: CodecKind::Session,
            ..CodecConfig::default()
        },
        ..FeditSettings::default()
    })
    .unwrap();
    let store = store();
    let caller = editor().with_session("sess-1");

    let invocation = TagInvocation::new("block", caller.clone())
        .target(Target::new(page_kind(), home(), Some("body".into())))
        .source("block_id='c' movable");
    let html = render_tag(&env, &invocation, &TemplateContext::new()).unwrap();
    // Session tokens are keyed by the element id.
    assert!(html.contains("data-edit-url=\"/fedit/edit/block/pages/page/1/body/?shared_context=block-c-section\""));

    let response = env.endpoint(&store).handle(&request(
        Method::POST,
        Route::BlockMove,
        "block",
        &home_key(),
        Some("body"),
        &[("action", "up"), ("shared_context", "block-c-section")],
        caller,
    ));
    assert!(response.is_success(), "{:?}", response);
    assert_eq!(body_ids(&store), vec!["a", "c", "b"]);

    // Another session cannot use the key.
    let response = env.endpoint(&store).handle(&request(
        Method::GET,
        Route::Refetch,
        "block",
        &home_key(),
        Some("body"),
        &[("shared_context", "block-c-section")],
        editor().with_session("sess-2"),
    ));
    assert_eq!(response.get("error"), Some(&json!("Block ID is required")));
}
