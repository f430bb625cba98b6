#![allow(dead_code)]

use http::Method;
use serde_json::json;

use fedit_adapters::{AdapterPath, EditRequest, FeditEnv, FeditSettings, Route};
use fedit_codec::{CodecConfig, CodecScope, SharedContextCodec};
use fedit_core::{
    Block, BlockDefinition, BlockValue, Caller, ContentObject, ContentStore, FieldKind, FieldSpec, Kwargs,
    ModelKind, ObjectKey, ACCESS_ADMIN,
};
use fedit_store::InMemoryContentStore;

pub const SECRET: &str = "integration-secret";

pub fn page_kind() -> ModelKind {
    ModelKind::new("pages", "page")
        .field(FieldSpec::new("title", FieldKind::Text { max_length: Some(40) }).required())
        .field(FieldSpec::new("body", FieldKind::Blocks).block_types(["heading", "text"]))
        .block("heading", BlockDefinition::new("Heading"))
        .block("text", BlockDefinition::new("Text"))
}

pub fn post_kind() -> ModelKind {
    ModelKind::new("blog", "post")
        .verbose_name("blog post")
        .with_drafts()
        .field(FieldSpec::new("title", FieldKind::Text { max_length: None }).required())
}

pub fn home_key() -> ObjectKey {
    ObjectKey::new("pages", "page", 1)
}

pub fn post_key() -> ObjectKey {
    ObjectKey::new("blog", "post", 5)
}

pub fn home() -> ContentObject {
    ContentObject::new(home_key(), "Home")
        .with_field("title", json!("Home"))
        .with_field(
            "body",
            BlockValue::Stream(vec![
                Block::leaf("a", "heading", "Welcome"),
                Block::leaf("b", "text", "First"),
                Block::leaf("c", "text", "Second"),
            ]),
        )
}

pub fn store() -> InMemoryContentStore {
    let store = InMemoryContentStore::new();
    store.register_model(page_kind());
    store.register_model(post_kind());
    store.insert(home()).unwrap();
    store
        .insert(ContentObject::new(post_key(), "Hello").with_field("title", json!("Hello")))
        .unwrap();
    store
}

pub fn signed_env() -> FeditEnv {
    FeditEnv::new(FeditSettings {
        codec: CodecConfig::signed(SECRET),
        ..FeditSettings::default()
    })
    .unwrap()
}

pub fn editor() -> Caller {
    Caller::user("ed")
        .with_permission(ACCESS_ADMIN)
        .with_permission("pages.change_page")
        .with_permission("blog.change_post")
}

pub fn kwargs(value: serde_json::Value) -> Kwargs {
    value.as_object().cloned().unwrap()
}

pub fn token(env: &FeditEnv, value: serde_json::Value) -> String {
    env.codec.encode(&kwargs(value), &CodecScope::default()).unwrap()
}

/// A request for `route` with the given query parameters.
pub fn request(
    method: Method,
    route: Route,
    adapter: &str,
    key: &ObjectKey,
    field: Option<&str>,
    query: &[(&str, &str)],
    caller: Caller,
) -> EditRequest {
    let url = AdapterPath::new(route, adapter, key, field).to_url_with_query("/fedit", query);
    EditRequest::from_url(method, &url, caller)
}

pub fn body_ids(store: &InMemoryContentStore) -> Vec<String> {
    store
        .load(&home_key())
        .unwrap()
        .blocks("body")
        .and_then(|b| b.children())
        .map(|(_, children)| children.iter().filter_map(|b| b.id.clone()).collect())
        .unwrap_or_default()
}
