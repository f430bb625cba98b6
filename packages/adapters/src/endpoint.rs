//! The edit endpoint.
//!
//! One [`Endpoint::handle`] call serves one request. Every route goes
//! through the same preamble, stopping at the first failure:
//!
//! 1. route parse (404)
//! 2. adapter lookup (400 `Invalid adapter ID`)
//! 3. model lookup (400 `Invalid model`)
//! 4. admin access and change permission (403)
//! 5. object load (400 `Model not found`)
//! 6. field presence for field-level adapters (400)
//! 7. shared-context decode (403 when a signed token is rejected)
//! 8. adapter bind (400)
//! 9. lock lookup
//!
//! Mutating routes refuse with 423 when someone else holds the lock, before
//! anything is changed.

use http::{Method, StatusCode};
use serde_json::{json, Value as JsonValue};

use fedit_codec::{CodecError, CodecScope, SharedContextCodec};
use fedit_core::{
    find_block, insert_after, lock_state, move_block, new_blocks_from, persist, Adapter, AdapterError,
    BlockTarget, BlockValue, ContentObject, ContentStore, Direction, Kwargs, LockInfo, LogEntry, ModelKind, MoveError,
    StoreError, Target, TemplateContext, ACCESS_ADMIN,
};

use crate::env::FeditEnv;
use crate::http::{EditRequest, EditResponse};
use crate::routes::{AdapterPath, Route};

type Handled = Result<EditResponse, EditResponse>;

/// A bound adapter together with the lock state it was bound under.
struct Bound {
    path: AdapterPath,
    model: ModelKind,
    adapter: Box<dyn Adapter>,
    shared_context: String,
    lock: Option<LockInfo>,
    locked_for_caller: bool,
}

pub struct Endpoint<'a> {
    env: &'a FeditEnv,
    store: &'a dyn ContentStore,
}

impl<'a> Endpoint<'a> {
    pub fn new(env: &'a FeditEnv, store: &'a dyn ContentStore) -> Self {
        Self { env, store }
    }

    pub fn handle(&self, request: &EditRequest) -> EditResponse {
        let response = self.dispatch(request).unwrap_or_else(|response| response);
        log::debug!("{} {} -> {}", request.method, request.path, response.status);
        response
    }

    fn dispatch(&self, request: &EditRequest) -> Handled {
        let path = AdapterPath::parse(&self.env.settings.url_prefix, &request.path)
            .map_err(|e| EditResponse::error(StatusCode::NOT_FOUND, e.to_string()))?;

        let is_get = request.method == Method::GET;
        let is_post = request.method == Method::POST;
        let allowed = match path.route {
            Route::Edit | Route::BlockAdd => is_get || is_post,
            Route::Refetch => is_get,
            Route::BlockMove => is_post,
        };
        if !allowed {
            return Err(EditResponse::error(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("{} is not allowed on {}", request.method, path.route),
            ));
        }

        let mut bound = self.bind(path, request)?;
        match (bound.path.route, is_get) {
            (Route::Edit, true) => self.edit_form(&bound),
            (Route::Edit, false) => self.edit_submit(&mut bound, request),
            (Route::Refetch, _) => self.refetch(&bound),
            (Route::BlockMove, _) => self.block_move(&bound, request),
            (Route::BlockAdd, true) => self.block_add_form(&bound),
            (Route::BlockAdd, false) => self.block_add_submit(&bound, request),
        }
    }

    fn bind(&self, path: AdapterPath, request: &EditRequest) -> Result<Bound, EditResponse> {
        let caller = &request.caller;
        let entry = self
            .env
            .registry
            .lookup(&path.adapter)
            .map_err(|_| EditResponse::bad_request("Invalid adapter ID"))?;

        let model = self
            .store
            .model(&path.app_label, &path.model_name)
            .map_err(|_| EditResponse::bad_request("Invalid model"))?;

        let change = model.change_permission();
        if !caller.has_perms([ACCESS_ADMIN, change.as_str()]) {
            log::warn!("{:?} may not edit {}", caller.username, model.label());
            return Err(EditResponse::forbidden("You do not have permission to view this page"));
        }

        let key = path.object_key();
        let object = self.store.load(&key).map_err(|e| match e {
            StoreError::NotFound { .. } => EditResponse::bad_request("Model not found"),
            other => store_failure(other),
        })?;

        if entry.kind().field_required() {
            match path.field_name.as_deref() {
                None => return Err(EditResponse::bad_request("Field name is required for object")),
                Some(name) if model.get_field(name).is_none() => {
                    return Err(EditResponse::bad_request("Invalid field name for object"))
                }
                Some(_) => {}
            }
        }

        let shared_context = shared_context_token(request).to_string();
        let kwargs = self.decode(&shared_context, request)?;

        let target = Target::new(model.clone(), object, path.field_name.clone());
        let adapter = entry
            .construct(target, caller.clone(), kwargs)
            .map_err(adapter_failure)?;

        let (lock, locked_for_caller) = lock_state(self.store, &key, caller);
        Ok(Bound {
            path,
            model,
            adapter,
            shared_context,
            lock,
            locked_for_caller,
        })
    }

    fn decode(&self, token: &str, request: &EditRequest) -> Result<Kwargs, EditResponse> {
        if token.is_empty() {
            return Ok(Kwargs::new());
        }
        let scope = CodecScope {
            session_key: request.caller.session_key.as_deref(),
            element_id: None,
        };
        self.env.codec.decode(token, &scope).map_err(|e: CodecError| {
            log::warn!("rejecting shared context for {}: {}", request.path, e);
            if e.is_rejection() {
                EditResponse::forbidden(e.to_string())
            } else {
                EditResponse::bad_request(e.to_string())
            }
        })
    }

    fn edit_form(&self, bound: &Bound) -> Handled {
        let adapter = bound.adapter.as_ref();
        let mut data = Kwargs::new();
        data.insert("identifier".into(), json!(adapter.identifier()));
        data.insert("element_id".into(), json!(adapter.element_id()));
        data.insert("header_title".into(), json!(adapter.header_title()));
        data.insert("form".into(), adapter.form().to_json());
        data.insert("shared_context".into(), json!(bound.shared_context));
        insert_lock(&mut data, bound);
        Ok(EditResponse::success(data))
    }

    fn edit_submit(&self, bound: &mut Bound, request: &EditRequest) -> Handled {
        if !bound.adapter.check_permissions() {
            return Err(EditResponse::forbidden("You do not have permission to edit this content"));
        }

        let form = bound.adapter.form();
        let failure = |status: StatusCode, errors: JsonValue, bound: &Bound| {
            let mut body = Kwargs::new();
            body.insert("success".into(), JsonValue::Bool(false));
            body.insert("errors".into(), errors);
            body.insert("form".into(), form.to_json());
            body.insert("data".into(), JsonValue::Object(request.data.clone()));
            insert_lock(&mut body, bound);
            EditResponse::json(status, JsonValue::Object(body))
        };

        if bound.locked_for_caller {
            log::warn!("{} refused: {}", bound.adapter.element_id(), lock_message(bound));
            return Err(failure(StatusCode::LOCKED, json!({}), &*bound));
        }

        let cleaned = match form.validate(&request.data) {
            Ok(cleaned) => cleaned,
            Err(errors) => return Err(failure(StatusCode::BAD_REQUEST, json!(errors), &*bound)),
        };

        bound
            .adapter
            .form_valid(self.store, cleaned)
            .map_err(adapter_failure)?;
        Ok(EditResponse::success(
            bound.adapter.response_data(&TemplateContext::new()),
        ))
    }

    fn refetch(&self, bound: &Bound) -> Handled {
        let mut data = bound.adapter.response_data(&TemplateContext::new());
        data.insert("refetch".into(), JsonValue::Bool(true));
        Ok(EditResponse::success(data))
    }

    /// Permission, lock and flag checks shared by the block routes.
    fn block_preflight<'b>(&self, bound: &'b Bound, flag: &str, refusal: &str) -> Result<&'b BlockTarget, EditResponse> {
        let adapter = bound.adapter.as_ref();
        let target = adapter
            .block_target()
            .ok_or_else(|| EditResponse::bad_request("Adapter does not edit a block"))?;
        if !adapter.check_permissions() {
            return Err(EditResponse::forbidden("You do not have permission to edit this content"));
        }
        if bound.locked_for_caller {
            log::warn!("{} refused: {}", adapter.element_id(), lock_message(bound));
            let mut body = Kwargs::new();
            body.insert("success".into(), JsonValue::Bool(false));
            body.insert("error".into(), json!(lock_message(bound)));
            insert_lock(&mut body, bound);
            return Err(EditResponse::json(StatusCode::LOCKED, JsonValue::Object(body)));
        }
        if !adapter.base().flag(flag) {
            return Err(EditResponse::bad_request(refusal));
        }
        Ok(target)
    }

    fn block_move(&self, bound: &Bound, request: &EditRequest) -> Handled {
        let target = self.block_preflight(bound, "movable", "Block is not movable")?;
        let direction: Direction = request_param(request, "action")
            .unwrap_or_default()
            .parse()
            .map_err(|_| EditResponse::bad_request("Invalid action"))?;

        let base = bound.adapter.base();
        let field_name = base.field_name.clone().unwrap_or_default();
        let mut object = base.object.clone();
        let root = blocks_of(&mut object, &field_name)?;

        let index = match move_block(root, &target.block_id, direction) {
            Ok(index) => index,
            Err(e @ MoveError::CannotMove(_)) => {
                return Ok(EditResponse::ok(json!({
                    "success": false,
                    "error": e.to_string(),
                })))
            }
            Err(e) => return Err(EditResponse::bad_request(e.to_string())),
        };

        let persisted = persist(self.store, &bound.model, &object, &base.caller).map_err(store_failure)?;
        let label = bound.model.block_definition(&target.block.block_type).label;
        let entry = LogEntry::new("fedit.move_block", object.key.clone(), &base.caller)
            .title(format!("Move block {} {}", label, direction))
            .data(json!({
                "model_id": object.key.pk,
                "model_name": object.key.model_name,
                "app_label": object.key.app_label,
                "field_name": field_name,
                "block_label": label,
                "block_id": target.block_id,
                "direction": direction,
            }))
            .revision(persisted.revision());
        self.store.log_action(entry).map_err(store_failure)?;
        log::info!("block {} of {} moved {} by {}", target.block_id, object.key, direction, base.caller.username());

        let mut data = Kwargs::new();
        data.insert("block_id".into(), json!(target.block_id));
        data.insert("direction".into(), json!(direction));
        data.insert("index".into(), json!(index));
        Ok(EditResponse::success(data))
    }

    fn block_add_form(&self, bound: &Bound) -> Handled {
        let adapter = bound.adapter.as_ref();
        let target = adapter
            .block_target()
            .ok_or_else(|| EditResponse::bad_request("Adapter does not edit a block"))?;
        let base = adapter.base();
        let label = bound.model.block_definition(&target.block.block_type).label;

        let block_types: Vec<JsonValue> = allowed_block_types(bound, target)
            .into_iter()
            .map(|block_type| {
                let label = bound.model.block_definition(&block_type).label;
                json!({"type": block_type, "label": label})
            })
            .collect();

        let mut data = Kwargs::new();
        data.insert("block_id".into(), json!(target.block_id));
        data.insert("block_types".into(), JsonValue::Array(block_types));
        data.insert(
            "header_title".into(),
            json!(format!(
                "Adding block to '{}' for {} '{}'",
                label, base.model.verbose_name, base.object.title
            )),
        );
        data.insert("shared_context".into(), json!(bound.shared_context));
        insert_lock(&mut data, bound);
        Ok(EditResponse::success(data))
    }

    fn block_add_submit(&self, bound: &Bound, request: &EditRequest) -> Handled {
        let target = self.block_preflight(bound, "addable", "Block is not addable")?;
        let allowed = allowed_block_types(bound, target);
        let blocks = new_blocks_from(&request.data, &allowed).map_err(|errors| {
            EditResponse::json(
                StatusCode::BAD_REQUEST,
                json!({"success": false, "errors": errors}),
            )
        })?;
        let block_ids: Vec<String> = blocks.iter().filter_map(|b| b.id.clone()).collect();
        let block_types: Vec<String> = blocks.iter().map(|b| b.block_type.clone()).collect();

        let base = bound.adapter.base();
        let field_name = base.field_name.clone().unwrap_or_default();
        let mut object = base.object.clone();
        let root = blocks_of(&mut object, &field_name)?;
        let inserted = insert_after(root, &target.block_id, blocks)
            .map_err(|e| EditResponse::bad_request(e.to_string()))?;

        let persisted = persist(self.store, &bound.model, &object, &base.caller).map_err(store_failure)?;
        let entry = LogEntry::new("fedit.add_block", object.key.clone(), &base.caller)
            .title(format!("Add {} block(s) to {}", block_ids.len(), field_name))
            .data(json!({
                "model_id": object.key.pk,
                "model_name": object.key.model_name,
                "app_label": object.key.app_label,
                "field_name": field_name,
                "after_block_id": target.block_id,
                "block_ids": block_ids,
                "block_types": block_types,
            }))
            .revision(persisted.revision());
        self.store.log_action(entry).map_err(store_failure)?;
        log::info!(
            "{} block(s) added after {} in {} by {}",
            block_ids.len(),
            target.block_id,
            object.key,
            base.caller.username()
        );

        let mut data = Kwargs::new();
        data.insert("inserted".into(), json!(inserted));
        data.insert("block_ids".into(), json!(block_ids));
        Ok(EditResponse::success(data))
    }
}

/// Query string first, then the submitted data.
fn request_param<'r>(request: &'r EditRequest, name: &str) -> Option<&'r str> {
    request.query_param(name).or_else(|| {
        request
            .data
            .get(name)
            .and_then(JsonValue::as_str)
            .filter(|v| !v.is_empty())
    })
}

fn shared_context_token(request: &EditRequest) -> &str {
    request_param(request, "shared_context").unwrap_or_default()
}

fn blocks_of<'o>(object: &'o mut ContentObject, field_name: &str) -> Result<&'o mut BlockValue, EditResponse> {
    object
        .blocks_mut(field_name)
        .ok_or_else(|| EditResponse::bad_request(format!("{} holds no blocks", field_name)))
}

/// Types a new sibling of the located block may have: the field's declared
/// types at the top level, otherwise the types already used by the siblings.
fn allowed_block_types(bound: &Bound, target: &BlockTarget) -> Vec<String> {
    let base = bound.adapter.base();
    let field_name = base.field_name.as_deref().unwrap_or_default();
    let declared = base
        .field
        .as_ref()
        .map(|f| f.block_types.clone())
        .unwrap_or_default();

    let Some(found) = base
        .object
        .blocks(field_name)
        .and_then(|root| find_block(&target.block_id, root))
    else {
        return declared;
    };
    if found.address.depth() == 1 && !declared.is_empty() {
        return declared;
    }

    let mut types: Vec<String> = Vec::new();
    for sibling in found.parent {
        if !types.contains(&sibling.block_type) {
            types.push(sibling.block_type.clone());
        }
    }
    types
}

fn lock_message(bound: &Bound) -> String {
    bound
        .lock
        .as_ref()
        .map(|l| l.message.clone())
        .unwrap_or_default()
}

fn insert_lock(data: &mut Kwargs, bound: &Bound) {
    data.insert("locked".into(), JsonValue::Bool(bound.lock.is_some()));
    data.insert("locked_for_user".into(), JsonValue::Bool(bound.locked_for_caller));
    if let Some(lock) = &bound.lock {
        data.insert("lock_message".into(), json!(lock.message));
    }
}

fn store_failure(err: StoreError) -> EditResponse {
    match err {
        StoreError::Locked { .. } => EditResponse::error(StatusCode::LOCKED, err.to_string()),
        StoreError::NotFound { .. } | StoreError::UnknownModel { .. } => EditResponse::bad_request(err.to_string()),
        StoreError::Other { .. } => {
            log::error!("content store failure: {}", err);
            EditResponse::error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn adapter_failure(err: AdapterError) -> EditResponse {
    match err {
        AdapterError::Store(store) => store_failure(store),
        AdapterError::Invalid { errors } => EditResponse::json(
            StatusCode::BAD_REQUEST,
            json!({"success": false, "errors": errors}),
        ),
        other => EditResponse::bad_request(other.to_string()),
    }
}
