//! The persistence collaborator adapters save through.
//!
//! Locks are owned by the store. Adapters and endpoints only ask who holds
//! one and refuse to mutate when it is somebody else.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::content::{ContentObject, ModelKind, ObjectKey};
use crate::context::Caller;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Model not found: {key}")]
    NotFound { key: ObjectKey },

    #[error("Invalid model: {app_label}.{model_name}")]
    UnknownModel { app_label: String, model_name: String },

    #[error("Object {key} is locked by {holder}")]
    Locked { key: ObjectKey, holder: String },

    #[error("store error: {message}")]
    Other { message: String },
}

/// Current lock on an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Username of the lock holder.
    pub holder: String,
    #[serde(default)]
    pub message: String,
}

impl LockInfo {
    pub fn new(holder: impl Into<String>) -> Self {
        let holder = holder.into();
        Self {
            message: format!("Locked by {}", holder),
            holder,
        }
    }

    /// Whether this lock stops `caller` from editing.
    pub fn is_locked_for(&self, caller: &Caller) -> bool {
        caller.username.as_deref() != Some(self.holder.as_str())
    }
}

/// A structured audit record for one content change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// e.g. `fedit.move_block`
    pub action: String,
    pub object: ObjectKey,
    pub user: Option<String>,
    pub title: String,
    pub data: JsonValue,
    /// Revision the change landed in, for draft-capable kinds.
    #[serde(default)]
    pub revision: Option<u64>,
}

impl LogEntry {
    pub fn new(action: impl Into<String>, object: ObjectKey, caller: &Caller) -> Self {
        Self {
            action: action.into(),
            object,
            user: caller.username.clone(),
            title: String::new(),
            data: JsonValue::Null,
            revision: None,
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn data(mut self, data: JsonValue) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn revision(mut self, revision: Option<u64>) -> Self {
        self.revision = revision;
        self
    }
}

/// Where a save ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Live,
    Draft { revision: u64 },
}

impl Persisted {
    pub fn revision(self) -> Option<u64> {
        match self {
            Persisted::Live => None,
            Persisted::Draft { revision } => Some(revision),
        }
    }
}

/// Content storage as seen by adapters.
pub trait ContentStore: Send + Sync {
    /// The kind registered under `app_label.model_name`.
    fn model(&self, app_label: &str, model_name: &str) -> Result<ModelKind, StoreError>;

    /// The editable state of an object: its latest draft revision when the
    /// kind supports drafts and one exists, otherwise the live object.
    fn load(&self, key: &ObjectKey) -> Result<ContentObject, StoreError>;

    /// The published state, ignoring drafts.
    fn load_live(&self, key: &ObjectKey) -> Result<ContentObject, StoreError>;

    fn save_live(&self, object: &ContentObject, caller: &Caller) -> Result<(), StoreError>;

    /// Update the latest draft revision, or create the first one. The live
    /// object is left alone. Returns the revision id.
    fn save_draft(&self, object: &ContentObject, caller: &Caller) -> Result<u64, StoreError>;

    fn lock_info(&self, key: &ObjectKey) -> Option<LockInfo>;

    fn log_action(&self, entry: LogEntry) -> Result<(), StoreError>;
}

/// Save `object` the way its kind wants: a draft revision when the kind
/// supports drafts, the live object otherwise.
pub fn persist(
    store: &dyn ContentStore,
    kind: &ModelKind,
    object: &ContentObject,
    caller: &Caller,
) -> Result<Persisted, StoreError> {
    if kind.supports_drafts {
        let revision = store.save_draft(object, caller)?;
        log::debug!("saved {} as draft revision {}", object.key, revision);
        Ok(Persisted::Draft { revision })
    } else {
        store.save_live(object, caller)?;
        log::debug!("saved {} live", object.key);
        Ok(Persisted::Live)
    }
}

/// Lock on `key` and whether it blocks `caller`.
pub fn lock_state(store: &dyn ContentStore, key: &ObjectKey, caller: &Caller) -> (Option<LockInfo>, bool) {
    let lock = store.lock_info(key);
    let locked_for_caller = lock.as_ref().is_some_and(|l| l.is_locked_for(caller));
    (lock, locked_for_caller)
}

/// Fail with [`StoreError::Locked`] when someone other than `caller` holds
/// the lock on `key`.
pub fn ensure_unlocked(store: &dyn ContentStore, key: &ObjectKey, caller: &Caller) -> Result<(), StoreError> {
    match lock_state(store, key, caller) {
        (Some(lock), true) => {
            log::warn!("{} is locked by {}; refusing edit by {:?}", key, lock.holder, caller.username);
            Err(StoreError::Locked {
                key: key.clone(),
                holder: lock.holder,
            })
        }
        _ => Ok(()),
    }
}
