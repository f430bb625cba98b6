//! The in-memory store: models, live objects, draft revisions, locks and audit log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use fedit_core::{Caller, ContentObject, ContentStore, LockInfo, LogEntry, ModelKind, ObjectKey, StoreError};

/// One saved draft of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: u64,
    pub object: ContentObject,
    pub user: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An audit log entry with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: LogEntry,
}

/// Thread-safe in-memory content storage.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    models: DashMap<(String, String), ModelKind>,
    live: DashMap<ObjectKey, ContentObject>,
    drafts: DashMap<ObjectKey, Vec<Revision>>,
    locks: DashMap<ObjectKey, LockInfo>,
    audit: RwLock<Vec<AuditRecord>>,
    next_revision: AtomicU64,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_model(&self, kind: ModelKind) {
        log::debug!("registered model {}", kind.label());
        self.models
            .insert((kind.app_label.clone(), kind.model_name.clone()), kind);
    }

    /// Insert or replace a live object. Its kind must be registered.
    pub fn insert(&self, object: ContentObject) -> Result<(), StoreError> {
        self.model(&object.key.app_label, &object.key.model_name)?;
        self.live.insert(object.key.clone(), object);
        Ok(())
    }

    pub fn remove(&self, key: &ObjectKey) -> Option<ContentObject> {
        self.drafts.remove(key);
        self.locks.remove(key);
        self.live.remove(key).map(|(_, object)| object)
    }

    pub fn objects(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<_> = self.live.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Lock `key` for `holder`. Replaces any existing lock.
    pub fn lock(&self, key: &ObjectKey, holder: &str) -> Result<LockInfo, StoreError> {
        if !self.live.contains_key(key) {
            return Err(StoreError::NotFound { key: key.clone() });
        }
        let lock = LockInfo::new(holder);
        self.locks.insert(key.clone(), lock.clone());
        log::info!("{} locked by {}", key, holder);
        Ok(lock)
    }

    pub fn unlock(&self, key: &ObjectKey) -> Option<LockInfo> {
        let lock = self.locks.remove(key).map(|(_, lock)| lock);
        if lock.is_some() {
            log::info!("{} unlocked", key);
        }
        lock
    }

    /// Draft revisions of `key`, oldest first.
    pub fn revisions(&self, key: &ObjectKey) -> Vec<Revision> {
        self.drafts.get(key).map(|r| r.clone()).unwrap_or_default()
    }

    /// Make the latest draft the live object and drop the drafts.
    pub fn publish(&self, key: &ObjectKey) -> Result<Option<u64>, StoreError> {
        let Some((_, mut revisions)) = self.drafts.remove(key) else {
            return Ok(None);
        };
        let Some(latest) = revisions.pop() else {
            return Ok(None);
        };
        self.live.insert(key.clone(), latest.object);
        log::info!("published revision {} of {}", latest.id, key);
        Ok(Some(latest.id))
    }

    /// Audit records, oldest first.
    pub fn audit_log(&self) -> Vec<AuditRecord> {
        match self.audit.read() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Audit records for one object.
    pub fn history(&self, key: &ObjectKey) -> Vec<AuditRecord> {
        self.audit_log()
            .into_iter()
            .filter(|r| &r.entry.object == key)
            .collect()
    }

    fn require_live(&self, key: &ObjectKey) -> Result<ContentObject, StoreError> {
        self.live
            .get(key)
            .map(|o| o.clone())
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })
    }
}

impl ContentStore for InMemoryContentStore {
    fn model(&self, app_label: &str, model_name: &str) -> Result<ModelKind, StoreError> {
        self.models
            .get(&(app_label.to_string(), model_name.to_string()))
            .map(|kind| kind.clone())
            .ok_or_else(|| StoreError::UnknownModel {
                app_label: app_label.to_string(),
                model_name: model_name.to_string(),
            })
    }

    fn load(&self, key: &ObjectKey) -> Result<ContentObject, StoreError> {
        let kind = self.model(&key.app_label, &key.model_name)?;
        let live = self.require_live(key)?;
        if !kind.supports_drafts {
            return Ok(live);
        }
        Ok(self
            .drafts
            .get(key)
            .and_then(|revisions| revisions.last().map(|r| r.object.clone()))
            .unwrap_or(live))
    }

    fn load_live(&self, key: &ObjectKey) -> Result<ContentObject, StoreError> {
        self.model(&key.app_label, &key.model_name)?;
        self.require_live(key)
    }

    fn save_live(&self, object: &ContentObject, _caller: &Caller) -> Result<(), StoreError> {
        self.require_live(&object.key)?;
        self.live.insert(object.key.clone(), object.clone());
        Ok(())
    }

    fn save_draft(&self, object: &ContentObject, caller: &Caller) -> Result<u64, StoreError> {
        self.require_live(&object.key)?;
        let mut revisions = self.drafts.entry(object.key.clone()).or_default();
        let now = Utc::now();
        if let Some(latest) = revisions.last_mut() {
            latest.object = object.clone();
            latest.user = caller.username.clone();
            latest.created_at = now;
            return Ok(latest.id);
        }

        let id = self.next_revision.fetch_add(1, Ordering::Relaxed) + 1;
        revisions.push(Revision {
            id,
            object: object.clone(),
            user: caller.username.clone(),
            created_at: now,
        });
        Ok(id)
    }

    fn lock_info(&self, key: &ObjectKey) -> Option<LockInfo> {
        self.locks.get(key).map(|l| l.clone())
    }

    fn log_action(&self, entry: LogEntry) -> Result<(), StoreError> {
        log::info!(
            "{} on {} by {}",
            entry.action,
            entry.object,
            entry.user.as_deref().unwrap_or("anonymous")
        );
        let record = AuditRecord {
            timestamp: Utc::now(),
            entry,
        };
        self.audit
            .write()
            .map_err(|_| StoreError::Other {
                message: "audit log lock poisoned".into(),
            })?
            .push(record);
        Ok(())
    }
}
