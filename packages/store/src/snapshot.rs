//! JSON seed data for [`InMemoryContentStore`].
//!
//! ```json
//! {
//!   "models": [{"app_label": "pages", "model_name": "page", "fields": [...]}],
//!   "objects": [{"key": {"app_label": "pages", "model_name": "page", "pk": "1"}, "title": "Home"}],
//!   "locks": [{"object": {"app_label": "pages", "model_name": "page", "pk": "1"}, "holder": "alice"}]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::{Deserialize, Serialize};

use fedit_core::{ContentObject, ModelKind, ObjectKey, StoreError};

use crate::InMemoryContentStore;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLock {
    pub object: ObjectKey,
    pub holder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub models: Vec<ModelKind>,
    pub objects: Vec<ContentObject>,
    pub locks: Vec<SnapshotLock>,
}

impl Snapshot {
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Build a store holding this snapshot. Objects without ids on their
    /// blocks get fresh ones.
    pub fn into_store(self) -> Result<InMemoryContentStore, SnapshotError> {
        let store = InMemoryContentStore::new();
        for kind in self.models {
            store.register_model(kind);
        }
        for mut object in self.objects {
            for value in object.fields.values_mut() {
                if let fedit_core::FieldValue::Blocks(blocks) = value {
                    blocks.assign_missing_ids();
                }
            }
            store.insert(object)?;
        }
        for lock in self.locks {
            store.lock(&lock.object, &lock.holder)?;
        }
        log::debug!("loaded snapshot with {} objects", store.objects().len());
        Ok(store)
    }
}

impl InMemoryContentStore {
    /// Seed a store from a snapshot file.
    pub fn from_snapshot(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        Snapshot::from_path(path)?.into_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedit_core::{ContentStore, ObjectKey};

    const SEED: &str = r#"{
        "models": [{
            "app_label": "pages",
            "model_name": "page",
            "verbose_name": "page",
            "fields": [
                {"name": "title", "verbose_name": "title", "kind": {"type": "text"}},
                {"name": "body", "verbose_name": "body", "kind": {"type": "blocks"}}
            ]
        }],
        "objects": [{
            "key": {"app_label": "pages", "model_name": "page", "pk": "1"},
            "title": "Home",
            "fields": {
                "title": "Home",
                "body": {"kind": "stream", "value": [
                    {"type": "text", "value": {"kind": "leaf", "value": "Hi"}}
                ]}
            }
        }],
        "locks": [{"object": {"app_label": "pages", "model_name": "page", "pk": "1"}, "holder": "alice"}]
    }"#;

    #[test]
    fn loads_models_objects_and_locks() {
        let store = Snapshot::from_json_str(SEED).unwrap().into_store().unwrap();
        let key = ObjectKey::new("pages", "page", 1);
        let object = store.load(&key).unwrap();

        assert_eq!(object.render_field("title"), "Home");
        assert_eq!(object.render_field("body"), "Hi");
        let (_, children) = object.blocks("body").unwrap().children().unwrap();
        assert!(children[0].id.is_some(), "missing ids are assigned");
        assert_eq!(store.lock_info(&key).unwrap().holder, "alice");
    }

    #[test]
    fn objects_of_unknown_models_are_rejected() {
        let seed = r#"{"objects": [{"key": {"app_label": "a", "model_name": "b", "pk": "1"}, "title": "x"}]}"#;
        let err = Snapshot::from_json_str(seed).unwrap().into_store().unwrap_err();
        assert!(matches!(err, SnapshotError::Store(StoreError::UnknownModel { .. })));
    }

    #[test]
    fn bad_json_and_missing_files() {
        assert!(matches!(Snapshot::from_json_str("{"), Err(SnapshotError::Json(_))));
        assert!(matches!(
            Snapshot::from_path("/nonexistent/fedit-seed.json"),
            Err(SnapshotError::Io { .. })
        ));
    }
}
