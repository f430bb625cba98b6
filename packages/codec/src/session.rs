//! Session-indirected tokens.
//!
//! The mapping is kept server-side, per session, and the token is only the
//! key it was stored under. Entries expire after a TTL; lookups of missing
//! or expired entries decode to an empty mapping. Every
//! [`PURGE_EVERY`] writes the store also sweeps out expired entries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use fedit_core::Kwargs;

use crate::{CodecError, CodecScope, SharedContextCodec};

/// Writes between two sweeps of expired entries.
pub const PURGE_EVERY: u64 = 64;

#[derive(Debug, Clone)]
struct Entry {
    kwargs: Kwargs,
    expires_at: DateTime<Utc>,
}

/// Shared contexts of all sessions, keyed by `(session, token)`.
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: DashMap<(String, String), Entry>,
    writes: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, session: &str, key: &str, kwargs: Kwargs, expires_at: DateTime<Utc>) {
        self.entries.insert(
            (session.to_string(), key.to_string()),
            Entry { kwargs, expires_at },
        );
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_EVERY == 0 {
            let purged = self.purge_expired(Utc::now());
            if purged > 0 {
                log::debug!("purged {} expired shared contexts", purged);
            }
        }
    }

    /// The live entry, if any. Expired entries are dropped on the way.
    pub fn get(&self, session: &str, key: &str, now: DateTime<Utc>) -> Option<Kwargs> {
        let id = (session.to_string(), key.to_string());
        let kwargs = {
            let entry = self.entries.get(&id)?;
            (entry.expires_at > now).then(|| entry.kwargs.clone())
        };
        if kwargs.is_none() {
            self.entries.remove(&id);
        }
        kwargs
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Drop everything stored for one session, e.g. on logout.
    pub fn clear_session(&self, session: &str) {
        self.entries.retain(|(s, _), _| s != session);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SessionCodec {
    store: Arc<SessionStore>,
    ttl: Duration,
}

impl SessionCodec {
    pub fn new(store: Arc<SessionStore>, ttl_secs: u64) -> Self {
        Self {
            store,
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1_000)),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}

impl SharedContextCodec for SessionCodec {
    fn encode(&self, kwargs: &Kwargs, scope: &CodecScope<'_>) -> Result<String, CodecError> {
        let session = scope.session_key.ok_or(CodecError::NoSession)?;
        let key = match scope.element_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().simple().to_string(),
        };
        let expires_at = Utc::now() + self.ttl;
        self.store.put(session, &key, kwargs.clone(), expires_at);
        log::debug!("stored shared context {} until {}", key, expires_at);
        Ok(key)
    }

    fn decode(&self, token: &str, scope: &CodecScope<'_>) -> Result<Kwargs, CodecError> {
        let Some(session) = scope.session_key else {
            return Ok(Kwargs::new());
        };
        Ok(self
            .store
            .get(session, token, Utc::now())
            .unwrap_or_default())
    }
}
