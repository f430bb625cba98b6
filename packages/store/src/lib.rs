//! A [`ContentStore`](fedit_core::ContentStore) kept in memory.
//!
//! Used by demos and by tests. It keeps live objects, per-object
//! draft revisions, edit locks and an audit log, and can be seeded from a JSON
//! snapshot.

mod memory;
mod snapshot;

pub use memory::{AuditRecord, InMemoryContentStore, Revision};
pub use snapshot::{Snapshot, SnapshotError};
