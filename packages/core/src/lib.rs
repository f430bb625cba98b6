//! Core of fedit: editing content from the rendered frontend.
//!
//! This crate holds everything that does not depend on a particular
//! adapter, codec or storage backend:
//!
//! - `keyword` / `schema`: declaring the parameters an adapter accepts
//! - `parser`: binding call-site tokens against a schema
//! - `block` / `locator` / `mutator`: block trees and edits to them
//! - `content` / `store`: the content model and its persistence collaborator
//! - `forms`: validation of submitted edits
//! - `adapter` / `registry`: adapter contracts and their lookup table
//!
//! # Example
//!
//! ```rust
//! use fedit_core::{parse_kwargs, AdapterSchema, Keyword, TemplateContext};
//!
//! let schema = AdapterSchema::describe(vec![
//!     Keyword::builder("test").build().unwrap(),
//!     Keyword::builder("admin").absolute().build().unwrap(),
//! ]);
//! let kwargs = parse_kwargs(&schema, &["test='v'", "admin"], &TemplateContext::new()).unwrap();
//! assert_eq!(kwargs["test"], "v");
//! assert_eq!(kwargs["admin"], true);
//! ```

pub mod adapter;
pub mod block;
pub mod content;
pub mod context;
mod error;
pub mod forms;
pub mod keyword;
pub mod locator;
pub mod mutator;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod store;

/// Keyword arguments as bound at a call site or carried in shared context.
pub type Kwargs = serde_json::Map<String, serde_json::Value>;

pub use adapter::{
    content_id_from_parts, slugify, Adapter, AdapterBase, AdapterError, AdapterForm, AdapterKind,
    BlockTarget, ButtonAction, Cleaned, Target, ToolbarButton,
};
pub use block::{Block, BlockValue, ContainerKind};
pub use content::{
    BlockDefinition, ContentObject, FieldKind, FieldSpec, FieldValue, ModelKind, ObjectKey,
};
pub use context::{Caller, TemplateContext, ACCESS_ADMIN};
pub use error::Error;
pub use forms::{new_blocks_from, BlockForm, CleanedData, EditForm, FormErrors, FormField};
pub use keyword::{Keyword, KeywordBuilder, KeywordClass, KeywordError};
pub use locator::{find_block, find_in_block, BlockAddress, Found};
pub use mutator::{insert_after, insert_children, move_block, move_child, Direction, InsertError, MoveError};
pub use parser::{parse_kwargs, resolve_literal, split_contents, ParseError};
pub use registry::{RegisteredAdapter, Registry, RegistryError};
pub use schema::AdapterSchema;
pub use store::{
    ensure_unlocked, lock_state, persist, ContentStore, LockInfo, LogEntry, Persisted, StoreError,
};
