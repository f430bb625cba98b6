//! Block trees - the recursive content stored in a block field.
//!
//! A block field holds a tree of [`Block`]s. Every node carries a declared
//! type name and a [`BlockValue`], which is one of:
//!
//! - `Leaf`: an atomic JSON value (text, number, rich text source, ...)
//! - `Struct`: named sub-blocks, addressed by their type name
//! - `List`: ordered children, each with its own id
//! - `Stream`: ordered heterogeneous children, each with a stable id
//!
//! Ids are unique within one tree by convention only; nothing here enforces
//! that.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// One addressable node of a block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub block_type: String,
    pub value: BlockValue,
}

/// The payload of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum BlockValue {
    Leaf(JsonValue),
    Struct(Vec<Block>),
    List(Vec<Block>),
    Stream(Vec<Block>),
}

/// How a container addresses its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Children are named fields; addressed by type name, never reordered.
    Struct,
    /// Homogeneous ordered children, addressed by id.
    List,
    /// Heterogeneous ordered children, addressed by id.
    Stream,
}

impl ContainerKind {
    /// Whether children can be moved and inserted.
    pub fn is_ordered(self) -> bool {
        !matches!(self, ContainerKind::Struct)
    }

    /// The content-path segment of `child` inside a container of this kind.
    pub fn segment(self, child: &Block) -> String {
        match self {
            ContainerKind::Struct => child.block_type.clone(),
            ContainerKind::List | ContainerKind::Stream => child
                .id
                .clone()
                .unwrap_or_else(|| child.block_type.clone()),
        }
    }
}

impl Block {
    pub fn new(id: Option<String>, block_type: impl Into<String>, value: BlockValue) -> Self {
        Self {
            id,
            block_type: block_type.into(),
            value,
        }
    }

    /// A leaf block with an explicit id.
    pub fn leaf(id: impl Into<String>, block_type: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::new(Some(id.into()), block_type, BlockValue::Leaf(value.into()))
    }

    /// A named struct field. Struct children carry no id of their own.
    pub fn field(name: impl Into<String>, value: BlockValue) -> Self {
        Self::new(None, name, value)
    }

    /// A fresh random block id.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Give every ordered-container child without an id a fresh one.
    pub fn assign_missing_ids(&mut self) {
        self.value.assign_missing_ids();
    }

    /// Plain-text rendering; the fallback content fragment for this block.
    pub fn render(&self) -> String {
        self.value.render()
    }
}

impl BlockValue {
    pub fn kind(&self) -> Option<ContainerKind> {
        match self {
            BlockValue::Leaf(_) => None,
            BlockValue::Struct(_) => Some(ContainerKind::Struct),
            BlockValue::List(_) => Some(ContainerKind::List),
            BlockValue::Stream(_) => Some(ContainerKind::Stream),
        }
    }

    /// Children of a container value, `None` for leaves.
    pub fn children(&self) -> Option<(ContainerKind, &[Block])> {
        match self {
            BlockValue::Leaf(_) => None,
            BlockValue::Struct(c) => Some((ContainerKind::Struct, c)),
            BlockValue::List(c) => Some((ContainerKind::List, c)),
            BlockValue::Stream(c) => Some((ContainerKind::Stream, c)),
        }
    }

    pub fn children_mut(&mut self) -> Option<(ContainerKind, &mut Vec<Block>)> {
        match self {
            BlockValue::Leaf(_) => None,
            BlockValue::Struct(c) => Some((ContainerKind::Struct, c)),
            BlockValue::List(c) => Some((ContainerKind::List, c)),
            BlockValue::Stream(c) => Some((ContainerKind::Stream, c)),
        }
    }

    /// An empty container of the same kind; leaves become `null`.
    pub fn empty_like(&self) -> BlockValue {
        match self {
            BlockValue::Leaf(_) => BlockValue::Leaf(JsonValue::Null),
            BlockValue::Struct(_) => BlockValue::Struct(Vec::new()),
            BlockValue::List(_) => BlockValue::List(Vec::new()),
            BlockValue::Stream(_) => BlockValue::Stream(Vec::new()),
        }
    }

    /// Number of direct children; zero for leaves.
    pub fn len(&self) -> usize {
        self.children().map_or(0, |(_, c)| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn assign_missing_ids(&mut self) {
        if let Some((kind, children)) = self.children_mut() {
            for child in children.iter_mut() {
                if kind.is_ordered() && child.id.is_none() {
                    child.id = Some(Block::generate_id());
                }
                child.value.assign_missing_ids();
            }
        }
    }

    pub fn render(&self) -> String {
        match self {
            BlockValue::Leaf(JsonValue::Null) => String::new(),
            BlockValue::Leaf(JsonValue::String(s)) => s.clone(),
            BlockValue::Leaf(other) => other.to_string(),
            BlockValue::Struct(c) | BlockValue::List(c) | BlockValue::Stream(c) => c
                .iter()
                .map(Block::render)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}
