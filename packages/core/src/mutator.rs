//! Reordering and inserting blocks.
//!
//! Mutations operate on the container reported by the locator. They either
//! succeed completely or leave the tree as it was; boundary failures are
//! ordinary `Err` values the caller reports back, not panics.
//!
//! Persistence and lock checks belong to the caller. Check the lock before
//! calling in here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockValue, ContainerKind};
use crate::locator::find_block;

/// Which way a block moves within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

impl FromStr for Direction {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(MoveError::InvalidAction {
                action: other.to_string(),
            }),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("Cannot move block {0}")]
    CannotMove(Direction),

    #[error("Invalid action")]
    InvalidAction { action: String },

    #[error("Block {id} not found")]
    BlockNotFound { id: String },

    #[error("Blocks inside a {kind:?} cannot be reordered")]
    Unordered { kind: ContainerKind },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    #[error("Block {id} not found")]
    BlockNotFound { id: String },

    #[error("Invalid parent block: a {kind:?} does not accept new children")]
    InvalidParent { kind: ContainerKind },

    #[error("Insert position {index} is out of range for {len} children")]
    OutOfRange { index: usize, len: usize },
}

/// Swap `items[index]` with its neighbour in `direction`.
///
/// Returns the new index. Up requires `0 < index < len`, down requires
/// `index < len - 1`; anything else fails without touching `items`.
pub fn move_child<T>(items: &mut [T], index: usize, direction: Direction) -> Result<usize, MoveError> {
    let len = items.len();
    let target = match direction {
        Direction::Up if index > 0 && index < len => index - 1,
        Direction::Down if index + 1 < len => index + 1,
        _ => return Err(MoveError::CannotMove(direction)),
    };
    items.swap(index, target);
    Ok(target)
}

/// Insert `blocks` at `index`, shifting later children up.
pub fn insert_children(
    children: &mut Vec<Block>,
    index: usize,
    blocks: Vec<Block>,
) -> Result<(), InsertError> {
    if index > children.len() {
        return Err(InsertError::OutOfRange {
            index,
            len: children.len(),
        });
    }
    children.splice(index..index, blocks);
    Ok(())
}

/// Locate `id` in `root` and move it one step in `direction`.
///
/// Returns the block's new index within its parent.
pub fn move_block(root: &mut BlockValue, id: &str, direction: Direction) -> Result<usize, MoveError> {
    let address = find_block(id, root)
        .ok_or_else(|| MoveError::BlockNotFound { id: id.to_string() })?
        .address;
    let index = address
        .index()
        .ok_or_else(|| MoveError::BlockNotFound { id: id.to_string() })?;

    let (kind, siblings) = address
        .parent_mut(root)
        .ok_or_else(|| MoveError::BlockNotFound { id: id.to_string() })?;
    if !kind.is_ordered() {
        return Err(MoveError::Unordered { kind });
    }

    let new_index = move_child(siblings, index, direction)?;
    log::debug!("moved block {} {} to index {}", id, direction, new_index);
    Ok(new_index)
}

/// Insert `blocks` right after the block `id`, in its parent container.
///
/// Missing ids on the new blocks are generated. Returns the index of the
/// first inserted block.
pub fn insert_after(root: &mut BlockValue, id: &str, mut blocks: Vec<Block>) -> Result<usize, InsertError> {
    let address = find_block(id, root)
        .ok_or_else(|| InsertError::BlockNotFound { id: id.to_string() })?
        .address;
    let index = address
        .index()
        .ok_or_else(|| InsertError::BlockNotFound { id: id.to_string() })?;

    let (kind, siblings) = address
        .parent_mut(root)
        .ok_or_else(|| InsertError::BlockNotFound { id: id.to_string() })?;
    if !kind.is_ordered() {
        return Err(InsertError::InvalidParent { kind });
    }

    for block in &mut blocks {
        if block.id.is_none() {
            block.id = Some(Block::generate_id());
        }
        block.assign_missing_ids();
    }

    let count = blocks.len();
    insert_children(siblings, index + 1, blocks)?;
    log::debug!("inserted {} block(s) after {}", count, id);
    Ok(index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::find_block;
    use serde_json::json;

    fn ids(value: &BlockValue) -> Vec<String> {
        value
            .children()
            .map(|(_, c)| c.iter().filter_map(|b| b.id.clone()).collect())
            .unwrap_or_default()
    }

    fn stream() -> BlockValue {
        BlockValue::Stream(vec![
            Block::leaf("a", "text", "A"),
            Block::leaf("b", "text", "B"),
            Block::leaf("c", "text", "C"),
        ])
    }

    #[test]
    fn move_first_up_fails_without_mutation() {
        let mut root = stream();
        let err = move_block(&mut root, "a", Direction::Up).unwrap_err();
        assert_eq!(err, MoveError::CannotMove(Direction::Up));
        assert_eq!(err.to_string(), "Cannot move block up");
        assert_eq!(ids(&root), vec!["a", "b", "c"]);
    }

    #[test]
    fn move_last_down_fails_without_mutation() {
        let mut root = stream();
        let err = move_block(&mut root, "c", Direction::Down).unwrap_err();
        assert_eq!(err.to_string(), "Cannot move block down");
        assert_eq!(ids(&root), vec!["a", "b", "c"]);
    }

    #[test]
    fn move_down_swaps_and_locator_sees_new_index() {
        let mut root = stream();
        assert_eq!(move_block(&mut root, "a", Direction::Down).unwrap(), 1);
        assert_eq!(ids(&root), vec!["b", "a", "c"]);
        assert_eq!(find_block("a", &root).unwrap().index, 1);
    }

    #[test]
    fn move_up_swaps_with_previous() {
        let mut root = stream();
        assert_eq!(move_block(&mut root, "c", Direction::Up).unwrap(), 1);
        assert_eq!(ids(&root), vec!["a", "c", "b"]);
    }

    #[test]
    fn move_child_bounds() {
        let mut items = vec![1, 2];
        assert!(move_child(&mut items, 2, Direction::Up).is_err());
        assert!(move_child(&mut items, 0, Direction::Up).is_err());
        assert!(move_child(&mut items, 1, Direction::Down).is_err());
        let mut empty: Vec<u8> = Vec::new();
        assert!(move_child(&mut empty, 0, Direction::Down).is_err());
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn struct_fields_are_not_reordered() {
        let mut root = BlockValue::Stream(vec![Block::new(
            Some("s".into()),
            "card",
            BlockValue::Struct(vec![
                Block::new(Some("t".into()), "title", BlockValue::Leaf(json!("T"))),
                Block::field("body", BlockValue::Leaf(json!("B"))),
            ]),
        )]);
        let err = move_block(&mut root, "t", Direction::Down).unwrap_err();
        assert_eq!(err, MoveError::Unordered { kind: ContainerKind::Struct });
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("down".parse::<Direction>().unwrap(), Direction::Down);
        let err = "sideways".parse::<Direction>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid action");
    }

    #[test]
    fn insert_after_shifts_following_blocks() {
        let mut root = stream();
        let new = vec![
            Block::new(None, "text", BlockValue::Leaf(json!("N1"))),
            Block::leaf("n2", "text", "N2"),
        ];
        assert_eq!(insert_after(&mut root, "a", new).unwrap(), 1);

        let (_, children) = root.children().unwrap();
        assert_eq!(children.len(), 5);
        assert!(children[1].id.is_some());
        assert_eq!(children[2].id.as_deref(), Some("n2"));
        assert_eq!(children[3].id.as_deref(), Some("b"));
        assert_eq!(find_block("c", &root).unwrap().index, 4);
    }

    #[test]
    fn insert_after_unknown_block() {
        let mut root = stream();
        let err = insert_after(&mut root, "zzz", vec![]).unwrap_err();
        assert_eq!(err, InsertError::BlockNotFound { id: "zzz".into() });
        assert_eq!(ids(&root), vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_children_checks_range() {
        let mut children = vec![Block::leaf("a", "text", "A")];
        let err = insert_children(&mut children, 3, vec![]).unwrap_err();
        assert_eq!(err, InsertError::OutOfRange { index: 3, len: 1 });
        insert_children(&mut children, 0, vec![Block::leaf("z", "text", "Z")]).unwrap();
        assert_eq!(children[0].id.as_deref(), Some("z"));
    }
}
