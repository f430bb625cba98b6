//! Locating blocks by id inside a block tree.
//!
//! The search is depth-first and pre-order. The first node whose id matches
//! wins; duplicate ids are not detected.
//!
//! A successful lookup reports the node, its content path (one segment per
//! level, see [`ContainerKind::segment`]), the container holding it and its
//! index there. It also records a [`BlockAddress`] so callers can come back
//! with a mutable borrow once they have decided to change the tree.

use std::slice;

use crate::block::{Block, BlockValue, ContainerKind};

/// Child indices from the root container down to one block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BlockAddress(Vec<usize>);

impl BlockAddress {
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Index of the block within its parent.
    pub fn index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Number of containers between the root and the block, root included.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The children vector holding the addressed block.
    pub fn parent_mut<'a>(
        &self,
        root: &'a mut BlockValue,
    ) -> Option<(ContainerKind, &'a mut Vec<Block>)> {
        let (_, ancestors) = self.0.split_last()?;
        let mut current = root;
        for &i in ancestors {
            current = &mut current.children_mut()?.1.get_mut(i)?.value;
        }
        current.children_mut()
    }

    pub fn block<'a>(&self, root: &'a BlockValue) -> Option<&'a Block> {
        let mut indices = self.0.iter();
        let (_, children) = root.children()?;
        let mut block = children.get(*indices.next()?)?;
        for &i in indices {
            block = block.value.children()?.1.get(i)?;
        }
        Some(block)
    }

    pub fn block_mut<'a>(&self, root: &'a mut BlockValue) -> Option<&'a mut Block> {
        let index = self.index()?;
        self.parent_mut(root)?.1.get_mut(index)
    }
}

/// A located block.
#[derive(Debug, Clone)]
pub struct Found<'a> {
    pub block: &'a Block,
    /// Segments from the root to the block, the block's own segment last.
    pub content_path: Vec<String>,
    pub parent_kind: ContainerKind,
    pub parent: &'a [Block],
    pub index: usize,
    pub address: BlockAddress,
}

impl Found<'_> {
    /// Content path joined with `.`, e.g. `body.card.title`.
    pub fn dotted_path(&self) -> String {
        self.content_path.join(".")
    }
}

/// Find `id` among the descendants of a container value.
///
/// Leaf roots have no descendants, so nothing is found.
pub fn find_block<'a>(id: &str, root: &'a BlockValue) -> Option<Found<'a>> {
    let (kind, children) = root.children()?;
    let mut path = Vec::new();
    let mut address = Vec::new();
    search(id, kind, children, &mut path, &mut address)
}

/// Find `id` starting at a single block, which may itself be the match.
///
/// The block is treated as the only child of a one-element stream, so
/// a match on the block itself reports index 0 and a one-element parent.
/// Addresses produced here are relative to that implicit wrapper and are
/// not valid against any real root.
pub fn find_in_block<'a>(id: &str, block: &'a Block) -> Option<Found<'a>> {
    let mut path = Vec::new();
    let mut address = Vec::new();
    search(
        id,
        ContainerKind::Stream,
        slice::from_ref(block),
        &mut path,
        &mut address,
    )
}

fn search<'a>(
    id: &str,
    kind: ContainerKind,
    children: &'a [Block],
    path: &mut Vec<String>,
    address: &mut Vec<usize>,
) -> Option<Found<'a>> {
    for (index, child) in children.iter().enumerate() {
        let segment = kind.segment(child);

        if child.id.as_deref() == Some(id) {
            let mut content_path = path.clone();
            content_path.push(segment);
            let mut indices = address.clone();
            indices.push(index);
            return Some(Found {
                block: child,
                content_path,
                parent_kind: kind,
                parent: children,
                index,
                address: BlockAddress(indices),
            });
        }

        if let Some((child_kind, grandchildren)) = child.value.children() {
            path.push(segment);
            address.push(index);
            if let Some(found) = search(id, child_kind, grandchildren, path, address) {
                return Some(found);
            }
            path.pop();
            address.pop();
        }
    }
    None
}
