// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: node identifiers and structural errors.

use core::fmt;

/// Identifier for a node in a [`Tree`](crate::Tree) (generational).
///
/// A slot freed by [`Tree::delete_subtree`](crate::Tree::delete_subtree) may be reused,
/// but the generation is bumped, so stale ids never alias a newer node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// Identifier for a node of a [`TreeModelFilter`](crate::TreeModelFilter) mirror (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FilterNodeId(pub(crate) u32, pub(crate) u32);

impl FilterNodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// Why a structural edit of a [`Tree`](crate::Tree) was refused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StructureError {
    /// The id does not refer to a live node.
    StaleNode(NodeId),
    /// The child is already linked under a parent and must be detached first.
    AlreadyAttached(NodeId),
    /// Linking would make a node its own ancestor.
    AncestorLoop {
        /// The node that would have been moved.
        node: NodeId,
        /// The intended parent, which is a descendant of (or equal to) `node`.
        parent: NodeId,
    },
    /// A child index is past the end of the parent's child list.
    IndexOutOfBounds {
        /// The parent whose child list was addressed.
        parent: NodeId,
        /// The offending index.
        index: usize,
        /// Number of children at the time of the call.
        len: usize,
    },
    /// The designated root cannot be linked under another node.
    RootNode(NodeId),
    /// A filter node is stale, or its source no longer sits where the mirror expects it.
    NotMirrored(FilterNodeId),
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleNode(id) => write!(f, "node {id:?} is not alive"),
            Self::AlreadyAttached(id) => write!(f, "node {id:?} already has a parent"),
            Self::AncestorLoop { node, parent } => {
                write!(f, "node {node:?} is an ancestor of {parent:?}")
            }
            Self::IndexOutOfBounds { parent, index, len } => write!(
                f,
                "child index {index} out of bounds for {parent:?} with {len} children"
            ),
            Self::RootNode(id) => write!(f, "root node {id:?} cannot have a parent"),
            Self::NotMirrored(id) => write!(f, "filter node {id:?} does not match its source"),
        }
    }
}

impl core::error::Error for StructureError {}
