// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Self-check of a [`TreeBuilder`] against its bookkeeping.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashSet;

use super::TreeBuilder;
use crate::structure::TreeStructure;
use crate::types::NodeId;

bitflags::bitflags! {
    /// Groups of consistency checks.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ConsistencyChecks: u8 {
        /// Orphan records: no present key is awaited, lists are non-empty and unique.
        const ORPHANS   = 0b0000_0001;
        /// The key index and the nodes reachable from the root match one to one.
        const INDEX     = 0b0000_0010;
        /// No key repeats along a root-to-node path.
        const PATHS     = 0b0000_0100;
        /// All nodes of one key have children with the same keys.
        const SIBLINGS  = 0b0000_1000;
    }
}

/// A violated builder invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsistencyIssue<K> {
    /// A key is both present and awaited as a missing parent.
    AwaitedKeyPresent {
        /// The key.
        key: K,
    },
    /// A missing parent key has no waiting elements.
    EmptyOrphanList {
        /// The missing parent key.
        key: K,
    },
    /// An element waits twice for the same parent.
    DuplicateOrphan {
        /// The missing parent key.
        parent: K,
        /// The waiting element.
        key: K,
    },
    /// A key is indexed with no nodes.
    EmptyNodeList {
        /// The key.
        key: K,
    },
    /// A node is indexed under a key its element does not have.
    MisfiledNode {
        /// The index key.
        key: K,
        /// The node.
        node: NodeId,
    },
    /// A node appears more than once in the index.
    DuplicateIndexedNode {
        /// The node.
        node: NodeId,
    },
    /// An indexed node is not reachable from the root.
    UnreachableNode {
        /// The node.
        node: NodeId,
    },
    /// A reachable node is missing from the index.
    UnindexedNode {
        /// The node.
        node: NodeId,
    },
    /// A key occurs twice on one path from the root.
    RepeatedKeyOnPath {
        /// The repeated key.
        key: K,
        /// The lower occurrence.
        node: NodeId,
    },
    /// Two nodes of one key have children with different keys.
    DivergentCopies {
        /// The key.
        key: K,
        /// The first node of the key.
        first: NodeId,
        /// The node that differs from it.
        other: NodeId,
    },
}

impl<K: fmt::Debug> fmt::Display for ConsistencyIssue<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitedKeyPresent { key } => {
                write!(f, "key {key:?} is present but still awaited by orphans")
            }
            Self::EmptyOrphanList { key } => write!(f, "empty orphan list for {key:?}"),
            Self::DuplicateOrphan { parent, key } => {
                write!(f, "{key:?} waits for {parent:?} more than once")
            }
            Self::EmptyNodeList { key } => write!(f, "empty node list for {key:?}"),
            Self::MisfiledNode { key, node } => {
                write!(f, "node {node:?} is indexed under foreign key {key:?}")
            }
            Self::DuplicateIndexedNode { node } => write!(f, "node {node:?} is indexed twice"),
            Self::UnreachableNode { node } => {
                write!(f, "indexed node {node:?} is not in the tree")
            }
            Self::UnindexedNode { node } => write!(f, "node {node:?} is not indexed"),
            Self::RepeatedKeyOnPath { key, node } => {
                write!(f, "key {key:?} repeats on the path to {node:?}")
            }
            Self::DivergentCopies { key, first, other } => write!(
                f,
                "nodes {first:?} and {other:?} of {key:?} have different children"
            ),
        }
    }
}

impl<K: fmt::Debug> core::error::Error for ConsistencyIssue<K> {}

pub(super) fn check<E, S>(
    builder: &TreeBuilder<E, S>,
    checks: ConsistencyChecks,
) -> Vec<ConsistencyIssue<S::Key>>
where
    E: Clone,
    S: TreeStructure<E>,
{
    let mut issues = Vec::new();
    if checks.contains(ConsistencyChecks::ORPHANS) {
        check_orphans(builder, &mut issues);
    }
    if checks.contains(ConsistencyChecks::INDEX) {
        check_index(builder, &mut issues);
    }
    if checks.contains(ConsistencyChecks::PATHS) {
        let mut on_path = HashSet::new();
        check_paths(builder, builder.root, &mut on_path, &mut issues);
    }
    if checks.contains(ConsistencyChecks::SIBLINGS) {
        check_siblings(builder, &mut issues);
    }
    issues
}

fn check_orphans<E: Clone, S: TreeStructure<E>>(
    builder: &TreeBuilder<E, S>,
    issues: &mut Vec<ConsistencyIssue<S::Key>>,
) {
    for (parent, waiting) in &builder.orphans {
        if builder.nodes.contains_key(parent) {
            issues.push(ConsistencyIssue::AwaitedKeyPresent {
                key: parent.clone(),
            });
        }
        if waiting.is_empty() {
            issues.push(ConsistencyIssue::EmptyOrphanList {
                key: parent.clone(),
            });
        }
        let mut seen = HashSet::new();
        for key in waiting {
            if !seen.insert(key) {
                issues.push(ConsistencyIssue::DuplicateOrphan {
                    parent: parent.clone(),
                    key: key.clone(),
                });
            }
        }
    }
}

fn check_index<E: Clone, S: TreeStructure<E>>(
    builder: &TreeBuilder<E, S>,
    issues: &mut Vec<ConsistencyIssue<S::Key>>,
) {
    let reachable: HashSet<NodeId> = builder.tree.descendants(builder.root).skip(1).collect();
    let mut indexed = HashSet::new();
    for (key, nodes) in &builder.nodes {
        if nodes.is_empty() {
            issues.push(ConsistencyIssue::EmptyNodeList { key: key.clone() });
        }
        for &node in nodes {
            if !indexed.insert(node) {
                issues.push(ConsistencyIssue::DuplicateIndexedNode { node });
            }
            if builder.key_of(node).as_ref() != Some(key) {
                issues.push(ConsistencyIssue::MisfiledNode {
                    key: key.clone(),
                    node,
                });
            }
            if !reachable.contains(&node) {
                issues.push(ConsistencyIssue::UnreachableNode { node });
            }
        }
    }
    for node in reachable {
        if !indexed.contains(&node) {
            issues.push(ConsistencyIssue::UnindexedNode { node });
        }
    }
}

fn check_paths<E: Clone, S: TreeStructure<E>>(
    builder: &TreeBuilder<E, S>,
    node: NodeId,
    on_path: &mut HashSet<S::Key>,
    issues: &mut Vec<ConsistencyIssue<S::Key>>,
) {
    for &child in builder.tree.children_of(node) {
        let Some(key) = builder.key_of(child) else {
            continue;
        };
        if on_path.contains(&key) {
            issues.push(ConsistencyIssue::RepeatedKeyOnPath { key, node: child });
            continue;
        }
        on_path.insert(key.clone());
        check_paths(builder, child, on_path, issues);
        on_path.remove(&key);
    }
}

fn check_siblings<E: Clone, S: TreeStructure<E>>(
    builder: &TreeBuilder<E, S>,
    issues: &mut Vec<ConsistencyIssue<S::Key>>,
) {
    let child_keys = |node: NodeId| -> HashSet<S::Key> {
        builder
            .tree
            .children_of(node)
            .iter()
            .filter_map(|&c| builder.key_of(c))
            .collect()
    };
    for (key, nodes) in &builder.nodes {
        let Some((&first, rest)) = nodes.split_first() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let expected = child_keys(first);
        for &other in rest {
            if child_keys(other) != expected {
                issues.push(ConsistencyIssue::DivergentCopies {
                    key: key.clone(),
                    first,
                    other,
                });
            }
        }
    }
}
