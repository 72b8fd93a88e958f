// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! How elements map to keys, parents and nodes.

use core::fmt::{self, Debug};
use core::hash::Hash;

use smallvec::SmallVec;

use crate::tree::Tree;
use crate::types::NodeId;

/// Parent keys of an element. Most elements have at most two.
pub type ParentKeys<K> = SmallVec<[K; 2]>;

/// Describes the hierarchy of a domain of elements to a [`TreeBuilder`](crate::TreeBuilder).
///
/// Single-parent structures implement [`TreeStructure::parent_key`] and keep the default
/// [`TreeStructure::parent_keys`]. Multi-parent structures override `parent_keys`; the builder
/// then never calls `parent_key`.
pub trait TreeStructure<E> {
    /// Stable identity of an element.
    type Key: Clone + Eq + Hash + Debug;

    /// Key of `element`.
    fn node_key(&self, element: &E) -> Self::Key;

    /// The single parent key of `element`, if it has one.
    fn parent_key(&self, element: &E) -> Option<Self::Key>;

    /// Every parent key of `element`. Repeated keys are ignored.
    fn parent_keys(&self, element: &E) -> ParentKeys<Self::Key> {
        self.parent_key(element).into_iter().collect()
    }

    /// Create the detached node that will represent `element` under one parent.
    fn create_node(&self, tree: &mut Tree<E>, element: &E) -> NodeId
    where
        E: Clone,
    {
        tree.create(Some(element.clone()))
    }
}

/// Single-parent [`TreeStructure`] built from two closures.
///
/// ```rust
/// use understory_tree_sync::{SingleParent, TreeStructure};
///
/// struct Folder {
///     id: u32,
///     parent: Option<u32>,
/// }
///
/// let s = SingleParent::new(|f: &Folder| f.id, |f: &Folder| f.parent);
/// let docs = Folder { id: 2, parent: Some(1) };
/// assert_eq!(s.node_key(&docs), 2);
/// assert_eq!(s.parent_keys(&docs).as_slice(), &[1]);
/// ```
pub struct SingleParent<FK, FP> {
    key: FK,
    parent: FP,
}

impl<FK, FP> SingleParent<FK, FP> {
    /// Use `key` for [`TreeStructure::node_key`] and `parent` for [`TreeStructure::parent_key`].
    pub fn new(key: FK, parent: FP) -> Self {
        Self { key, parent }
    }
}

impl<FK, FP> Debug for SingleParent<FK, FP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleParent").finish_non_exhaustive()
    }
}

impl<E, K, FK, FP> TreeStructure<E> for SingleParent<FK, FP>
where
    K: Clone + Eq + Hash + Debug,
    FK: Fn(&E) -> K,
    FP: Fn(&E) -> Option<K>,
{
    type Key = K;

    fn node_key(&self, element: &E) -> K {
        (self.key)(element)
    }

    fn parent_key(&self, element: &E) -> Option<K> {
        (self.parent)(element)
    }
}

/// Multi-parent [`TreeStructure`] built from two closures.
///
/// The parents closure may return anything iterable; an element shows up once under every
/// parent that exists.
pub struct MultiParent<FK, FP> {
    key: FK,
    parents: FP,
}

impl<FK, FP> MultiParent<FK, FP> {
    /// Use `key` for [`TreeStructure::node_key`] and `parents` for
    /// [`TreeStructure::parent_keys`].
    pub fn new(key: FK, parents: FP) -> Self {
        Self { key, parents }
    }
}

impl<FK, FP> Debug for MultiParent<FK, FP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiParent").finish_non_exhaustive()
    }
}

impl<E, K, I, FK, FP> TreeStructure<E> for MultiParent<FK, FP>
where
    K: Clone + Eq + Hash + Debug,
    I: IntoIterator<Item = K>,
    FK: Fn(&E) -> K,
    FP: Fn(&E) -> I,
{
    type Key = K;

    fn node_key(&self, element: &E) -> K {
        (self.key)(element)
    }

    fn parent_key(&self, element: &E) -> Option<K> {
        (self.parents)(element).into_iter().next()
    }

    fn parent_keys(&self, element: &E) -> ParentKeys<K> {
        (self.parents)(element).into_iter().collect()
    }
}
