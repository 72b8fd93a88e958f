// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only node contract shared by every tree kind.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use crate::event::Subscription;

/// Read access to a tree of payload-carrying nodes, plus its event stream.
///
/// Presentation code and [`TreeModelFilter`](crate::TreeModelFilter) consume trees through this
/// trait. It is implemented by [`Tree`](crate::Tree) and by [`FilterView`](crate::FilterView),
/// so a filter can mirror another filter.
///
/// Methods taking a stale id behave as if the node had no parent, no children and no payload.
pub trait TreeView {
    /// Node handle.
    type Id: Copy + Eq + Hash + Debug;
    /// Payload carried by nodes.
    type Item;

    /// The root node, if any.
    fn root(&self) -> Option<Self::Id>;

    /// Parent of `id`, or `None` for the root, detached nodes and stale ids.
    fn parent(&self, id: Self::Id) -> Option<Self::Id>;

    /// Ordered children of `id`.
    fn children(&self, id: Self::Id) -> &[Self::Id];

    /// Payload of `id`.
    fn user_object(&self, id: Self::Id) -> Option<&Self::Item>;

    /// Subscribe to this tree's mutation events.
    fn subscribe(&self) -> Subscription<Self::Id>;

    /// Number of children of `id`.
    fn child_count(&self, id: Self::Id) -> usize {
        self.children(id).len()
    }

    /// Child of `id` at `index`.
    fn child_at(&self, id: Self::Id, index: usize) -> Option<Self::Id> {
        self.children(id).get(index).copied()
    }

    /// Position of `child` among the children of `parent`.
    fn index_of(&self, parent: Self::Id, child: Self::Id) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Nodes from the top of `id`'s tree down to `id`, inclusive.
    ///
    /// For a detached subtree the path starts at the subtree's top node.
    fn path_from_root(&self, id: Self::Id) -> Vec<Self::Id> {
        let mut path = Vec::new();
        let mut cur = Some(id);
        while let Some(node) = cur {
            path.push(node);
            cur = self.parent(node);
        }
        path.reverse();
        path
    }

    /// Whether `id` is reachable from [`TreeView::root`].
    fn is_attached(&self, id: Self::Id) -> bool {
        let Some(root) = self.root() else {
            return false;
        };
        let mut cur = id;
        loop {
            if cur == root {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }
}
