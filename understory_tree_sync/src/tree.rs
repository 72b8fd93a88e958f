// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node arena: ordered children, parent handles, payloads and change events.

use alloc::{vec, vec::Vec};
use core::cmp::Ordering;

use crate::event::{Listeners, Subscription, TreeEvent};
use crate::types::{NodeId, StructureError};
use crate::view::TreeView;

/// Ordering used to keep siblings sorted by payload.
pub type Comparator<T> = dyn Fn(&T, &T) -> Ordering;

/// Ordered tree of payload-carrying nodes.
///
/// Nodes live in an arena and are addressed by generational [`NodeId`]s. A parent owns the
/// order of its children; each child keeps a plain handle back to its parent. Nodes can exist
/// detached (created but not linked, or unlinked by [`Tree::remove`]) until they are linked
/// again or freed with [`Tree::delete_subtree`].
///
/// Structural edits below the designated [root](Tree::root) are reported to subscribers as
/// [`TreeEvent`]s. Edits inside detached subtrees are silent.
///
/// ## Example
///
/// ```rust
/// use understory_tree_sync::{Tree, TreeEvent, TreeView};
///
/// let mut tree = Tree::with_root(Some("root"));
/// let root = tree.root().unwrap();
/// let events = tree.subscribe();
///
/// let a = tree.create(Some("a"));
/// tree.append(root, a).unwrap();
///
/// assert_eq!(tree.children_of(root), &[a]);
/// assert_eq!(tree.path_from_root(a), vec![root, a]);
/// assert!(matches!(
///     events.drain().as_slice(),
///     [TreeEvent::NodesInserted { indices, .. }] if indices == &[0]
/// ));
/// ```
pub struct Tree<T> {
    /// slots
    nodes: Vec<Option<Node<T>>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: Option<NodeId>,
    listeners: Listeners<NodeId>,
}

impl<T> core::fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.len();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
struct Node<T> {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    user_object: Option<T>,
}

impl<T> Tree<T> {
    /// Create an empty tree without a root.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: None,
            listeners: Listeners::default(),
        }
    }

    /// Create a tree whose root carries `user_object`.
    pub fn with_root(user_object: Option<T>) -> Self {
        Self::with_root_id(user_object).0
    }

    pub(crate) fn with_root_id(user_object: Option<T>) -> (Self, NodeId) {
        let mut tree = Self::new();
        let root = tree.create(user_object);
        tree.root = Some(root);
        (tree, root)
    }

    /// Designate a detached node (or nothing) as the root.
    ///
    /// Subscribers receive a [`TreeEvent::StructureChanged`] with the new root as the path.
    pub fn set_root(&mut self, root: Option<NodeId>) -> Result<(), StructureError> {
        if let Some(r) = root {
            if !self.is_alive(r) {
                return Err(StructureError::StaleNode(r));
            }
            if self.node(r).parent.is_some() {
                return Err(StructureError::AlreadyAttached(r));
            }
        }
        self.root = root;
        if self.listeners.is_active() {
            self.listeners.emit(TreeEvent::StructureChanged {
                path: root.into_iter().collect(),
            });
        }
        Ok(())
    }

    /// Allocate a detached node.
    pub fn create(&mut self, user_object: Option<T>) -> NodeId {
        let node = |generation| Node {
            generation,
            parent: None,
            children: Vec::new(),
            user_object,
        };
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(node(generation));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(node(generation)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Whether the arena holds no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node_opt(id).is_some()
    }

    /// Returns the parent of a node if live, or `None` for roots, detached nodes or stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// Get the children of a node, or empty slice if node is stale.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.node_opt(id).map_or(&[], |n| &n.children)
    }

    /// Mutable payload of a live node. Changes made through it are not reported;
    /// follow up with [`Tree::fire_changed`].
    pub fn user_object_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_opt_mut(id)?.user_object.as_mut()
    }

    /// Replace the payload of `id` and report the change. Returns the previous payload.
    pub fn set_user_object(&mut self, id: NodeId, user_object: Option<T>) -> Option<T> {
        let old = self.put_user_object(id, user_object);
        self.fire_changed(id);
        old
    }

    /// Replace a payload without reporting it.
    pub(crate) fn put_user_object(&mut self, id: NodeId, user_object: Option<T>) -> Option<T> {
        let node = self.node_opt_mut(id)?;
        core::mem::replace(&mut node.user_object, user_object)
    }

    /// Whether `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent_of(n);
        }
        false
    }

    /// Link the detached node `child` under `parent` at `index`.
    pub fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), StructureError> {
        self.check_link(parent, child)?;
        let len = self.node(parent).children.len();
        if index > len {
            return Err(StructureError::IndexOutOfBounds { parent, index, len });
        }
        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        self.emit_child_event(parent, vec![index], vec![child], |path, indices, children| {
            TreeEvent::NodesInserted {
                path,
                indices,
                children,
            }
        });
        Ok(())
    }

    /// Link `child` as the last child of `parent`. Returns its index.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<usize, StructureError> {
        let index = self.children_of(parent).len();
        self.insert(parent, child, index)?;
        Ok(index)
    }

    /// Link `child` under `parent` keeping siblings sorted by `comparator`.
    ///
    /// The child goes after any siblings that compare equal to it. Without a comparator the
    /// child is appended.
    pub fn insert_ordered(
        &mut self,
        parent: NodeId,
        child: NodeId,
        comparator: Option<&Comparator<T>>,
    ) -> Result<usize, StructureError> {
        let Some(cmp) = comparator else {
            return self.append(parent, child);
        };
        let index = self
            .children_of(parent)
            .partition_point(|&sibling| self.compare(sibling, child, cmp) != Ordering::Greater);
        self.insert(parent, child, index)?;
        Ok(index)
    }

    /// Unlink the child of `parent` at `index`. The child stays alive, detached.
    pub fn remove(&mut self, parent: NodeId, index: usize) -> Result<NodeId, StructureError> {
        let node = self
            .node_opt_mut(parent)
            .ok_or(StructureError::StaleNode(parent))?;
        let len = node.children.len();
        if index >= len {
            return Err(StructureError::IndexOutOfBounds { parent, index, len });
        }
        let child = node.children.remove(index);
        self.node_mut(child).parent = None;
        self.emit_child_event(parent, vec![index], vec![child], |path, indices, children| {
            TreeEvent::NodesRemoved {
                path,
                indices,
                children,
            }
        });
        Ok(child)
    }

    /// Unlink `child` from its parent. Returns the index it occupied.
    pub fn remove_from_parent(&mut self, child: NodeId) -> Option<usize> {
        let parent = self.parent_of(child)?;
        let index = self.index_of(parent, child)?;
        self.remove(parent, index).ok()?;
        Some(index)
    }

    /// Unlink every child of `parent`, reported as a single event. Returns the detached children.
    pub fn remove_all_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node_opt_mut(parent) else {
            return Vec::new();
        };
        let children = core::mem::take(&mut node.children);
        if children.is_empty() {
            return children;
        }
        for &c in &children {
            self.node_mut(c).parent = None;
        }
        let indices = (0..children.len()).collect();
        self.emit_child_event(parent, indices, children.clone(), |path, indices, children| {
            TreeEvent::NodesRemoved {
                path,
                indices,
                children,
            }
        });
        children
    }

    /// Put the detached, childless node `new` in the place of `old`, handing it all of
    /// `old`'s children in order. `old` ends up detached and childless.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> Result<(), StructureError> {
        if !self.is_alive(old) {
            return Err(StructureError::StaleNode(old));
        }
        let parent = self.parent_of(old).ok_or(StructureError::RootNode(old))?;
        self.check_link(parent, new)?;
        if !self.node(new).children.is_empty() {
            return Err(StructureError::AlreadyAttached(new));
        }
        let index = self.remove_from_parent(old).unwrap_or(0);
        self.insert(parent, new, index)?;
        let children = self.remove_all_children(old);
        for (i, child) in children.into_iter().enumerate() {
            self.insert(new, child, i)?;
        }
        Ok(())
    }

    /// Move `node` under `new_parent`, in comparator order if one is given.
    ///
    /// Does nothing when `node` is already a child of `new_parent`.
    pub fn move_to(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        comparator: Option<&Comparator<T>>,
    ) -> Result<(), StructureError> {
        if !self.is_alive(node) {
            return Err(StructureError::StaleNode(node));
        }
        if !self.is_alive(new_parent) {
            return Err(StructureError::StaleNode(new_parent));
        }
        if self.parent_of(node) == Some(new_parent) {
            return Ok(());
        }
        if self.is_ancestor_of(node, new_parent) {
            return Err(StructureError::AncestorLoop {
                node,
                parent: new_parent,
            });
        }
        self.remove_from_parent(node);
        self.insert_ordered(new_parent, node, comparator)?;
        Ok(())
    }

    /// Stable-sort the children of `parent` by `comparator`.
    ///
    /// A changed order is reported as one [`TreeEvent::StructureChanged`] on `parent`.
    pub fn update_order(&mut self, parent: NodeId, comparator: &Comparator<T>) {
        let Some(node) = self.node_opt(parent) else {
            return;
        };
        let mut sorted = node.children.clone();
        sorted.sort_by(|&a, &b| self.compare(a, b, comparator));
        if sorted == node.children {
            return;
        }
        self.node_mut(parent).children = sorted;
        if self.listeners.is_active() && self.is_attached(parent) {
            self.listeners.emit(TreeEvent::StructureChanged {
                path: self.path_from_root(parent),
            });
        }
    }

    /// Free `node` and its whole subtree, unlinking it first if needed.
    ///
    /// All ids in the subtree become stale. Deleting the root leaves the tree rootless.
    pub fn delete_subtree(&mut self, node: NodeId) {
        if !self.is_alive(node) {
            return;
        }
        self.remove_from_parent(node);
        if self.root == Some(node) {
            self.root = None;
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes[id.idx()].take() {
                stack.extend(n.children);
                self.free_list.push(id.idx());
            }
        }
    }

    /// Report that the payload of `node` changed.
    pub fn fire_changed(&mut self, node: NodeId) {
        match self.parent_of(node) {
            Some(parent) => self.fire_children_changed(parent, &[node]),
            None => {
                if self.root == Some(node) && self.listeners.is_active() {
                    self.listeners.emit(TreeEvent::NodesChanged {
                        path: vec![node],
                        indices: Vec::new(),
                        children: Vec::new(),
                    });
                }
            }
        }
    }

    /// Report that the payloads of several children of `parent` changed, as one event.
    ///
    /// Ids that are not children of `parent` are ignored.
    pub fn fire_children_changed(&mut self, parent: NodeId, children: &[NodeId]) {
        let siblings = self.children_of(parent);
        let mut changed: Vec<(usize, NodeId)> = children
            .iter()
            .filter_map(|&c| siblings.iter().position(|&s| s == c).map(|i| (i, c)))
            .collect();
        if changed.is_empty() {
            return;
        }
        changed.sort_unstable();
        changed.dedup();
        let (indices, children) = changed.into_iter().unzip();
        self.emit_child_event(parent, indices, children, |path, indices, children| {
            TreeEvent::NodesChanged {
                path,
                indices,
                children,
            }
        });
    }

    /// Depth-first, pre-order walk of `node`'s subtree, starting with `node` itself.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_, T> {
        let stack = if self.is_alive(node) {
            vec![node]
        } else {
            Vec::new()
        };
        Descendants { tree: self, stack }
    }

    fn check_link(&self, parent: NodeId, child: NodeId) -> Result<(), StructureError> {
        if !self.is_alive(parent) {
            return Err(StructureError::StaleNode(parent));
        }
        if !self.is_alive(child) {
            return Err(StructureError::StaleNode(child));
        }
        if self.root == Some(child) {
            return Err(StructureError::RootNode(child));
        }
        if self.node(child).parent.is_some() {
            return Err(StructureError::AlreadyAttached(child));
        }
        if self.is_ancestor_of(child, parent) {
            return Err(StructureError::AncestorLoop {
                node: child,
                parent,
            });
        }
        Ok(())
    }

    fn compare(&self, a: NodeId, b: NodeId, cmp: &Comparator<T>) -> Ordering {
        let payload = |id| self.node_opt(id).and_then(|n| n.user_object.as_ref());
        match (payload(a), payload(b)) {
            (Some(x), Some(y)) => cmp(x, y),
            _ => Ordering::Equal,
        }
    }

    fn emit_child_event(
        &self,
        parent: NodeId,
        indices: Vec<usize>,
        children: Vec<NodeId>,
        make: impl FnOnce(Vec<NodeId>, Vec<usize>, Vec<NodeId>) -> TreeEvent<NodeId>,
    ) {
        if !self.listeners.is_active() || !self.is_attached(parent) {
            return;
        }
        self.listeners
            .emit(make(self.path_from_root(parent), indices, children));
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node<T>> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.generation()).then_some(n)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.generation() {
            return None;
        }
        Some(n)
    }

    /// Panics if `id` is stale; callers check liveness first.
    fn node(&self, id: NodeId) -> &Node<T> {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }
}

impl<T> TreeView for Tree<T> {
    type Id = NodeId;
    type Item = T;

    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent_of(id)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.children_of(id)
    }

    fn user_object(&self, id: NodeId) -> Option<&T> {
        self.node_opt(id)?.user_object.as_ref()
    }

    fn subscribe(&self) -> Subscription<NodeId> {
        self.listeners.subscribe()
    }
}

/// Iterator returned by [`Tree::descendants`].
#[derive(Debug)]
pub struct Descendants<'a, T> {
    tree: &'a Tree<T>,
    stack: Vec<NodeId>,
}

impl<T> Iterator for Descendants<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children_of(id).iter().rev().copied());
        Some(id)
    }
}
