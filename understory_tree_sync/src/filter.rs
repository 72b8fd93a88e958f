// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filtered mirror of a tree, kept up to date from the source's events.

use alloc::{boxed::Box, vec, vec::Vec};
use core::fmt::{self, Debug};
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::event::{Listeners, Subscription, TreeEvent};
use crate::patch::{self, PatchStep};
use crate::tree::Tree;
use crate::types::{FilterNodeId, NodeId, StructureError};
use crate::view::TreeView;

/// Decides whether a payload is shown by a [`TreeModelFilter`].
pub type Predicate<T> = dyn Fn(&T) -> bool;

#[derive(Clone, Debug)]
struct FilterNode<I> {
    generation: u32,
    /// `None` only for a root without source.
    source: Option<I>,
    parent: Option<FilterNodeId>,
    children: Vec<FilterNodeId>,
}

/// A tree that mirrors the accepted nodes of a source tree.
///
/// The filter owns its own arena of nodes addressed by [`FilterNodeId`]. Its root stands for
/// the source root; below it, every source node accepted by the predicate and reachable through
/// accepted ancestors has exactly one image, in source order. A rejected node hides its whole
/// subtree.
///
/// The source is any [`TreeView`] and is passed to every call that needs to read it. The filter
/// subscribes to the source in [`set_source_root`](Self::set_source_root) and catches up on
/// [`sync`](Self::sync). It reports its own changes to its subscribers in filter ids, so a
/// [`FilterView`] can serve as the source of another filter.
///
/// ## Example
///
/// ```rust
/// use understory_tree_sync::{Tree, TreeModelFilter, TreeView};
///
/// let mut tree = Tree::with_root(Some(0));
/// let root = tree.root().unwrap();
/// for n in 1..=4 {
///     let node = tree.create(Some(n));
///     tree.append(root, node).unwrap();
/// }
///
/// let mut evens = TreeModelFilter::new().with_predicate(|n: &i32| n % 2 == 0);
/// evens.set_source_root(&tree, Some(root));
///
/// let view = evens.view(&tree);
/// let shown: Vec<i32> = view
///     .children(evens.root())
///     .iter()
///     .map(|&c| *view.user_object(c).unwrap())
///     .collect();
/// assert_eq!(shown, [2, 4]);
///
/// let six = tree.create(Some(6));
/// tree.insert(root, six, 0).unwrap();
/// evens.sync(&tree);
/// assert_eq!(evens.children_of(evens.root()).len(), 3);
/// assert_eq!(evens.get_mapped(six), evens.children_of(evens.root()).first().copied());
/// ```
pub struct TreeModelFilter<I, T> {
    nodes: Vec<Option<FilterNode<I>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: FilterNodeId,
    /// Source node to its image; never contains the source root.
    mapping: HashMap<I, FilterNodeId>,
    predicate: Option<Box<Predicate<T>>>,
    /// The source root is the source tree's root, so a new tree root is followed.
    follows_tree_root: bool,
    subscription: Option<Subscription<I>>,
    listeners: Listeners<FilterNodeId>,
}

impl<I: Debug, T> Debug for TreeModelFilter<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source_root = self.nodes[self.root.idx()].as_ref().and_then(|n| n.source.as_ref());
        f.debug_struct("TreeModelFilter")
            .field("root", &self.root)
            .field("source_root", &source_root)
            .field("mapped", &self.mapping.len())
            .field("has_predicate", &self.predicate.is_some())
            .field("follows_tree_root", &self.follows_tree_root)
            .finish_non_exhaustive()
    }
}

impl<I, T> Default for TreeModelFilter<I, T>
where
    I: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T> TreeModelFilter<I, T>
where
    I: Copy + Eq + Hash + Debug,
{
    /// Create a filter with no source and no predicate.
    pub fn new() -> Self {
        let mut filter = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: FilterNodeId::new(0, 1),
            mapping: HashMap::new(),
            predicate: None,
            follows_tree_root: false,
            subscription: None,
            listeners: Listeners::default(),
        };
        filter.root = filter.alloc(None, None);
        filter
    }

    /// Builder-style predicate, for use before a source is set.
    pub fn with_predicate(mut self, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// The image of the source root. Always alive.
    pub fn root(&self) -> FilterNodeId {
        self.root
    }

    /// The source node mirrored by [`root`](Self::root).
    pub fn source_root(&self) -> Option<I> {
        self.node(self.root).source
    }

    /// Whether a source is set.
    pub fn is_attached(&self) -> bool {
        self.source_root().is_some()
    }

    /// Number of mirrored source nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Whether nothing below the root is mirrored.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Returns true if `id` refers to a live filter node.
    pub fn is_alive(&self, id: FilterNodeId) -> bool {
        self.node_opt(id).is_some()
    }

    /// The source node mirrored by `node`.
    pub fn source_of(&self, node: FilterNodeId) -> Option<I> {
        self.node_opt(node)?.source
    }

    /// The image of `source`, if it is mirrored.
    pub fn get_mapped(&self, source: I) -> Option<FilterNodeId> {
        if self.source_root() == Some(source) {
            return Some(self.root);
        }
        self.mapping.get(&source).copied()
    }

    /// Parent of a filter node, or `None` for the root and stale ids.
    pub fn parent_of(&self, node: FilterNodeId) -> Option<FilterNodeId> {
        self.node_opt(node)?.parent
    }

    /// Children of a filter node, or an empty slice if the node is stale.
    pub fn children_of(&self, node: FilterNodeId) -> &[FilterNodeId] {
        self.node_opt(node).map_or(&[], |n| &n.children)
    }

    /// Read the mirror as a tree, resolving payloads through `source`.
    pub fn view<'a, S>(&'a self, source: &'a S) -> FilterView<'a, I, T, S>
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        FilterView {
            filter: self,
            source,
        }
    }

    /// Subscribe to the mirror's events.
    pub fn subscribe(&self) -> Subscription<FilterNodeId> {
        self.listeners.subscribe()
    }

    /// Replace the predicate and reconcile the whole mirror, reporting each step.
    pub fn set_predicate<S>(&mut self, source: &S, predicate: Option<Box<Predicate<T>>>)
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        self.predicate = predicate;
        self.resync_node(source, self.root, true);
    }

    /// Mirror the subtree of `root` in `source`, or nothing.
    ///
    /// Drops the previous subscription and every image, subscribes to `source` and rebuilds
    /// the mirror. Subscribers receive one [`TreeEvent::StructureChanged`] on the root.
    pub fn set_source_root<S>(&mut self, source: &S, root: Option<I>)
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        self.subscription = None;
        self.follows_tree_root = root.is_some() && root == source.root();
        if root.is_some() {
            self.subscription = Some(source.subscribe());
        }
        self.repoint(source, root);
    }

    /// Translate every source event received since the last call.
    pub fn sync<S>(&mut self, source: &S)
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        let events = match &self.subscription {
            Some(subscription) => subscription.drain(),
            None => return,
        };
        for event in &events {
            self.handle_event(source, event);
        }
    }

    /// Reconcile the whole mirror with the current state of `source`, reporting each step.
    pub fn resync<S>(&mut self, source: &S)
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        self.resync_node(source, self.root, true);
    }

    /// Apply one source event to the mirror.
    ///
    /// Events are resolved against the live state of `source` by child identity, so they may
    /// be handled after later edits. Events that do not fit the mirror are logged and skipped.
    pub fn handle_event<S>(&mut self, source: &S, event: &TreeEvent<I>)
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        if !self.is_attached() {
            return;
        }
        match event {
            TreeEvent::NodesChanged { path, children, .. } => {
                self.nodes_changed(source, path, children);
            }
            TreeEvent::NodesInserted { path, children, .. } => {
                self.nodes_inserted(source, path, children);
            }
            TreeEvent::NodesRemoved { path, children, .. } => self.nodes_removed(path, children),
            TreeEvent::StructureChanged { path } => self.structure_changed(source, path),
        }
    }

    fn nodes_changed<S>(&mut self, source: &S, path: &[I], children: &[I])
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        let Some(&target) = path.last() else {
            return;
        };
        if children.is_empty() {
            if let Some(image) = self.get_mapped(target) {
                self.fire_changed(image);
            }
            return;
        }
        let Some(parent) = self.get_mapped(target) else {
            if let Some(source_root) = self.source_root()
                && children.contains(&source_root)
            {
                self.fire_changed(self.root);
            }
            return;
        };
        let mut changed = Vec::new();
        for &child in children {
            if source.parent(child) != Some(target) {
                tracing::debug!(?child, "changed node moved before the event was handled");
                continue;
            }
            match (self.image_under(parent, child), self.accepts(source, child)) {
                (Some(image), true) => changed.push(image),
                (Some(image), false) => {
                    if let Some(index) = self.index_in(parent, image) {
                        self.remove_child(parent, index, true);
                    }
                }
                (None, true) => self.seek_place_and_add(source, parent, target, child),
                (None, false) => {}
            }
        }
        self.fire_children_changed(parent, &changed);
    }

    fn nodes_inserted<S>(&mut self, source: &S, path: &[I], children: &[I])
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        let Some(&target) = path.last() else {
            return;
        };
        let Some(parent) = self.get_mapped(target) else {
            return;
        };
        for &child in children {
            if source.parent(child) != Some(target) || self.image_under(parent, child).is_some() {
                continue;
            }
            if self.accepts(source, child) {
                self.seek_place_and_add(source, parent, target, child);
            }
        }
    }

    fn nodes_removed(&mut self, path: &[I], children: &[I]) {
        let Some(&target) = path.last() else {
            return;
        };
        let Some(parent) = self.get_mapped(target) else {
            return;
        };
        let siblings = self.children_of(parent);
        let mut removed: Vec<(usize, FilterNodeId)> = Vec::new();
        for &child in children {
            match siblings
                .iter()
                .position(|&s| self.source_of(s) == Some(child))
            {
                Some(index) => removed.push((index, siblings[index])),
                None => tracing::debug!(?child, ?parent, "removed node has no image here"),
            }
        }
        if removed.is_empty() {
            return;
        }
        removed.sort_unstable();
        removed.dedup();
        let list = &mut self.node_mut(parent).children;
        for &(index, _) in removed.iter().rev() {
            list.remove(index);
        }
        let (indices, images): (Vec<usize>, Vec<FilterNodeId>) = removed.into_iter().unzip();
        self.emit_children(parent, indices, images.clone(), |path, indices, children| {
            TreeEvent::NodesRemoved {
                path,
                indices,
                children,
            }
        });
        for image in images {
            self.release(image);
        }
    }

    fn structure_changed<S>(&mut self, source: &S, path: &[I])
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        let Some(&target) = path.last() else {
            if self.follows_tree_root {
                self.repoint(source, None);
            }
            return;
        };
        if self.source_root() == Some(target) {
            self.resync_node(source, self.root, false);
            self.emit_structure_changed(self.root);
        } else if path.len() == 1 && self.follows_tree_root {
            self.repoint(source, Some(target));
        } else if let Some(&image) = self.mapping.get(&target) {
            self.resync_node(source, image, false);
            self.emit_structure_changed(image);
        } else if let Some(source_root) = self.source_root()
            && source.path_from_root(source_root).contains(&target)
        {
            self.resync_node(source, self.root, false);
            self.emit_structure_changed(self.root);
        }
    }

    /// Drop every image and mirror `root` from scratch.
    fn repoint<S>(&mut self, source: &S, root: Option<I>)
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        let children = core::mem::take(&mut self.node_mut(self.root).children);
        for child in children {
            self.release(child);
        }
        self.mapping.clear();
        self.node_mut(self.root).source = root;
        self.resync_node(source, self.root, false);
        self.emit_structure_changed(self.root);
    }

    /// Patch the children of `node` to the accepted children of its source, then recurse.
    fn resync_node<S>(&mut self, source: &S, node: FilterNodeId, produce_events: bool)
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        let Some(n) = self.node_opt(node) else {
            return;
        };
        let current = n.children.clone();
        let goal: Vec<I> = match n.source {
            Some(src) => source
                .children(src)
                .iter()
                .copied()
                .filter(|&c| self.accepts(source, c))
                .collect(),
            None => Vec::new(),
        };
        // Drop stale images first. Adding a subtree may release an image that moved into it,
        // which must not shift the indices of the steps below.
        let wanted: HashSet<I> = goal.iter().copied().collect();
        for index in (0..current.len()).rev() {
            if !self.source_of(current[index]).is_some_and(|s| wanted.contains(&s)) {
                self.remove_child(node, index, produce_events);
            }
        }
        let current = self.node(node).children.clone();
        let steps = patch::diff_unique(&current, &goal, |&c| self.source_of(c), |&g| Some(g));
        let mut fresh = Vec::new();
        for step in steps {
            match step {
                PatchStep::Remove { index } => self.remove_child(node, index, produce_events),
                PatchStep::Add { index, goal_index } => {
                    fresh.extend(self.add_child(source, node, goal[goal_index], index, produce_events));
                }
            }
        }
        let children = self.node(node).children.clone();
        for child in children {
            if !fresh.contains(&child) {
                self.resync_node(source, child, produce_events);
            }
        }
    }

    /// Insert an image of `child` after the image of its nearest mirrored preceding sibling.
    fn seek_place_and_add<S>(
        &mut self,
        source: &S,
        parent: FilterNodeId,
        source_parent: I,
        child: I,
    ) where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        let siblings = source.children(source_parent);
        let Some(pos) = siblings.iter().position(|&s| s == child) else {
            return;
        };
        let mut place = 0;
        for peer in siblings[..pos].iter().rev() {
            let Some(&image) = self.mapping.get(peer) else {
                continue;
            };
            match self.index_in(parent, image) {
                Some(index) => {
                    place = index + 1;
                    break;
                }
                None => tracing::warn!(
                    ?peer,
                    ?parent,
                    "preceding sibling is mirrored under another parent"
                ),
            }
        }
        self.add_child(source, parent, child, place, true);
    }

    fn add_child<S>(
        &mut self,
        source: &S,
        parent: FilterNodeId,
        child: I,
        index: usize,
        produce_events: bool,
    ) -> Option<FilterNodeId>
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        if let Some(&stale) = self.mapping.get(&child)
            && self.is_alive(stale)
        {
            if self.is_ancestor_or_self(stale, parent) {
                tracing::warn!(
                    ?child,
                    ?parent,
                    "source node is mirrored above its new parent; skipping"
                );
                return None;
            }
            self.unlink(stale);
        }
        let siblings = &self.node_opt(parent)?.children;
        let len = siblings.len();
        let index = if index > len {
            tracing::warn!(?parent, index, len, "filter insertion index out of range");
            len
        } else {
            index
        };
        let anchor = index.checked_sub(1).map(|i| siblings[i]);
        let image = self.alloc(Some(child), Some(parent));
        self.mapping.insert(child, image);
        // Fill the subtree before linking it: this may unlink images that moved into it, and
        // their removals must be reported against the mirror subscribers already know.
        self.resync_node(source, image, false);
        let index = match anchor {
            None => 0,
            Some(anchor) => self
                .index_in(parent, anchor)
                .map_or_else(|| index.min(self.children_of(parent).len()), |i| i + 1),
        };
        self.node_mut(parent).children.insert(index, image);
        if produce_events {
            self.emit_children(parent, vec![index], vec![image], |path, indices, children| {
                TreeEvent::NodesInserted {
                    path,
                    indices,
                    children,
                }
            });
        }
        Some(image)
    }

    fn remove_child(&mut self, parent: FilterNodeId, index: usize, produce_events: bool) {
        let Some(p) = self.node_opt_mut(parent) else {
            return;
        };
        if index >= p.children.len() {
            tracing::warn!(
                ?parent,
                index,
                len = p.children.len(),
                "filter removal index out of range"
            );
            return;
        }
        let image = p.children.remove(index);
        if produce_events {
            self.emit_children(parent, vec![index], vec![image], |path, indices, children| {
                TreeEvent::NodesRemoved {
                    path,
                    indices,
                    children,
                }
            });
        }
        self.release(image);
    }

    /// Remove a live image from wherever it sits, reporting the removal.
    fn unlink(&mut self, image: FilterNodeId) {
        match self.parent_of(image) {
            Some(parent) => {
                if let Some(index) = self.index_in(parent, image) {
                    self.remove_child(parent, index, true);
                }
            }
            None => self.release(image),
        }
    }

    fn is_ancestor_or_self(&self, ancestor: FilterNodeId, node: FilterNodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent_of(n);
        }
        false
    }

    /// Free the subtree of a detached image and drop its mappings.
    fn release(&mut self, node: FilterNodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if !self.is_alive(id) {
                continue;
            }
            let Some(n) = self.nodes[id.idx()].take() else {
                continue;
            };
            // A newer image of the same source may have replaced this one.
            if let Some(src) = n.source
                && self.mapping.get(&src) == Some(&id)
            {
                self.mapping.remove(&src);
            }
            self.free_list.push(id.idx());
            stack.extend(n.children);
        }
    }

    fn accepts<S>(&self, source: &S, node: I) -> bool
    where
        S: TreeView<Id = I, Item = T> + ?Sized,
    {
        match &self.predicate {
            None => true,
            Some(predicate) => source.user_object(node).is_some_and(|v| predicate(v)),
        }
    }

    /// The image of `child` among the children of `parent`.
    fn image_under(&self, parent: FilterNodeId, child: I) -> Option<FilterNodeId> {
        self.children_of(parent)
            .iter()
            .copied()
            .find(|&c| self.source_of(c) == Some(child))
    }

    fn index_in(&self, parent: FilterNodeId, child: FilterNodeId) -> Option<usize> {
        self.children_of(parent).iter().position(|&c| c == child)
    }

    fn fire_changed(&self, image: FilterNodeId) {
        match self.parent_of(image) {
            Some(parent) => self.fire_children_changed(parent, &[image]),
            None => {
                if self.listeners.is_active() {
                    self.listeners.emit(TreeEvent::NodesChanged {
                        path: vec![image],
                        indices: Vec::new(),
                        children: Vec::new(),
                    });
                }
            }
        }
    }

    fn fire_children_changed(&self, parent: FilterNodeId, images: &[FilterNodeId]) {
        let mut changed: Vec<(usize, FilterNodeId)> = images
            .iter()
            .filter_map(|&c| self.index_in(parent, c).map(|i| (i, c)))
            .collect();
        if changed.is_empty() {
            return;
        }
        changed.sort_unstable();
        changed.dedup();
        let (indices, children) = changed.into_iter().unzip();
        self.emit_children(parent, indices, children, |path, indices, children| {
            TreeEvent::NodesChanged {
                path,
                indices,
                children,
            }
        });
    }

    fn emit_children(
        &self,
        parent: FilterNodeId,
        indices: Vec<usize>,
        children: Vec<FilterNodeId>,
        make: impl FnOnce(Vec<FilterNodeId>, Vec<usize>, Vec<FilterNodeId>) -> TreeEvent<FilterNodeId>,
    ) {
        if self.listeners.is_active() {
            self.listeners
                .emit(make(self.path_to(parent), indices, children));
        }
    }

    fn emit_structure_changed(&self, node: FilterNodeId) {
        if self.listeners.is_active() {
            self.listeners.emit(TreeEvent::StructureChanged {
                path: self.path_to(node),
            });
        }
    }

    fn path_to(&self, node: FilterNodeId) -> Vec<FilterNodeId> {
        let mut path = Vec::new();
        let mut cur = Some(node);
        while let Some(n) = cur {
            path.push(n);
            cur = self.parent_of(n);
        }
        path.reverse();
        path
    }

    fn alloc(&mut self, source: Option<I>, parent: Option<FilterNodeId>) -> FilterNodeId {
        let node = |generation| FilterNode {
            generation,
            source,
            parent,
            children: Vec::new(),
        };
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(node(generation));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(node(generation)));
            self.generations.push(generation);
            (self.nodes.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "FilterNodeId uses 32-bit indices."
        )]
        FilterNodeId::new(idx as u32, generation)
    }

    fn node_opt(&self, id: FilterNodeId) -> Option<&FilterNode<I>> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.generation()).then_some(n)
    }

    fn node_opt_mut(&mut self, id: FilterNodeId) -> Option<&mut FilterNode<I>> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.generation() {
            return None;
        }
        Some(n)
    }

    /// Panics if `id` is stale; callers check liveness first.
    fn node(&self, id: FilterNodeId) -> &FilterNode<I> {
        self.nodes[id.idx()].as_ref().expect("dangling FilterNodeId")
    }

    fn node_mut(&mut self, id: FilterNodeId) -> &mut FilterNode<I> {
        self.nodes[id.idx()].as_mut().expect("dangling FilterNodeId")
    }
}

/// Edits of a source [`Tree`] addressed in filter coordinates.
///
/// These only touch the source; the mirror follows on the next [`sync`](TreeModelFilter::sync).
impl<T> TreeModelFilter<NodeId, T> {
    /// Source index at which a node must be inserted to appear at `index` among the children
    /// of `parent` in the mirror.
    ///
    /// That is right after the source node of the preceding image, 0 for the first position,
    /// and the end of the source list at or past the last position.
    pub fn source_insertion_index(
        &self,
        source: &Tree<T>,
        parent: FilterNodeId,
        index: usize,
    ) -> Option<usize> {
        let source_parent = self.source_of(parent)?;
        let children = self.children_of(parent);
        if index >= children.len() {
            return Some(source.child_count(source_parent));
        }
        let Some(prev) = index.checked_sub(1) else {
            return Some(0);
        };
        let prev_source = self.source_of(children[prev])?;
        source.index_of(source_parent, prev_source).map(|i| i + 1)
    }

    /// Link the detached `child` under the source of `parent` so that it shows at `index`.
    ///
    /// Returns the source index used.
    pub fn insert_through(
        &self,
        source: &mut Tree<T>,
        parent: FilterNodeId,
        child: NodeId,
        index: usize,
    ) -> Result<usize, StructureError> {
        let source_parent = self
            .source_of(parent)
            .ok_or(StructureError::NotMirrored(parent))?;
        let at = self
            .source_insertion_index(source, parent, index)
            .ok_or(StructureError::NotMirrored(parent))?;
        source.insert(source_parent, child, at)?;
        Ok(at)
    }

    /// Unlink the source of `node` from its parent. Returns the detached source node.
    pub fn remove_through(
        &self,
        source: &mut Tree<T>,
        node: FilterNodeId,
    ) -> Result<NodeId, StructureError> {
        let source_node = self
            .source_of(node)
            .ok_or(StructureError::NotMirrored(node))?;
        if node == self.root {
            return Err(StructureError::RootNode(source_node));
        }
        source
            .remove_from_parent(source_node)
            .ok_or(StructureError::NotMirrored(node))?;
        Ok(source_node)
    }

    /// Replace the payload behind `node`. Returns the previous payload.
    pub fn set_user_object_through(
        &self,
        source: &mut Tree<T>,
        node: FilterNodeId,
        user_object: Option<T>,
    ) -> Result<Option<T>, StructureError> {
        let source_node = self
            .source_of(node)
            .ok_or(StructureError::NotMirrored(node))?;
        if !source.is_alive(source_node) {
            return Err(StructureError::StaleNode(source_node));
        }
        Ok(source.set_user_object(source_node, user_object))
    }
}

/// A [`TreeModelFilter`] read together with its source.
///
/// Returned by [`TreeModelFilter::view`]. Payloads are looked up in the source.
pub struct FilterView<'a, I, T, S: ?Sized> {
    filter: &'a TreeModelFilter<I, T>,
    source: &'a S,
}

impl<I: Debug, T, S: ?Sized> Debug for FilterView<'_, I, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterView")
            .field("filter", self.filter)
            .finish_non_exhaustive()
    }
}

impl<I, T, S> TreeView for FilterView<'_, I, T, S>
where
    I: Copy + Eq + Hash + Debug,
    S: TreeView<Id = I, Item = T> + ?Sized,
{
    type Id = FilterNodeId;
    type Item = T;

    fn root(&self) -> Option<FilterNodeId> {
        Some(self.filter.root)
    }

    fn parent(&self, id: FilterNodeId) -> Option<FilterNodeId> {
        self.filter.parent_of(id)
    }

    fn children(&self, id: FilterNodeId) -> &[FilterNodeId] {
        self.filter.children_of(id)
    }

    fn user_object(&self, id: FilterNodeId) -> Option<&T> {
        self.source.user_object(self.filter.source_of(id)?)
    }

    fn subscribe(&self) -> Subscription<FilterNodeId> {
        self.filter.subscribe()
    }
}
