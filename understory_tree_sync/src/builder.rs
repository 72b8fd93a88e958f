// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-parent tree projection over a keyed element domain.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cmp::Ordering;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::event::Subscription;
use crate::structure::{ParentKeys, TreeStructure};
use crate::tree::{Comparator, Tree};
use crate::types::NodeId;
use crate::view::TreeView;

mod consistency;

pub use consistency::{ConsistencyChecks, ConsistencyIssue};

/// Default node count above which the automatic consistency check is skipped.
pub const DEFAULT_CHECK_LIMIT: usize = 1500;

type NodeList = SmallVec<[NodeId; 2]>;

/// Tuning for a [`TreeBuilder`].
///
/// The automatic self-check runs after every mutation when `checks` is non-empty and the
/// projection holds at most `check_limit` nodes. [`TreeBuilder::check_consistency`] ignores
/// both settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Checks run after each mutation.
    pub checks: ConsistencyChecks,
    /// Largest projection (in nodes) that is still checked automatically.
    pub check_limit: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            checks: if cfg!(debug_assertions) {
                ConsistencyChecks::all()
            } else {
                ConsistencyChecks::empty()
            },
            check_limit: DEFAULT_CHECK_LIMIT,
        }
    }
}

impl BuilderConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the automatic checks.
    pub fn checks(mut self, checks: ConsistencyChecks) -> Self {
        self.checks = checks;
        self
    }

    /// Set the size threshold of the automatic check.
    pub fn check_limit(mut self, limit: usize) -> Self {
        self.check_limit = limit;
        self
    }
}

/// Maintains a tree in which every element appears once under each of its parents.
///
/// Elements are identified by [`TreeStructure::node_key`]. An element whose parents are all
/// unknown sits under the synthetic [root](TreeBuilder::root) and is remembered as an orphan of
/// each missing parent key; once such a parent is added, the element is relocated under it.
/// Edits never rebuild the projection: nodes are moved, copied or pruned, and the backing
/// [`Tree`] reports each step to its subscribers.
///
/// ## Example
///
/// ```rust
/// use understory_tree_sync::{MultiParent, TreeBuilder, TreeView};
///
/// // (id, parents)
/// let structure = MultiParent::new(
///     |e: &(char, &'static str)| e.0,
///     |e: &(char, &'static str)| e.1.chars().collect::<Vec<_>>(),
/// );
/// let mut builder = TreeBuilder::new(structure);
/// builder.add_all([('a', ""), ('b', "a"), ('c', "a"), ('d', "bc")]);
///
/// let d_nodes = builder.find_nodes_by_key(&'d');
/// assert_eq!(d_nodes.len(), 2);
/// let tree = builder.tree();
/// let parents: Vec<_> = d_nodes
///     .iter()
///     .map(|&n| tree.user_object(tree.parent_of(n).unwrap()).unwrap().0)
///     .collect();
/// assert_eq!(parents, ['b', 'c']);
/// ```
pub struct TreeBuilder<E, S: TreeStructure<E>> {
    structure: S,
    comparator: Option<Box<Comparator<E>>>,
    tree: Tree<E>,
    root: NodeId,
    /// Every projection node, by element key.
    nodes: HashMap<S::Key, NodeList>,
    /// Missing parent key -> keys of elements waiting for it.
    orphans: HashMap<S::Key, SmallVec<[S::Key; 2]>>,
    config: BuilderConfig,
}

impl<E, S: TreeStructure<E>> core::fmt::Debug for TreeBuilder<E, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("tree", &self.tree)
            .field("keys", &self.nodes.len())
            .field("orphan_parents", &self.orphans.len())
            .field("sorted", &self.comparator.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Parents whose children changed during one `update_all`, in first-touch order.
#[derive(Default)]
struct PendingUpdates {
    parents: Vec<(NodeId, Vec<NodeId>)>,
    slots: HashMap<NodeId, usize>,
}

impl PendingUpdates {
    fn touch(&mut self, parent: NodeId, child: NodeId) {
        let slot = *self.slots.entry(parent).or_insert_with(|| {
            self.parents.push((parent, Vec::new()));
            self.parents.len() - 1
        });
        self.parents[slot].1.push(child);
    }
}

impl<E: Clone, S: TreeStructure<E>> TreeBuilder<E, S> {
    /// Create an empty projection.
    pub fn new(structure: S) -> Self {
        let (tree, root) = Tree::with_root_id(None);
        Self {
            structure,
            comparator: None,
            tree,
            root,
            nodes: HashMap::new(),
            orphans: HashMap::new(),
            config: BuilderConfig::default(),
        }
    }

    /// Keep siblings sorted by `comparator`.
    pub fn with_comparator(mut self, comparator: impl Fn(&E, &E) -> Ordering + 'static) -> Self {
        self.set_comparator(Some(Box::new(comparator)));
        self
    }

    /// Replace the sibling ordering and re-sort every parent. `None` keeps the current order
    /// and appends from now on.
    pub fn set_comparator(&mut self, comparator: Option<Box<Comparator<E>>>) {
        self.comparator = comparator;
        let Some(cmp) = self.comparator.as_deref() else {
            return;
        };
        let parents: Vec<NodeId> = self
            .tree
            .descendants(self.root)
            .filter(|&n| self.tree.child_count(n) > 1)
            .collect();
        for parent in parents {
            self.tree.update_order(parent, cmp);
        }
    }

    /// Use `config` instead of the default.
    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Change the configuration.
    pub fn set_config(&mut self, config: BuilderConfig) {
        self.config = config;
    }

    /// The element structure.
    pub fn structure(&self) -> &S {
        &self.structure
    }

    /// The projection. Its root is [`TreeBuilder::root`].
    pub fn tree(&self) -> &Tree<E> {
        &self.tree
    }

    /// The synthetic root. It never carries an element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Subscribe to mutation events of the projection.
    pub fn subscribe(&self) -> Subscription<NodeId> {
        self.tree.subscribe()
    }

    /// Number of distinct elements in the projection.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no element is present.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether an element with the key of `element` is present.
    pub fn contains(&self, element: &E) -> bool {
        self.nodes.contains_key(&self.structure.node_key(element))
    }

    /// Every node representing `element`.
    pub fn find_nodes(&self, element: &E) -> &[NodeId] {
        self.find_nodes_by_key(&self.structure.node_key(element))
    }

    /// Every node representing the element with `key`.
    pub fn find_nodes_by_key(&self, key: &S::Key) -> &[NodeId] {
        self.nodes.get(key).map_or(&[], |nodes| nodes.as_slice())
    }

    /// Keys of the elements waiting for a parent with `key` to appear.
    pub fn orphans_of(&self, key: &S::Key) -> &[S::Key] {
        self.orphans.get(key).map_or(&[], |keys| keys.as_slice())
    }

    /// Add `element` unless its key is already present.
    pub fn add_element(&mut self, element: E) {
        self.add_one(element);
        self.self_check();
    }

    /// Add several elements.
    pub fn add_all(&mut self, elements: impl IntoIterator<Item = E>) {
        for element in elements {
            self.add_one(element);
        }
        self.self_check();
    }

    /// Remove the element with the key of `element`.
    pub fn remove_element(&mut self, element: &E) {
        let key = self.structure.node_key(element);
        self.remove_key(&key);
        self.self_check();
    }

    /// Remove the element with `key`.
    pub fn remove_by_key(&mut self, key: &S::Key) {
        self.remove_key(key);
        self.self_check();
    }

    /// Remove several elements.
    pub fn remove_all<'a>(&mut self, elements: impl IntoIterator<Item = &'a E>)
    where
        E: 'a,
    {
        for element in elements {
            let key = self.structure.node_key(element);
            self.remove_key(&key);
        }
        self.self_check();
    }

    /// Re-read a single element. See [`TreeBuilder::update_all`].
    pub fn update_element(&mut self, element: E) {
        self.update_all(core::iter::once(element));
    }

    /// Re-read the payload and parents of present elements.
    ///
    /// Nodes under parents that are still declared stay where they are and are reported as
    /// changed, one event per parent. Nodes under parents that are gone are reused for new
    /// parents or pruned. Elements not in the projection are logged and skipped.
    pub fn update_all(&mut self, elements: impl IntoIterator<Item = E>) {
        let mut updates = PendingUpdates::default();
        for element in elements {
            self.update_one(element, &mut updates);
        }
        for (parent, changed) in updates.parents {
            self.tree.fire_children_changed(parent, &changed);
            if let Some(cmp) = self.comparator.as_deref() {
                self.tree.update_order(parent, cmp);
            }
        }
        self.self_check();
    }

    /// Drop every element and orphan record.
    pub fn clear(&mut self) {
        for child in self.tree.remove_all_children(self.root) {
            self.tree.delete_subtree(child);
        }
        self.nodes.clear();
        self.orphans.clear();
    }

    /// Run every consistency check, regardless of [`BuilderConfig`].
    pub fn check_consistency(&self) -> Vec<ConsistencyIssue<S::Key>> {
        consistency::check(self, ConsistencyChecks::all())
    }

    fn self_check(&self) {
        if self.config.checks.is_empty() || self.tree.len() > self.config.check_limit {
            return;
        }
        for issue in consistency::check(self, self.config.checks) {
            tracing::warn!(%issue, "tree builder is inconsistent");
        }
    }

    fn add_one(&mut self, element: E) {
        let key = self.structure.node_key(&element);
        if self.nodes.contains_key(&key) {
            return;
        }
        let mut parents: Vec<NodeId> = Vec::new();
        for parent_key in self.parent_keys_of(&element, &key) {
            match self.nodes.get(&parent_key) {
                Some(nodes) => parents.extend(nodes.iter().copied()),
                None => self.add_orphan(parent_key, key.clone()),
            }
        }
        if parents.is_empty() {
            parents.push(self.root);
        }
        let mut created = NodeList::new();
        for parent in parents {
            let node = self.structure.create_node(&mut self.tree, &element);
            self.link(parent, node);
            created.push(node);
        }
        self.nodes.insert(key.clone(), created.clone());

        let Some(waiting) = self.orphans.remove(&key) else {
            return;
        };
        for orphan in waiting {
            let Some(orphan_nodes) = self.nodes.get(&orphan).cloned() else {
                tracing::warn!(?orphan, parent = ?key, "orphan record without nodes");
                continue;
            };
            self.adopt(&created, &orphan_nodes);
        }
    }

    /// Relocate an orphan's nodes under freshly created parents.
    ///
    /// A node currently under the root is reused; every other parent gets a copy. The
    /// adoption is abandoned when any orphan node is an ancestor of a new parent.
    fn adopt(&mut self, parents: &[NodeId], orphan_nodes: &[NodeId]) {
        let mut spares = NodeList::new();
        for &orphan in orphan_nodes {
            if self.is_top_level(orphan) {
                spares.push(orphan);
            }
            if parents.iter().any(|&p| self.tree.is_ancestor_of(orphan, p)) {
                tracing::warn!(?orphan, "orphan adoption would create a loop; skipped");
                return;
            }
        }
        let Some(&sample) = orphan_nodes.first() else {
            return;
        };
        let mut spares = spares.into_iter();
        for &parent in parents {
            self.move_spare_or_copy(parent, &mut spares, sample);
        }
        for spare in spares {
            self.remove_subtree(spare);
        }
    }

    fn remove_key(&mut self, key: &S::Key) {
        let Some(removed) = self.nodes.remove(key) else {
            return;
        };
        // Children of removed nodes, grouped by element key in discovery order.
        let mut orphaned: Vec<(S::Key, NodeList)> = Vec::new();
        let mut slots: HashMap<S::Key, usize> = HashMap::new();
        for &node in &removed {
            self.tree.remove_from_parent(node);
            let children = self.tree.children_of(node).to_vec();
            for child in children {
                let Some(child_key) = self.key_of(child) else {
                    continue;
                };
                let slot = *slots.entry(child_key.clone()).or_insert_with(|| {
                    orphaned.push((child_key.clone(), NodeList::new()));
                    orphaned.len() - 1
                });
                orphaned[slot].1.push(child);
                self.add_orphan(key.clone(), child_key);
            }
        }
        for (child_key, orphan_nodes) in orphaned {
            let survivors = self.find_nodes_by_key(&child_key);
            let only_here = survivors.iter().all(|n| orphan_nodes.contains(n));
            let mut orphan_nodes = orphan_nodes.into_iter();
            if only_here && let Some(first) = orphan_nodes.next() {
                self.relocate(first, self.root);
            }
            for rest in orphan_nodes {
                self.remove_subtree(rest);
            }
        }
        self.remove_orphaned_element(key);
        for node in removed {
            self.tree.delete_subtree(node);
        }
    }

    fn update_one(&mut self, element: E, updates: &mut PendingUpdates) {
        let key = self.structure.node_key(&element);
        let Some(nodes) = self.nodes.get(&key).cloned() else {
            tracing::error!(?key, "cannot update an element that is not in the tree");
            return;
        };
        for &node in &nodes {
            self.tree.put_user_object(node, Some(element.clone()));
        }
        let parent_keys = self.parent_keys_of(&element, &key);
        if parent_keys.is_empty() {
            self.update_without_parents(&key, &nodes, updates);
        } else {
            self.update_with_parents(&key, &nodes, &parent_keys, updates);
        }
    }

    /// Keep one node under the root, preferring one that is already there.
    fn update_without_parents(
        &mut self,
        key: &S::Key,
        nodes: &[NodeId],
        updates: &mut PendingUpdates,
    ) {
        let Some(&first) = nodes.first() else {
            return;
        };
        let keep = match nodes.iter().copied().find(|&n| self.is_top_level(n)) {
            Some(top) => {
                updates.touch(self.root, top);
                top
            }
            None => {
                self.relocate(first, self.root);
                first
            }
        };
        for &node in nodes {
            if node != keep {
                self.remove_subtree(node);
            }
        }
        self.remove_orphaned_element(key);
    }

    fn update_with_parents(
        &mut self,
        key: &S::Key,
        nodes: &[NodeId],
        parent_keys: &[S::Key],
        updates: &mut PendingUpdates,
    ) {
        // Forget waits on parents that are no longer declared.
        self.orphans.retain(|missing, waiting| {
            if !parent_keys.contains(missing) {
                waiting.retain(|k| k != key);
            }
            !waiting.is_empty()
        });

        let mut added: ParentKeys<S::Key> = parent_keys.iter().cloned().collect();
        let mut spares = NodeList::new();
        let mut kept_any = false;
        for &node in nodes {
            let parent = self.tree.parent_of(node);
            let parent_key = parent
                .filter(|&p| p != self.root)
                .and_then(|p| self.key_of(p));
            match (parent, parent_key) {
                (Some(parent), Some(parent_key)) => {
                    if parent_keys.contains(&parent_key) {
                        updates.touch(parent, node);
                        kept_any = true;
                    } else {
                        spares.push(node);
                    }
                    added.retain(|k| *k != parent_key);
                }
                _ => spares.push(node),
            }
        }

        let mut new_parents: Vec<NodeId> = Vec::new();
        for added_key in added {
            match self.nodes.get(&added_key) {
                None => self.add_orphan(added_key, key.clone()),
                Some(targets) => {
                    let loops = targets
                        .iter()
                        .any(|&t| nodes.iter().any(|&n| self.tree.is_ancestor_of(n, t)));
                    if loops {
                        tracing::warn!(
                            ?key,
                            parent = ?added_key,
                            "reparenting would create a loop; skipped"
                        );
                        continue;
                    }
                    new_parents.extend(targets.iter().copied());
                }
            }
        }
        if new_parents.is_empty() && !kept_any {
            new_parents.push(self.root);
        }

        let Some(&sample) = nodes.first() else {
            return;
        };
        let mut spares = spares.into_iter();
        for parent in new_parents {
            self.move_spare_or_copy(parent, &mut spares, sample);
        }
        for spare in spares {
            self.remove_subtree(spare);
        }
    }

    fn move_spare_or_copy(
        &mut self,
        parent: NodeId,
        spares: &mut impl Iterator<Item = NodeId>,
        sample: NodeId,
    ) {
        if let Some(spare) = spares.next() {
            self.relocate(spare, parent);
        } else if let Some(copy) = self.copy_subtree(sample) {
            self.link(parent, copy);
        }
    }

    /// Build a detached, registered copy of `sample`'s subtree.
    fn copy_subtree(&mut self, sample: NodeId) -> Option<NodeId> {
        let element = self.tree.user_object(sample)?.clone();
        let key = self.structure.node_key(&element);
        let copy = self.structure.create_node(&mut self.tree, &element);
        self.nodes.entry(key).or_default().push(copy);
        let children = self.tree.children_of(sample).to_vec();
        for child in children {
            if let Some(child_copy) = self.copy_subtree(child)
                && let Err(err) = self.tree.append(copy, child_copy)
            {
                tracing::warn!(%err, "failed to copy a subtree");
            }
        }
        Some(copy)
    }

    /// Unlink, unregister and free `node` with everything below it.
    fn remove_subtree(&mut self, node: NodeId) {
        self.tree.remove_from_parent(node);
        let doomed: Vec<(NodeId, S::Key)> = self
            .tree
            .descendants(node)
            .filter_map(|n| self.key_of(n).map(|k| (n, k)))
            .collect();
        for (n, k) in doomed {
            if let Some(list) = self.nodes.get_mut(&k) {
                list.retain(|&mut x| x != n);
                if list.is_empty() {
                    self.nodes.remove(&k);
                }
            }
        }
        self.tree.delete_subtree(node);
    }

    fn link(&mut self, parent: NodeId, node: NodeId) {
        if let Err(err) = self
            .tree
            .insert_ordered(parent, node, self.comparator.as_deref())
        {
            tracing::warn!(%err, "failed to link a projection node");
        }
    }

    fn relocate(&mut self, node: NodeId, parent: NodeId) {
        if let Err(err) = self
            .tree
            .move_to(node, parent, self.comparator.as_deref())
        {
            tracing::warn!(%err, "failed to move a projection node");
        }
    }

    fn add_orphan(&mut self, missing: S::Key, waiting: S::Key) {
        let list = self.orphans.entry(missing).or_default();
        if !list.contains(&waiting) {
            list.push(waiting);
        }
    }

    fn remove_orphaned_element(&mut self, key: &S::Key) {
        self.orphans.retain(|_, waiting| {
            waiting.retain(|k| k != key);
            !waiting.is_empty()
        });
    }

    /// Declared parents without repeats and without the element itself.
    fn parent_keys_of(&self, element: &E, key: &S::Key) -> ParentKeys<S::Key> {
        let mut out = ParentKeys::new();
        for parent_key in self.structure.parent_keys(element) {
            if parent_key != *key && !out.contains(&parent_key) {
                out.push(parent_key);
            }
        }
        out
    }

    fn key_of(&self, node: NodeId) -> Option<S::Key> {
        self.tree
            .user_object(node)
            .map(|e| self.structure.node_key(e))
    }

    fn is_top_level(&self, node: NodeId) -> bool {
        self.tree.parent_of(node) == Some(self.root)
    }
}
