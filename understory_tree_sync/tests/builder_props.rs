// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for the tree builder.
//!
//! Elements only name parents with smaller keys, so the declared hierarchy is acyclic and
//! every operation stream must leave the builder consistent.

use std::collections::BTreeMap;

use proptest::prelude::*;
use understory_tree_sync::{
    BuilderConfig, ConsistencyChecks, MultiParent, NodeId, Tree, TreeBuilder, TreeStructure,
    TreeView,
};

const KEYS: u8 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Element {
    key: u8,
    parents: Vec<u8>,
}

#[derive(Clone, Debug)]
enum Op {
    Add(Element),
    Remove(u8),
    Update(Element),
}

fn element() -> impl Strategy<Value = Element> {
    (0..KEYS).prop_flat_map(|key| {
        prop::collection::vec(0..key.max(1), 0..3).prop_map(move |parents| Element {
            key,
            // Key 0 has no smaller keys to point at.
            parents: parents.into_iter().filter(|&p| p < key).collect(),
        })
    })
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => element().prop_map(Op::Add),
        1 => (0..KEYS).prop_map(Op::Remove),
        2 => element().prop_map(Op::Update),
    ]
}

fn structure() -> impl TreeStructure<Element, Key = u8> {
    MultiParent::new(|e: &Element| e.key, |e: &Element| e.parents.clone())
}

fn quiet_builder() -> TreeBuilder<Element, impl TreeStructure<Element, Key = u8>> {
    TreeBuilder::new(structure()).with_config(BuilderConfig::new().checks(ConsistencyChecks::empty()))
}

/// Children of `node` as a canonical, order-independent string.
fn canonical(tree: &Tree<Element>, node: NodeId) -> String {
    let mut parts: Vec<String> = tree
        .children_of(node)
        .iter()
        .map(|&c| {
            let key = tree.user_object(c).map_or(u8::MAX, |e| e.key);
            format!("{key}({})", canonical(tree, c))
        })
        .collect();
    parts.sort();
    parts.join(",")
}

fn apply(builder: &mut TreeBuilder<Element, impl TreeStructure<Element, Key = u8>>, op: &Op) {
    match op {
        Op::Add(e) => builder.add_element(e.clone()),
        Op::Remove(key) => builder.remove_by_key(key),
        Op::Update(e) => {
            if builder.find_nodes_by_key(&e.key).is_empty() {
                builder.add_element(e.clone());
            } else {
                builder.update_element(e.clone());
            }
        }
    }
}

/// The element domain after `ops`, as the builder sees it.
fn final_domain(ops: &[Op]) -> BTreeMap<u8, Element> {
    let mut domain = BTreeMap::new();
    for op in ops {
        match op {
            Op::Add(e) => {
                domain.entry(e.key).or_insert_with(|| e.clone());
            }
            Op::Remove(key) => {
                domain.remove(key);
            }
            Op::Update(e) => {
                domain.insert(e.key, e.clone());
            }
        }
    }
    domain
}

proptest! {
    #[test]
    fn random_edits_keep_the_builder_consistent(ops in prop::collection::vec(op(), 1..40)) {
        let mut builder = quiet_builder();
        for op in &ops {
            apply(&mut builder, op);
            let issues = builder.check_consistency();
            prop_assert!(issues.is_empty(), "after {:?}: {:?}", op, issues);
        }
    }
}

proptest! {
    #[test]
    fn incremental_projection_matches_a_fresh_build(ops in prop::collection::vec(op(), 1..40)) {
        let mut builder = quiet_builder();
        for op in &ops {
            apply(&mut builder, op);
        }
        let mut fresh = quiet_builder();
        fresh.add_all(final_domain(&ops).into_values());
        prop_assert_eq!(
            canonical(builder.tree(), builder.root()),
            canonical(fresh.tree(), fresh.root()),
            "ops: {:?}",
            ops
        );
    }
}

proptest! {
    #[test]
    fn add_then_remove_leaves_an_empty_projection(
        elements in prop::collection::vec(element(), 0..30),
    ) {
        let mut builder = quiet_builder();
        builder.add_all(elements.iter().cloned());
        builder.add_all(elements.iter().cloned());
        prop_assert!(builder.check_consistency().is_empty(), "adding twice is harmless");

        builder.remove_all(elements.iter());
        prop_assert!(builder.is_empty(), "no element is left");
        prop_assert_eq!(builder.tree().len(), 1, "only the root node is alive");
        prop_assert_eq!(builder.tree().child_count(builder.root()), 0);
        for key in 0..KEYS {
            prop_assert!(builder.orphans_of(&key).is_empty(), "orphan record for {} survived", key);
        }
    }
}
