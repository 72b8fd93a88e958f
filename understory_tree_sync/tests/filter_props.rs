// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for the filtered mirror: after any edit stream, the incrementally
//! maintained mirror equals a mirror built from scratch over the final source.

use proptest::prelude::*;
use understory_tree_sync::{FilterNodeId, NodeId, Tree, TreeModelFilter, TreeView};

#[derive(Clone, Debug)]
enum Edit {
    Insert { parent: usize, index: usize, value: u8 },
    Remove { node: usize },
    Change { node: usize, value: u8 },
    Move { node: usize, parent: usize },
    Sort { node: usize },
    Sync,
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        4 => (any::<usize>(), any::<usize>(), any::<u8>())
            .prop_map(|(parent, index, value)| Edit::Insert { parent, index, value }),
        1 => any::<usize>().prop_map(|node| Edit::Remove { node }),
        2 => (any::<usize>(), any::<u8>()).prop_map(|(node, value)| Edit::Change { node, value }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(node, parent)| Edit::Move { node, parent }),
        1 => any::<usize>().prop_map(|node| Edit::Sort { node }),
        1 => Just(Edit::Sync),
    ]
}

fn accepts(value: &u8) -> bool {
    value % 3 != 0
}

fn pick(nodes: &[NodeId], choice: usize) -> NodeId {
    nodes[choice % nodes.len()]
}

/// Apply `edit` to the attached part of `tree`. Returns whether the filter should sync now.
fn apply(tree: &mut Tree<u8>, edit: &Edit) -> bool {
    let root = tree.root().unwrap();
    let attached: Vec<NodeId> = tree.descendants(root).collect();
    let below: Vec<NodeId> = attached[1..].to_vec();
    match *edit {
        Edit::Insert { parent, index, value } => {
            let parent = pick(&attached, parent);
            let node = tree.create(Some(value));
            let index = index % (tree.child_count(parent) + 1);
            tree.insert(parent, node, index).unwrap();
        }
        Edit::Remove { node } if !below.is_empty() => {
            tree.delete_subtree(pick(&below, node));
        }
        Edit::Change { node, value } => {
            tree.set_user_object(pick(&attached, node), Some(value));
        }
        Edit::Move { node, parent } if !below.is_empty() => {
            let node = pick(&below, node);
            let parent = pick(&attached, parent);
            if !tree.is_ancestor_of(node, parent) {
                tree.move_to(node, parent, None).unwrap();
            }
        }
        Edit::Sort { node } => {
            tree.update_order(pick(&attached, node), &|a: &u8, b: &u8| a.cmp(b));
        }
        Edit::Sync => return true,
        _ => {}
    }
    false
}

/// Nested payloads of the children of `node`.
fn render<V: TreeView<Item = u8>>(view: &V, node: V::Id) -> String {
    let parts: Vec<String> = view
        .children(node)
        .iter()
        .map(|&c| {
            let value = view.user_object(c).copied().unwrap_or(u8::MAX);
            format!("{value}({})", render(view, c))
        })
        .collect();
    parts.join(",")
}

fn fresh_render(tree: &Tree<u8>) -> String {
    let mut fresh = TreeModelFilter::new().with_predicate(accepts);
    fresh.set_source_root(tree, tree.root());
    render(&fresh.view(tree), fresh.root())
}

#[test]
fn late_move_under_a_new_sibling() {
    let mut tree = Tree::with_root(Some(1_u8));
    let root = tree.root().unwrap();
    let mut filter = TreeModelFilter::new().with_predicate(accepts);
    filter.set_source_root(&tree, Some(root));
    let one = tree.create(Some(1));
    tree.append(root, one).unwrap();
    filter.sync(&tree);

    let fifty_two = tree.create(Some(52));
    tree.insert(root, fifty_two, 0).unwrap();
    let twenty_six = tree.create(Some(26));
    tree.append(root, twenty_six).unwrap();
    tree.move_to(one, fifty_two, None).unwrap();
    filter.sync(&tree);

    assert_eq!(render(&filter.view(&tree), filter.root()), "52(1()),26()");
    assert_eq!(render(&filter.view(&tree), filter.root()), fresh_render(&tree));
    assert_eq!(filter.len(), 3, "one image per mirrored node");
}

proptest! {
    #[test]
    fn mirror_matches_a_fresh_filter(edits in prop::collection::vec(edit(), 1..60)) {
        let mut tree = Tree::with_root(Some(1_u8));
        let mut filter = TreeModelFilter::new().with_predicate(accepts);
        filter.set_source_root(&tree, tree.root());

        for edit in &edits {
            if apply(&mut tree, edit) {
                filter.sync(&tree);
                prop_assert_eq!(
                    render(&filter.view(&tree), filter.root()),
                    fresh_render(&tree),
                    "after {:?}",
                    edit
                );
            }
        }
        filter.sync(&tree);
        prop_assert_eq!(render(&filter.view(&tree), filter.root()), fresh_render(&tree));

        // Every mapping points at a live image of an accepted source node.
        let view = filter.view(&tree);
        let images: Vec<FilterNodeId> = {
            let mut out = Vec::new();
            let mut stack = vec![filter.root()];
            while let Some(n) = stack.pop() {
                stack.extend(view.children(n).iter().copied());
                out.push(n);
            }
            out
        };
        prop_assert_eq!(images.len(), filter.len() + 1, "one image per mapped node, plus the root");
        for image in images.into_iter().skip(1) {
            let source = filter.source_of(image).unwrap();
            prop_assert_eq!(filter.get_mapped(source), Some(image));
            prop_assert!(tree.user_object(source).is_some_and(accepts));
        }
    }
}

proptest! {
    #[test]
    fn chained_mirror_matches_its_source(edits in prop::collection::vec(edit(), 1..40)) {
        let mut tree = Tree::with_root(Some(1_u8));
        let mut first = TreeModelFilter::new().with_predicate(accepts);
        first.set_source_root(&tree, tree.root());
        let mut second: TreeModelFilter<FilterNodeId, u8> =
            TreeModelFilter::new().with_predicate(|v: &u8| v % 2 == 0);
        second.set_source_root(&first.view(&tree), Some(first.root()));

        for edit in &edits {
            apply(&mut tree, edit);
        }
        first.sync(&tree);
        let view = first.view(&tree);
        second.sync(&view);

        let mut expected = TreeModelFilter::new().with_predicate(|v: &u8| accepts(v) && v % 2 == 0);
        expected.set_source_root(&tree, tree.root());
        prop_assert_eq!(
            render(&second.view(&view), second.root()),
            render(&expected.view(&tree), expected.root())
        );
    }
}
