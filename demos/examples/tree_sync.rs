// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builder + filters: a multi-parent catalog narrowed by two stacked filters.
//!
//! This example shows how to combine:
//! - `TreeBuilder` to project flat, keyed elements with several parents into a tree,
//! - `TreeModelFilter` to mirror the parts of that tree a predicate accepts,
//! - a second `TreeModelFilter` stacked on the first one's view.
//!
//! Run:
//! - `cargo run -p understory_demos --example tree_sync`

use understory_tree_sync::{MultiParent, TreeBuilder, TreeEvent, TreeModelFilter, TreeView};

/// A catalog entry that can be filed under several categories.
#[derive(Clone, Debug)]
struct Entry {
    name: &'static str,
    parents: Vec<&'static str>,
    in_stock: bool,
}

fn entry(name: &'static str, parents: &[&'static str], in_stock: bool) -> Entry {
    Entry {
        name,
        parents: parents.to_vec(),
        in_stock,
    }
}

/// Print the subtree below `node`, one indented line per node.
fn print_tree<V: TreeView<Item = Entry>>(view: &V, node: V::Id, depth: usize) {
    for &child in view.children(node) {
        let label = view.user_object(child).map_or("?", |e| e.name);
        println!("{:indent$}{label}", "", indent = depth * 2);
        print_tree(view, child, depth + 1);
    }
}

fn main() {
    let mut builder = TreeBuilder::new(MultiParent::new(
        |e: &Entry| e.name,
        |e: &Entry| e.parents.clone(),
    ))
    .with_comparator(|a: &Entry, b: &Entry| a.name.cmp(b.name));

    // "kettle" arrives before its categories and waits as an orphan.
    builder.add_all([
        entry("kettle", &["kitchen", "gifts"], true),
        entry("kitchen", &[], true),
        entry("mug", &["kitchen", "gifts"], false),
        entry("toaster", &["kitchen"], true),
    ]);
    println!("== Before \"gifts\" exists ==");
    print_tree(builder.tree(), builder.root(), 0);
    println!("orphans waiting for gifts: {:?}", builder.orphans_of(&"gifts"));

    builder.add_element(entry("gifts", &[], true));
    println!("\n== After \"gifts\" arrives ==");
    print_tree(builder.tree(), builder.root(), 0);
    println!(
        "\"kettle\" is shown {} times",
        builder.find_nodes_by_key(&"kettle").len()
    );

    // Mirror only what is in stock.
    let tree = builder.tree();
    let mut in_stock = TreeModelFilter::new().with_predicate(|e: &Entry| e.in_stock);
    in_stock.set_source_root(tree, Some(builder.root()));

    // Stack a second filter on the first: in stock and not a gift category.
    let mut no_gifts = TreeModelFilter::new().with_predicate(|e: &Entry| e.name != "gifts");
    no_gifts.set_source_root(&in_stock.view(tree), Some(in_stock.root()));
    let events = no_gifts.subscribe();

    println!("\n== In stock ==");
    print_tree(&in_stock.view(tree), in_stock.root(), 0);
    println!("\n== In stock, gifts hidden ==");
    print_tree(&no_gifts.view(&in_stock.view(tree)), no_gifts.root(), 0);

    // Restock the mug; both filters follow through their events.
    builder.update_element(entry("mug", &["kitchen", "gifts"], true));
    let tree = builder.tree();
    in_stock.sync(tree);
    let view = in_stock.view(tree);
    no_gifts.sync(&view);

    println!("\n== After restocking the mug ==");
    print_tree(&no_gifts.view(&view), no_gifts.root(), 0);
    for event in events.drain() {
        if let TreeEvent::NodesInserted { indices, .. } = &event {
            println!("  inserted at {indices:?}");
        }
    }
}
