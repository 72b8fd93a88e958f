// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test helpers: trees written as `a(b(1,2),c)` and rendered back the same way.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::iter::Peekable;
use core::str::Chars;

use crate::tree::Tree;
use crate::types::NodeId;
use crate::view::TreeView;

/// A tree whose root is named `root`, with `layout` below it.
pub(crate) fn build(layout: &str) -> (Tree<String>, NodeId) {
    let mut tree = Tree::with_root(Some("root".to_string()));
    let root = tree.root().unwrap();
    parse_into(&mut tree, root, layout);
    (tree, root)
}

/// A detached node named `root` with `layout` below it.
pub(crate) fn build_detached(tree: &mut Tree<String>, layout: &str) -> NodeId {
    let top = tree.create(Some("root".to_string()));
    parse_into(tree, top, layout);
    top
}

/// Append the nodes described by `layout` under `parent`.
pub(crate) fn parse_into(tree: &mut Tree<String>, parent: NodeId, layout: &str) {
    parse_list(tree, parent, &mut layout.chars().peekable());
}

fn parse_list(tree: &mut Tree<String>, parent: NodeId, chars: &mut Peekable<Chars<'_>>) {
    loop {
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if matches!(c, ',' | '(' | ')') {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            return;
        }
        let node = tree.create(Some(name));
        tree.append(parent, node).unwrap();
        if chars.peek() == Some(&'(') {
            chars.next();
            parse_list(tree, node, chars);
            assert_eq!(chars.next(), Some(')'), "unbalanced layout");
        }
        if chars.peek() != Some(&',') {
            return;
        }
        chars.next();
    }
}

/// Children of `node`, in the same notation `parse_into` reads.
pub(crate) fn render<V: TreeView<Item = String>>(view: &V, node: V::Id) -> String {
    let parts: Vec<String> = view
        .children(node)
        .iter()
        .map(|&child| {
            let name = view.user_object(child).map_or("?", String::as_str);
            let below = render(view, child);
            if below.is_empty() {
                name.to_string()
            } else {
                alloc::format!("{name}({below})")
            }
        })
        .collect();
    parts.join(",")
}

/// Follow the dotted `path` of names down from `from`; the empty path is `from` itself.
///
/// The first child with a matching name wins.
pub(crate) fn find<V: TreeView<Item = String>>(view: &V, from: V::Id, path: &str) -> V::Id {
    let mut node = from;
    for name in path.split('.').filter(|s| !s.is_empty()) {
        node = view
            .children(node)
            .iter()
            .copied()
            .find(|&c| view.user_object(c).is_some_and(|s| s == name))
            .unwrap_or_else(|| panic!("bad path {path}"));
    }
    node
}
