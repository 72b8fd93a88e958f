// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_tree_sync --heading-base-level=0

//! Understory Tree Sync: incremental tree projections for tree views.
//!
//! Tree views rarely show the data they are fed as-is. Elements arrive flat, with parent
//! references, and users narrow the result with filters. This crate keeps such derived trees
//! up to date one edit at a time instead of rebuilding them, so views keep their expansion
//! and selection state and only repaint what changed.
//!
//! - [`TreeBuilder`] projects a keyed domain of elements into a tree. An element may declare
//!   several parents and then shows up once under each of them. Elements whose parents are not
//!   known yet wait under the root as orphans and move into place when the parent arrives.
//! - [`TreeModelFilter`] mirrors the nodes of a source tree accepted by a predicate, keeping
//!   source order and nesting, and follows the source through its mutation events.
//! - [`patch`] computes minimal remove/add scripts between two lists; the filter uses it to
//!   reconcile children without discarding unaffected ones.
//!
//! ## Trees, views and events
//!
//! [`Tree`] is the shared node arena: ordered children, parent handles, payloads and
//! generational [`NodeId`]s. Structural edits below its root are reported as [`TreeEvent`]s to
//! every live [`Subscription`]. A subscription is an owned queue; dropping it unsubscribes.
//!
//! Presentation code reads trees through the [`TreeView`] trait. Both [`Tree`] and
//! [`FilterView`] implement it, so a filter can be stacked on top of another filter.
//!
//! ## Describing elements
//!
//! A [`TreeStructure`] tells the builder how to key an element and where it belongs.
//! [`SingleParent`] and [`MultiParent`] wrap a pair of closures for the common cases.
//!
//! ## Failure model
//!
//! The engine favors availability. Edits that would create a cycle are skipped, events that do
//! not fit the mirror are logged and ignored, and the builder can verify its own bookkeeping
//! with [`TreeBuilder::check_consistency`]. Diagnostics go through `tracing`; install a
//! subscriber to see them. By default the builder checks itself after every mutation in debug
//! builds, up to [`DEFAULT_CHECK_LIMIT`] nodes; see [`BuilderConfig`].
//!
//! ## API overview
//!
//! - [`TreeBuilder::add_all`], [`TreeBuilder::remove_all`] and [`TreeBuilder::update_all`]
//!   edit the element domain; [`TreeBuilder::find_nodes`] maps an element to its nodes.
//! - [`TreeModelFilter::set_source_root`] attaches a filter, [`TreeModelFilter::sync`] applies
//!   pending source events and [`TreeModelFilter::set_predicate`] re-filters everything.
//! - [`TreeModelFilter::get_mapped`] and [`TreeModelFilter::source_of`] translate between
//!   source and filter nodes.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod builder;
mod event;
mod filter;
pub mod patch;
mod structure;
mod tree;
mod types;
mod view;

#[cfg(test)]
mod testing;

pub use builder::{
    BuilderConfig, ConsistencyChecks, ConsistencyIssue, DEFAULT_CHECK_LIMIT, TreeBuilder,
};
pub use event::{Subscription, TreeEvent};
pub use filter::{FilterView, Predicate, TreeModelFilter};
pub use structure::{MultiParent, ParentKeys, SingleParent, TreeStructure};
pub use tree::{Comparator, Descendants, Tree};
pub use types::{FilterNodeId, NodeId, StructureError};
pub use view::TreeView;
