// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree mutation events and the subscriptions that buffer them.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;

/// A primitive tree mutation.
///
/// `path` runs from the root of the emitting tree down to the parent whose children changed.
/// For [`TreeEvent::StructureChanged`] it ends at the restructured node itself, and for a
/// [`TreeEvent::NodesChanged`] about the root it is just `[root]` with no children.
///
/// Child events carry both the indices (at emission time) and the child ids, so a consumer
/// that drains events after further edits can still resolve them by identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeEvent<Id> {
    /// Payloads of existing children changed in place.
    NodesChanged {
        /// Root-to-parent path.
        path: Vec<Id>,
        /// Indices of the changed children, ascending.
        indices: Vec<usize>,
        /// The changed children, parallel to `indices`.
        children: Vec<Id>,
    },
    /// Children were inserted.
    NodesInserted {
        /// Root-to-parent path.
        path: Vec<Id>,
        /// Indices of the new children after insertion, ascending.
        indices: Vec<usize>,
        /// The inserted children, parallel to `indices`.
        children: Vec<Id>,
    },
    /// Children were removed.
    NodesRemoved {
        /// Root-to-parent path.
        path: Vec<Id>,
        /// Indices the children occupied before removal, ascending.
        indices: Vec<usize>,
        /// The removed children, parallel to `indices`.
        children: Vec<Id>,
    },
    /// The subtree below the last node of `path` changed arbitrarily.
    StructureChanged {
        /// Root-to-node path.
        path: Vec<Id>,
    },
}

impl<Id: Copy> TreeEvent<Id> {
    /// The path carried by the event.
    pub fn path(&self) -> &[Id] {
        match self {
            Self::NodesChanged { path, .. }
            | Self::NodesInserted { path, .. }
            | Self::NodesRemoved { path, .. }
            | Self::StructureChanged { path } => path,
        }
    }

    /// The last node of the path: the parent for child events, the node itself otherwise.
    pub fn target(&self) -> Option<Id> {
        self.path().last().copied()
    }

    /// Children named by the event (empty for [`TreeEvent::StructureChanged`]).
    pub fn children(&self) -> &[Id] {
        match self {
            Self::NodesChanged { children, .. }
            | Self::NodesInserted { children, .. }
            | Self::NodesRemoved { children, .. } => children,
            Self::StructureChanged { .. } => &[],
        }
    }
}

type Queue<Id> = RefCell<Vec<TreeEvent<Id>>>;

/// Receives the events of one tree until dropped.
///
/// Returned by [`TreeView::subscribe`](crate::TreeView::subscribe). Events queue up inside the
/// subscription and are taken with [`Subscription::drain`]. Dropping the subscription detaches
/// it; the emitter only holds a weak reference.
#[derive(Debug)]
pub struct Subscription<Id> {
    queue: Rc<Queue<Id>>,
}

impl<Id> Subscription<Id> {
    /// Take every event queued since the last drain, oldest first.
    pub fn drain(&self) -> Vec<TreeEvent<Id>> {
        core::mem::take(&mut *self.queue.borrow_mut())
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// Weak fan-out list owned by an emitting tree.
#[derive(Debug)]
pub(crate) struct Listeners<Id> {
    queues: RefCell<Vec<Weak<Queue<Id>>>>,
}

impl<Id> Default for Listeners<Id> {
    fn default() -> Self {
        Self {
            queues: RefCell::new(Vec::new()),
        }
    }
}

impl<Id: Clone> Listeners<Id> {
    pub(crate) fn subscribe(&self) -> Subscription<Id> {
        let queue = Rc::new(RefCell::new(Vec::new()));
        self.queues.borrow_mut().push(Rc::downgrade(&queue));
        Subscription { queue }
    }

    /// Whether anybody is still listening. Emitters skip building paths when not.
    pub(crate) fn is_active(&self) -> bool {
        let mut queues = self.queues.borrow_mut();
        queues.retain(|q| q.strong_count() > 0);
        !queues.is_empty()
    }

    pub(crate) fn emit(&self, event: TreeEvent<Id>) {
        let mut queues = self.queues.borrow_mut();
        queues.retain(|q| q.strong_count() > 0);
        let Some((last, rest)) = queues.split_last() else {
            return;
        };
        for queue in rest {
            if let Some(queue) = queue.upgrade() {
                queue.borrow_mut().push(event.clone());
            }
        }
        if let Some(queue) = last.upgrade() {
            queue.borrow_mut().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn inserted(child: u32) -> TreeEvent<u32> {
        TreeEvent::NodesInserted {
            path: vec![0],
            indices: vec![0],
            children: vec![child],
        }
    }

    #[test]
    fn every_subscriber_gets_a_copy() {
        let listeners = Listeners::default();
        let a = listeners.subscribe();
        let b = listeners.subscribe();
        listeners.emit(inserted(1));
        listeners.emit(inserted(2));
        assert_eq!(a.len(), 2, "first subscriber sees both events");
        assert_eq!(b.drain(), vec![inserted(1), inserted(2)], "order is kept");
        assert!(b.is_empty(), "drain empties the queue");
        assert_eq!(a.len(), 2, "draining one queue leaves the other alone");
    }

    #[test]
    fn dropping_a_subscription_detaches_it() {
        let listeners = Listeners::<u32>::default();
        let a = listeners.subscribe();
        assert!(listeners.is_active(), "one live subscription");
        drop(a);
        assert!(!listeners.is_active(), "dropped subscription is pruned");
        listeners.emit(inserted(3));
        assert!(listeners.queues.borrow().is_empty(), "no dead entries linger");
    }

    #[test]
    fn accessors_follow_the_variant() {
        let ev = TreeEvent::StructureChanged { path: vec![0_u32, 4] };
        assert_eq!(ev.target(), Some(4), "structure events target the node itself");
        assert!(ev.children().is_empty(), "structure events name no children");
        assert_eq!(inserted(7).children(), &[7], "child events expose their children");
    }
}
