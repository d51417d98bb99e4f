// Traversal context
//
// The visited stack holds the nodes currently open on the traversal path.
// A node is pushed when the walker starts enumerating its children and popped
// when it is done, so a container reached again from a different parent
// later on is visited normally; only a true cycle (a node reaching itself)
// is cut short.

use super::registry::Registry;
use crate::cell::CellId;
use crate::value::ContainerId;

/// A node that can close a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Node {
    Container(ContainerId),
    /// A cell descended into without being subscribed (excluded cells).
    Cell(CellId),
}

/// Stack of nodes currently open on the traversal path.
#[derive(Debug, Default)]
pub(crate) struct Visited {
    open: Vec<Node>,
}

impl Visited {
    pub(crate) fn contains(&self, node: Node) -> bool {
        self.open.contains(&node)
    }

    pub(crate) fn clear(&mut self) {
        self.open.clear();
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    fn push(&mut self, node: Node) {
        self.open.push(node);
    }

    fn pop(&mut self, node: Node) {
        if let Some(pos) = self.open.iter().rposition(|open| *open == node) {
            self.open.remove(pos);
        }
    }
}

/// Mutable state threaded through one walk: the session's subscription
/// registry plus the visited stack.
pub(crate) struct Traversal<'a> {
    pub(crate) registry: &'a mut Registry,
    visited: &'a mut Visited,
    /// Cell whose change is being dispatched; teardown never reaches it.
    pinned: Option<CellId>,
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(registry: &'a mut Registry, visited: &'a mut Visited) -> Self {
        Self {
            registry,
            visited,
            pinned: None,
        }
    }

    pub(crate) fn pin(&mut self, cell: CellId) {
        self.pinned = Some(cell);
    }

    pub(crate) fn is_pinned(&self, cell: CellId) -> bool {
        self.pinned == Some(cell)
    }

    /// Run `f` with `node` open on the stack.
    ///
    /// Returns false without running `f` if `node` is already open.
    pub(crate) fn scoped(&mut self, node: Node, f: impl FnOnce(&mut Self)) -> bool {
        if self.visited.contains(node) {
            return false;
        }
        self.visited.push(node);
        f(self);
        self.visited.pop(node);
        true
    }
}
