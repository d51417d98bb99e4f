// Graph walker
//
// `watch` discovers every reactive cell reachable from a value and hands it to
// `subscribe_cell`; `unwatch` mirrors the same descent to tear subscriptions
// down. Both push plain containers (and cells descended into without a
// subscription) on the visited stack so cycles terminate. Subscribed cells
// need no stack entry: the registry already stops a second visit.

use super::context::{Node, Traversal};
use super::session::Engine;
use crate::value::{Key, Value};
use tracing::trace;

impl Engine {
    /// Subscribe to every cell reachable from `value`, attributing cells
    /// found directly at this position to `key`/`parent`.
    pub(super) fn watch(
        &self,
        cx: &mut Traversal<'_>,
        value: &Value,
        key: Option<&Key>,
        parent: Option<&Value>,
    ) {
        if value.is_falsy() {
            return;
        }

        match value {
            Value::Cell(_) | Value::Collection(_) => self.subscribe_cell(cx, value, key, parent),
            Value::List(_) | Value::Object(_) => self.watch_children(cx, value),
            _ => {}
        }
    }

    fn watch_children(&self, cx: &mut Traversal<'_>, container: &Value) {
        let Some(id) = container.container_id() else {
            return;
        };

        let entered = cx.scoped(Node::Container(id), |cx| {
            for (key, child) in container.children() {
                let child = self.options.access(child, &key, container);
                self.watch(cx, &child, Some(&key), Some(container));
            }
        });
        if !entered {
            trace!(?id, "container already on traversal path");
        }
    }

    fn subscribe_cell(
        &self,
        cx: &mut Traversal<'_>,
        cell: &Value,
        key: Option<&Key>,
        parent: Option<&Value>,
    ) {
        let Some(id) = cell.cell_id() else {
            return;
        };

        if !cell.is_watchable() || !self.options.admits(cell) {
            trace!(cell = ?id, "cell excluded, descending without subscribing");
            cx.scoped(Node::Cell(id), |cx| {
                self.watch_contents(cx, cell, key, parent);
            });
            return;
        }

        if cx.registry.contains(id) {
            return;
        }

        let entry = match cell {
            Value::Cell(observable) => self.subscribe_scalar(observable, key, parent),
            Value::Collection(array) => self.subscribe_slots(array, key, parent),
            _ => return,
        };
        cx.registry.insert(id, entry);
        trace!(cell = ?id, key = ?key, "subscribed");

        self.watch_contents(cx, cell, key, parent);
    }

    /// Walk what a cell currently holds. A scalar cell's value inherits the
    /// cell's own position; collection elements are keyed by slot with the
    /// collection as parent, and pass through the value accessor.
    fn watch_contents(
        &self,
        cx: &mut Traversal<'_>,
        cell: &Value,
        key: Option<&Key>,
        parent: Option<&Value>,
    ) {
        match cell {
            Value::Cell(observable) => self.watch(cx, &observable.peek(), key, parent),
            Value::Collection(array) => {
                for (index, item) in array.peek().into_iter().enumerate() {
                    let key = Key::Index(index);
                    let item = self.options.access(item, &key, cell);
                    self.watch(cx, &item, Some(&key), Some(cell));
                }
            }
            _ => {}
        }
    }

    /// Dispose every subscription reachable from `value`.
    pub(super) fn unwatch(&self, cx: &mut Traversal<'_>, value: &Value) {
        if value.is_falsy() {
            return;
        }

        match value {
            Value::Cell(_) | Value::Collection(_) => self.unwatch_cell(cx, value),
            Value::List(_) | Value::Object(_) => {
                let Some(id) = value.container_id() else {
                    return;
                };
                cx.scoped(Node::Container(id), |cx| {
                    for (key, child) in value.children() {
                        let child = self.options.access(child, &key, value);
                        self.unwatch(cx, &child);
                    }
                });
            }
            _ => {}
        }
    }

    fn unwatch_cell(&self, cx: &mut Traversal<'_>, cell: &Value) {
        let Some(id) = cell.cell_id() else {
            return;
        };
        // The old value of a cell can reach back to the cell itself; its own
        // subscription and its new contents are the dispatcher's business.
        if cx.is_pinned(id) {
            return;
        }

        if cx.registry.remove(id).is_some() {
            trace!(cell = ?id, "unsubscribed");
        }

        // Tear down what the cell holds now, not what it held when subscribed.
        cx.scoped(Node::Cell(id), |cx| match cell {
            Value::Cell(observable) => self.unwatch(cx, &observable.peek()),
            Value::Collection(array) => {
                for (index, item) in array.peek().into_iter().enumerate() {
                    let item = self.options.access(item, &Key::Index(index), cell);
                    self.unwatch(cx, &item);
                }
            }
            _ => {}
        });
    }
}
