// Change dispatcher
//
// Handlers installed on cells never touch session state themselves: they
// turn each notification into a job and submit it to the engine, which runs
// it under the session lock (see session.rs). The `on_*` methods below are
// those jobs.

use super::Change;
use super::context::Traversal;
use super::registry::{Entry, Retained};
use super::session::{Engine, Job};
use crate::cell::{ArrayChange, CellId, ChangeStatus, Observable, ObservableArray};
use crate::value::{Key, Value};
use tracing::trace;

impl Engine {
    pub(super) fn subscribe_scalar(
        &self,
        observable: &Observable,
        key: Option<&Key>,
        parent: Option<&Value>,
    ) -> Entry {
        let cell = observable.id();
        let engine = self.this.clone();
        let subscription = observable.subscribe(move |value| {
            if let Some(engine) = engine.upgrade() {
                engine.submit(Job::Scalar {
                    cell,
                    value: value.clone(),
                });
            }
        });

        Entry::new(
            Value::Cell(observable.clone()),
            key,
            parent,
            Retained::Scalar(observable.peek()),
            subscription,
        )
    }

    pub(super) fn subscribe_slots(
        &self,
        array: &ObservableArray,
        key: Option<&Key>,
        parent: Option<&Value>,
    ) -> Entry {
        let cell = array.id();
        let engine = self.this.clone();
        let source = array.downgrade();
        let subscription = array.subscribe_changes(move |changes| {
            let (Some(engine), Some(array)) = (engine.upgrade(), source.upgrade()) else {
                return;
            };
            // Contents are captured now so a deferred batch still refreshes
            // its snapshot to the state right after its own mutation.
            engine.submit(Job::Slots {
                cell,
                changes: changes.to_vec(),
                contents: array.peek(),
            });
        });

        Entry::new(
            Value::Collection(array.clone()),
            key,
            parent,
            Retained::Slots(array.peek()),
            subscription,
        )
    }

    /// A scalar cell now holds `value`.
    pub(super) fn on_scalar_change(&self, cx: &mut Traversal<'_>, cell: CellId, value: Value) {
        let Some(entry) = cx.registry.get(cell) else {
            trace!(cell = ?cell, "change for unsubscribed cell dropped");
            return;
        };
        let Retained::Scalar(prior_value) = &entry.retained else {
            return;
        };
        let prior_value = prior_value.clone();
        let target = entry.target.clone();
        let key = entry.key.clone();
        let parent = entry.parent.clone();

        self.unwatch(cx, &prior_value);

        if target.is_watchable() {
            self.emit(Change {
                target,
                parent: parent.clone(),
                key: key.clone(),
                value: Some(value.clone()),
                prior_value: Some(prior_value),
            });
        }

        self.watch(cx, &value, key.as_ref(), parent.as_ref());

        if let Some(entry) = cx.registry.get_mut(cell) {
            entry.retained = Retained::Scalar(value);
        }
    }

    /// A collection delivered a batch of slot changes.
    pub(super) fn on_slot_changes(
        &self,
        cx: &mut Traversal<'_>,
        cell: CellId,
        changes: &[ArrayChange],
        contents: Vec<Value>,
    ) {
        let Some(entry) = cx.registry.get(cell) else {
            trace!(cell = ?cell, "slot changes for unsubscribed collection dropped");
            return;
        };
        let Retained::Slots(snapshot) = &entry.retained else {
            return;
        };
        let snapshot = snapshot.clone();
        let target = entry.target.clone();
        let parent = entry.parent.clone();

        for change in changes {
            let (value, prior_value) = resolve_slot(change, &snapshot);

            if target.is_watchable() {
                self.emit(Change {
                    target: target.clone(),
                    parent: parent.clone(),
                    key: Some(Key::Index(change.index)),
                    value,
                    prior_value,
                });
            }

            // Moved elements keep their subscriptions.
            if change.is_moved() {
                continue;
            }
            let key = Key::Index(change.index);
            let item = self.options.access(change.value.clone(), &key, &target);
            match change.status {
                ChangeStatus::Added => self.watch(cx, &item, Some(&key), Some(&target)),
                ChangeStatus::Removed => self.unwatch(cx, &item),
            }
        }

        if let Some(entry) = cx.registry.get_mut(cell) {
            entry.retained = Retained::Slots(contents);
        }
    }

    fn emit(&self, change: Change) {
        (self.callback)(&change);
    }
}

/// `(value, prior_value)` reported for one slot descriptor.
///
/// The live collection has already changed by the time a batch arrives, so
/// the moved halves read the other side of the move from the snapshot taken
/// after the previous batch.
fn resolve_slot(change: &ArrayChange, snapshot: &[Value]) -> (Option<Value>, Option<Value>) {
    match (change.status, change.moved) {
        (ChangeStatus::Added, Some(_)) => {
            (Some(change.value.clone()), snapshot.get(change.index).cloned())
        }
        (ChangeStatus::Removed, Some(moved)) => {
            (snapshot.get(moved).cloned(), Some(change.value.clone()))
        }
        (ChangeStatus::Added, None) => (Some(change.value.clone()), None),
        (ChangeStatus::Removed, None) => (None, Some(change.value.clone())),
    }
}
