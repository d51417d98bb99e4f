use crate::cell::{CellId, Subscription};
use crate::hash::IdMap;
use crate::value::{Key, Value};

/// What a subscription remembers between notifications.
pub(crate) enum Retained {
    /// Value of a scalar cell as of the last notification.
    Scalar(Value),
    /// Contents of a collection as of the last batch.
    Slots(Vec<Value>),
}

/// One live subscription and the graph position it was discovered at.
pub(crate) struct Entry {
    pub(crate) target: Value,
    pub(crate) key: Option<Key>,
    pub(crate) parent: Option<Value>,
    pub(crate) retained: Retained,
    /// Disposed when the entry is dropped.
    _subscription: Subscription,
}

impl Entry {
    pub(crate) fn new(
        target: Value,
        key: Option<&Key>,
        parent: Option<&Value>,
        retained: Retained,
        subscription: Subscription,
    ) -> Self {
        Self {
            target,
            key: key.cloned(),
            parent: parent.cloned(),
            retained,
            _subscription: subscription,
        }
    }
}

/// Cell identity -> live subscription, at most one per cell.
///
/// Removing an entry drops its [`Subscription`], which unsubscribes the
/// handler from the cell.
#[derive(Default)]
pub(crate) struct Registry {
    entries: IdMap<CellId, Entry>,
}

impl Registry {
    pub(crate) fn contains(&self, cell: CellId) -> bool {
        self.entries.contains_key(&cell)
    }

    pub(crate) fn insert(&mut self, cell: CellId, entry: Entry) {
        let previous = self.entries.insert(cell, entry);
        debug_assert!(previous.is_none(), "cell {cell:?} subscribed twice");
    }

    pub(crate) fn get(&self, cell: CellId) -> Option<&Entry> {
        self.entries.get(&cell)
    }

    pub(crate) fn get_mut(&mut self, cell: CellId) -> Option<&mut Entry> {
        self.entries.get_mut(&cell)
    }

    pub(crate) fn remove(&mut self, cell: CellId) -> Option<Entry> {
        self.entries.remove(&cell)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every remaining entry, returning how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}
