use super::diff;
use super::notifier::{Notifier, Subscription};
use super::{CellId, CellMeta};
use crate::error::CellError;
use crate::value::Value;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Whether a slot gained or lost a value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeStatus {
    /// The slot now holds `value`
    Added,
    /// `value` left the slot
    Removed,
}

/// One slot-level change inside a batch delivered by [`ObservableArray`].
///
/// `index` is a slot of the new contents for [`ChangeStatus::Added`] and a
/// slot of the previous contents for [`ChangeStatus::Removed`]. When the same
/// element was removed in one place and added in another, both halves carry
/// `moved`: the added half points at the slot it came from, the removed half
/// at the slot it went to.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayChange {
    /// Added or removed
    pub status: ChangeStatus,
    /// The element that entered or left the slot
    pub value: Value,
    /// Slot index
    pub index: usize,
    /// Counterpart slot of a move
    pub moved: Option<usize>,
}

impl ArrayChange {
    /// Returns true for either half of a move
    pub fn is_moved(&self) -> bool {
        self.moved.is_some()
    }
}

/// Reactive collection: an ordered sequence that reports granular per-slot
/// changes instead of one whole-value notification.
///
/// Every mutation diffs the previous contents against the new ones and, if
/// anything changed, delivers the resulting batch of [`ArrayChange`]s to the
/// subscribers registered with [`subscribe_changes`](ObservableArray::subscribe_changes).
///
/// # Example
/// ```ignore
/// let list = ObservableArray::from_values(["a", "b"]);
/// let sub = list.subscribe_changes(|changes| println!("{changes:?}"));
/// list.reverse();  // one moved pair
/// ```
#[derive(Clone)]
pub struct ObservableArray {
    inner: Arc<ArrayInner>,
}

struct ArrayInner {
    meta: CellMeta,
    items: RwLock<Vec<Value>>,
    changes: Arc<Notifier<[ArrayChange]>>,
}

impl ObservableArray {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::from_values(Vec::<Value>::new())
    }

    /// Create a collection holding `values`
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            inner: Arc::new(ArrayInner {
                meta: CellMeta::new(),
                items: RwLock::new(values.into_iter().map(Into::into).collect()),
                changes: Notifier::new(),
            }),
        }
    }

    /// Identity of this cell
    pub fn id(&self) -> CellId {
        self.inner.meta.id()
    }

    /// Snapshot of the current contents
    pub fn peek(&self) -> Vec<Value> {
        self.inner.items.read().clone()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    /// Returns true if the collection has no slots
    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    /// Value at `index`, if present
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.items.read().get(index).cloned()
    }

    /// Append a value
    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        self.mutate(|items| items.push(value));
    }

    /// Remove and return the last value
    pub fn pop(&self) -> Option<Value> {
        self.mutate(Vec::pop)
    }

    /// Insert `value` at `index`, shifting later slots right
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), CellError> {
        let value = value.into();
        self.mutate(|items| {
            if index > items.len() {
                return Err(CellError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, value);
            Ok(())
        })
    }

    /// Remove the value at `index`, shifting later slots left
    pub fn remove_at(&self, index: usize) -> Result<Value, CellError> {
        self.mutate(|items| {
            if index >= items.len() {
                return Err(CellError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            Ok(items.remove(index))
        })
    }

    /// Remove every slot equal to `value` (identity for containers and cells),
    /// returning the removed values.
    pub fn remove(&self, value: &Value) -> Vec<Value> {
        self.mutate(|items| {
            let (removed, kept): (Vec<Value>, Vec<Value>) = std::mem::take(items)
                .into_iter()
                .partition(|item| item == value);
            *items = kept;
            removed
        })
    }

    /// Reverse the slot order
    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
    }

    /// Remove every slot, returning the previous contents
    pub fn clear(&self) -> Vec<Value> {
        self.mutate(std::mem::take)
    }

    /// Swap in entirely new contents
    pub fn replace<I, V>(&self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.mutate(|items| *items = values);
    }

    /// Apply `edit` to the contents and notify subscribers with the slot diff.
    fn mutate<R>(&self, edit: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let (result, changes) = {
            let mut items = self.inner.items.write();
            let previous = items.clone();
            let result = edit(&mut *items);
            (result, diff::compare(&previous, &*items))
        };

        if !changes.is_empty() {
            self.inner.changes.notify(&changes);
        }
        result
    }

    /// Call `handler` with each batch of slot changes
    pub fn subscribe_changes<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&[ArrayChange]) + Send + Sync + 'static,
    {
        self.inner.changes.subscribe(Arc::new(handler))
    }

    /// Number of live change subscriptions (deep subscriptions excluded)
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.len()
    }

    /// Whether deep watches pick this collection up
    pub fn is_watchable(&self) -> bool {
        self.inner.meta.is_watchable()
    }

    /// Include this collection in (`true`) or exclude it from (`false`) every
    /// deep watch, current and future.
    pub fn set_watchable(&self, watchable: bool) -> &Self {
        self.inner.meta.set_watchable(watchable);
        self
    }

    /// Weak handle that does not keep the collection alive
    pub fn downgrade(&self) -> WeakObservableArray {
        WeakObservableArray {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns true if both handles point at the same collection
    pub fn ptr_eq(&self, other: &ObservableArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn meta(&self) -> &CellMeta {
        &self.inner.meta
    }
}

impl Default for ObservableArray {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Into<Value>> FromIterator<V> for ObservableArray {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}

impl fmt::Debug for ObservableArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableArray")
            .field("id", &self.id())
            .field("len", &self.len())
            .finish()
    }
}

/// Non-owning handle to an [`ObservableArray`]
#[derive(Clone)]
pub struct WeakObservableArray {
    inner: Weak<ArrayInner>,
}

impl WeakObservableArray {
    /// Recover a strong handle if the collection is still alive
    pub fn upgrade(&self) -> Option<ObservableArray> {
        self.inner.upgrade().map(|inner| ObservableArray { inner })
    }
}
