use super::notifier::{Notifier, Subscription};
use super::{CellId, CellMeta};
use crate::error::CellError;
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::warn;

/// Scalar reactive cell holding one [`Value`].
///
/// Unlike a bare signal, an `Observable` owns its value: [`set`](Observable::set)
/// stores it and then notifies every subscriber with the new value. Writing a
/// primitive equal to the current primitive is a no-op; writing a container or
/// cell always notifies, since its contents may have changed.
///
/// Handles are cheap to clone and compare by identity.
///
/// # Example
/// ```ignore
/// let count = Observable::new(1);
/// let sub = count.subscribe(|value| println!("now {value:?}"));
/// count.set(2);   // prints "now Number(2.0)"
/// sub.dispose();
/// ```
#[derive(Clone)]
pub struct Observable {
    inner: Arc<ObservableInner>,
}

struct ObservableInner {
    meta: CellMeta,
    value: RwLock<Value>,
    writable: bool,
    changes: Arc<Notifier<Value>>,
    /// Upstream subscription keeping a derived cell in sync.
    source: Mutex<Option<Subscription>>,
}

impl Observable {
    /// Create a writable cell
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_access(value.into(), true)
    }

    /// Create a read-only cell that tracks `source` through `map`.
    ///
    /// The derived cell recomputes every time `source` notifies and cannot be
    /// written directly ([`try_set`](Observable::try_set) fails with
    /// [`CellError::ReadOnly`]).
    pub fn derived<F>(source: &Observable, map: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let derived = Self::with_access(map(&source.peek()), false);
        let target = derived.downgrade();
        let upstream = source.subscribe(move |value| {
            if let Some(derived) = target.upgrade() {
                derived.write(map(value));
            }
        });
        *derived.inner.source.lock() = Some(upstream);
        derived
    }

    fn with_access(value: Value, writable: bool) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                meta: CellMeta::new(),
                value: RwLock::new(value),
                writable,
                changes: Notifier::new(),
                source: Mutex::new(None),
            }),
        }
    }

    /// Identity of this cell
    pub fn id(&self) -> CellId {
        self.inner.meta.id()
    }

    /// Read the current value without registering any dependency
    pub fn peek(&self) -> Value {
        self.inner.value.read().clone()
    }

    /// Returns false for derived cells
    pub fn is_writable(&self) -> bool {
        self.inner.writable
    }

    /// Store a new value and notify subscribers.
    ///
    /// Writes to a derived cell are rejected and logged.
    pub fn set(&self, value: impl Into<Value>) {
        if let Err(err) = self.try_set(value) {
            warn!(cell = ?self.id(), %err, "write ignored");
        }
    }

    /// Store a new value and notify subscribers, failing on derived cells.
    pub fn try_set(&self, value: impl Into<Value>) -> Result<(), CellError> {
        if !self.inner.writable {
            return Err(CellError::ReadOnly);
        }
        self.write(value.into());
        Ok(())
    }

    fn write(&self, value: Value) {
        {
            let mut current = self.inner.value.write();
            if current.is_primitive() && *current == value {
                return;
            }
            *current = value.clone();
        }
        // Lock released: handlers are free to read or write this cell.
        self.inner.changes.notify(&value);
    }

    /// Call `handler` with the new value after every change
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.changes.subscribe(Arc::new(handler))
    }

    /// Number of live change subscriptions (deep subscriptions excluded)
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.len()
    }

    /// Whether deep watches pick this cell up
    pub fn is_watchable(&self) -> bool {
        self.inner.meta.is_watchable()
    }

    /// Include this cell in (`true`) or exclude it from (`false`) every deep
    /// watch, current and future. An excluded cell that is already subscribed
    /// stays subscribed but its changes are not reported.
    pub fn set_watchable(&self, watchable: bool) -> &Self {
        self.inner.meta.set_watchable(watchable);
        self
    }

    /// Weak handle that does not keep the cell alive
    pub fn downgrade(&self) -> WeakObservable {
        WeakObservable {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns true if both handles point at the same cell
    pub fn ptr_eq(&self, other: &Observable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn meta(&self) -> &CellMeta {
        &self.inner.meta
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The value is not printed: it may reach back to this cell.
        f.debug_struct("Observable")
            .field("id", &self.id())
            .field("writable", &self.inner.writable)
            .finish()
    }
}

/// Non-owning handle to an [`Observable`]
#[derive(Clone)]
pub struct WeakObservable {
    inner: Weak<ObservableInner>,
}

impl WeakObservable {
    /// Recover a strong handle if the cell is still alive
    pub fn upgrade(&self) -> Option<Observable> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }
}
