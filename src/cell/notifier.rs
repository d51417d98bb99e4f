use parking_lot::Mutex;
use slab::Slab;
use std::fmt;
use std::sync::Arc;

/// A subscriber callback. `Fn` rather than `FnMut` so a handler can be
/// re-entered when it mutates the cell it listens to.
pub(crate) type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// List of subscriber callbacks for one cell.
///
/// Handlers live in a slab so unsubscribing is O(1). The lock is never held
/// while a handler runs: `notify` snapshots the list first, and re-checks
/// that each handler is still registered right before calling it, so a
/// handler disposed by an earlier one in the same round is skipped.
pub(crate) struct Notifier<T: ?Sized> {
    handlers: Mutex<Slab<Handler<T>>>,
}

impl<T: ?Sized + 'static> Notifier<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            handlers: Mutex::new(Slab::new()),
        })
    }

    pub(crate) fn subscribe(self: &Arc<Self>, handler: Handler<T>) -> Subscription {
        let key = self.handlers.lock().insert(handler.clone());
        let notifier = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(notifier) = notifier.upgrade() {
                notifier.remove(key, &handler);
            }
        })
    }

    pub(crate) fn notify(&self, payload: &T) {
        let snapshot: Vec<(usize, Handler<T>)> = self
            .handlers
            .lock()
            .iter()
            .map(|(key, handler)| (key, handler.clone()))
            .collect();

        for (key, handler) in snapshot {
            if self.is_registered(key, &handler) {
                handler(payload);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_registered(&self, key: usize, handler: &Handler<T>) -> bool {
        self.handlers
            .lock()
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, handler))
    }

    fn remove(&self, key: usize, handler: &Handler<T>) {
        let mut handlers = self.handlers.lock();
        // Slab keys are recycled; only remove the slot if it is still ours.
        if handlers
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, handler))
        {
            handlers.remove(key);
        }
    }
}

/// Handle to an active subscription.
///
/// Call [`dispose`](Subscription::dispose) to unsubscribe. Dropping the
/// handle unsubscribes as well, so keep it alive for as long as the
/// handler should run.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Unsubscribe now
    pub fn dispose(mut self) {
        self.teardown_now();
    }

    /// Returns true once the subscription has been torn down
    pub fn is_disposed(&self) -> bool {
        self.teardown.is_none()
    }

    fn teardown_now(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.teardown_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
