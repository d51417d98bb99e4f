//! Deep subscriptions on individual cells.
//!
//! `cell.subscribe_deep(handler)` is shorthand for deep-watching the cell
//! itself and receiving every change record anywhere below it. All deep
//! subscribers of one cell share a single internal [`WatchSession`]: the
//! first subscriber starts it, every record is published to all of them, and
//! disposing the last subscriber disposes the session.

use crate::cell::notifier::{Handler, Notifier};
use crate::cell::{Observable, ObservableArray, Subscription};
use crate::value::Value;
use crate::watch::{Change, WatchSession, watch};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Per-cell fan-out point for deep subscribers.
pub(crate) struct DeepHub {
    subscribers: Arc<Notifier<Change>>,
    session: Mutex<Option<WatchSession>>,
}

impl DeepHub {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Notifier::new(),
            session: Mutex::new(None),
        })
    }

    fn subscribe(self: &Arc<Self>, target: Value, handler: Handler<Change>) -> Subscription {
        let registration = self.subscribers.subscribe(handler);

        {
            let mut session = self.session.lock();
            if session.is_none() {
                debug!("starting internal deep watch");
                let publisher = Arc::downgrade(&self.subscribers);
                *session = Some(watch(target, move |change| {
                    if let Some(subscribers) = publisher.upgrade() {
                        subscribers.notify(change);
                    }
                }));
            }
        }

        let hub = Arc::downgrade(self);
        Subscription::new(move || {
            drop(registration);
            if let Some(hub) = hub.upgrade() {
                hub.release_if_idle();
            }
        })
    }

    fn release_if_idle(&self) {
        let idle = {
            let mut session = self.session.lock();
            if self.subscribers.is_empty() {
                session.take()
            } else {
                None
            }
        };
        // Disposed outside the lock: disposal drops subscriptions on this cell.
        if let Some(session) = idle {
            debug!("last deep subscriber gone, disposing internal deep watch");
            session.dispose();
        }
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Observable {
    /// Receive every change record from the graph reachable through this
    /// cell, including changes of the cell itself.
    ///
    /// ```ignore
    /// let foo = Observable::new(Object::new().with("bar", Observable::new(1)));
    /// let sub = foo.subscribe_deep(|change| println!("{change:?}"));
    /// ```
    pub fn subscribe_deep<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.meta()
            .deep
            .subscribe(Value::Cell(self.clone()), Arc::new(handler))
    }

    /// Number of live deep subscriptions on this cell
    pub fn deep_subscriber_count(&self) -> usize {
        self.meta().deep.subscriber_count()
    }
}

impl ObservableArray {
    /// Receive every change record from this collection and everything its
    /// elements reach.
    pub fn subscribe_deep<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.meta()
            .deep
            .subscribe(Value::Collection(self.clone()), Arc::new(handler))
    }

    /// Number of live deep subscriptions on this collection
    pub fn deep_subscriber_count(&self) -> usize {
        self.meta().deep.subscriber_count()
    }
}
