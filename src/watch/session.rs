use super::Change;
use super::context::{Traversal, Visited};
use super::options::{WatchOptions, default_options};
use super::registry::Registry;
use crate::cell::{ArrayChange, CellId};
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Receives every change record of a watch.
pub type WatchCallback = Arc<dyn Fn(&Change) + Send + Sync>;

/// One unit of engine work.
pub(crate) enum Job {
    /// Initial traversal from the root.
    Watch(Value),
    /// A scalar cell now holds `value`.
    Scalar { cell: CellId, value: Value },
    /// A collection delivered a batch; `contents` is its state right after.
    Slots {
        cell: CellId,
        changes: Vec<ArrayChange>,
        contents: Vec<Value>,
    },
    /// Tear the whole tree down.
    Dispose,
}

struct WatchState {
    root: Option<Value>,
    registry: Registry,
    visited: Visited,
}

/// Shared core of a [`WatchSession`].
///
/// All session state sits behind one lock. Work arrives as [`Job`]s on a FIFO
/// queue; whoever submits while nobody is draining drains the queue, and a
/// job submitted while a drain is in progress (a callback mutating a watched
/// cell, or disposing the session) waits for the current job to finish.
/// The lock is therefore never re-entered.
pub(crate) struct Engine {
    pub(super) this: Weak<Engine>,
    pub(super) options: WatchOptions,
    pub(super) callback: WatchCallback,
    state: Mutex<WatchState>,
    jobs: Mutex<VecDeque<Job>>,
    draining: AtomicBool,
    disposed: AtomicBool,
    subscriptions: AtomicUsize,
}

impl Engine {
    pub(super) fn submit(&self, job: Job) {
        self.jobs.lock().push_back(job);
        self.drain();
    }

    fn drain(&self) {
        loop {
            if self.draining.swap(true, Ordering::AcqRel) {
                trace!("session busy, job deferred");
                return;
            }
            {
                let _guard = DrainGuard(&self.draining);
                while let Some(job) = self.next_job() {
                    self.run(job);
                }
            }
            // A job may have been queued by another thread between the last
            // pop and the guard resetting the flag.
            if self.jobs.lock().is_empty() {
                return;
            }
        }
    }

    fn next_job(&self) -> Option<Job> {
        self.jobs.lock().pop_front()
    }

    fn run(&self, job: Job) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        let mut state = self.state.lock();
        let WatchState {
            root,
            registry,
            visited,
        } = &mut *state;
        // Left non-empty only if a previous job panicked half way.
        visited.clear();
        let mut cx = Traversal::new(registry, visited);

        match job {
            Job::Watch(value) => self.watch(&mut cx, &value, None, None),
            Job::Scalar { cell, value } => {
                cx.pin(cell);
                self.on_scalar_change(&mut cx, cell, value);
            }
            Job::Slots {
                cell,
                changes,
                contents,
            } => {
                cx.pin(cell);
                self.on_slot_changes(&mut cx, cell, &changes, contents);
            }
            Job::Dispose => {
                if let Some(root) = root.take() {
                    self.unwatch(&mut cx, &root);
                }
                let leftover = cx.registry.clear();
                if leftover > 0 {
                    debug!(leftover, "disposed subscriptions unreachable from root");
                }
                visited.clear();
                self.disposed.store(true, Ordering::Release);
                debug!("watch session disposed");
            }
        }

        self.subscriptions.store(registry.len(), Ordering::Release);
    }
}

/// Resets the draining flag on every exit path, panics included.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to one deep watch.
///
/// Returned by [`watch`] and [`watch_with`]. Dropping the session disposes
/// it, so keep it alive for as long as changes should be reported.
#[must_use = "dropping a WatchSession disposes it"]
pub struct WatchSession {
    engine: Arc<Engine>,
}

impl WatchSession {
    pub(crate) fn begin(root: Value, callback: WatchCallback, options: WatchOptions) -> Self {
        let options = options.layered_over(&default_options());
        debug!(?options, "starting watch session");

        let engine = Arc::new_cyclic(|this| Engine {
            this: this.clone(),
            options,
            callback,
            state: Mutex::new(WatchState {
                root: Some(root.clone()),
                registry: Registry::default(),
                visited: Visited::default(),
            }),
            jobs: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            subscriptions: AtomicUsize::new(0),
        });
        engine.submit(Job::Watch(root));

        Self { engine }
    }

    /// Unsubscribe from every cell reachable from the root and release it.
    ///
    /// Takes effect immediately unless the session is already processing a
    /// change, either in this session's own callback or on another thread.
    /// Then the teardown is queued and runs once the current change has been
    /// fully processed, and [`is_disposed`](WatchSession::is_disposed) stays
    /// false until it has. Calling it again is a no-op.
    pub fn dispose(&self) {
        if !self.engine.disposed.load(Ordering::Acquire) {
            self.engine.submit(Job::Dispose);
        }
    }

    /// Returns true once [`dispose`](WatchSession::dispose) has completed
    pub fn is_disposed(&self) -> bool {
        self.engine.disposed.load(Ordering::Acquire)
    }

    /// Number of cells this session is subscribed to, as of the last
    /// completed job.
    pub fn subscription_count(&self) -> usize {
        self.engine.subscriptions.load(Ordering::Acquire)
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSession")
            .field("subscriptions", &self.subscription_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Deep-watch `root` with the default options.
///
/// `callback` receives one [`Change`] per leaf-level mutation anywhere in the
/// graph reachable from `root`, and the watch follows the graph as it changes
/// shape.
///
/// # Example
/// ```ignore
/// let bar = Observable::new(1);
/// let root = Object::new().with("bar", &bar);
///
/// let session = deepwatch::watch(&root, |change| {
///     println!("{:?}: {:?} -> {:?}", change.key, change.prior_value, change.value);
/// });
///
/// bar.set(2);          // prints Some(Name("bar")): Some(Number(1.0)) -> Some(Number(2.0))
/// session.dispose();
/// bar.set(3);          // nothing
/// ```
pub fn watch<V, F>(root: V, callback: F) -> WatchSession
where
    V: Into<Value>,
    F: Fn(&Change) + Send + Sync + 'static,
{
    watch_with(root, callback, WatchOptions::new())
}

/// Deep-watch `root` with `options` layered over the process-wide defaults.
pub fn watch_with<V, F>(root: V, callback: F, options: WatchOptions) -> WatchSession
where
    V: Into<Value>,
    F: Fn(&Change) + Send + Sync + 'static,
{
    WatchSession::begin(root.into(), Arc::new(callback), options)
}
