use crate::value::{Key, Value};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Rewrites a `(value, key, parent)` triple found while descending a container.
///
/// Lets a watch see through indirections, e.g. a property holding a name
/// that resolves to the cell which really backs it.
pub type ValueAccessor = Arc<dyn Fn(Value, &Key, &Value) -> Value + Send + Sync>;

/// Decides whether a discovered cell gets subscribed at all.
pub type ShouldWatch = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Per-watch configuration.
///
/// Unset fields fall back to the process-wide defaults (see
/// [`set_default_options`]); when those are unset too, values are used as
/// found and every cell is watched.
///
/// # Example
/// ```ignore
/// let options = WatchOptions::new()
///     .should_watch(|cell| cell.as_cell().is_some_and(Observable::is_writable));
/// let session = watch_with(&root, |change| println!("{change:?}"), options);
/// ```
#[derive(Clone, Default)]
pub struct WatchOptions {
    value_accessor: Option<ValueAccessor>,
    should_watch: Option<ShouldWatch>,
}

impl WatchOptions {
    /// Options with nothing set
    pub const fn new() -> Self {
        Self {
            value_accessor: None,
            should_watch: None,
        }
    }

    /// Set the value accessor
    pub fn value_accessor<F>(mut self, accessor: F) -> Self
    where
        F: Fn(Value, &Key, &Value) -> Value + Send + Sync + 'static,
    {
        self.value_accessor = Some(Arc::new(accessor));
        self
    }

    /// Set the should-watch predicate
    pub fn should_watch<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.should_watch = Some(Arc::new(predicate));
        self
    }

    /// Fill every unset field from `defaults`.
    pub(crate) fn layered_over(self, defaults: &WatchOptions) -> Self {
        Self {
            value_accessor: self
                .value_accessor
                .or_else(|| defaults.value_accessor.clone()),
            should_watch: self.should_watch.or_else(|| defaults.should_watch.clone()),
        }
    }

    pub(crate) fn access(&self, value: Value, key: &Key, parent: &Value) -> Value {
        match &self.value_accessor {
            Some(accessor) => accessor(value, key, parent),
            None => value,
        }
    }

    pub(crate) fn admits(&self, cell: &Value) -> bool {
        self.should_watch
            .as_ref()
            .is_none_or(|predicate| predicate(cell))
    }
}

impl fmt::Debug for WatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOptions")
            .field("value_accessor", &self.value_accessor.is_some())
            .field("should_watch", &self.should_watch.is_some())
            .finish()
    }
}

/// Process-wide defaults applied under every watch's own options.
static DEFAULT_OPTIONS: RwLock<WatchOptions> = RwLock::new(WatchOptions::new());

/// Current process-wide default options
pub fn default_options() -> WatchOptions {
    DEFAULT_OPTIONS.read().clone()
}

/// Replace the process-wide default options, returning the previous ones.
///
/// Only watches started afterwards are affected.
pub fn set_default_options(options: WatchOptions) -> WatchOptions {
    std::mem::replace(&mut *DEFAULT_OPTIONS.write(), options)
}
