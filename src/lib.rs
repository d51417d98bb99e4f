#![deny(missing_docs)]

//! Deep change observation over nested graphs of reactive cells.
//!
//! Hand [`watch`] any [`Value`]: a plain [`Object`] or [`List`], a scalar
//! [`Observable`], a reactive [`ObservableArray`], or any nesting of them.
//! Every cell reachable from it gets subscribed, and the callback receives one
//! [`Change`] per mutation anywhere in the graph. When a cell's value changes,
//! the watch drops the cells that were only reachable through the old value
//! and picks up the cells reachable through the new one.
//!
//! # Quick Start
//!
//! ```ignore
//! use deepwatch::{Object, Observable, ObservableArray, watch};
//!
//! let name = Observable::new("Ada");
//! let tags = ObservableArray::from_values(["math"]);
//! let root = Object::new().with("name", &name).with("tags", &tags);
//!
//! let session = watch(&root, |change| {
//!     println!("{:?}: {:?} -> {:?}", change.key, change.prior_value, change.value);
//! });
//!
//! name.set("Grace");     // key "name", Ada -> Grace
//! tags.push("navy");     // key 1, None -> navy
//!
//! session.dispose();     // nothing is reported any more
//! ```
//!
//! # Core Types
//!
//! - [`Value`] - A node of the graph: primitive, container or cell.
//! - [`Observable`] - Scalar reactive cell. [`set`](Observable::set) notifies subscribers.
//! - [`ObservableArray`] - Reactive collection reporting per-slot [`ArrayChange`]s.
//! - [`WatchSession`] - Disposable handle of one deep watch.
//! - [`Change`] - `{ target, parent, key, value, prior_value }` record.
//!
//! # Options
//!
//! ```ignore
//! // Only subscribe to writable cells, and resolve indirections while descending
//! let options = WatchOptions::new()
//!     .should_watch(|cell| cell.as_cell().is_some_and(Observable::is_writable))
//!     .value_accessor(|value, key, parent| resolve(value, key, parent));
//! let session = watch_with(&root, callback, options);
//!
//! // Process-wide defaults, used for anything a watch leaves unset
//! let previous = set_default_options(WatchOptions::new().should_watch(|_| true));
//! ```
//!
//! # Per-cell control
//!
//! ```ignore
//! cell.set_watchable(false);                  // excluded from every deep watch
//! let sub = cell.subscribe_deep(|change| {}); // deep watch rooted at this cell
//! ```
//!
//! # Reentrancy
//!
//! Callbacks may mutate watched cells or dispose their own session. Such work
//! is queued and runs as soon as the record being delivered has been fully
//! processed, still before the outermost mutation returns.

mod cell;
mod deep;
mod error;
mod hash;
mod value;
mod watch;

// Graph
pub use value::{Key, List, Object, Value};

// Reactive cells
pub use cell::{
    ArrayChange, CellId, ChangeStatus, Observable, ObservableArray, Subscription, WeakObservable,
    WeakObservableArray,
};
pub use error::CellError;

// Watching
pub use watch::{
    Change, ShouldWatch, ValueAccessor, WatchCallback, WatchOptions, WatchSession,
    default_options, set_default_options, watch, watch_with,
};

#[cfg(test)]
mod tests;
