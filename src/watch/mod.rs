//! The deep watch engine.
//!
//! - `walker`: discovers cells reachable from a value (and tears them down)
//! - `registry`: cell identity -> live subscription
//! - `dispatch`: turns cell notifications into change records and re-homes
//!   the watch over the changed subtree
//! - `session`: job queue, lifecycle and the public entry points

mod context;
mod dispatch;
mod options;
mod registry;
mod session;
mod walker;

pub use options::{ShouldWatch, ValueAccessor, WatchOptions, default_options, set_default_options};
pub use session::{WatchCallback, WatchSession, watch, watch_with};

use crate::value::{Key, Value};

/// A change somewhere in a watched graph.
///
/// `value` and `prior_value` are `None` where a collection slot was filled or
/// emptied; a scalar cell always reports both.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    /// The cell that changed
    pub target: Value,
    /// The container the cell was reached through (`None` for the root)
    pub parent: Option<Value>,
    /// Property name or slot the cell was reached under; for collections,
    /// the slot that changed
    pub key: Option<Key>,
    /// New value
    pub value: Option<Value>,
    /// Value before this change
    pub prior_value: Option<Value>,
}
