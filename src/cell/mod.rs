// Reactive cell primitives
//
// This module provides the publish/subscribe side the watch engine builds on:
// - Observable: a scalar cell holding one Value
// - ObservableArray: a reactive collection notifying per-slot changes
// - Notifier/Subscription: the handler lists both cell kinds use
//
// Each cell carries a CellMeta with its identity, the per-cell watchable
// toggle and the hub backing deep subscriptions (see crate::deep).

mod array;
pub(crate) mod diff;
pub(crate) mod notifier;
mod observable;

pub use array::{ArrayChange, ChangeStatus, ObservableArray, WeakObservableArray};
pub use notifier::Subscription;
pub use observable::{Observable, WeakObservable};

use crate::deep::DeepHub;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Identity of a reactive cell.
///
/// Ids are handed out from a process-wide counter and never reused, so a
/// stale id can never alias a newer cell.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct CellId(u64);

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(0);

impl CellId {
    fn next() -> Self {
        Self(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// State shared by both cell kinds.
pub(crate) struct CellMeta {
    id: CellId,
    watchable: AtomicBool,
    pub(crate) deep: Arc<DeepHub>,
}

impl CellMeta {
    pub(crate) fn new() -> Self {
        Self {
            id: CellId::next(),
            watchable: AtomicBool::new(true),
            deep: DeepHub::new(),
        }
    }

    pub(crate) fn id(&self) -> CellId {
        self.id
    }

    pub(crate) fn is_watchable(&self) -> bool {
        self.watchable.load(Ordering::Acquire)
    }

    pub(crate) fn set_watchable(&self, watchable: bool) {
        self.watchable.store(watchable, Ordering::Release);
    }
}
