//! Map types keyed by cell ids and property names.
//!
//! Both maps hash with foldhash under one fixed seed, so building an empty
//! map allocates no random state.

use foldhash::fast::{FixedState, FoldHasher};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::hash::BuildHasher;

const SEED: u64 = 0x517cc1b727220a95;

/// Zero-sized `BuildHasher` shared by [`IdMap`] and [`PropertyMap`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FastHashBuilder;

impl BuildHasher for FastHashBuilder {
    type Hasher = FoldHasher<'static>;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        FixedState::with_seed(SEED).build_hasher()
    }
}

/// Unordered map keyed by identity (cell ids).
pub(crate) type IdMap<K, V> = HashMap<K, V, FastHashBuilder>;

/// Insertion-ordered map; object properties enumerate in this order.
pub(crate) type PropertyMap<K, V> = IndexMap<K, V, FastHashBuilder>;
