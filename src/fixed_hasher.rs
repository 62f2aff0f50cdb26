//! Deterministic hashing for the hull's internal maps.
//!
//! Hull construction must not depend on a per-process random seed, otherwise the order in which
//! twins are paired or output indices are assigned could differ between runs.

use core::hash::BuildHasher;
use foldhash::fast::{FixedState, FoldHasher};

const FIXED_HASHER: FixedState =
    FixedState::with_seed(0b1001010111101110000001001100010000000011001001101011001001111000);

/// A [`BuildHasher`] with a fixed seed.
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHasher;

impl BuildHasher for FixedHasher {
    type Hasher = FoldHasher<'static>;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_HASHER.build_hasher()
    }
}

/// A [`hashbrown::HashMap`] using [`FixedHasher`].
pub type FixedHashMap<K, V> = hashbrown::HashMap<K, V, FixedHasher>;

/// A [`hashbrown::HashSet`] using [`FixedHasher`].
pub type FixedHashSet<T> = hashbrown::HashSet<T, FixedHasher>;
