//! The open-addressed glyph/grapheme cache table.
//!
//! `RwLock<Table>` with a dedicated write mutex: readers take the shared
//! `RwLock` guard for a lookup; a miss drops it and takes `write_mutex`,
//! which serializes concurrent writers for *any* key on this cache, not
//! just the colliding one. Holding it across the caller's `compute` closure
//! guarantees exactly one raster call reaches the backend per key: a second
//! writer for the same key re-probes under the mutex and finds the first
//! writer's result already there instead of rasterizing again.

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::pattern::SubpixelMode;

/// Fibonacci hashing multiplier for 32-bit keys.
const FIB32: u32 = 2_654_435_761;
/// 64-bit analogue (2^64 / golden ratio), used for the variable-length
/// grapheme-cluster key.
const FIB64: u64 = 0x9E37_79B9_7F4A_7C15;

const INITIAL_SIZE: usize = 256;
const LOAD_FACTOR_PCT: usize = 75;

pub(crate) trait CacheKey: Clone + PartialEq {
    fn slot_index(&self, mask: usize) -> usize;
}

/// `(codepoint, subpixel_mode)` packed into a 32-bit word: 3 bits of
/// subpixel mode in the high bits, 29 bits of codepoint.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub(crate) struct GlyphKey(u32);

impl GlyphKey {
    pub(crate) fn new(codepoint: char, subpixel: SubpixelMode) -> Self {
        let cp = (codepoint as u32) & 0x1FFF_FFFF;
        let sp = subpixel.bits() & 0b111;
        GlyphKey((sp << 29) | cp)
    }
}

impl CacheKey for GlyphKey {
    fn slot_index(&self, mask: usize) -> usize {
        (self.0.wrapping_mul(FIB32) as usize) & mask
    }
}

/// `(codepoint sequence, subpixel mode)` - the grapheme cache key.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub(crate) struct GraphemeKey {
    cluster: SmallVec<[char; 8]>,
    subpixel_bits: u32,
}

impl GraphemeKey {
    pub(crate) fn new(cluster: &[char], subpixel: SubpixelMode) -> Self {
        GraphemeKey {
            cluster: cluster.iter().copied().collect(),
            subpixel_bits: subpixel.bits(),
        }
    }
}

impl CacheKey for GraphemeKey {
    fn slot_index(&self, mask: usize) -> usize {
        use std::hash::{Hash, Hasher};
        let mut hasher = rustc_hash::FxHasher::default();
        self.cluster.hash(&mut hasher);
        self.subpixel_bits.hash(&mut hasher);
        (hasher.finish().wrapping_mul(FIB64) as usize) & mask
    }
}

/// A cached value, distinguishing a real hit from a negative (retry-
/// suppressing) entry.
#[derive(Clone)]
pub(crate) enum CacheEntry<V> {
    Valid(V),
    Negative,
}

impl<V> CacheEntry<V> {
    pub(crate) fn as_option(&self) -> Option<&V> {
        match self {
            CacheEntry::Valid(v) => Some(v),
            CacheEntry::Negative => None,
        }
    }
}

enum Slot<K, V> {
    Empty,
    Occupied(K, V),
}

enum Probe {
    Hit(usize),
    Empty(usize),
}

struct Table<K, V> {
    slots: Vec<Slot<K, V>>,
    count: usize,
}

impl<K: CacheKey, V: Clone> Table<K, V> {
    fn with_capacity(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, || Slot::Empty);
        Table { slots, count: 0 }
    }

    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    /// Linear probe starting at the key's natural slot.
    fn probe(&self, key: &K) -> Probe {
        let mask = self.mask();
        let start = key.slot_index(mask);
        for step in 0..self.slots.len() {
            let idx = (start + step) & mask;
            match &self.slots[idx] {
                Slot::Empty => return Probe::Empty(idx),
                Slot::Occupied(k, _) if k == key => return Probe::Hit(idx),
                Slot::Occupied(..) => continue,
            }
        }
        // Table is full (shouldn't happen given the 75% watermark); fall
        // back to the first slot so the caller's subsequent insert forces a
        // resize rather than panicking.
        Probe::Empty(start)
    }

    fn get_at(&self, idx: usize) -> Option<&V> {
        match &self.slots[idx] {
            Slot::Occupied(_, v) => Some(v),
            Slot::Empty => None,
        }
    }

    fn insert_at(&mut self, idx: usize, key: K, value: V) {
        if !matches!(self.slots[idx], Slot::Occupied(ref k, _) if *k == key) {
            self.count += 1;
        }
        self.slots[idx] = Slot::Occupied(key, value);
    }

    fn load_factor_pct(&self) -> usize {
        self.count * 100 / self.slots.len()
    }

    /// Double the table size and rehash every live entry.
    fn grown(&self) -> Table<K, V> {
        let mut grown = Table::with_capacity(self.slots.len() * 2);
        for slot in &self.slots {
            if let Slot::Occupied(k, v) = slot {
                match grown.probe(k) {
                    Probe::Empty(idx) => grown.insert_at(idx, k.clone(), v.clone()),
                    Probe::Hit(_) => unreachable!("fresh table cannot already contain the key"),
                }
            }
        }
        grown
    }
}

/// The glyph/grapheme cache.
///
/// This type has no write-serialization of its own: the lock that plays
/// that role is the owning `Font`'s primary mutex, not a cache-private one.
/// Callers must hold that lock across [`Cache::get_or_insert_with`].
pub(crate) struct Cache<K, V> {
    table: RwLock<Table<K, V>>,
}

impl<K: CacheKey + Clone, V: Clone> Default for Cache<K, V> {
    fn default() -> Self {
        Cache { table: RwLock::new(Table::with_capacity(INITIAL_SIZE)) }
    }
}

impl<K: CacheKey + Clone, V: Clone> Cache<K, V> {
    /// Shared-lock lookup. Safe to call
    /// without holding the Font's primary lock.
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let table = self.table.read();
        match table.probe(key) {
            Probe::Hit(idx) => table.get_at(idx).cloned(),
            Probe::Empty(_) => None,
        }
    }

    /// The miss path. Callers must hold the owning
    /// Font's primary lock across this call. Re-probes before computing,
    /// because another thread may have inserted this key (or resized the
    /// table) while the caller was acquiring that lock.
    pub(crate) fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    fn insert(&self, key: K, value: V) {
        let mut table = self.table.write();
        match table.probe(&key) {
            Probe::Hit(idx) => table.insert_at(idx, key, value),
            Probe::Empty(idx) => table.insert_at(idx, key, value),
        }
        if table.load_factor_pct() >= LOAD_FACTOR_PCT {
            let grown = table.grown();
            *table = grown;
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table.read().count
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.table.read().slots.len()
    }
}
