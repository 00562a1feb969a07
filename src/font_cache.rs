//! The process-wide font-object cache (C9): reservation-with-wait so
//! concurrent callers resolving the same name share one construction
//! instead of racing.
//!
//! Each cache entry is an
//! `Arc<SlotHandle>` holding a `Mutex<SlotState>` + `Condvar`, rather than a
//! single process-wide lock held across construction.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHasher;

use crate::font::Font;

type FontCacheMap = HashMap<u64, Arc<SlotHandle>>;

static FONT_CACHE: OnceLock<Mutex<FontCacheMap>> = OnceLock::new();

fn font_cache() -> &'static Mutex<FontCacheMap> {
    FONT_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

enum SlotState {
    /// Created by the first constructor, other constructors wait on the
    /// slot's condition. `waiters` counts threads currently blocked on
    /// `cond`.
    Reserved { waiters: usize },
    PublishedValid(Font),
    PublishedNull,
}

struct SlotHandle {
    state: Mutex<SlotState>,
    cond: Condvar,
}

/// Hash of the verbatim joined name list + attribute string.
pub(crate) fn cache_key(names: &[String], attributes: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = FxHasher::default();
    names.hash(&mut hasher);
    attributes.hash(&mut hasher);
    hasher.finish()
}

pub(crate) enum Reservation {
    /// This call is the one doing the constructing; call [`publish`] with
    /// the same key and handle when done.
    Creator(Arc<SlotHandle>),
    /// Another call already produced (or is producing) a result, returned
    /// here directly.
    Existing(Option<Font>),
}

/// Reserve the slot for `key`, or wait for the existing reservation to
/// publish.
pub(crate) fn reserve_or_wait(key: u64) -> Reservation {
    let mut map = font_cache().lock();
    if let Some(handle) = map.get(&key).cloned() {
        drop(map);
        let mut state = handle.state.lock();
        loop {
            match &mut *state {
                SlotState::Reserved { waiters } => {
                    *waiters += 1;
                    handle.cond.wait(&mut state);
                },
                SlotState::PublishedValid(font) => {
                    return Reservation::Existing(Some(font.clone_for_caller()));
                },
                SlotState::PublishedNull => return Reservation::Existing(None),
            }
        }
    }
    let handle = Arc::new(SlotHandle {
        state: Mutex::new(SlotState::Reserved { waiters: 0 }),
        cond: Condvar::new(),
    });
    map.insert(key, handle.clone());
    Reservation::Creator(handle)
}

/// Publish the construction result for a slot this call reserved. Waiters
/// increment a counter while reserved; on publication, the publisher adds
/// the waiter count to the reference counter so each waiter owns its
/// reference.
pub(crate) fn publish(_key: u64, handle: Arc<SlotHandle>, result: Option<Font>) -> Option<Font> {
    let mut state = handle.state.lock();
    let waiters = match &*state {
        SlotState::Reserved { waiters } => *waiters,
        _ => unreachable!("slot published twice"),
    };
    let creator_handle = match result {
        Some(mut font) => {
            if waiters > 0 {
                font.add_references(waiters);
            }
            *state = SlotState::PublishedValid(font.clone_for_cache_storage());
            Some(font)
        },
        None => {
            // Stays published-null permanently: later callers for the same
            // key see an immediate failure instead of retrying construction.
            *state = SlotState::PublishedNull;
            None
        },
    };
    drop(state);
    handle.cond.notify_all();
    creator_handle
}

/// Remove a slot from the cache when its last reference is dropped: reaching
/// 0 destroys the Font and removes it from the process-wide cache.
pub(crate) fn evict(key: u64) {
    font_cache().lock().remove(&key);
}

/// `shutdown()`'s drain: destroys every font in the cache regardless of its
/// reference count; callers that still hold a handle past this point are
/// using it incorrectly.
pub(crate) fn drain_all() {
    font_cache().lock().clear();
}

#[cfg(test)]
pub(crate) fn clear_for_tests() {
    font_cache().lock().clear();
}
