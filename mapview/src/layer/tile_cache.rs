use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};

use super::{LayerId, TileKey};
use crate::decoded_image::DecodedImage;

/// Shared flag used to cancel a tile request.
///
/// Cancellation is cooperative: the request checks the flag before each attempt and the cache
/// checks it before accepting the result.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a new, not cancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the request as cancelled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true if [`CancellationFlag::cancel`] was called on this flag or any of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn same_as(&self, other: &CancellationFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// State of a tile in the cache.
#[derive(Debug, Clone)]
pub enum TileState {
    /// The tile is requested but not loaded yet.
    Pending,
    /// The tile is loaded and decoded.
    Ready(Arc<DecodedImage>),
    /// Loading of the tile failed `attempts` times.
    Failed {
        /// Number of failed attempts.
        attempts: u32,
    },
}

impl TileState {
    /// Returns true for [`TileState::Pending`].
    pub fn is_pending(&self) -> bool {
        matches!(self, TileState::Pending)
    }
}

/// A tile stored in the cache.
#[derive(Debug, Clone)]
pub struct TileEntry {
    /// Key of the tile.
    pub key: TileKey,
    /// Loading state and the image if it is loaded.
    pub state: TileState,
    last_access: u64,
}

impl TileEntry {
    /// Creates a new entry. Access time is set when the entry is put into the cache.
    pub fn new(key: TileKey, state: TileState) -> Self {
        Self {
            key,
            state,
            last_access: 0,
        }
    }

    /// Logical time of the last access to the entry. Greater values are more recent.
    pub fn last_access(&self) -> u64 {
        self.last_access
    }
}

/// Receives keys of pending entries evicted from the cache, so that their requests can be
/// cancelled.
///
/// Called after the cache lock is released.
pub trait EvictionListener: Send + Sync {
    /// A pending entry with the given key was evicted.
    fn pending_evicted(&self, key: TileKey);
}

struct Slot {
    state: TileState,
    last_access: u64,
}

struct CacheInner {
    entries: AHashMap<TileKey, Slot>,
    tick: u64,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn insert(&mut self, entry: TileEntry, capacity: usize) -> Vec<TileKey> {
        let last_access = self.next_tick();
        let key = entry.key;
        self.entries.insert(
            key,
            Slot {
                state: entry.state,
                last_access,
            },
        );

        let mut evicted_pending = vec![];
        while self.entries.len() > capacity {
            let Some((victim, was_pending)) = self.select_victim(&key) else {
                break;
            };

            self.entries.remove(&victim);
            log::trace!("Evicted tile {victim} from cache");
            if was_pending {
                evicted_pending.push(victim);
            }
        }

        evicted_pending
    }

    /// Least recently accessed entry that is not pending. Pending entries are only selected when
    /// nothing else is left. The entry that is being inserted is never selected.
    fn select_victim(&self, inserted: &TileKey) -> Option<(TileKey, bool)> {
        let mut oldest_settled: Option<(&TileKey, u64)> = None;
        let mut oldest_pending: Option<(&TileKey, u64)> = None;

        for (key, slot) in &self.entries {
            if key == inserted {
                continue;
            }

            let target = if slot.state.is_pending() {
                &mut oldest_pending
            } else {
                &mut oldest_settled
            };

            if target.map_or(true, |(_, access)| slot.last_access < access) {
                *target = Some((key, slot.last_access));
            }
        }

        match (oldest_settled, oldest_pending) {
            (Some((key, _)), _) => Some((*key, false)),
            (None, Some((key, _))) => Some((*key, true)),
            (None, None) => None,
        }
    }
}

/// Bounded in-memory store of tiles of all layers with least-recently-used eviction.
///
/// All operations take one internal lock, so concurrent `get`/`put` calls from fetch workers are
/// linearizable.
pub struct TileCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    eviction_listener: RwLock<Option<Weak<dyn EvictionListener>>>,
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl TileCache {
    /// Creates an empty cache holding at most `capacity` entries (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: AHashMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
            eviction_listener: RwLock::new(None),
        }
    }

    /// Sets the listener notified when pending entries are evicted.
    pub fn set_eviction_listener(&self, listener: Weak<dyn EvictionListener>) {
        *self.eviction_listener.write() = Some(listener);
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the entry and marks it as the most recently used one.
    pub fn get(&self, key: &TileKey) -> Option<TileEntry> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        let slot = inner.entries.get_mut(key)?;
        slot.last_access = tick;

        Some(TileEntry {
            key: *key,
            state: slot.state.clone(),
            last_access: tick,
        })
    }

    /// Returns the state of the entry without changing its recency.
    pub fn peek(&self, key: &TileKey) -> Option<TileState> {
        self.inner
            .lock()
            .entries
            .get(key)
            .map(|slot| slot.state.clone())
    }

    /// Inserts the entry, replacing the existing one with the same key. Evicts least recently used
    /// entries if the capacity is exceeded.
    pub fn put(&self, entry: TileEntry) {
        let evicted = self.inner.lock().insert(entry, self.capacity);
        self.notify_evicted(evicted);
    }

    /// Inserts the entry unless `flag` is cancelled. The flag is checked under the cache lock.
    ///
    /// Returns true if the entry was inserted.
    pub fn put_unless_cancelled(&self, entry: TileEntry, flag: &CancellationFlag) -> bool {
        let evicted = {
            let mut inner = self.inner.lock();
            if flag.is_cancelled() {
                return false;
            }

            inner.insert(entry, self.capacity)
        };

        self.notify_evicted(evicted);
        true
    }

    /// Removes the entry if `predicate` returns true for its state. Returns true if the entry was
    /// removed.
    pub fn remove_if(&self, key: &TileKey, predicate: impl FnOnce(&TileState) -> bool) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(slot) if predicate(&slot.state) => {
                inner.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Removes the entry if it is pending.
    pub fn remove_pending(&self, key: &TileKey) -> bool {
        self.remove_if(key, TileState::is_pending)
    }

    /// Removes all entries of the layer. Returns the number of removed entries.
    pub fn purge_layer(&self, layer: LayerId) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| key.layer != layer);
        before - inner.entries.len()
    }

    /// Removes failed entries of the layer, so that they are requested again. Returns the
    /// removed keys.
    pub fn reset_failed(&self, layer: LayerId) -> Vec<TileKey> {
        let mut inner = self.inner.lock();
        let failed: Vec<TileKey> = inner
            .entries
            .iter()
            .filter(|(key, slot)| {
                key.layer == layer && matches!(slot.state, TileState::Failed { .. })
            })
            .map(|(key, _)| *key)
            .collect();

        for key in &failed {
            inner.entries.remove(key);
        }

        failed
    }

    /// Keys of the layer currently in the cache, in no particular order.
    pub fn layer_keys(&self, layer: LayerId) -> Vec<TileKey> {
        self.inner
            .lock()
            .entries
            .keys()
            .filter(|key| key.layer == layer)
            .copied()
            .collect()
    }

    fn notify_evicted(&self, evicted: Vec<TileKey>) {
        if evicted.is_empty() {
            return;
        }

        let listener = self.eviction_listener.read().as_ref().and_then(Weak::upgrade);
        if let Some(listener) = listener {
            for key in evicted {
                listener.pending_evicted(key);
            }
        }
    }
}
