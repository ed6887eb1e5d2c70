use std::sync::{Condvar, Mutex, MutexGuard};

use tracing::trace;

use crate::error::{CollectionError, Result};

struct Slot<K, V> {
    ready: Option<(K, V)>,
    loading: bool,
}

/// Single-entry, single-flight cache.
///
/// At most one loader runs at a time. Callers that arrive while a load is in
/// flight block on a `Condvar` and then re-check the slot, so a caller asking
/// for the key just loaded reuses the result instead of loading again. A
/// failed load leaves the previous entry in place.
pub struct LoadingCache<K, V> {
    slot: Mutex<Slot<K, V>>,
    wake: Condvar,
    name: &'static str,
}

impl<K: PartialEq + Clone, V: Clone> LoadingCache<K, V> {
    pub fn new(name: &'static str) -> Self {
        LoadingCache {
            slot: Mutex::new(Slot {
                ready: None,
                loading: false,
            }),
            wake: Condvar::new(),
            name,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slot<K, V>>> {
        self.slot
            .lock()
            .map_err(|_| CollectionError::LockPoisoned(self.name))
    }

    pub fn get_or_load(&self, key: K, load: impl FnOnce() -> Result<V>) -> Result<V> {
        let mut slot = self.lock()?;
        loop {
            if let Some((cached, value)) = &slot.ready {
                if *cached == key {
                    trace!(cache = self.name, "cache hit");
                    return Ok(value.clone());
                }
            }
            if !slot.loading {
                break;
            }
            slot = self
                .wake
                .wait(slot)
                .map_err(|_| CollectionError::LockPoisoned(self.name))?;
        }
        slot.loading = true;
        drop(slot);

        let mut flight = InFlight {
            cache: self,
            armed: true,
        };
        trace!(cache = self.name, "cache miss, loading");
        let result = load();
        flight.armed = false;

        let mut slot = self.lock()?;
        slot.loading = false;
        if let Ok(value) = &result {
            slot.ready = Some((key, value.clone()));
        }
        self.wake.notify_all();
        result
    }

    /// The cached value for `key`, without loading.
    pub fn peek(&self, key: &K) -> Option<V> {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match &slot.ready {
            Some((cached, value)) if cached == key => Some(value.clone()),
            _ => None,
        }
    }

    /// Drop the cached entry. A load already in flight still completes.
    pub fn clear(&self) {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .ready = None;
    }
}

/// Releases waiters if a loader unwinds.
struct InFlight<'a, K, V> {
    cache: &'a LoadingCache<K, V>,
    armed: bool,
}

impl<K, V> Drop for InFlight<'_, K, V> {
    fn drop(&mut self) {
        if self.armed {
            let mut slot = self
                .cache
                .slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.loading = false;
            self.cache.wake.notify_all();
        }
    }
}
