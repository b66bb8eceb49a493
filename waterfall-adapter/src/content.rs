use alloc::vec::Vec;

use crate::key::{KeyMap, WatchKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Watch {
    remaining: usize,
    deadline_ms: u64,
}

/// Tracks deferred content (images, embeds) per item.
///
/// An item resolves once every watched unit has settled (loaded or failed), or once the
/// per-unit timeout has elapsed, whichever comes first. Each item resolves at most once per
/// watch.
#[derive(Clone, Debug)]
pub struct ContentTracker<K> {
    timeout_ms: u64,
    watches: KeyMap<K, Watch>,
}

impl<K: WatchKey> ContentTracker<K> {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            watches: KeyMap::new(),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Starts watching `units` unresolved content units of an item.
    ///
    /// Watching an item again restarts its timers. Returns `false` (and watches nothing) when
    /// `units` is zero.
    pub fn watch(&mut self, key: K, units: usize, now_ms: u64) -> bool {
        if units == 0 {
            return false;
        }
        let deadline_ms = now_ms.saturating_add(self.timeout_ms);
        self.watches.insert(
            key,
            Watch {
                remaining: units,
                deadline_ms,
            },
        );
        true
    }

    /// One unit settled. Returns `true` when this resolved the item.
    pub fn unit_settled(&mut self, key: &K) -> bool {
        let Some(watch) = self.watches.get_mut(key) else {
            return false;
        };
        watch.remaining = watch.remaining.saturating_sub(1);
        if watch.remaining > 0 {
            return false;
        }
        self.watches.remove(key);
        true
    }

    /// Resolves every item whose timeout elapsed at `now_ms`.
    pub fn expire(&mut self, now_ms: u64, mut f: impl FnMut(K)) -> usize {
        let due: Vec<K> = self
            .watches
            .iter()
            .filter(|(_, w)| w.deadline_ms <= now_ms)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &due {
            self.watches.remove(key);
        }
        let n = due.len();
        if n > 0 {
            wdebug!(expired = n, now_ms, "content timeouts elapsed");
        }
        due.into_iter().for_each(&mut f);
        n
    }

    pub fn forget(&mut self, key: &K) {
        self.watches.remove(key);
    }

    pub fn clear(&mut self) {
        self.watches.clear();
    }

    pub fn is_watching(&self, key: &K) -> bool {
        self.watches.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// The earliest pending timeout, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.watches.values().map(|w| w.deadline_ms).min()
    }
}
