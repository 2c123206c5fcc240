//! Per-handle payload cache.

use std::collections::HashMap;

use crate::handle::ValueHandle;

/// Maps a foreign handle to a host-side payload the engine cannot hold
/// itself (a function callback, a type resolver, an equality checker,
/// or an opaque external value).
///
/// This is deliberately the simplest possible component: a single map,
/// no locking. Callers that share a cache across threads serialize
/// access externally; inside a session every call site is
/// boundary-adjacent and already runs under the session lock.
#[derive(Debug)]
pub struct HandleCache<T> {
    entries: HashMap<ValueHandle, T>,
}

// Manual impl: the cache is empty-constructible for any payload type,
// `T: Default` or not.
impl<T> Default for HandleCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Associates `value` with `handle`, dropping any prior payload for
    /// the same handle. At most one live payload per handle.
    pub fn store(&mut self, handle: ValueHandle, value: T) {
        self.entries.insert(handle, value);
    }

    /// Pure lookup; `None` when nothing is stored for `handle`.
    pub fn get(&self, handle: ValueHandle) -> Option<&T> {
        self.entries.get(&handle)
    }

    /// Removes the payload for `handle`; no-op when absent.
    pub fn delete(&mut self, handle: ValueHandle) {
        self.entries.remove(&handle);
    }

    /// Removes all payloads.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> HandleCache<T> {
    /// Cloned lookup, convenient for the shared-closure payloads that
    /// are `Arc`s anyway.
    pub fn get_cloned(&self, handle: ValueHandle) -> Option<T> {
        self.entries.get(&handle).cloned()
    }
}
