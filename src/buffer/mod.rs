//! # Write Buffer Module
//!
//! The mutable, in-memory staging area of the engine. All writes land
//! here first; when the buffer is full it is drained into a fresh run
//! at level 0.
//!
//! ## Design Invariants
//!
//! - At most one entry per key; inserting an existing key replaces
//!   its value in place.
//! - Capacity is counted in **entries**, not bytes.
//! - Updating an existing key never fails, even at capacity — only an
//!   insert of a *new* key into a full buffer is refused, which is
//!   the engine's signal to flush.
//! - Iteration order is ascending by key, so a drained buffer can be
//!   streamed straight into a run writer.
//!
//! Deletions are ordinary entries carrying the tombstone sentinel;
//! the buffer does not interpret values.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use tracing::trace;

use crate::entry::{Entry, Key, Value};

// ------------------------------------------------------------------------------------------------
// Buffer
// ------------------------------------------------------------------------------------------------

/// An ordered, capacity-bounded set of pending writes keyed by key.
pub struct Buffer {
    /// Pending entries, sorted by key.
    entries: BTreeMap<Key, Value>,

    /// Maximum number of entries before inserts of new keys are refused.
    capacity: usize,
}

impl Buffer {
    /// Creates an empty buffer holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
        }
    }

    /// Inserts or replaces a key.
    ///
    /// Returns `false` only when the buffer is at capacity **and**
    /// the key is not already present — the caller must flush and
    /// retry. Replacing an existing key always succeeds.
    pub fn put(&mut self, key: Key, val: Value) -> bool {
        if self.entries.len() == self.capacity && !self.entries.contains_key(&key) {
            trace!(key, "buffer full, refusing new key");
            return false;
        }
        self.entries.insert(key, val);
        true
    }

    /// Returns the pending value for `key`, including the tombstone
    /// sentinel if the key was deleted.
    pub fn get(&self, key: Key) -> Option<Value> {
        self.entries.get(&key).copied()
    }

    /// Returns a snapshot of entries with keys in `[lo, hi]`
    /// (inclusive on both ends), ascending by key.
    pub fn range(&self, lo: Key, hi: Key) -> Vec<Entry> {
        if lo > hi {
            return Vec::new();
        }
        self.entries
            .range(lo..=hi)
            .map(|(&key, &val)| Entry::new(key, val))
            .collect()
    }

    /// Iterates all pending entries ascending by key.
    pub fn iter(&self) -> impl Iterator<Item = Entry> + '_ {
        self.entries.iter().map(|(&key, &val)| Entry::new(key, val))
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity in entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
