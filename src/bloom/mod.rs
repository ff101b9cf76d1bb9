//! # Bloom Filter Module
//!
//! A fixed-size Bloom filter over 32-bit keys, attached to every
//! sealed run so point lookups can skip runs that definitely do not
//! contain a key.
//!
//! ## Design Invariants
//!
//! - Exactly **three** independent integer-mixing hash functions,
//!   each reduced modulo the bit-array length.
//! - `set(k)` followed by `contains(k)` is always `true` — false
//!   negatives are impossible.
//! - False positives are allowed; the caller resolves them with an
//!   exact lookup.
//!
//! The bit length is chosen by the engine as
//! `⌈bits_per_entry × run_capacity⌉`, so the false-positive rate is a
//! direct function of the configured bits-per-entry.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use bit_vec::BitVec;

use crate::entry::Key;

// ------------------------------------------------------------------------------------------------
// BloomFilter
// ------------------------------------------------------------------------------------------------

/// A space-efficient probabilistic membership filter over keys.
pub struct BloomFilter {
    /// The bit array backing the filter.
    bits: BitVec,
}

impl BloomFilter {
    /// Creates a filter with exactly `nbits` bits (minimum 1).
    pub fn with_bits(nbits: usize) -> Self {
        Self {
            bits: BitVec::from_elem(nbits.max(1), false),
        }
    }

    /// Creates a filter sized for `capacity` keys at the given
    /// bits-per-entry ratio: `⌈bits_per_entry × capacity⌉` bits.
    pub fn for_capacity(capacity: usize, bits_per_entry: f64) -> Self {
        let nbits = (bits_per_entry * capacity as f64).ceil() as usize;
        Self::with_bits(nbits)
    }

    /// Inserts a key, setting one bit per hash function.
    pub fn set(&mut self, key: Key) {
        let len = self.bits.len() as u64;
        self.bits.set((Self::hash_1(key) % len) as usize, true);
        self.bits.set((Self::hash_2(key) % len) as usize, true);
        self.bits.set((Self::hash_3(key) % len) as usize, true);
    }

    /// Returns `true` if the key is *possibly* present, `false` if it
    /// is definitely absent.
    pub fn contains(&self, key: Key) -> bool {
        let len = self.bits.len() as u64;
        self.bits[(Self::hash_1(key) % len) as usize]
            && self.bits[(Self::hash_2(key) % len) as usize]
            && self.bits[(Self::hash_3(key) % len) as usize]
    }

    /// Number of bits in the filter.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Always `false`; the filter holds at least one bit.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    // Three integer-mixing hashes with distinct constants. Keys are
    // sign-extended to 64 bits before mixing so negative keys spread
    // over the full hash domain.

    fn hash_1(k: Key) -> u64 {
        let mut key = k as i64 as u64;
        key = (!key).wrapping_add(key << 15);
        key ^= key >> 12;
        key = key.wrapping_add(key << 2);
        key ^= key >> 4;
        key = key.wrapping_mul(2057);
        key ^= key >> 16;
        key
    }

    fn hash_2(k: Key) -> u64 {
        let mut key = k as i64 as u64;
        key = key.wrapping_add(0x7ed55d16).wrapping_add(key << 12);
        key = (key ^ 0xc761c23c) ^ (key >> 19);
        key = key.wrapping_add(0x165667b1).wrapping_add(key << 5);
        key = key.wrapping_add(0xd3a2646c) ^ (key << 9);
        key = key.wrapping_add(0xfd7046c5).wrapping_add(key << 3);
        key = (key ^ 0xb55a4f09) ^ (key >> 16);
        key
    }

    fn hash_3(k: Key) -> u64 {
        let mut key = k as i64 as u64;
        key = (key ^ 61) ^ (key >> 16);
        key = key.wrapping_add(key << 3);
        key ^= key >> 4;
        key = key.wrapping_mul(0x27d4eb2d);
        key ^= key >> 15;
        key
    }
}
