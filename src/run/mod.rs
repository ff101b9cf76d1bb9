//! # Run Module
//!
//! An immutable, sorted, disk-backed table of fixed-width entries —
//! the on-disk unit of the LSM tree. Each run is one file plus an
//! in-memory Bloom filter.
//!
//! ## On-disk layout
//!
//! ```text
//! [ENTRY][ENTRY][ENTRY]...
//! ```
//!
//! A pure concatenation of 8-byte records (`[key LE][val LE]`) in
//! strictly ascending key order. No header, no footer, no index —
//! the file length is exactly `8 × size` and the sorted order *is*
//! the index: point lookups binary-search the mapped file directly.
//!
//! ## Write path
//!
//! [`RunWriter`] appends entries in ascending key order to a
//! temporary file, populating the Bloom filter as it goes. `seal()`
//! flushes, fsyncs, and atomically renames the temporary file into
//! place — the rename is the commit point, so a crash mid-write can
//! never leave a partially-written run visible. The sealed [`Run`] is
//! memory-mapped read-only.
//!
//! ## Read path
//!
//! - `get` consults the Bloom filter first; a negative answer skips
//!   the file entirely. A positive answer is confirmed (or refuted)
//!   by binary search, so Bloom false positives are invisible.
//! - `range` binary-searches both bounds and copies out the
//!   contiguous slice.
//! - Tombstone entries are returned as-is; recency resolution is the
//!   caller's concern.
//!
//! ## Lifecycle
//!
//! Runs are immutable after sealing and safe to read from many
//! threads. The backing file is deleted when the `Run` is dropped —
//! the engine holds runs in `Arc`s, so a level clear removes the file
//! once the last in-flight reader is done with it.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::bloom::BloomFilter;
use crate::entry::{ENTRY_SIZE, Entry, Key, Value};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by run construction and access.
#[derive(Debug, Error)]
pub enum RunError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The sealed file's length does not match the entry count.
    #[error("run file length mismatch: expected {expected} bytes, found {found}")]
    LengthMismatch { expected: u64, found: u64 },
}

// ------------------------------------------------------------------------------------------------
// RunWriter — append-only construction
// ------------------------------------------------------------------------------------------------

/// Builds a run by appending entries in strictly ascending key order.
///
/// Writes go to `<path>.tmp`; [`RunWriter::seal`] renames the file
/// into place and returns the readable [`Run`].
pub struct RunWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    writer: BufWriter<File>,
    bloom: BloomFilter,
    max_size: usize,
    size: usize,
    last_key: Option<Key>,
}

impl RunWriter {
    /// Creates a writer targeting `path`, sized for at most
    /// `max_size` entries with a Bloom filter of
    /// `⌈bits_per_entry × max_size⌉` bits.
    pub fn create(
        path: impl AsRef<Path>,
        max_size: usize,
        bits_per_entry: f64,
    ) -> Result<Self, RunError> {
        let path = path.as_ref().to_path_buf();
        let tmp_path = path.with_extension("tmp");

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        trace!(path = %path.display(), max_size, "run writer created");

        Ok(Self {
            path,
            tmp_path,
            writer: BufWriter::new(file),
            bloom: BloomFilter::for_capacity(max_size, bits_per_entry),
            max_size,
            size: 0,
            last_key: None,
        })
    }

    /// Appends one entry.
    ///
    /// # Panics
    ///
    /// Panics if the entry is out of order or the run is already at
    /// capacity — both are caller bugs, not runtime conditions.
    pub fn put(&mut self, entry: Entry) -> Result<(), RunError> {
        assert!(self.size < self.max_size, "append to a full run");
        if let Some(last) = self.last_key {
            assert!(entry.key > last, "out-of-order append: {} after {}", entry.key, last);
        }

        self.writer.write_all(&entry.to_bytes())?;
        self.bloom.set(entry.key);
        self.last_key = Some(entry.key);
        self.size += 1;
        Ok(())
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Flushes, fsyncs, and renames the file into place, returning
    /// the sealed, readable run. The rename is the commit point.
    pub fn seal(mut self) -> Result<Run, RunError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.tmp_path, &self.path)?;

        debug!(path = %self.path.display(), size = self.size, "run sealed");

        Run::map(self.path, self.max_size, self.size, self.bloom)
    }
}

// ------------------------------------------------------------------------------------------------
// Run — immutable reader
// ------------------------------------------------------------------------------------------------

/// A sealed, memory-mapped, immutable run.
pub struct Run {
    /// Backing file path; owned by this run and deleted on drop.
    path: PathBuf,

    /// Capacity in entries this run was sized for.
    max_size: usize,

    /// Actual entry count (`≤ max_size`).
    size: usize,

    /// Membership filter covering every key in the run.
    bloom: BloomFilter,

    /// Read-only mapping of the entry file. `None` for an empty run —
    /// zero-length files cannot be mapped.
    mmap: Option<Mmap>,
}

impl Run {
    fn map(
        path: PathBuf,
        max_size: usize,
        size: usize,
        bloom: BloomFilter,
    ) -> Result<Self, RunError> {
        let expected = (size * ENTRY_SIZE) as u64;
        let found = fs::metadata(&path)?.len();
        if found != expected {
            return Err(RunError::LengthMismatch { expected, found });
        }

        let mmap = if size > 0 {
            let file = File::open(&path)?;
            // Safe to map: the file is sealed and never written again,
            // and the mapping is read-only.
            Some(unsafe { Mmap::map(&file)? })
        } else {
            None
        };

        Ok(Self {
            path,
            max_size,
            size,
            bloom,
            mmap,
        })
    }

    /// Number of entries in the run.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the run holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Capacity in entries this run was sized for.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Decodes the entry at `idx` (`idx < len()`).
    pub fn entry(&self, idx: usize) -> Entry {
        debug_assert!(idx < self.size);
        let data = self
            .mmap
            .as_ref()
            .expect("non-empty run is always mapped");
        let off = idx * ENTRY_SIZE;
        let mut buf = [0u8; ENTRY_SIZE];
        buf.copy_from_slice(&data[off..off + ENTRY_SIZE]);
        Entry::from_bytes(&buf)
    }

    /// Looks up a single key.
    ///
    /// The Bloom filter is consulted first; on a negative answer the
    /// file is not touched. Tombstone values are returned as-is.
    pub fn get(&self, key: Key) -> Option<Value> {
        if self.size == 0 || !self.bloom.contains(key) {
            return None;
        }

        let idx = self.lower_bound(key);
        if idx < self.size {
            let entry = self.entry(idx);
            if entry.key == key {
                return Some(entry.val);
            }
        }
        None
    }

    /// Returns the contiguous entries with keys in `[lo, hi]`
    /// (inclusive on both ends), ascending by key.
    pub fn range(&self, lo: Key, hi: Key) -> Vec<Entry> {
        if lo > hi || self.size == 0 {
            return Vec::new();
        }
        let start = self.lower_bound(lo);
        let end = self.upper_bound(hi);
        (start..end).map(|i| self.entry(i)).collect()
    }

    /// Iterates every entry in key order.
    pub fn iter(&self) -> impl Iterator<Item = Entry> + '_ {
        (0..self.size).map(move |i| self.entry(i))
    }

    /// Index of the first entry with `key ≥ bound`.
    fn lower_bound(&self, bound: Key) -> usize {
        let (mut lo, mut hi) = (0usize, self.size);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.entry(mid).key < bound {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Index one past the last entry with `key ≤ bound`.
    fn upper_bound(&self, bound: Key) -> usize {
        let (mut lo, mut hi) = (0usize, self.size);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.entry(mid).key <= bound {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

impl Drop for Run {
    /// Removes the backing file. The engine drops runs only when a
    /// level is cleared during compaction, and `Arc` keeps the file
    /// alive while any reader still holds the run.
    fn drop(&mut self) {
        self.mmap = None;
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %e, "failed to remove run file");
        }
    }
}
