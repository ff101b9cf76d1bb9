//! # LSM Storage Engine
//!
//! A synchronous, embeddable storage engine over 32-bit integer keys
//! and values, organised as a leveled LSM tree with size-tiered
//! compaction and parallel reads.
//!
//! ## Design Overview
//!
//! Data lives in three places, queried newest-first:
//!
//! 1. **Write buffer** — an in-memory sorted map holding the most
//!    recent `B` writes.
//! 2. **Levels 0..D-1** — each level holds up to `fanout` immutable
//!    runs; runs at level `i` hold up to `B × fanout^i` entries.
//!    Within a level runs are ordered newest-first.
//! 3. **Run files** — sorted, memory-mapped entry files with a Bloom
//!    filter each.
//!
//! Writes fill the buffer; a full buffer is drained into a fresh run
//! prepended to level 0. A full level is consolidated by
//! `merge_down`: all of its runs are k-way merged (newest wins) into
//! a single run prepended to the next level, recursing first if that
//! level is itself full. Tombstones ride along until they reach the
//! deepest level, where they are dropped — only there is it safe,
//! because no older version can remain below to resurface.
//!
//! ## Parallel reads
//!
//! Point and range queries fan a task out across the worker pool.
//! Workers claim run indices from an atomic counter in global
//! newest-first order (levels by index, runs front-to-back). Point
//! search stops early once a hit is found: any worker holding a
//! higher index can only find an older version, so skipping it is
//! sound. Range search probes every run and reconciles the collected
//! slices through the merge machinery, buffer first.
//!
//! ## Concurrency Model
//!
//! All mutation (`put`, `delete`, `load`, compaction) runs on one
//! driver thread; reads run between writes and observe a consistent
//! snapshot. Runs are reference-counted, so files deleted by a
//! compaction stay readable for any in-flight worker.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::buffer::Buffer;
use crate::entry::{ENTRY_SIZE, Entry, Key, TOMBSTONE, Value};
use crate::level::Level;
use crate::merge::MergeContext;
use crate::pool::{FanoutTask, WorkerPool};
use crate::run::{Run, RunError, RunWriter};

#[cfg(test)]
mod tests;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Error originating from run construction or access.
    #[error("run error: {0}")]
    Run(#[from] RunError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Every level down to the deepest is full; the tree does not
    /// auto-grow. The driver should treat this as fatal.
    #[error("no more space in tree")]
    OutOfSpace,

    /// `load` was pointed at a file that does not exist.
    #[error("could not locate file '{0}'")]
    MissingLoadFile(String),

    /// Rejected configuration passed to [`Engine::open`].
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration for an [`Engine`] instance, passed to [`Engine::open`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Write buffer capacity `B`, in entries.
    pub buffer_capacity: usize,

    /// Number of levels `D` in the tree.
    pub depth: usize,

    /// Fanout `F`: runs per level, and the per-level growth factor of
    /// run capacity (`B × F^i` entries at level `i`).
    pub fanout: usize,

    /// Worker threads `T` used by parallel point and range search.
    pub worker_threads: usize,

    /// Bloom filter budget in bits per entry; each run's filter holds
    /// `⌈bits_per_entry × run_capacity⌉` bits.
    pub bloom_bits_per_entry: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1024,
            depth: 5,
            fanout: 10,
            worker_threads: 4,
            bloom_bits_per_entry: 5.0,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.buffer_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "buffer_capacity must be at least 1".into(),
            ));
        }
        if self.depth == 0 {
            return Err(EngineError::InvalidConfig("depth must be at least 1".into()));
        }
        if self.fanout < 2 {
            return Err(EngineError::InvalidConfig("fanout must be at least 2".into()));
        }
        if self.worker_threads == 0 {
            return Err(EngineError::InvalidConfig(
                "worker_threads must be at least 1".into(),
            ));
        }
        if !(self.bloom_bits_per_entry > 0.0) {
            return Err(EngineError::InvalidConfig(
                "bloom_bits_per_entry must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Where a logical pair currently resides, as reported by
/// [`Engine::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Resident in a run at the given level (0-based index;
    /// displayed 1-based as `L1`, `L2`, ...).
    Level(usize),

    /// Still staged in the write buffer.
    Buffer,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Level(idx) => write!(f, "L{}", idx + 1),
            Self::Buffer => write!(f, "Buffer"),
        }
    }
}

/// Snapshot of logical tree contents returned by [`Engine::stats`].
///
/// Tombstoned pairs are excluded everywhere. The `Display` impl
/// renders the driver-facing text:
///
/// ```text
/// Logical Pairs: LVL1: 2, LVL2: 3
/// Total Logical Pairs: 6
/// 1:10:L1 7:70:L2 3:30:Buffer
/// ```
pub struct EngineStats {
    /// Live (non-tombstone) entry count per level.
    pub level_counts: Vec<usize>,

    /// Live entry count in the write buffer.
    pub buffer_count: usize,

    /// Grand total across all levels plus the buffer.
    pub total: usize,

    /// Every live pair with its location, levels first (top-down,
    /// runs newest-first), buffer last.
    pub pairs: Vec<(Entry, Location)>,
}

impl std::fmt::Display for EngineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Logical Pairs: ")?;
        for (idx, count) in self.level_counts.iter().enumerate() {
            write!(f, "LVL{}: {}", idx + 1, count)?;
            if idx + 1 < self.level_counts.len() {
                write!(f, ", ")?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Total Logical Pairs: {}", self.total)?;
        for (i, (entry, location)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{entry}:{location}")?;
        }
        writeln!(f)
    }
}

// ------------------------------------------------------------------------------------------------
// Shared search state
// ------------------------------------------------------------------------------------------------

/// State shared by point-search workers.
struct PointSearch {
    /// All runs, global newest-first order.
    runs: Vec<Arc<Run>>,

    /// Next run index to claim.
    next_run: AtomicUsize,

    /// Index of the newest run with a hit so far, `-1` if none.
    /// Read without the lock for early termination.
    hit_run: AtomicI64,

    /// The winning `(run index, value)`, guarded for updates.
    hit: Mutex<Option<(usize, Value)>>,
}

/// State shared by range-search workers.
struct RangeSearch {
    /// All runs, global newest-first order.
    runs: Vec<Arc<Run>>,

    /// Next run index to claim.
    next_run: AtomicUsize,

    /// Collected sub-ranges keyed by priority: 0 is the buffer, run
    /// `c` contributes under `c + 1`.
    results: Mutex<BTreeMap<usize, Vec<Entry>>>,
}

// ------------------------------------------------------------------------------------------------
// Engine
// ------------------------------------------------------------------------------------------------

/// The LSM storage engine handle.
pub struct Engine {
    /// In-memory write staging area.
    buffer: Buffer,

    /// Level hierarchy, shallowest (newest) first.
    levels: Vec<Level>,

    /// Worker pool shared by all parallel searches.
    pool: WorkerPool,

    /// Directory owning all run files.
    data_dir: PathBuf,

    /// Bloom sizing parameter for newly created runs.
    bits_per_entry: f64,

    /// Monotonic sequence for run file names.
    next_run_seq: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.data_dir)
            .field("levels", &self.levels.len())
            .field("bits_per_entry", &self.bits_per_entry)
            .field("next_run_seq", &self.next_run_seq)
            .finish()
    }
}

impl Engine {
    /// Opens an engine rooted at the given directory.
    ///
    /// Creates the directory if needed and sweeps stale run and
    /// temporary files left behind by a previous process — run files
    /// are meaningless without the in-memory tree that owned them.
    pub fn open(data_dir: impl AsRef<Path>, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Self::sweep_stale_files(&data_dir)?;

        let mut levels = Vec::with_capacity(config.depth);
        let mut max_run_size = config.buffer_capacity;
        for _ in 0..config.depth {
            levels.push(Level::new(config.fanout, max_run_size));
            max_run_size = max_run_size.checked_mul(config.fanout).ok_or_else(|| {
                EngineError::InvalidConfig("level capacity overflows usize".into())
            })?;
        }

        info!(
            data_dir = %data_dir.display(),
            buffer_capacity = config.buffer_capacity,
            depth = config.depth,
            fanout = config.fanout,
            worker_threads = config.worker_threads,
            "engine opened"
        );

        Ok(Self {
            buffer: Buffer::new(config.buffer_capacity),
            levels,
            pool: WorkerPool::new(config.worker_threads),
            data_dir,
            bits_per_entry: config.bloom_bits_per_entry,
            next_run_seq: 0,
        })
    }

    /// Inserts or updates a key.
    ///
    /// The tombstone sentinel is reserved: a `put` of [`TOMBSTONE`]
    /// behaves exactly like [`Engine::delete`].
    pub fn put(&mut self, key: Key, val: Value) -> Result<(), EngineError> {
        if self.buffer.put(key, val) {
            return Ok(());
        }

        self.flush_buffer()?;

        let inserted = self.buffer.put(key, val);
        assert!(inserted, "insert into freshly drained buffer failed");
        Ok(())
    }

    /// Deletes a key by writing a tombstone.
    pub fn delete(&mut self, key: Key) -> Result<(), EngineError> {
        self.put(key, TOMBSTONE)
    }

    /// Looks up a single key.
    ///
    /// Returns `None` if the key was never written or its most recent
    /// write is a deletion. The buffer is consulted first; on a miss
    /// the runs are searched in parallel, newest-first, stopping as
    /// soon as a hit makes deeper runs irrelevant.
    pub fn get(&self, key: Key) -> Option<Value> {
        trace!(key, "get");

        if let Some(val) = self.buffer.get(key) {
            return (val != TOMBSTONE).then_some(val);
        }

        let state = Arc::new(PointSearch {
            runs: self.run_snapshot(),
            next_run: AtomicUsize::new(0),
            hit_run: AtomicI64::new(-1),
            hit: Mutex::new(None),
        });

        let shared = Arc::clone(&state);
        let task: FanoutTask = Arc::new(move |cx| {
            let c = shared.next_run.fetch_add(1, Ordering::SeqCst);

            // A hit pre-empts every claim deeper than its index: newer
            // runs have lower indices, so nothing at or below the hit
            // could be more recent. Claims above the hit still probe —
            // they may find a newer version.
            let hit_run = shared.hit_run.load(Ordering::SeqCst);
            if hit_run >= 0 && c as i64 > hit_run {
                return;
            }
            let Some(run) = shared.runs.get(c) else {
                return;
            };

            match run.get(key) {
                None => cx.requeue(),
                Some(val) => {
                    let mut hit = shared.hit.lock().expect("point search lock poisoned");
                    if hit.map_or(true, |(run_idx, _)| c < run_idx) {
                        *hit = Some((c, val));
                        shared.hit_run.store(c as i64, Ordering::SeqCst);
                    }
                }
            }
        });

        self.pool.launch(task);
        self.pool.wait_all();

        let hit = state.hit.lock().expect("point search lock poisoned").take();
        hit.and_then(|(_, val)| (val != TOMBSTONE).then_some(val))
    }

    /// Returns all live entries with keys in `[lo, hi_exclusive)`,
    /// ascending by key, newest version per key, tombstones excluded.
    pub fn range(&self, lo: Key, hi_exclusive: Key) -> Vec<Entry> {
        trace!(lo, hi_exclusive, "range");

        if hi_exclusive <= lo {
            return Vec::new();
        }
        let hi = hi_exclusive - 1;

        // Priority 0: the buffer holds the most recent data.
        let mut seeded = BTreeMap::new();
        seeded.insert(0usize, self.buffer.range(lo, hi));

        let state = Arc::new(RangeSearch {
            runs: self.run_snapshot(),
            next_run: AtomicUsize::new(0),
            results: Mutex::new(seeded),
        });

        let shared = Arc::clone(&state);
        let task: FanoutTask = Arc::new(move |cx| {
            let c = shared.next_run.fetch_add(1, Ordering::SeqCst);
            let Some(run) = shared.runs.get(c) else {
                return;
            };

            // Unlike point search there is no early exit — every run
            // may contribute somewhere in the range.
            let slice = run.range(lo, hi);
            shared
                .results
                .lock()
                .expect("range search lock poisoned")
                .insert(c + 1, slice);
            cx.requeue();
        });

        self.pool.launch(task);
        self.pool.wait_all();

        let results = mem::take(&mut *state.results.lock().expect("range search lock poisoned"));

        // Ascending priority = newest-first registration, so the merge
        // keeps the most recent version of every key.
        let mut ctx = MergeContext::new();
        for slice in results.into_values() {
            ctx.add(slice.into_iter());
        }
        ctx.filter(|entry| !entry.is_tombstone()).collect()
    }

    /// Bulk-loads a binary dump of 8-byte `[key LE][val LE]` records,
    /// applying each as a `put` in file order.
    ///
    /// Trailing double-quote characters in the path are stripped (a
    /// quirk of the legacy dump tooling). Returns the number of
    /// records applied; a short trailing read terminates the load.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize, EngineError> {
        let raw = path.as_ref().to_string_lossy();
        let trimmed = raw.trim_end_matches('"');

        let file = File::open(trimmed).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EngineError::MissingLoadFile(trimmed.to_string())
            } else {
                EngineError::Io(e)
            }
        })?;

        let mut reader = BufReader::new(file);
        let mut buf = [0u8; ENTRY_SIZE];
        let mut loaded = 0usize;
        loop {
            match reader.read_exact(&mut buf) {
                Ok(()) => {
                    let entry = Entry::from_bytes(&buf);
                    self.put(entry.key, entry.val)?;
                    loaded += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }

        info!(loaded, path = trimmed, "bulk load complete");
        Ok(loaded)
    }

    /// [`Engine::load`] wrapped with a monotonic clock; logs and
    /// returns the elapsed write latency.
    pub fn load_timed(&mut self, path: impl AsRef<Path>) -> Result<(usize, Duration), EngineError> {
        let start = Instant::now();
        let loaded = self.load(path)?;
        let elapsed = start.elapsed();
        info!(micros = elapsed.as_micros() as u64, "load latency");
        Ok((loaded, elapsed))
    }

    /// [`Engine::range`] wrapped with a monotonic clock; logs and
    /// returns the elapsed read latency.
    pub fn range_timed(&self, lo: Key, hi_exclusive: Key) -> (Vec<Entry>, Duration) {
        let start = Instant::now();
        let entries = self.range(lo, hi_exclusive);
        let elapsed = start.elapsed();
        info!(micros = elapsed.as_micros() as u64, "range latency");
        (entries, elapsed)
    }

    /// Counts and dumps every live logical pair, per level and in the
    /// buffer. See [`EngineStats`].
    pub fn stats(&self) -> EngineStats {
        let mut level_counts = Vec::with_capacity(self.levels.len());
        let mut pairs = Vec::new();
        let mut total = 0usize;

        for (idx, level) in self.levels.iter().enumerate() {
            let mut count = 0usize;
            for run in level.runs() {
                for entry in run.iter() {
                    if !entry.is_tombstone() {
                        count += 1;
                        pairs.push((entry, Location::Level(idx)));
                    }
                }
            }
            total += count;
            level_counts.push(count);
        }

        let mut buffer_count = 0usize;
        for entry in self.buffer.iter() {
            if !entry.is_tombstone() {
                buffer_count += 1;
                pairs.push((entry, Location::Buffer));
            }
        }
        total += buffer_count;

        EngineStats {
            level_counts,
            buffer_count,
            total,
            pairs,
        }
    }

    // --------------------------------------------------------------------------------------------
    // Flush & compaction
    // --------------------------------------------------------------------------------------------

    /// Drains the full buffer into a fresh run at the front of level
    /// 0, compacting level 0 downward first if it has no free slot.
    fn flush_buffer(&mut self) -> Result<(), EngineError> {
        debug!(entries = self.buffer.len(), "flushing write buffer");

        self.merge_down(0)?;

        let path = self.next_run_path();
        let mut writer =
            RunWriter::create(&path, self.levels[0].max_run_size(), self.bits_per_entry)?;
        for entry in self.buffer.iter() {
            writer.put(entry)?;
        }
        let run = writer.seal()?;

        self.levels[0].prepend(Arc::new(run));
        self.buffer.clear();
        Ok(())
    }

    /// Ensures `level` has a free run slot, merging all of its runs
    /// into a single new run at `level + 1` if it is full (recursing
    /// into `level + 1` first when that is also full).
    ///
    /// Tombstones are dropped only when the merge target is the
    /// deepest level — above it they must keep shadowing older
    /// versions of their key.
    fn merge_down(&mut self, level: usize) -> Result<(), EngineError> {
        if self.levels[level].remaining() > 0 {
            return Ok(());
        }
        if level + 1 == self.levels.len() {
            return Err(EngineError::OutOfSpace);
        }

        let next = level + 1;
        if self.levels[next].remaining() == 0 {
            self.merge_down(next)?;
            debug_assert!(self.levels[next].remaining() > 0);
        }

        let deepest = next + 1 == self.levels.len();

        // Keep the sources alive until the merge has been streamed
        // out; clearing the level only drops the level's references.
        let sources: Vec<Arc<Run>> = self.levels[level].runs().cloned().collect();

        let path = self.next_run_path();
        let mut writer =
            RunWriter::create(&path, self.levels[next].max_run_size(), self.bits_per_entry)?;

        let mut ctx = MergeContext::new();
        for run in &sources {
            ctx.add(run.iter());
        }
        for entry in ctx {
            if deepest && entry.is_tombstone() {
                continue;
            }
            writer.put(entry)?;
        }

        let run = writer.seal()?;
        debug!(
            from = level,
            to = next,
            source_runs = sources.len(),
            merged_entries = run.len(),
            deepest,
            "level compacted"
        );

        self.levels[next].prepend(Arc::new(run));
        self.levels[level].clear();
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Helpers
    // --------------------------------------------------------------------------------------------

    /// All runs in global newest-first order: levels by index, runs
    /// front-to-back within each level.
    fn run_snapshot(&self) -> Vec<Arc<Run>> {
        self.levels
            .iter()
            .flat_map(|level| level.runs().cloned())
            .collect()
    }

    /// Allocates the next run file path.
    fn next_run_path(&mut self) -> PathBuf {
        let seq = self.next_run_seq;
        self.next_run_seq += 1;
        self.data_dir.join(format!("run-{seq:08}.bin"))
    }

    /// Removes leftover run and temporary files from a previous
    /// process. Runs are meaningless without the in-memory tree that
    /// owned them (recovery is out of scope), and stale names would
    /// collide with this engine's file sequence.
    fn sweep_stale_files(data_dir: &Path) -> Result<(), EngineError> {
        for dir_entry in fs::read_dir(data_dir)? {
            let path = dir_entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if (name.starts_with("run-") && name.ends_with(".bin")) || name.ends_with(".tmp") {
                debug!(path = %path.display(), "removing stale file");
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
