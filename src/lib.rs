//! # StrataKV
//!
//! An embeddable key-value storage engine over 32-bit integer keys
//! and values, built on a **leveled LSM-tree** with size-tiered
//! compaction and parallel reads. Designed for fast sequential
//! writes and low-latency point lookups.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       Engine                           │
//! │  ┌────────────┐   ┌─────────────────────────────────┐  │
//! │  │   Write    │   │  Level 0: run run               │  │
//! │  │   Buffer   │──►│  Level 1: run run run           │  │
//! │  │ (in-memory)│   │  Level 2: run        (on disk)  │  │
//! │  └────────────┘   └───────────────┬─────────────────┘  │
//! │        flush          merge_down  │ (cascading)        │
//! │                                   ▼                    │
//! │  ┌──────────────────────────────────────────────────┐  │
//! │  │  Worker pool — parallel point / range search     │  │
//! │  └──────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Core storage engine — put, get, range, delete, bulk load, stats, compaction |
//! | [`buffer`] | In-memory sorted write staging area |
//! | [`run`] | Immutable, sorted, memory-mapped on-disk tables with Bloom filters |
//! | [`level`] | Capacity-bounded run collections, newest-first |
//! | [`merge`] | k-way merge with newest-wins collision resolution |
//! | [`bloom`] | Per-run probabilistic membership filter |
//! | [`pool`] | Fixed thread pool and self-requeuing fan-out tasks |
//! | [`entry`] | Fixed-width records, tombstone sentinel, binary codec |
//!
//! ## Key Properties
//!
//! - **Newest wins** — the buffer shadows level 0, shallower levels
//!   shadow deeper ones, and newer runs shadow older runs within a
//!   level. Reads always observe the most recent write.
//! - **Parallel reads** — point and range queries race worker
//!   threads across runs; point search terminates early once a hit
//!   rules out everything older.
//! - **Bloom-gated lookups** — each run carries a Bloom filter so
//!   point lookups skip runs that cannot contain the key.
//! - **Tombstone deletes** — deletions are writes of a reserved
//!   sentinel, eliminated only when compaction reaches the deepest
//!   level.
//! - **Atomic sealing** — runs are written to a temporary file and
//!   renamed into place; a partial run is never visible.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stratakv::{Engine, EngineConfig};
//!
//! let config = EngineConfig {
//!     buffer_capacity: 1024,
//!     depth: 5,
//!     fanout: 10,
//!     worker_threads: 4,
//!     bloom_bits_per_entry: 5.0,
//! };
//!
//! let mut engine = Engine::open("/tmp/my_db", config).unwrap();
//!
//! // Write
//! engine.put(1, 10).unwrap();
//!
//! // Read
//! assert_eq!(engine.get(1), Some(10));
//!
//! // Delete
//! engine.delete(1).unwrap();
//! assert_eq!(engine.get(1), None);
//!
//! // Range scan over [0, 100)
//! engine.put(2, 20).unwrap();
//! engine.put(3, 30).unwrap();
//! for entry in engine.range(0, 100) {
//!     println!("{entry}");
//! }
//! ```

pub mod bloom;
pub mod buffer;
pub mod engine;
pub mod entry;
pub mod level;
pub mod merge;
pub mod pool;
pub mod run;

pub use engine::{Engine, EngineConfig, EngineError, EngineStats, Location};
pub use entry::{Entry, Key, TOMBSTONE, VALUE_MAX, VALUE_MIN, Value};
