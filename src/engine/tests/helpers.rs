use crate::engine::EngineConfig;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times — only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The smallest interesting tree: two-entry buffer, two levels,
/// fanout two. Every third distinct put flushes, and cascades kick in
/// after a handful of writes.
pub fn tiny_config() -> EngineConfig {
    init_tracing();
    EngineConfig {
        buffer_capacity: 2,
        depth: 2,
        fanout: 2,
        worker_threads: 2,
        bloom_bits_per_entry: 5.0,
    }
}

/// Large buffer so nothing ever flushes — exercises the buffer-only
/// read paths.
pub fn buffer_only_config() -> EngineConfig {
    init_tracing();
    EngineConfig {
        buffer_capacity: 64 * 1024,
        depth: 2,
        fanout: 2,
        worker_threads: 2,
        bloom_bits_per_entry: 5.0,
    }
}

/// Deep, roomy tree for volume tests; compaction happens but the
/// deepest level is never reached.
pub fn roomy_config() -> EngineConfig {
    init_tracing();
    EngineConfig {
        buffer_capacity: 8,
        depth: 4,
        fanout: 3,
        worker_threads: 4,
        bloom_bits_per_entry: 5.0,
    }
}
