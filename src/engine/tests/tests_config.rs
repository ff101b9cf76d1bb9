//! Configuration validation and data-directory hygiene.

#[cfg(test)]
mod tests {
    use crate::engine::{Engine, EngineConfig, EngineError};
    use crate::engine::tests::helpers::*;
    use tempfile::TempDir;

    fn assert_rejected(config: EngineConfig) {
        let tmp = TempDir::new().unwrap();
        let err = Engine::open(tmp.path(), config).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn zero_buffer_capacity_rejected() {
        assert_rejected(EngineConfig {
            buffer_capacity: 0,
            ..tiny_config()
        });
    }

    #[test]
    fn zero_depth_rejected() {
        assert_rejected(EngineConfig {
            depth: 0,
            ..tiny_config()
        });
    }

    #[test]
    fn fanout_below_two_rejected() {
        assert_rejected(EngineConfig {
            fanout: 1,
            ..tiny_config()
        });
    }

    #[test]
    fn zero_workers_rejected() {
        assert_rejected(EngineConfig {
            worker_threads: 0,
            ..tiny_config()
        });
    }

    #[test]
    fn non_positive_bloom_bits_rejected() {
        assert_rejected(EngineConfig {
            bloom_bits_per_entry: 0.0,
            ..tiny_config()
        });
        assert_rejected(EngineConfig {
            bloom_bits_per_entry: -1.0,
            ..tiny_config()
        });
        assert_rejected(EngineConfig {
            bloom_bits_per_entry: f64::NAN,
            ..tiny_config()
        });
    }

    #[test]
    fn default_config_opens() {
        init_tracing();
        let tmp = TempDir::new().unwrap();
        let mut engine = Engine::open(tmp.path(), EngineConfig::default()).unwrap();
        engine.put(1, 10).unwrap();
        assert_eq!(engine.get(1), Some(10));
    }

    #[test]
    fn open_sweeps_stale_run_and_tmp_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("run-00000042.bin"), b"stale").unwrap();
        std::fs::write(tmp.path().join("run-00000001.tmp"), b"stale").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"keep me").unwrap();

        let _engine = Engine::open(tmp.path(), tiny_config()).unwrap();

        assert!(!tmp.path().join("run-00000042.bin").exists());
        assert!(!tmp.path().join("run-00000001.tmp").exists());
        assert!(tmp.path().join("notes.txt").exists());
    }

    #[test]
    fn open_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");

        let mut engine = Engine::open(&nested, tiny_config()).unwrap();
        engine.put(1, 10).unwrap();

        assert!(nested.is_dir());
    }
}
