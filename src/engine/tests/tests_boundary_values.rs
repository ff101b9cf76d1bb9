//! Extreme keys and values.

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::engine::tests::helpers::*;
    use crate::entry::{VALUE_MAX, VALUE_MIN};
    use tempfile::TempDir;

    #[test]
    fn extreme_keys_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut engine = Engine::open(tmp.path(), tiny_config()).unwrap();

        engine.put(i32::MIN, 1).unwrap();
        engine.put(i32::MAX, 2).unwrap();
        engine.put(0, 3).unwrap(); // flushes the first two

        assert_eq!(engine.get(i32::MIN), Some(1));
        assert_eq!(engine.get(i32::MAX), Some(2));
        assert_eq!(engine.get(0), Some(3));
    }

    #[test]
    fn extreme_values_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut engine = Engine::open(tmp.path(), buffer_only_config()).unwrap();

        engine.put(1, VALUE_MIN).unwrap();
        engine.put(2, VALUE_MAX).unwrap();

        assert_eq!(engine.get(1), Some(VALUE_MIN));
        assert_eq!(engine.get(2), Some(VALUE_MAX));
    }

    #[test]
    fn range_over_negative_keys() {
        let tmp = TempDir::new().unwrap();
        let mut engine = Engine::open(tmp.path(), tiny_config()).unwrap();

        for key in [-10, -5, 0, 5] {
            engine.put(key, key).unwrap();
        }

        let got: Vec<i32> = engine.range(-10, 5).iter().map(|e| e.key).collect();
        assert_eq!(got, vec![-10, -5, 0]);
    }

    #[test]
    fn full_domain_range() {
        let tmp = TempDir::new().unwrap();
        let mut engine = Engine::open(tmp.path(), buffer_only_config()).unwrap();

        engine.put(i32::MIN, 1).unwrap();
        engine.put(0, 2).unwrap();

        // [MIN, MAX) covers everything except key MAX itself.
        let got: Vec<i32> = engine.range(i32::MIN, i32::MAX).iter().map(|e| e.key).collect();
        assert_eq!(got, vec![i32::MIN, 0]);
    }
}
