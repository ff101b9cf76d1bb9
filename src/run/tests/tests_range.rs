#[cfg(test)]
mod tests {
    use crate::entry::Entry;
    use crate::run::{Run, RunWriter};
    use tempfile::TempDir;

    fn build(tmp: &TempDir, pairs: &[(i32, i32)]) -> Run {
        let path = tmp.path().join("run-000001.bin");
        let mut writer = RunWriter::create(&path, pairs.len().max(1), 5.0).unwrap();
        for &(key, val) in pairs {
            writer.put(Entry::new(key, val)).unwrap();
        }
        writer.seal().unwrap()
    }

    fn keys(entries: &[Entry]) -> Vec<i32> {
        entries.iter().map(|e| e.key).collect()
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let tmp = TempDir::new().unwrap();
        let run = build(&tmp, &[(1, 10), (3, 30), (5, 50), (7, 70)]);

        assert_eq!(keys(&run.range(3, 5)), vec![3, 5]);
        assert_eq!(keys(&run.range(1, 7)), vec![1, 3, 5, 7]);
    }

    #[test]
    fn range_bounds_between_keys() {
        let tmp = TempDir::new().unwrap();
        let run = build(&tmp, &[(10, 1), (20, 2), (30, 3)]);

        assert_eq!(keys(&run.range(11, 29)), vec![20]);
        assert_eq!(keys(&run.range(0, 9)), Vec::<i32>::new());
        assert_eq!(keys(&run.range(31, 99)), Vec::<i32>::new());
    }

    #[test]
    fn range_single_key() {
        let tmp = TempDir::new().unwrap();
        let run = build(&tmp, &[(10, 1), (20, 2), (30, 3)]);

        let entries = run.range(20, 20);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, 20);
        assert_eq!(entries[0].val, 2);
    }

    #[test]
    fn range_inverted_bounds_is_empty() {
        let tmp = TempDir::new().unwrap();
        let run = build(&tmp, &[(1, 10), (2, 20)]);

        assert!(run.range(2, 1).is_empty());
    }

    #[test]
    fn range_covering_everything() {
        let tmp = TempDir::new().unwrap();
        let run = build(&tmp, &[(-5, 1), (0, 2), (5, 3)]);

        assert_eq!(keys(&run.range(i32::MIN, i32::MAX)), vec![-5, 0, 5]);
    }
}
