#[cfg(test)]
mod tests {
    use crate::buffer::Buffer;

    #[test]
    fn full_buffer_refuses_new_key() {
        let mut buffer = Buffer::new(2);

        assert!(buffer.put(1, 10));
        assert!(buffer.put(2, 20));
        assert!(!buffer.put(3, 30));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get(3), None);
    }

    #[test]
    fn full_buffer_still_updates_existing_key() {
        let mut buffer = Buffer::new(2);

        assert!(buffer.put(1, 10));
        assert!(buffer.put(2, 20));

        // At capacity, but key 2 is present — the update must succeed.
        assert!(buffer.put(2, 22));

        assert_eq!(buffer.get(2), Some(22));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn refused_put_succeeds_after_clear() {
        let mut buffer = Buffer::new(1);

        assert!(buffer.put(1, 10));
        assert!(!buffer.put(2, 20));

        buffer.clear();

        assert!(buffer.put(2, 20));
        assert_eq!(buffer.get(2), Some(20));
    }

    #[test]
    fn capacity_is_reported() {
        let buffer = Buffer::new(16);
        assert_eq!(buffer.capacity(), 16);
    }
}
