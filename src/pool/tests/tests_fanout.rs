#[cfg(test)]
mod tests {
    use crate::pool::{FanoutTask, WorkerPool};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn launch_submits_once_per_worker() {
        let pool = WorkerPool::new(4);
        let invocations = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&invocations);
        let task: FanoutTask = Arc::new(move |_cx| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        pool.launch(task);
        pool.wait_all();

        assert_eq!(invocations.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn requeue_claims_every_work_unit_exactly_once() {
        const UNITS: usize = 200;

        let pool = WorkerPool::new(3);
        let next = Arc::new(AtomicUsize::new(0));
        let claims = Arc::new(Vec::from_iter((0..UNITS).map(|_| AtomicUsize::new(0))));

        let next_ref = Arc::clone(&next);
        let claims_ref = Arc::clone(&claims);
        let task: FanoutTask = Arc::new(move |cx| {
            let unit = next_ref.fetch_add(1, Ordering::SeqCst);
            if unit >= UNITS {
                return;
            }
            claims_ref[unit].fetch_add(1, Ordering::SeqCst);
            cx.requeue();
        });

        pool.launch(task);
        pool.wait_all();

        for (unit, claim) in claims.iter().enumerate() {
            assert_eq!(claim.load(Ordering::SeqCst), 1, "unit {unit} claimed wrongly");
        }
    }

    #[test]
    fn wait_all_covers_transitive_requeues() {
        // A single chain of requeues much deeper than the worker
        // count; wait_all must not return before the chain ends.
        let pool = WorkerPool::new(2);
        let depth = Arc::new(AtomicUsize::new(0));

        let depth_ref = Arc::clone(&depth);
        let task: FanoutTask = Arc::new(move |cx| {
            if depth_ref.fetch_add(1, Ordering::SeqCst) < 1000 {
                cx.requeue();
            }
        });

        pool.launch(task);
        pool.wait_all();

        assert!(depth.load(Ordering::SeqCst) >= 1000);
    }

    #[test]
    fn fanout_pool_is_reusable() {
        let pool = WorkerPool::new(2);

        for _ in 0..3 {
            let invocations = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&invocations);
            let task: FanoutTask = Arc::new(move |_cx| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            pool.launch(task);
            pool.wait_all();

            assert_eq!(invocations.load(Ordering::SeqCst), 2);
        }
    }
}
