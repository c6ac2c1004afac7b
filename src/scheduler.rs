//! Bounded-concurrency job scheduler.
//!
//! Runs every item of an ordered job list through an async worker while
//! keeping at most `concurrency` workers in flight. Admission is FIFO; the
//! scheduler suspends until *any* running job settles before admitting more,
//! and returns only once every job has settled.
//!
//! Failure isolation: the worker is expected to capture its own errors and
//! return a failure value instead of propagating; the scheduler drops worker
//! results either way, so one failing or slow job never cancels, blocks, or
//! aborts the rest of the batch. Aggregating outcomes (counters, logging) is
//! the worker's business.

use std::collections::VecDeque;
use std::future::Future;

use tokio::task::JoinSet;
use tracing::error;

/// Execute `worker(item, index)` for every item, at most `concurrency` at a
/// time. `index` is the item's position in the input sequence, not its
/// completion order, so log labels stay deterministic under any interleaving.
///
/// A `concurrency` of zero is treated as one. Completion order between jobs
/// is unconstrained. A worker that never settles stalls further admission;
/// bounding that is the worker's job (per-step timeouts).
pub async fn run_concurrent<T, E, F, Fut>(items: Vec<T>, concurrency: usize, worker: F)
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(T, usize) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    let concurrency = concurrency.max(1);
    let mut pending: VecDeque<(usize, T)> = items.into_iter().enumerate().collect();
    let mut running = JoinSet::new();

    loop {
        // Admit from the front of the queue until the ceiling is reached.
        while running.len() < concurrency {
            let Some((index, item)) = pending.pop_front() else {
                break;
            };
            running.spawn(worker(item, index));
        }
        assert!(
            running.len() <= concurrency,
            "scheduler running set ({}) exceeded concurrency limit ({})",
            running.len(),
            concurrency
        );

        // Wait for any running job to settle. None means the running set is
        // drained, and the queue was already empty when we got here.
        match running.join_next().await {
            Some(Ok(_result)) => {
                // Success or worker-reported failure: the job has settled
                // either way, and the slot is free again.
            }
            Some(Err(join_err)) => {
                // A panicking worker loses its own job only.
                error!("job task aborted: {join_err}");
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }
        fn leave(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn respects_concurrency_ceiling_and_runs_every_job() {
        let gauge = Arc::new(Gauge::default());
        let invocations = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..17).collect();
        run_concurrent(items, 3, |_item, _index| {
            let gauge = Arc::clone(&gauge);
            let invocations = Arc::clone(&invocations);
            async move {
                gauge.enter();
                invocations.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                gauge.leave();
                Ok::<(), ()>(())
            }
        })
        .await;

        assert_eq!(invocations.load(Ordering::SeqCst), 17);
        assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn passes_original_sequence_index_regardless_of_completion_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        // Items carry their own position; early items sleep longest so the
        // completion order inverts the admission order.
        let items: Vec<usize> = (0..8).collect();
        run_concurrent(items, 4, |item, index| {
            let seen = Arc::clone(&seen);
            async move {
                tokio::time::sleep(Duration::from_millis(40 - 5 * item as u64)).await;
                seen.lock().unwrap().push((item, index));
                Ok::<(), ()>(())
            }
        })
        .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 8);
        for (item, index) in seen.iter() {
            assert_eq!(item, index);
        }
    }

    #[tokio::test]
    async fn failing_jobs_do_not_block_the_rest_of_the_batch() {
        let invocations = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..10).collect();
        run_concurrent(items, 2, |item, _index| {
            let invocations = Arc::clone(&invocations);
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                if item % 2 == 0 {
                    Err(format!("job {item} fell over"))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(invocations.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn a_panicking_worker_loses_only_its_own_job() {
        let invocations = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..6).collect();
        run_concurrent(items, 2, |item, _index| {
            let invocations = Arc::clone(&invocations);
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                if item == 2 {
                    panic!("boom");
                }
                Ok::<(), ()>(())
            }
        })
        .await;

        assert_eq!(invocations.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn limit_larger_than_job_count_runs_everything_at_once() {
        let gauge = Arc::new(Gauge::default());

        let items: Vec<usize> = (0..4).collect();
        run_concurrent(items, 64, |_item, _index| {
            let gauge = Arc::clone(&gauge);
            async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(20)).await;
                gauge.leave();
                Ok::<(), ()>(())
            }
        })
        .await;

        // All four were admitted immediately.
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_job_list_returns_immediately() {
        run_concurrent(Vec::<usize>::new(), 3, |_item, _index| async move {
            Ok::<(), ()>(())
        })
        .await;
    }

    #[tokio::test]
    async fn zero_limit_is_clamped_to_one() {
        let invocations = Arc::new(AtomicUsize::new(0));
        run_concurrent(vec![1, 2, 3], 0, |_item, _index| {
            let invocations = Arc::clone(&invocations);
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<(), ()>(())
            }
        })
        .await;
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
    }
}
