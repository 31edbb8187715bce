//! Worker-pool helpers.
//!
//! Wraps rayon so a caller can fan independent work items out over a fixed
//! number of workers without touching the global pool.

use rayon::ThreadPoolBuildError;
use rayon::prelude::*;

/// Maps `f` over `items` on a dedicated pool of `workers` threads.
///
/// Results keep the order of `items`. With `workers == 1` the items are
/// processed inline on the calling thread, one after another.
///
/// # Panics
///
/// Panics if `workers` is 0.
pub fn par_map_pooled<T, R, F>(
    items: &[T],
    workers: usize,
    f: F,
) -> Result<Vec<R>, ThreadPoolBuildError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    assert!(workers > 0, "workers must be > 0");

    if workers == 1 {
        return Ok(items.iter().map(f).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|idx| format!("tile-worker-{idx}"))
        .build()?;

    Ok(pool.install(|| items.par_iter().map(&f).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_par_map_pooled_single_worker_is_sequential() {
        let items: Vec<i32> = (0..5).collect();
        let order = std::sync::Mutex::new(Vec::new());
        let result = par_map_pooled(&items, 1, |&x| {
            order.lock().unwrap().push(x);
            x + 1
        })
        .unwrap();
        assert_eq!(result, vec![1, 2, 3, 4, 5]);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_par_map_pooled_preserves_order() {
        let items: Vec<i32> = (0..100).collect();
        let result = par_map_pooled(&items, 4, |&x| x * 2).unwrap();
        let expected: Vec<i32> = (0..100).map(|x| x * 2).collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_par_map_pooled_visits_every_item_once() {
        let items: Vec<usize> = (0..64).collect();
        let counter = AtomicUsize::new(0);
        let _ = par_map_pooled(&items, 3, |_| counter.fetch_add(1, Ordering::Relaxed)).unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 64);
    }

    #[test]
    fn test_par_map_pooled_empty() {
        let items: Vec<i32> = vec![];
        let result = par_map_pooled(&items, 2, |&x| x).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    #[should_panic(expected = "workers must be > 0")]
    fn test_par_map_pooled_zero_workers_panics() {
        let _ = par_map_pooled(&[1], 0, |&x: &i32| x);
    }
}
