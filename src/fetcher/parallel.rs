use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::app::{FeedmeError, Result};

pub const DEFAULT_WORKERS: usize = 10;

/// Bounded fan-out: one task per key, at most `workers` running at once.
#[derive(Clone)]
pub struct ParallelFetcher {
    semaphore: Arc<Semaphore>,
}

impl ParallelFetcher {
    pub fn new() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Run `f` for every key and return the outcomes in input order,
    /// whatever order the tasks finish in.
    pub async fn fetch_all<K, T, F, Fut>(&self, keys: Vec<K>, f: F) -> Vec<Result<T>>
    where
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles = Vec::with_capacity(keys.len());

        for key in keys {
            let semaphore = self.semaphore.clone();
            let work = f(key);

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| FeedmeError::Other(e.to_string()))?;
                work.await
            });

            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                    results.push(Err(FeedmeError::Task(e)));
                }
            }
        }

        results
    }
}

impl Default for ParallelFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let pool = ParallelFetcher::with_workers(4);
        // later keys finish first
        let results = pool
            .fetch_all(vec![40u64, 30, 20, 10], |ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(ms)
            })
            .await;

        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![40, 30, 20, 10]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = ParallelFetcher::with_workers(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = pool
            .fetch_all((0..12).collect(), |i: usize| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                }
            })
            .await;

        assert_eq!(results.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_errors_stay_in_their_slot() {
        let pool = ParallelFetcher::new();
        let results = pool
            .fetch_all(vec![1u64, 2, 3], |id| async move {
                if id == 2 {
                    Err(FeedmeError::ItemNotFound(id))
                } else {
                    Ok(id)
                }
            })
            .await;

        assert!(results[0].is_ok());
        assert!(results[1].as_ref().is_err_and(|e| e.is_not_found()));
        assert!(results[2].is_ok());
    }
}
