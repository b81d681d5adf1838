//! Batch executor
//!
//! Runs one unit of work per item under a bounded pool. Results are
//! collected in submission order and the first failure in that order is
//! returned after every unit has finished. There is no rollback: units that
//! succeeded before a failure stay applied.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// Upper bound of the default worker count
pub const MAX_DEFAULT_WORKERS: usize = 32;

/// Pool sizing for batch operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of units running at once; `None` picks a default
    /// from the core count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

impl ExecutorConfig {
    /// Effective number of workers (at least one)
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(default_worker_count).max(1)
    }
}

/// `min(32, cores + 4)`
pub fn default_worker_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores + 4).min(MAX_DEFAULT_WORKERS)
}

/// Bounded pool shared by every batch submitted through it
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl BatchExecutor {
    /// Create an executor sized by `config`
    pub fn new(config: &ExecutorConfig) -> Self {
        let workers = config.worker_count();
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Number of units that may run at once in parallel mode
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` once per item.
    ///
    /// With `parallel` unset the units run one after another in submission
    /// order. Otherwise each unit is spawned and waits for a pool permit.
    /// Either way every unit runs to completion before the first failure
    /// (in submission order) is returned.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, parallel: bool, task: F) -> Result<Vec<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut first_error = None;

        if parallel {
            let handles: Vec<_> = items
                .into_iter()
                .map(|item| {
                    let permits = Arc::clone(&self.permits);
                    let unit = task(item);
                    tokio::spawn(async move {
                        let _permit = permits
                            .acquire_owned()
                            .await
                            .map_err(|e| Error::General(format!("worker pool closed: {e}")))?;
                        unit.await
                    })
                })
                .collect();

            for handle in handles {
                let outcome = handle
                    .await
                    .unwrap_or_else(|e| Err(Error::General(format!("batch task failed: {e}"))));
                collect(outcome, &mut results, &mut first_error);
            }
        } else {
            for item in items {
                collect(task(item).await, &mut results, &mut first_error);
            }
        }

        if let Some(err) = first_error {
            tracing::debug!(
                total,
                succeeded = results.len(),
                "batch finished with failures"
            );
            return Err(err);
        }
        Ok(results)
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(&ExecutorConfig::default())
    }
}

fn collect<T>(outcome: Result<T>, results: &mut Vec<T>, first_error: &mut Option<Error>) {
    match outcome {
        Ok(value) => results.push(value),
        Err(err) => {
            if first_error.is_none() {
                *first_error = Some(err);
            } else {
                tracing::debug!(error = %err, "discarding subsequent batch failure");
            }
        }
    }
}
