/*!
 * Admission gate for translation provider calls.
 *
 * Per-question fan-out is unbounded; this limiter is what actually bounds
 * concurrent provider traffic. Waiters are admitted in arrival (FIFO) order.
 */

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default cap on concurrent provider calls
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Bounds the number of translation units in flight at once.
///
/// Persistence writes and bookkeeping stay outside the gate; only the
/// provider-facing section of each unit runs under a permit.
#[derive(Debug, Clone)]
pub struct TranslationLimiter {
    /// Admission semaphore (tokio semaphores are FIFO-fair)
    semaphore: Arc<Semaphore>,
    /// Configured capacity
    capacity: usize,
}

impl TranslationLimiter {
    /// Create a limiter with the given capacity (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently available (for tests and diagnostics)
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run a task once a permit is available, releasing it when done.
    ///
    /// The semaphore is owned by the limiter and never closed, so
    /// acquisition cannot fail.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("limiter semaphore closed");
        task.await
    }
}

impl Default for TranslationLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}
