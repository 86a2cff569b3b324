use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tracing::warn;

/// Bounded-parallelism scheduler.
///
/// At most `max_concurrency` tasks run at once. Waiting submissions are
/// admitted in the order they asked for a slot (the semaphore is fair), and a
/// task that fails releases its slot like any other.
#[derive(Clone)]
pub struct ConcurrencyController {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    in_flight: Arc<AtomicUsize>,
}

impl ConcurrencyController {
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = if max_concurrency == 0 {
            warn!("max_concurrency of 0 requested, using 1");
            1
        } else {
            max_concurrency
        };

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot, then run `task` to completion and hand back its
    /// own outcome.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self.semaphore.acquire().await?;
        let _slot = InFlight::enter(&self.in_flight);
        task.await
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

// Decrements on drop so a panicking or cancelled task still gives its slot back
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
