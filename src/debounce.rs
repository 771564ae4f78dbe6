//! Trailing-edge debounce on the tokio timer.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

type Callback = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Runs the callback once, `delay` after the last of a burst of triggers.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
    callback: Callback,
}

impl Debouncer {
    pub fn new<F, Fut>(delay: Duration, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            callback: Arc::new(move || Box::pin(callback())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a run, superseding any pending one. Must be called inside a
    /// tokio runtime.
    pub fn trigger(&self) -> JoinHandle<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == generation {
                callback().await;
            }
        })
    }

    /// Drop any pending run.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
