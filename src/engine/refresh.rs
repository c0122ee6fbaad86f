//! Refresh callbacks for miss and stale-while-revalidate reads
//!
//! A [`Refresher`] is a caller-supplied async producer. It is cheaply
//! cloneable so the engine can hand a copy to a detached background task;
//! ownership transfers at scheduling time, so the callback always outlives
//! the task it feeds.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future used by type-erased callbacks
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Async producer invoked when a key is missing, expired, or stale
pub struct Refresher<T>(Arc<dyn Fn() -> BoxFuture<crate::Result<T>> + Send + Sync>);

impl<T> Clone for Refresher<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Refresher<T> {
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<T>> + Send + 'static,
    {
        Self(Arc::new(move || Box::pin(producer())))
    }

    pub async fn call(&self) -> crate::Result<T> {
        (self.0)().await
    }
}

impl<T> std::fmt::Debug for Refresher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Refresher")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_refresher_invokes_producer() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let refresher = Refresher::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(42u32)
            }
        });

        assert_eq!(refresher.call().await.unwrap(), 42);
        let cloned = refresher.clone();
        assert_eq!(cloned.call().await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresher_propagates_errors() {
        let refresher: Refresher<u32> = Refresher::new(|| async {
            Err(crate::CacheError::InvalidArgument("upstream down".into()))
        });
        assert!(refresher.call().await.is_err());
    }
}
