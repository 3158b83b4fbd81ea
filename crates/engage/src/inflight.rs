use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counts detached side-effect tasks so shutdown and tests can wait for
/// them. Callers of pipeline operations never wait on this.
#[derive(Clone, Default)]
pub struct InflightTracker {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    count: AtomicUsize,
    idle: Notify,
}

struct Guard(Arc<Inner>);

impl Drop for Guard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl InflightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` on the current runtime without awaiting it.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        let guard = Guard(self.inner.clone());
        tokio::spawn(async move {
            let _guard = guard;
            fut.await;
        });
    }

    pub fn inflight(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Wait until every spawned task has finished.
    pub async fn settle(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.inflight() == 0 {
                return;
            }
            idle.await;
        }
    }
}
