//! CountdownLatch - wait until N units of work have finished

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tracing::debug;

struct Inner {
    count: AtomicUsize,
    notify: Notify,
}

/// Completion counter shared by producers and the coordinating task
///
/// Producers call [`count_down`](Self::count_down) once each; the
/// coordinator awaits [`wait`](Self::wait) before closing the aggregator.
#[derive(Clone)]
pub struct CountdownLatch {
    inner: Arc<Inner>,
}

impl fmt::Debug for CountdownLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownLatch").field("count", &self.count()).finish()
    }
}

impl CountdownLatch {
    /// Create a latch expecting `count` completions
    pub fn new(count: usize) -> Self {
        debug!(count, "CountdownLatch::new: called");
        Self {
            inner: Arc::new(Inner {
                count: AtomicUsize::new(count),
                notify: Notify::new(),
            }),
        }
    }

    /// Remaining completions
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Record one completion; extra calls once the count is zero are ignored
    pub fn count_down(&self) {
        let previous = self
            .inner
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1));

        match previous {
            Ok(1) => {
                debug!("CountdownLatch::count_down: reached zero");
                self.inner.notify.notify_waiters();
            }
            Ok(remaining) => debug!(remaining = remaining - 1, "CountdownLatch::count_down: called"),
            Err(_) => debug!("CountdownLatch::count_down: already zero"),
        }
    }

    /// Guard that counts down once when dropped
    ///
    /// Create it at the top of a task so the completion is recorded even if
    /// the task panics or is cancelled.
    pub fn guard(&self) -> CountdownGuard {
        CountdownGuard { latch: self.clone() }
    }

    /// Wait until the count reaches zero
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking, so a count_down between the check
            // and the await is not missed
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Records one completion on drop; see [`CountdownLatch::guard`]
#[derive(Debug)]
pub struct CountdownGuard {
    latch: CountdownLatch,
}

impl Drop for CountdownGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}
