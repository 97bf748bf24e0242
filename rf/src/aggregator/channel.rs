//! ResultAggregator and its single-consumer Drain

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};

use futures::Stream;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use super::outcome::Outcome;
use crate::error::{SyncError, SyncResult};

/// Channel message: a submitted item or the explicit close marker
enum Envelope<T> {
    Item(T),
    Close,
}

enum Tx<T> {
    Bounded(mpsc::Sender<Envelope<T>>),
    Unbounded(mpsc::UnboundedSender<Envelope<T>>),
}

impl<T> Tx<T> {
    /// Enqueue, waiting for capacity on a bounded channel
    async fn send(&self, envelope: Envelope<T>) -> SyncResult<()> {
        match self {
            Tx::Bounded(tx) => tx.send(envelope).await.map_err(|_| SyncError::Closed),
            Tx::Unbounded(tx) => tx.send(envelope).map_err(|_| SyncError::Closed),
        }
    }
}

#[derive(Debug)]
enum Rx<T> {
    Bounded(mpsc::Receiver<Envelope<T>>),
    Unbounded(mpsc::UnboundedReceiver<Envelope<T>>),
}

impl<T> Rx<T> {
    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Envelope<T>>> {
        match self {
            Rx::Bounded(rx) => rx.poll_recv(cx),
            Rx::Unbounded(rx) => rx.poll_recv(cx),
        }
    }
}

struct Shared<T> {
    tx: Tx<T>,

    /// Taken by the one consumer
    rx: Mutex<Option<Rx<T>>>,

    /// Submits hold the read side, close holds the write side, so a close
    /// cannot overtake a submit that was already in flight
    closed: RwLock<bool>,

    expected: Option<usize>,

    submitted: AtomicU64,
}

/// Fan-in queue collecting one result per producer
///
/// Clone the aggregator into each producer task. Once every producer has
/// submitted (the caller tracks this, e.g. with a
/// [`CountdownLatch`](crate::latch::CountdownLatch)), call
/// [`close`](Self::close); the consumer's [`Drain`] then ends.
pub struct ResultAggregator<T = Outcome> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ResultAggregator<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + 'static> ResultAggregator<T> {
    /// Create an aggregator for `expected` producers, or unbounded if the
    /// producer count is unknown
    pub fn new(expected: Option<usize>) -> Self {
        debug!(?expected, "ResultAggregator::new: called");
        let (tx, rx) = match expected {
            // One extra slot for the close marker, so neither a conforming
            // submit nor the close ever waits on the consumer
            Some(n) => {
                let (tx, rx) = mpsc::channel(n + 1);
                (Tx::Bounded(tx), Rx::Bounded(rx))
            }
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Tx::Unbounded(tx), Rx::Unbounded(rx))
            }
        };

        Self {
            shared: Arc::new(Shared {
                tx,
                rx: Mutex::new(Some(rx)),
                closed: RwLock::new(false),
                expected,
                submitted: AtomicU64::new(0),
            }),
        }
    }

    /// Aggregator sized for exactly `n` producers
    pub fn bounded(n: usize) -> Self {
        Self::new(Some(n))
    }

    /// Aggregator for an unknown number of producers
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Expected producer count, if known
    pub fn expected(&self) -> Option<usize> {
        self.shared.expected
    }

    /// Number of items accepted so far
    pub fn submitted(&self) -> u64 {
        self.shared.submitted.load(Ordering::Acquire)
    }

    /// Submit one producer's result
    ///
    /// Waits only when the channel is bounded and full. Submitting after
    /// [`close`](Self::close) is a usage violation.
    pub async fn submit(&self, item: T) -> SyncResult<()> {
        debug!("ResultAggregator::submit: called");
        let closed = self.shared.closed.read().await;
        if *closed {
            warn!("Submit after close rejected");
            return Err(SyncError::usage("submit after aggregator close"));
        }

        self.shared.tx.send(Envelope::Item(item)).await?;
        self.shared.submitted.fetch_add(1, Ordering::AcqRel);
        debug!("ResultAggregator::submit: accepted");
        Ok(())
    }

    /// Mark the stream finished
    ///
    /// Call only after every producer has submitted. Waits for submits
    /// already in progress; closing twice is a usage violation.
    pub async fn close(&self) -> SyncResult<()> {
        debug!("ResultAggregator::close: called");
        let mut closed = self.shared.closed.write().await;
        if *closed {
            return Err(SyncError::usage("aggregator closed twice"));
        }
        *closed = true;

        if self.shared.tx.send(Envelope::Close).await.is_err() {
            debug!("ResultAggregator::close: consumer already gone");
        }
        info!(submitted = self.submitted(), "Aggregator closed");
        Ok(())
    }

    /// Take the consumer side
    ///
    /// There is exactly one consumer; a second call is a usage violation.
    pub fn drain(&self) -> SyncResult<Drain<T>> {
        debug!("ResultAggregator::drain: called");
        let rx = self
            .shared
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| SyncError::usage("aggregator already has a consumer"))?;

        Ok(Drain {
            rx,
            expected: self.shared.expected,
            drained: 0,
            finished: false,
        })
    }
}

/// Lazy, finite sequence of submitted items
///
/// Yields items in arrival order and ends at the close marker. Once ended it
/// stays ended.
#[derive(Debug)]
pub struct Drain<T> {
    rx: Rx<T>,
    expected: Option<usize>,
    drained: u64,
    finished: bool,
}

impl<T> Unpin for Drain<T> {}

impl<T> Drain<T> {
    /// Wait for the next item; `None` once the aggregator is closed
    pub async fn recv(&mut self) -> Option<T> {
        std::future::poll_fn(|cx| self.poll_item(cx)).await
    }

    /// Number of items yielded so far
    pub fn drained(&self) -> u64 {
        self.drained
    }

    /// Returns `true` once the close marker has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match ready!(self.rx.poll_recv(cx)) {
            Some(Envelope::Item(item)) => {
                self.drained += 1;
                Poll::Ready(Some(item))
            }
            Some(Envelope::Close) | None => {
                self.finish();
                Poll::Ready(None)
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        match self.expected {
            Some(expected) if expected as u64 != self.drained => {
                warn!(expected, drained = self.drained, "Drained count differs from expected producers");
            }
            _ => debug!(drained = self.drained, "Drain::finish: stream ended"),
        }
    }
}

impl<T> Stream for Drain<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().poll_item(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_two_producers_ok_and_failed() {
        let aggregator: ResultAggregator = ResultAggregator::bounded(2);
        let mut drain = aggregator.drain().unwrap();

        let p1 = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.submit(Outcome::Ok).await })
        };
        let p2 = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.submit(Outcome::failed("disk full")).await })
        };
        p1.await.unwrap().unwrap();
        p2.await.unwrap().unwrap();
        aggregator.close().await.unwrap();

        let mut seen = Vec::new();
        while let Some(outcome) = drain.recv().await {
            seen.push(outcome);
        }
        seen.sort_by_key(|o| o.to_string());
        assert_eq!(seen, vec![Outcome::failed("disk full"), Outcome::Ok]);
        assert_eq!(drain.drained(), 2);
        assert!(drain.is_finished());

        // Not restartable
        assert!(drain.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_many_producers_each_drained_once() {
        let n = 50;
        let aggregator: ResultAggregator<usize> = ResultAggregator::bounded(n);
        let drain = aggregator.drain().unwrap();

        let mut producers = Vec::new();
        for i in 0..n {
            let aggregator = aggregator.clone();
            producers.push(tokio::spawn(async move { aggregator.submit(i).await }));
        }
        for producer in producers {
            producer.await.unwrap().unwrap();
        }
        aggregator.close().await.unwrap();

        let items: Vec<usize> = drain.collect().await;
        assert_eq!(items.len(), n);
        let unique: HashSet<usize> = items.into_iter().collect();
        assert_eq!(unique, (0..n).collect::<HashSet<_>>());
        assert_eq!(aggregator.submitted(), n as u64);
    }

    #[tokio::test]
    async fn test_consumer_runs_concurrently_with_producers() {
        let aggregator: ResultAggregator<u32> = ResultAggregator::unbounded();
        let drain = aggregator.drain().unwrap();
        let consumer = tokio::spawn(async move { drain.collect::<Vec<_>>().await });

        for i in 0..10 {
            aggregator.submit(i).await.unwrap();
        }
        aggregator.close().await.unwrap();

        let mut items = consumer.await.unwrap();
        items.sort_unstable();
        assert_eq!(items, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_bounded_applies_backpressure_without_loss() {
        // Capacity for 1 item plus the close marker; 5 producers must wait
        let aggregator: ResultAggregator<u32> = ResultAggregator::bounded(1);
        let drain = aggregator.drain().unwrap();

        let mut producers = Vec::new();
        for i in 0..5 {
            let aggregator = aggregator.clone();
            producers.push(tokio::spawn(async move { aggregator.submit(i).await }));
        }

        let consumer = tokio::spawn(async move { drain.collect::<Vec<_>>().await });
        for producer in producers {
            producer.await.unwrap().unwrap();
        }
        aggregator.close().await.unwrap();

        let mut items = consumer.await.unwrap();
        items.sort_unstable();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_submit_after_close_rejected() {
        let aggregator: ResultAggregator = ResultAggregator::bounded(1);
        aggregator.close().await.unwrap();

        let result = aggregator.submit(Outcome::Ok).await;
        assert!(matches!(result, Err(SyncError::UsageViolation(_))));
        assert_eq!(aggregator.submitted(), 0);
    }

    #[tokio::test]
    async fn test_double_close_rejected() {
        let aggregator: ResultAggregator = ResultAggregator::unbounded();
        aggregator.close().await.unwrap();
        assert!(aggregator.close().await.unwrap_err().is_usage_violation());
    }

    #[tokio::test]
    async fn test_single_consumer() {
        let aggregator: ResultAggregator = ResultAggregator::unbounded();
        let _drain = aggregator.drain().unwrap();
        assert!(aggregator.drain().unwrap_err().is_usage_violation());
    }

    #[tokio::test]
    async fn test_close_with_no_producers_ends_stream() {
        let aggregator: ResultAggregator = ResultAggregator::bounded(0);
        let mut drain = aggregator.drain().unwrap();
        aggregator.close().await.unwrap();
        assert!(drain.recv().await.is_none());
        assert_eq!(drain.drained(), 0);
    }

    #[tokio::test]
    async fn test_submit_to_dropped_consumer() {
        let aggregator: ResultAggregator = ResultAggregator::bounded(1);
        drop(aggregator.drain().unwrap());
        assert_eq!(aggregator.submit(Outcome::Ok).await, Err(SyncError::Closed));
    }
}
