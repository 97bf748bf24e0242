//! Rendezvous - synchronous two-party handoff
//!
//! A send completes only once a receive has taken its payload, which gives
//! the receiver a happens-before edge over the send. That edge is the one
//! safe point at which the receiving side may close the slot.
//!
//! Built on a single-slot channel plus a per-send acknowledgement, so at most
//! one unconsumed payload is ever buffered.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

struct Handoff<T> {
    payload: T,
    ack: oneshot::Sender<()>,
}

/// Counts one send as pending until its handoff is enqueued
///
/// Dropping it while still armed (receiver closed, or the send future
/// cancelled while waiting for the slot) takes the count back.
struct PendingSend<'a> {
    pending: &'a AtomicUsize,
    armed: bool,
}

impl<'a> PendingSend<'a> {
    fn new(pending: &'a AtomicUsize) -> Self {
        pending.fetch_add(1, Ordering::AcqRel);
        Self { pending, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingSend<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pending.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Create a connected sender/receiver pair
pub fn rendezvous<T>() -> (RendezvousSender<T>, RendezvousReceiver<T>) {
    debug!("rendezvous: called");
    let (tx, rx) = mpsc::channel(1);
    let pending = Arc::new(AtomicUsize::new(0));
    (
        RendezvousSender {
            tx,
            pending: pending.clone(),
        },
        RendezvousReceiver { rx, pending },
    )
}

/// Sending side; clone it to hand out to more than one sender
pub struct RendezvousSender<T> {
    tx: mpsc::Sender<Handoff<T>>,

    /// Sends whose payload has not yet been taken by a receive
    pending: Arc<AtomicUsize>,
}

impl<T> Clone for RendezvousSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<T> RendezvousSender<T> {
    /// Hand `payload` over, waiting until a receive has taken it
    ///
    /// Returns [`SyncError::Closed`] if the receiver was closed or dropped
    /// before taking the payload.
    pub async fn send(&self, payload: T) -> SyncResult<()> {
        debug!("RendezvousSender::send: called");
        let (ack_tx, ack_rx) = oneshot::channel();

        let mut counted = PendingSend::new(&self.pending);
        if self
            .tx
            .send(Handoff {
                payload,
                ack: ack_tx,
            })
            .await
            .is_err()
        {
            debug!("RendezvousSender::send: receiver closed");
            return Err(SyncError::Closed);
        }
        // Enqueued: the receive that takes the handoff owns the decrement
        counted.disarm();

        debug!("RendezvousSender::send: waiting for receive");
        ack_rx.await.map_err(|_| SyncError::Closed)
    }

    /// Returns `true` once the receiving side has closed
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving side; the single owner of the close
pub struct RendezvousReceiver<T> {
    rx: mpsc::Receiver<Handoff<T>>,
    pending: Arc<AtomicUsize>,
}

impl<T> RendezvousReceiver<T> {
    /// Wait for a send and take its payload, releasing the sender
    ///
    /// Returns [`SyncError::Closed`] once every sender is gone.
    pub async fn receive(&mut self) -> SyncResult<T> {
        debug!("RendezvousReceiver::receive: called");
        let handoff = self.rx.recv().await.ok_or(SyncError::Closed)?;
        self.pending.fetch_sub(1, Ordering::AcqRel);

        // The sender may have given up waiting; the payload is still ours
        let _ = handoff.ack.send(());
        debug!("RendezvousReceiver::receive: matched");
        Ok(handoff.payload)
    }

    /// Sends started but not yet matched by a receive
    pub fn pending_sends(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Release the slot
    ///
    /// Precondition: every send has been matched by a receive that already
    /// returned. A detected unmatched send is reported as a usage violation;
    /// the slot is released either way and the waiting sender gets
    /// [`SyncError::Closed`].
    pub fn close(mut self) -> SyncResult<()> {
        debug!("RendezvousReceiver::close: called");
        self.rx.close();

        let pending = self.pending.load(Ordering::Acquire);
        if pending > 0 {
            warn!(pending, "Rendezvous closed with unmatched sends");
            return Err(SyncError::usage(format!(
                "rendezvous closed with {} unmatched send(s)",
                pending
            )));
        }

        info!("Rendezvous closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for_pending<T>(rx: &RendezvousReceiver<T>, n: usize) {
        while rx.pending_sends() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_send_receive_close() {
        let (tx, mut rx) = rendezvous();
        let sender = tokio::spawn(async move { tx.send("payload".to_string()).await });

        let payload = rx.receive().await.unwrap();
        assert_eq!(payload, "payload");
        sender.await.unwrap().unwrap();

        assert!(rx.close().is_ok());
    }

    #[tokio::test]
    async fn test_send_blocks_until_received() {
        let (tx, mut rx) = rendezvous();
        let sender = tokio::spawn(async move { tx.send(42u32).await });

        wait_for_pending(&rx, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sender.is_finished(), "send returned before a receive");

        assert_eq!(rx.receive().await.unwrap(), 42);
        sender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_close_with_unmatched_send() {
        let (tx, rx) = rendezvous();
        let sender = tokio::spawn(async move { tx.send(()).await });
        wait_for_pending(&rx, 1).await;

        let result = rx.close();
        assert!(matches!(result, Err(SyncError::UsageViolation(_))));
        assert_eq!(sender.await.unwrap(), Err(SyncError::Closed));
    }

    #[tokio::test]
    async fn test_send_after_close() {
        let (tx, rx) = rendezvous::<u8>();
        rx.close().unwrap();

        assert!(tx.is_closed());
        assert_eq!(tx.send(1).await, Err(SyncError::Closed));
    }

    #[tokio::test]
    async fn test_receive_after_senders_dropped() {
        let (tx, mut rx) = rendezvous::<u8>();
        drop(tx);
        assert_eq!(rx.receive().await, Err(SyncError::Closed));
    }

    #[tokio::test]
    async fn test_sequential_handoffs_in_order() {
        let (tx, mut rx) = rendezvous();
        let sender = tokio::spawn(async move {
            for i in 0..5u32 {
                tx.send(i).await?;
            }
            Ok::<_, SyncError>(())
        });

        for expected in 0..5u32 {
            assert_eq!(rx.receive().await.unwrap(), expected);
        }
        sender.await.unwrap().unwrap();
        assert_eq!(rx.pending_sends(), 0);
        rx.close().unwrap();
    }

    #[tokio::test]
    async fn test_multiple_senders_all_matched() {
        let (tx, mut rx) = rendezvous();
        let mut senders = Vec::new();
        for i in 0..3u32 {
            let tx = tx.clone();
            senders.push(tokio::spawn(async move { tx.send(i).await }));
        }
        wait_for_pending(&rx, 3).await;

        // All three are waiting, none has completed
        assert!(senders.iter().all(|s| !s.is_finished()));

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(rx.receive().await.unwrap());
        }
        for sender in senders {
            sender.await.unwrap().unwrap();
        }
        received.sort_unstable();
        assert_eq!(received, vec![0, 1, 2]);
        drop(tx);
        rx.close().unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_send_is_not_left_pending() {
        let (tx, mut rx) = rendezvous();
        let first = {
            let tx = tx.clone();
            tokio::spawn(async move { tx.send(1u32).await })
        };
        wait_for_pending(&rx, 1).await;

        // The slot holds the first payload, so this send waits until cancelled
        let cancelled = tokio::time::timeout(Duration::from_millis(20), tx.send(2)).await;
        assert!(cancelled.is_err());
        assert_eq!(rx.pending_sends(), 1);

        assert_eq!(rx.receive().await.unwrap(), 1);
        first.await.unwrap().unwrap();

        assert_eq!(rx.pending_sends(), 0);
        assert!(rx.close().is_ok());
    }
}
