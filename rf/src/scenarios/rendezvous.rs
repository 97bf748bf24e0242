//! Rendezvous scenario: close the slot only after the matching receive

use eyre::Result;
use serde::Serialize;
use tracing::info;

use crate::rendezvous::rendezvous;

#[derive(Debug, Clone, Serialize)]
pub struct RendezvousReport {
    pub sent: String,
    pub received: String,
    pub closed_cleanly: bool,
}

/// Send `payload` from a spawned task, receive it, then close
pub async fn run(payload: &str) -> Result<RendezvousReport> {
    let (tx, mut rx) = rendezvous();

    let sent = payload.to_string();
    let sender = {
        let payload = sent.clone();
        tokio::spawn(async move { tx.send(payload).await })
    };

    // The receive returning is what makes the close safe
    let received = rx.receive().await?;
    let closed_cleanly = rx.close().is_ok();
    sender.await??;

    info!(closed_cleanly, "Rendezvous scenario finished");
    Ok(RendezvousReport {
        sent,
        received,
        closed_cleanly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_payload_handed_over_and_closed() {
        let report = run("ping").await.unwrap();
        assert_eq!(report.received, "ping");
        assert_eq!(report.sent, report.received);
        assert!(report.closed_cleanly);
    }
}
