//! File fan-in scenario: producers write files and report through the
//! aggregator
//!
//! Each producer owns its own outcome. Nothing is funneled through a shared
//! error slot; the only merge point is the aggregator.

use std::sync::Arc;

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::files::FileCapability;
use crate::aggregator::{Outcome, ResultAggregator};
use crate::latch::CountdownLatch;
use crate::spawn::{join_indexed, spawn_indexed};

/// One producer's result, tagged with the file it wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct FanInReport {
    pub outcomes: Vec<FileOutcome>,
    pub submitted: u64,
    pub drained: u64,
}

impl FanInReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.outcome.is_ok()).count()
    }

    /// Every submitted outcome was drained
    pub fn is_balanced(&self) -> bool {
        self.submitted == self.drained && self.drained as usize == self.outcomes.len()
    }
}

/// Create, write and close one file, folding every failure into the outcome
async fn produce<C: FileCapability>(files: &C, name: &str, payload: &[u8]) -> Outcome {
    debug!(file = name, "fan_in::produce: called");
    let mut handle = match files.create(name).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!(file = name, error = %e, "Create failed");
            return Outcome::failed(e);
        }
    };

    let written = files.write(&mut handle, payload).await;
    let closed = files.close(handle).await;

    match (written, closed) {
        (Err(e), _) => {
            warn!(file = name, error = %e, "Write failed");
            Outcome::failed(e)
        }
        (Ok(n), _) if n != payload.len() => Outcome::failed(format!("short write: {} of {} bytes", n, payload.len())),
        (Ok(_), Err(e)) => {
            warn!(file = name, error = %e, "Close failed");
            Outcome::failed(e)
        }
        (Ok(_), Ok(())) => Outcome::Ok,
    }
}

/// Run one producer per name, draining their outcomes concurrently
pub async fn run<C>(files: Arc<C>, names: &[String], payload: &[u8]) -> Result<FanInReport>
where
    C: FileCapability + 'static,
{
    let n = names.len();
    let aggregator: ResultAggregator<FileOutcome> = ResultAggregator::bounded(n);
    let latch = CountdownLatch::new(n);

    let mut drain = aggregator.drain()?;
    let consumer = tokio::spawn(async move {
        let mut outcomes = Vec::new();
        while let Some(received) = drain.recv().await {
            info!(file = %received.file, outcome = %received.outcome, "Outcome received");
            outcomes.push(received);
        }
        (outcomes, drain.drained())
    });

    let names: Arc<Vec<String>> = Arc::new(names.to_vec());
    let payload: Arc<[u8]> = Arc::from(payload);
    let producers = spawn_indexed(n, |index| {
        let files = files.clone();
        let names = names.clone();
        let payload = payload.clone();
        let aggregator = aggregator.clone();
        let latch = latch.clone();
        async move {
            // Counts down even if the capability panics
            let _done = latch.guard();
            let file = names[index].clone();
            let outcome = produce(&*files, &file, &payload).await;
            aggregator.submit(FileOutcome { file, outcome }).await
        }
    });

    latch.wait().await;
    aggregator.close().await?;

    for (index, submitted) in join_indexed(producers).await? {
        submitted.wrap_err_with(|| format!("Producer {} failed to submit", index))?;
    }
    let (outcomes, drained) = consumer.await?;

    let report = FanInReport {
        outcomes,
        submitted: aggregator.submitted(),
        drained,
    };
    info!(
        producers = n,
        failures = report.failures(),
        "Fan-in scenario finished"
    );
    Ok(report)
}
