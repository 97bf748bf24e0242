//! Watchdog scenario: a heartbeat checker watching a monitored task

use std::time::Duration;

use eyre::Result;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::heartbeat::{HeartbeatConfig, HeartbeatMonitor, HeartbeatState};

/// How the monitored side behaves
#[derive(Debug, Clone)]
pub struct WatchdogOptions {
    /// Send keep-alives every half interval
    pub keep_alive: bool,

    /// How long to observe before giving up on a termination
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchdogReport {
    pub terminated: bool,

    /// Time from start to the termination callback
    pub fired_after: Option<Duration>,

    pub final_state: HeartbeatState,
}

/// Watch a (possibly silent) task for up to `options.duration`
///
/// `on_terminate` runs when the checker declares the task dead. It may end
/// the process, in which case this never returns.
pub async fn run<F>(config: &HeartbeatConfig, options: &WatchdogOptions, on_terminate: F) -> Result<WatchdogReport>
where
    F: FnOnce() + Send + 'static,
{
    let monitor = HeartbeatMonitor::new();
    let started = Instant::now();
    let (fired_tx, fired_rx) = oneshot::channel();

    let checker = monitor.start_checking(config.interval(), config.threshold(), move || {
        let _ = fired_tx.send(Instant::now());
        on_terminate();
    })?;

    let beater = options.keep_alive.then(|| {
        let monitor = monitor.clone();
        let period = config.interval() / 2;
        tokio::spawn(async move {
            loop {
                monitor.keep_alive();
                tokio::time::sleep(period).await;
            }
        })
    });

    let fired_at = tokio::select! {
        fired = fired_rx => fired.ok(),
        _ = tokio::time::sleep(options.duration) => None,
    };

    if let Some(beater) = beater {
        beater.abort();
    }
    if fired_at.is_some() {
        checker.await?;
    } else {
        debug!("watchdog: observation window elapsed, stopping checker");
        checker.abort();
    }

    let report = WatchdogReport {
        terminated: fired_at.is_some(),
        fired_after: fired_at.map(|at| at - started),
        final_state: monitor.state(),
    };
    info!(terminated = report.terminated, ?report.fired_after, "Watchdog scenario finished");
    Ok(report)
}
