//! HeartbeatMonitor implementation

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::error::{SyncError, SyncResult};

/// Liveness state: `Alive -> Stale -> Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeartbeatState {
    Alive,
    /// Staleness detected, termination callback running
    Stale,
    /// Terminal; the monitor never resumes
    Terminated,
}

impl HeartbeatState {
    fn as_u8(self) -> u8 {
        match self {
            HeartbeatState::Alive => 0,
            HeartbeatState::Stale => 1,
            HeartbeatState::Terminated => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => HeartbeatState::Alive,
            1 => HeartbeatState::Stale,
            _ => HeartbeatState::Terminated,
        }
    }
}

struct Inner {
    /// Monotonic origin; timestamps are nanoseconds since this instant
    origin: Instant,

    /// Last keep-alive, nanoseconds since `origin`
    last_seen_nanos: AtomicU64,

    state: AtomicU8,

    checker_started: AtomicBool,
}

/// Liveness tracker shared between the monitored entity and its checker
///
/// Cloning is cheap; every clone observes the same timestamp and state.
/// Creating the monitor counts as the first keep-alive.
#[derive(Clone)]
pub struct HeartbeatMonitor {
    inner: Arc<Inner>,
}

impl HeartbeatMonitor {
    /// Create a monitor whose last-seen timestamp is now
    pub fn new() -> Self {
        debug!("HeartbeatMonitor::new: called");
        Self {
            inner: Arc::new(Inner {
                origin: Instant::now(),
                last_seen_nanos: AtomicU64::new(0),
                state: AtomicU8::new(HeartbeatState::Alive.as_u8()),
                checker_started: AtomicBool::new(false),
            }),
        }
    }

    fn now_nanos(&self) -> u64 {
        u64::try_from(self.inner.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Record that the monitored entity is alive
    ///
    /// A single atomic store; safe to call from any task at any time. Calls
    /// after termination are recorded but do not revive the monitor.
    pub fn keep_alive(&self) {
        let now = self.now_nanos();
        trace!(now_nanos = now, "HeartbeatMonitor::keep_alive: called");
        self.inner.last_seen_nanos.store(now, Ordering::Release);
    }

    /// Time elapsed since the last keep-alive
    pub fn last_seen(&self) -> Duration {
        let last = self.inner.last_seen_nanos.load(Ordering::Acquire);
        Duration::from_nanos(self.now_nanos().saturating_sub(last))
    }

    /// Returns `true` if no keep-alive arrived within `threshold`
    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.last_seen() > threshold
    }

    /// Current liveness state
    pub fn state(&self) -> HeartbeatState {
        HeartbeatState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: HeartbeatState) {
        self.inner.state.store(state.as_u8(), Ordering::Release);
    }

    /// Spawn the periodic checker
    ///
    /// Every `interval` the checker compares the last keep-alive against
    /// `threshold`. On the first stale check it invokes `on_terminate` once,
    /// moves to [`HeartbeatState::Terminated`] and exits. Only one checker
    /// may be started per monitor.
    pub fn start_checking<F>(
        &self,
        interval: Duration,
        threshold: Duration,
        on_terminate: F,
    ) -> SyncResult<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        debug!(?interval, ?threshold, "HeartbeatMonitor::start_checking: called");
        if interval.is_zero() {
            return Err(SyncError::usage("heartbeat check interval must be non-zero"));
        }
        if self.inner.checker_started.swap(true, Ordering::AcqRel) {
            return Err(SyncError::usage("heartbeat checker already started"));
        }

        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            monitor.run_checker(interval, threshold).await;
            monitor.terminate(threshold, on_terminate);
        });
        info!(?interval, ?threshold, "Heartbeat checker started");
        Ok(handle)
    }

    /// Tick until a stale check is observed
    async fn run_checker(&self, interval: Duration, threshold: Duration) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let last_seen = self.last_seen();
            if last_seen > threshold {
                warn!(?last_seen, ?threshold, "Heartbeat stale");
                self.set_state(HeartbeatState::Stale);
                return;
            }
            debug!(?last_seen, "HeartbeatMonitor::run_checker: alive");
        }
    }

    fn terminate<F>(&self, threshold: Duration, on_terminate: F)
    where
        F: FnOnce(),
    {
        error!(?threshold, "No keep-alives within threshold, terminating");
        on_terminate();
        self.set_state(HeartbeatState::Terminated);
    }
}

impl fmt::Debug for HeartbeatMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatMonitor")
            .field("state", &self.state())
            .field("last_seen", &self.last_seen())
            .finish()
    }
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::new()
    }
}
