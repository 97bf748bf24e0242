//! Heartbeat monitor (watchdog) for liveness detection
//!
//! The monitored side calls [`HeartbeatMonitor::keep_alive`]; a checker task
//! started with [`HeartbeatMonitor::start_checking`] polls the last-seen
//! timestamp every interval and fires a termination callback once the
//! entity has gone quiet for longer than the threshold.
//!
//! The timestamp is a single `AtomicU64`, never a plain field and never a
//! lock: the writer stores, the checker loads.

mod config;
mod monitor;

pub use config::HeartbeatConfig;
pub use monitor::{HeartbeatMonitor, HeartbeatState};
