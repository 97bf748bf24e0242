//! Runnable demonstrations composing the primitives
//!
//! Each scenario exercises the race-free counterpart of one classic data
//! race and returns a report the CLI prints and the tests assert on:
//!
//! - [`registry`] - a map written by one task and read by others
//! - [`watchdog`] - a timestamp written by one task and polled by another
//! - [`fan_in`] - several producers reporting results to one consumer
//! - [`loop_capture`] - tasks spawned in a loop, each needing its own index
//! - [`rendezvous`] - closing a channel after a send

mod config;
pub mod fan_in;
pub mod files;
pub mod loop_capture;
pub mod registry;
pub mod rendezvous;
pub mod watchdog;

pub use config::{FanInConfig, LoopCaptureConfig};
pub use fan_in::{FanInReport, FileOutcome};
pub use files::{FileCapability, LocalFiles};
pub use loop_capture::LoopCaptureReport;
pub use registry::RegistryReport;
pub use rendezvous::RendezvousReport;
pub use watchdog::{WatchdogOptions, WatchdogReport};
