//! racefree - race-free concurrency primitives
//!
//! Four independent primitives, each the corrected form of a classic data
//! race between tasks that share mutable state:
//!
//! - [`registry::GuardedRegistry`] - key/value map behind a reader/writer lock
//! - [`heartbeat::HeartbeatMonitor`] - watchdog over an atomically stored
//!   timestamp
//! - [`aggregator::ResultAggregator`] - fan-in of per-producer outcomes to a
//!   single consumer
//! - [`rendezvous::rendezvous`] - synchronous handoff whose receive orders
//!   the close after the send
//!
//! Supporting pieces: [`latch::CountdownLatch`] to know when every producer
//! is done, [`spawn::spawn_indexed`] to hand each task its own index, and
//! [`scenarios`] composing all of them into runnable demonstrations.
//!
//! # Example
//!
//! ```ignore
//! use racefree::{CountdownLatch, Outcome, ResultAggregator};
//!
//! let aggregator = ResultAggregator::bounded(2);
//! let latch = CountdownLatch::new(2);
//! let mut drain = aggregator.drain()?;
//!
//! for outcome in [Outcome::Ok, Outcome::failed("disk full")] {
//!     let (aggregator, latch) = (aggregator.clone(), latch.clone());
//!     tokio::spawn(async move {
//!         aggregator.submit(outcome).await?;
//!         latch.count_down();
//!         Ok::<_, racefree::SyncError>(())
//!     });
//! }
//!
//! latch.wait().await;
//! aggregator.close().await?;
//! while let Some(outcome) = drain.recv().await {
//!     println!("{}", outcome);
//! }
//! ```

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod latch;
pub mod registry;
pub mod rendezvous;
pub mod scenarios;
pub mod spawn;

pub use aggregator::{Drain, Outcome, ResultAggregator};
pub use config::Config;
pub use error::{SyncError, SyncResult};
pub use heartbeat::{HeartbeatConfig, HeartbeatMonitor, HeartbeatState};
pub use latch::{CountdownGuard, CountdownLatch};
pub use registry::GuardedRegistry;
pub use rendezvous::{RendezvousReceiver, RendezvousSender, rendezvous};
pub use spawn::{join_indexed, spawn_indexed};
