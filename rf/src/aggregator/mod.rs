//! Fan-in aggregation of producer outcomes
//!
//! Each producer owns its own result and submits it through the
//! [`ResultAggregator`]; a single consumer drains the merged stream. Results
//! are never multiplexed through a shared mutable slot.

mod channel;
mod outcome;

pub use channel::{Drain, ResultAggregator};
pub use outcome::Outcome;
