//! Producer outcome type

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of one producer's unit of work
///
/// A failure is data: it travels through the aggregator like a success and
/// never aborts other producers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Failed(String),
}

impl Outcome {
    /// Build a failed outcome from any displayable error
    pub fn failed(reason: impl fmt::Display) -> Self {
        Outcome::Failed(reason.to_string())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    /// The failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok => None,
            Outcome::Failed(reason) => Some(reason),
        }
    }
}

impl<E: fmt::Display> From<Result<(), E>> for Outcome {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Outcome::Ok,
            Err(e) => Outcome::failed(e),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => write!(f, "ok"),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
