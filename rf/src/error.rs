//! Errors returned by the synchronization primitives

use thiserror::Error;

/// Errors from primitive operations
///
/// `UsageViolation` is a broken calling protocol (submit after close, close
/// with a send still outstanding, a second consumer). It is surfaced to the
/// caller immediately instead of corrupting state; callers are expected to
/// treat it as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Usage violation: {0}")]
    UsageViolation(String),

    #[error("Channel closed")]
    Closed,
}

impl SyncError {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        SyncError::UsageViolation(msg.into())
    }

    /// Returns `true` for protocol breaches
    pub fn is_usage_violation(&self) -> bool {
        matches!(self, SyncError::UsageViolation(_))
    }
}

/// Result alias for primitive operations
pub type SyncResult<T> = Result<T, SyncError>;
