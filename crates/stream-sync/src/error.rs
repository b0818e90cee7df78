use std::time::Duration;

use stream_api::{ApiError, StreamStatus};
use thiserror::Error;

/// The desired spec violates an invariant. Resolved only by a corrected spec.
///
/// The messages are surfaced verbatim in the `Synced` condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the desired shard count must be greater than zero")]
    InvalidShardCount,
    #[error("the desired retention period must be between 24 and 8760 hours")]
    RetentionOutOfRange,
    #[error("KMS encryption type requires a KeyID")]
    MissingKeyId,
    #[error("cannot specify KeyID with NONE encryption type")]
    UnexpectedKeyId,
}

/// The desired spec cannot be reconciled at all without operator action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("the stream name must not be empty")]
    MissingName,
    #[error("streamName is immutable once created")]
    NameChanged { created: String, desired: String },
}

/// Why a reconcile cycle did not reach the synced state.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error("stream {name} is {status}, waiting for it to become ACTIVE")]
    NotReady { name: String, status: StreamStatus },
    #[error("stream {name} does not exist yet")]
    NotCreated { name: String },
    #[error("stream {name} is still being deleted")]
    NotDeleted { name: String },
    #[error("unexpected stream status transition from {from} to {to}")]
    UnexpectedTransition { from: String, to: String },
    #[error("stream {name} has been {status} for longer than {budget:?}")]
    Stalled {
        name: String,
        status: StreamStatus,
        budget: Duration,
    },
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: ApiError,
    },
}

impl CycleError {
    pub fn remote(operation: &'static str, source: ApiError) -> Self {
        Self::Remote { operation, source }
    }

    /// Retrying with the same inputs cannot help; the resource needs a spec
    /// change or operator attention.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Fatal(_) | Self::Stalled { .. } => true,
            Self::Remote { source, .. } => !source.is_retryable() && !source.is_not_found(),
            _ => false,
        }
    }

    /// Transient: the next scheduled cycle may succeed unchanged.
    pub fn is_recoverable(&self) -> bool {
        !self.is_terminal() && !matches!(self, Self::Validation(_))
    }

    /// Short CamelCase reason used in conditions and events.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationFailed",
            Self::Fatal(_) => "Terminal",
            Self::NotReady { .. } | Self::NotCreated { .. } | Self::NotDeleted { .. } => {
                "NotReady"
            }
            Self::UnexpectedTransition { .. } => "UnexpectedTransition",
            Self::Stalled { .. } => "LatencyBudgetExceeded",
            Self::Remote { source, .. } if source.is_retryable() || source.is_not_found() => {
                "RemoteError"
            }
            Self::Remote { .. } => "Terminal",
        }
    }
}
