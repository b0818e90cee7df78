//! Per-resource lifecycle state machine.
//!
//! ```text
//! Absent -> Creating -> Active <-> Updating
//!                         |
//!                         v
//!                      Deleting -> Absent
//! ```
//!
//! `Failed` is terminal for the cycle and reachable from any state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use stream_api::StreamStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Absent,
    Creating,
    Active,
    Updating,
    Deleting,
    Failed,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "Absent",
            Self::Creating => "Creating",
            Self::Active => "Active",
            Self::Updating => "Updating",
            Self::Deleting => "Deleting",
            Self::Failed => "Failed",
        }
    }
}

impl From<StreamStatus> for Lifecycle {
    fn from(status: StreamStatus) -> Self {
        match status {
            StreamStatus::Creating => Self::Creating,
            StreamStatus::Active => Self::Active,
            StreamStatus::Updating => Self::Updating,
            StreamStatus::Deleting => Self::Deleting,
        }
    }
}

impl From<Option<StreamStatus>> for Lifecycle {
    fn from(status: Option<StreamStatus>) -> Self {
        status.map(Self::from).unwrap_or(Self::Absent)
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Expected,
    Unexpected,
}

/// Classify the move from the status recorded by the previous cycle to the
/// one observed now. `None` means the stream did not exist.
pub fn check(previous: Option<StreamStatus>, current: Option<StreamStatus>) -> Transition {
    use StreamStatus::*;
    let expected = match (previous, current) {
        (a, b) if a == b => true,
        // Fresh resource, or an existing stream adopted by name.
        (None, Some(Creating | Active)) => true,
        (Some(Creating), Some(Active)) => true,
        (Some(Active), Some(Updating | Deleting)) => true,
        (Some(Updating), Some(Active)) => true,
        (Some(Deleting), None) => true,
        _ => false,
    };
    if expected {
        Transition::Expected
    } else {
        Transition::Unexpected
    }
}

/// Whether a stream that has not been ACTIVE since `unsettled_since` has
/// exceeded `budget` at `now`.
pub fn exceeds_budget(
    unsettled_since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    budget: Duration,
) -> bool {
    let Some(since) = unsettled_since else {
        return false;
    };
    match (now - since).to_std() {
        Ok(elapsed) => elapsed > budget,
        // `since` is in the future: clock skew, not a stall.
        Err(_) => false,
    }
}
