//! Projection of an [`Outcome`] onto the `Synced` and `Ready` conditions.
//!
//! The two axes are independent: a rejected spec leaves `Ready` reflecting
//! the remote status, and a stream that is still converging is `Ready`
//! but not `Synced`.

use stream_crds::{Condition, condition_types};

use crate::engine::Outcome;

pub mod reasons {
    pub const IN_SYNC: &str = "InSync";
    pub const UPDATES_PENDING: &str = "UpdatesPending";
    pub const STREAM_ACTIVE: &str = "StreamActive";
    pub const STREAM_NOT_ACTIVE: &str = "StreamNotActive";
    pub const STREAM_ABSENT: &str = "StreamAbsent";
}

/// Build the full condition list for `outcome`. Callers replace the
/// previous list wholesale.
pub fn report(outcome: &Outcome, now: &str) -> Vec<Condition> {
    vec![synced(outcome, now), ready(outcome, now)]
}

fn synced(outcome: &Outcome, now: &str) -> Condition {
    if let Some(err) = &outcome.error {
        return Condition::fail(condition_types::SYNCED, err.reason(), &err.to_string(), now);
    }
    if outcome.pending.is_empty() {
        return Condition::ok(
            condition_types::SYNCED,
            reasons::IN_SYNC,
            "stream matches the desired spec",
            now,
        );
    }
    let pending: Vec<&str> = outcome.pending.iter().map(|k| k.as_str()).collect();
    let message = if outcome.applied.is_empty() {
        format!("waiting to apply {}", pending.join(", "))
    } else {
        let applied: Vec<&str> = outcome.applied.iter().map(|op| op.as_str()).collect();
        format!(
            "applied {}; pending {}",
            applied.join(", "),
            pending.join(", ")
        )
    };
    Condition::fail(
        condition_types::SYNCED,
        reasons::UPDATES_PENDING,
        &message,
        now,
    )
}

fn ready(outcome: &Outcome, now: &str) -> Condition {
    match &outcome.observed {
        Some(o) if o.is_active() => Condition::ok(
            condition_types::READY,
            reasons::STREAM_ACTIVE,
            "stream is ACTIVE",
            now,
        ),
        Some(o) => Condition::fail(
            condition_types::READY,
            reasons::STREAM_NOT_ACTIVE,
            &format!("stream is {}", o.stream_status),
            now,
        ),
        None => Condition::fail(
            condition_types::READY,
            reasons::STREAM_ABSENT,
            "stream does not exist",
            now,
        ),
    }
}
