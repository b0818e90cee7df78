//! One bounded reconcile cycle per call.
//!
//! The engine never loops on its own beyond a single bounded wait after
//! issuing a create or delete. Repetition is the caller's scheduling loop.

use std::time::Duration;

use chrono::{DateTime, Utc};
use stream_api::{ApiError, StreamApi, StreamStatus};
use stream_crds::Condition;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::compare::{self, Delta, DeltaKind};
use crate::conditions;
use crate::error::{CycleError, FatalError, ValidationError};
use crate::lifecycle::{self, Lifecycle, Transition};
use crate::model::{DesiredSpec, ObservedState};

#[derive(Debug, Clone)]
pub struct Settings {
    /// Longest a single cycle waits for a create or delete to settle.
    pub settle_timeout: Duration,
    /// How long a stream may stay out of ACTIVE before the lifecycle is
    /// reported as failed.
    pub not_ready_budget: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settle_timeout: Duration::from_secs(20),
            not_ready_budget: Duration::from_secs(600),
        }
    }
}

/// Remote mutations the engine can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    UpdateShardCount,
    UpdateRetention,
    UpdateEncryption,
    UpdateTags,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CreateStream",
            Self::UpdateShardCount => "UpdateShardCount",
            Self::UpdateRetention => "UpdateRetention",
            Self::UpdateEncryption => "UpdateEncryption",
            Self::UpdateTags => "UpdateTags",
            Self::Delete => "DeleteStream",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for one [`sync`] cycle.
#[derive(Debug, Clone)]
pub struct Cycle<'a> {
    pub desired: &'a DesiredSpec,
    /// Name the stream was created with, as recorded by an earlier cycle.
    pub created_name: Option<&'a str>,
    /// Remote status recorded by the previous cycle.
    pub previous_status: Option<StreamStatus>,
    /// When the stream was last seen leaving ACTIVE, if it has not returned.
    pub unsettled_since: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

impl<'a> Cycle<'a> {
    pub fn new(desired: &'a DesiredSpec) -> Self {
        Self {
            desired,
            created_name: None,
            previous_status: None,
            unsettled_since: None,
            now: Utc::now(),
        }
    }
}

/// Result of one cycle. Produced fresh every call and never persisted.
#[derive(Debug)]
pub struct Outcome {
    pub lifecycle: Lifecycle,
    /// Latest observation, if the stream exists and could be described.
    pub observed: Option<ObservedState>,
    /// Deltas found this cycle, applied or deferred.
    pub pending: Vec<DeltaKind>,
    /// Remote mutations issued this cycle.
    pub applied: Vec<Operation>,
    pub error: Option<CycleError>,
}

impl Outcome {
    fn settled(observed: Option<ObservedState>) -> Self {
        Self {
            lifecycle: observed.as_ref().map(|o| o.stream_status).into(),
            observed,
            pending: Vec::new(),
            applied: Vec::new(),
            error: None,
        }
    }

    fn failed(lifecycle: Lifecycle, observed: Option<ObservedState>, error: CycleError) -> Self {
        Self {
            lifecycle,
            observed,
            pending: Vec::new(),
            applied: Vec::new(),
            error: Some(error),
        }
    }

    /// True when the cycle found nothing to change and hit no error.
    pub fn is_synced(&self) -> bool {
        self.error.is_none() && self.pending.is_empty()
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        match &self.error {
            Some(CycleError::Validation(v)) => Some(v),
            _ => None,
        }
    }

    /// Error that stops retries until the resource or the remote side changes.
    pub fn terminal_error(&self) -> Option<&CycleError> {
        self.error.as_ref().filter(|e| e.is_terminal())
    }

    /// Error the next scheduled cycle may resolve on its own.
    pub fn recoverable_error(&self) -> Option<&CycleError> {
        self.error.as_ref().filter(|e| e.is_recoverable())
    }

    pub fn conditions(&self, now: &str) -> Vec<Condition> {
        conditions::report(self, now)
    }
}

/// Describe the stream and list its tags. A missing stream is `Ok(None)`.
pub async fn observe<C: StreamApi>(client: &C, name: &str) -> Result<Option<ObservedState>, ApiError> {
    let Some(desc) = client.describe(name).await? else {
        return Ok(None);
    };
    match client.list_tags(name).await {
        Ok(tags) => Ok(Some(ObservedState::new(desc, tags))),
        // Deleted between the two calls.
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Observe until `settled` holds or `settings.settle_timeout` would be
/// exceeded. Never sleeps less than the client's poll interval.
async fn wait_until<C, F>(
    client: &C,
    name: &str,
    settings: &Settings,
    settled: F,
) -> Result<Option<ObservedState>, ApiError>
where
    C: StreamApi,
    F: Fn(Option<&ObservedState>) -> bool,
{
    let deadline = Instant::now() + settings.settle_timeout;
    let interval = client.poll_interval();
    loop {
        let observed = observe(client, name).await?;
        if settled(observed.as_ref()) || Instant::now() + interval > deadline {
            return Ok(observed);
        }
        debug!(stream = %name, ?interval, "waiting for stream to settle");
        tokio::time::sleep(interval).await;
    }
}

/// Create the stream unless it already exists, then wait (bounded) for it
/// to leave CREATING.
pub async fn ensure_created<C: StreamApi>(
    client: &C,
    desired: &DesiredSpec,
    settings: &Settings,
) -> Outcome {
    if let Err(e) = compare::validate(desired) {
        return Outcome::failed(Lifecycle::Absent, None, e.into());
    }
    match observe(client, &desired.stream_name).await {
        Ok(observed) => create_if_absent(client, desired, observed, settings).await,
        Err(e) => Outcome::failed(
            Lifecycle::Absent,
            None,
            CycleError::remote("DescribeStreamSummary", e),
        ),
    }
}

async fn create_if_absent<C: StreamApi>(
    client: &C,
    desired: &DesiredSpec,
    observed: Option<ObservedState>,
    settings: &Settings,
) -> Outcome {
    let name = desired.stream_name.as_str();
    let mut applied = Vec::new();

    match observed {
        Some(o) if o.stream_status != StreamStatus::Creating => return Outcome::settled(Some(o)),
        Some(_) => debug!(stream = %name, "create already in flight"),
        None => match client.create(&desired.create_request()).await {
            Ok(()) => {
                info!(stream = %name, shards = desired.shard_count, "created stream");
                applied.push(Operation::Create);
            }
            // Another create won the race; treat it as in flight.
            Err(e) if e.is_in_use() => debug!(stream = %name, "stream already being created"),
            Err(e) => {
                return Outcome::failed(
                    Lifecycle::Absent,
                    None,
                    CycleError::remote(Operation::Create.as_str(), e),
                );
            }
        },
    }

    let waited = wait_until(client, name, settings, |o| {
        o.is_some_and(|o| o.stream_status != StreamStatus::Creating)
    })
    .await;

    let mut outcome = match waited {
        Ok(Some(o)) if o.stream_status == StreamStatus::Creating => {
            let status = o.stream_status;
            Outcome::failed(
                Lifecycle::Creating,
                Some(o),
                CycleError::NotReady {
                    name: name.to_string(),
                    status,
                },
            )
        }
        Ok(Some(o)) => Outcome::settled(Some(o)),
        // Not visible yet: the service is eventually consistent.
        Ok(None) => Outcome::failed(
            Lifecycle::Creating,
            None,
            CycleError::NotCreated {
                name: name.to_string(),
            },
        ),
        Err(e) => Outcome::failed(
            Lifecycle::Creating,
            None,
            CycleError::remote("DescribeStreamSummary", e),
        ),
    };
    outcome.applied = applied;
    outcome
}

/// Converge an ACTIVE stream towards `desired`.
///
/// At most one structural mutation is issued per call, picked by
/// [`DeltaKind`] priority; a tags change rides along with it. The result
/// reflects a fresh observation taken after the calls.
pub async fn reconcile<C: StreamApi>(
    client: &C,
    desired: &DesiredSpec,
    observed: ObservedState,
) -> Outcome {
    let name = desired.stream_name.as_str();

    if !observed.is_active() {
        let status = observed.stream_status;
        return Outcome::failed(
            status.into(),
            Some(observed),
            CycleError::NotReady {
                name: name.to_string(),
                status,
            },
        );
    }

    let deltas = match compare::diff(desired, &observed) {
        Ok(d) => d,
        Err(e) => {
            warn!(stream = %name, error = %e, "desired spec rejected");
            return Outcome::failed(Lifecycle::Active, Some(observed), e.into());
        }
    };
    if deltas.is_empty() {
        return Outcome::settled(Some(observed));
    }

    let pending: Vec<DeltaKind> = deltas.iter().map(Delta::kind).collect();
    let structural = deltas.iter().find(|d| d.kind().is_structural());
    let tags = deltas.iter().find(|d| d.kind() == DeltaKind::TagsChange);
    info!(stream = %name, ?pending, "applying changes");

    let mut applied = Vec::new();
    for delta in structural.into_iter().chain(tags) {
        let (op, res) = apply(client, name, delta).await;
        if let Err(e) = res {
            return remote_failure(observed, pending, applied, op, e);
        }
        applied.push(op);
    }

    // Refresh for status only; the next cycle diffs its own observation.
    let observed = match observe(client, name).await {
        Ok(fresh) => fresh,
        Err(e) => {
            warn!(stream = %name, error = %e, "refresh after update failed");
            Some(observed)
        }
    };
    Outcome {
        lifecycle: observed.as_ref().map(|o| o.stream_status).into(),
        observed,
        pending,
        applied,
        error: None,
    }
}

async fn apply<C: StreamApi>(
    client: &C,
    name: &str,
    delta: &Delta,
) -> (Operation, Result<(), ApiError>) {
    match delta {
        Delta::ShardCount { from, to } => {
            info!(stream = %name, from, to, "updating shard count");
            (
                Operation::UpdateShardCount,
                client.update_shard_count(name, *to).await,
            )
        }
        Delta::Retention { from, to } => {
            info!(stream = %name, from, to, "updating retention period");
            (
                Operation::UpdateRetention,
                client.update_retention(name, *from, *to).await,
            )
        }
        Delta::Encryption {
            encryption_type,
            key_id,
        } => {
            info!(stream = %name, %encryption_type, "updating encryption");
            (
                Operation::UpdateEncryption,
                client.update_encryption(name, *encryption_type, key_id).await,
            )
        }
        Delta::Tags(t) => (
            Operation::UpdateTags,
            client.update_tags(name, &t.added_or_updated, &t.removed).await,
        ),
    }
}

/// A mutation failed. Not-found means the stream vanished under us; it is
/// re-observed next cycle rather than treated as fatal.
fn remote_failure(
    observed: ObservedState,
    pending: Vec<DeltaKind>,
    applied: Vec<Operation>,
    op: Operation,
    e: ApiError,
) -> Outcome {
    warn!(stream = %observed.stream_name, operation = %op, error = %e, "update failed");
    let (lifecycle, observed) = if e.is_not_found() {
        (Lifecycle::Absent, None)
    } else {
        (Lifecycle::Active, Some(observed))
    };
    Outcome {
        lifecycle,
        observed,
        pending,
        applied,
        error: Some(CycleError::remote(op.as_str(), e)),
    }
}

/// Delete the stream once and wait (bounded) for it to disappear. A stream
/// that is already gone is success.
pub async fn ensure_deleted<C: StreamApi>(client: &C, name: &str, settings: &Settings) -> Outcome {
    let observed = match observe(client, name).await {
        Ok(None) => return Outcome::settled(None),
        Ok(Some(o)) => o,
        Err(e) => {
            return Outcome::failed(
                Lifecycle::Deleting,
                None,
                CycleError::remote("DescribeStreamSummary", e),
            );
        }
    };

    let mut applied = Vec::new();
    if observed.stream_status != StreamStatus::Deleting {
        match client.delete(name).await {
            Ok(()) => {
                info!(stream = %name, "deleting stream");
                applied.push(Operation::Delete);
            }
            Err(e) if e.is_not_found() => return Outcome::settled(None),
            Err(e) => {
                let lifecycle = observed.stream_status.into();
                let error = if e.is_in_use() {
                    CycleError::NotReady {
                        name: name.to_string(),
                        status: observed.stream_status,
                    }
                } else {
                    CycleError::remote(Operation::Delete.as_str(), e)
                };
                return Outcome::failed(lifecycle, Some(observed), error);
            }
        }
    }

    let mut outcome = match wait_until(client, name, settings, |o| o.is_none()).await {
        Ok(None) => Outcome::settled(None),
        Ok(Some(o)) => Outcome::failed(
            Lifecycle::Deleting,
            Some(o),
            CycleError::NotDeleted {
                name: name.to_string(),
            },
        ),
        Err(e) => Outcome::failed(
            Lifecycle::Deleting,
            None,
            CycleError::remote("DescribeStreamSummary", e),
        ),
    };
    outcome.applied = applied;
    outcome
}

/// Run one full cycle: identity check, fresh observation, create if absent,
/// transition check, validation and at most one structural update.
pub async fn sync<C: StreamApi>(client: &C, cycle: &Cycle<'_>, settings: &Settings) -> Outcome {
    let desired = cycle.desired;
    let name = desired.stream_name.as_str();
    let previous: Lifecycle = cycle.previous_status.into();

    if name.is_empty() {
        return Outcome::failed(Lifecycle::Failed, None, FatalError::MissingName.into());
    }
    if let Some(created) = cycle.created_name
        && created != name
    {
        return Outcome::failed(
            Lifecycle::Failed,
            None,
            FatalError::NameChanged {
                created: created.to_string(),
                desired: name.to_string(),
            }
            .into(),
        );
    }

    let observed = match observe(client, name).await {
        Ok(o) => o,
        Err(e) => {
            return Outcome::failed(previous, None, CycleError::remote("DescribeStreamSummary", e));
        }
    };
    let current = observed.as_ref().map(|o| o.stream_status);

    if let Err(e) = compare::validate(desired) {
        warn!(stream = %name, error = %e, "desired spec rejected");
        return Outcome::failed(current.into(), observed, e.into());
    }

    if let Some(status) = current
        && status != StreamStatus::Active
        && lifecycle::exceeds_budget(cycle.unsettled_since, cycle.now, settings.not_ready_budget)
    {
        warn!(stream = %name, %status, "stream exceeded its latency budget");
        return Outcome::failed(
            Lifecycle::Failed,
            observed,
            CycleError::Stalled {
                name: name.to_string(),
                status,
                budget: settings.not_ready_budget,
            },
        );
    }

    if lifecycle::check(cycle.previous_status, current) == Transition::Unexpected {
        let from = cycle
            .previous_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "absent".into());
        let to = current
            .map(|s| s.to_string())
            .unwrap_or_else(|| "absent".into());
        warn!(stream = %name, %from, %to, "unexpected status transition");
        return Outcome::failed(
            current.into(),
            observed,
            CycleError::UnexpectedTransition { from, to },
        );
    }

    match current {
        None | Some(StreamStatus::Creating) => {
            let created = create_if_absent(client, desired, observed, settings).await;
            match created.observed {
                Some(o) if created.error.is_none() => {
                    let mut outcome = reconcile(client, desired, o).await;
                    let mut applied = created.applied;
                    applied.append(&mut outcome.applied);
                    outcome.applied = applied;
                    outcome
                }
                _ => created,
            }
        }
        Some(StreamStatus::Active) => match observed {
            Some(o) => reconcile(client, desired, o).await,
            None => Outcome::settled(None),
        },
        Some(status) => Outcome::failed(
            status.into(),
            observed,
            CycleError::NotReady {
                name: name.to_string(),
                status,
            },
        ),
    }
}
