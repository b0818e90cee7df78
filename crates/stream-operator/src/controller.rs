use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::events::{Event, EventType, Recorder};
use kube::runtime::watcher;
use kube::{Client, CustomResourceExt, Resource, ResourceExt};
use stream_api::StreamStatus;
use stream_crds::{Stream, StreamResourceStatus, condition_types};
use stream_sync::compare::system_tags;
use stream_sync::{
    Cycle, CycleError, DesiredSpec, Lifecycle, Operation, Outcome, ResourceReconciler,
};
use thiserror::Error;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::context::{Context, Reconciler};
use crate::metrics::{
    increment_mutations, increment_reconcile_total, observe_reconcile_duration,
    set_managed_streams,
};
use crate::server::ServerState;

const FIELD_MANAGER: &str = "stream-operator";

/// Held on every `Stream` until its remote stream is gone.
pub const FINALIZER: &str = "streams.dev/finalizer";

/// Requeue while a change is in flight or the stream is not ACTIVE yet.
pub const REQUEUE_PENDING: Duration = Duration::from_secs(15);
/// Requeue for drift detection once in sync.
pub const REQUEUE_SYNCED: Duration = Duration::from_secs(300);
/// Requeue after a remote or Kubernetes API error.
pub const REQUEUE_ERROR: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),
}

pub fn print_crd() -> Result<()> {
    let crd = Stream::crd();
    let yaml = serde_yaml::to_string(&crd)?;
    println!("{yaml}");
    Ok(())
}

pub async fn run(server_state: ServerState) -> Result<()> {
    let client = Client::try_default().await?;
    let ctx = Arc::new(Context::new(client.clone())?);

    let streams = match ctx.watch_namespace {
        Some(ref ns) => Api::<Stream>::namespaced(client.clone(), ns),
        None => Api::<Stream>::all(client.clone()),
    };

    info!(kind = Reconciler::KIND, "Starting stream controller");
    server_state.set_ready();

    Controller::new(streams, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => info!(?o, "reconciled"),
                Err(e) => error!(%e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

pub async fn reconcile(stream: Arc<Stream>, ctx: Arc<Context>) -> Result<Action, Error> {
    let client = &ctx.client;
    let name = stream.name_any();
    let ns = stream.namespace().unwrap_or_else(|| "default".into());
    let api = Api::<Stream>::namespaced(client.clone(), &ns);

    let recorder = Recorder::new(client.clone(), ctx.reporter.clone());
    let obj_ref = stream.object_ref(&());
    let start_time = std::time::Instant::now();

    if stream.metadata.deletion_timestamp.is_some() {
        return finalize(&api, &stream, &ctx, &recorder, &obj_ref).await;
    }

    if !has_finalizer(&stream) {
        let mut finalizers = stream.metadata.finalizers.clone().unwrap_or_default();
        finalizers.push(FINALIZER.to_string());
        let patch = serde_json::json!({
            "metadata": { "finalizers": finalizers }
        });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(Error::Kube)?;
    }

    let desired = DesiredSpec::from_spec(
        &stream.spec,
        system_tags(&ns, env!("CARGO_PKG_VERSION")),
    );
    let previous = stream.status.as_ref();
    if is_new_generation(previous, stream.metadata.generation) {
        for key in desired.ignored_tags() {
            warn!(%name, %key, "ignoring user tag in reserved namespace");
        }
    }
    let cycle = Cycle {
        desired: &desired,
        created_name: previous.and_then(|s| s.stream_name.as_deref()),
        previous_status: previous.and_then(previous_status),
        unsettled_since: previous.and_then(unsettled_since),
        now: Utc::now(),
    };

    info!(%name, %ns, stream = %desired.stream_name, "reconciling");
    let outcome = ctx.reconciler.sync(&cycle).await;

    let now = chrono_now();
    let status = build_status(previous, &desired, &outcome, stream.metadata.generation, &now);
    patch_status(&api, &name, &status).await?;

    for op in &outcome.applied {
        increment_mutations(op.as_str(), &ns);
    }
    publish_outcome(&recorder, &obj_ref, previous, &desired, &outcome).await?;
    update_managed_gauge(client, ctx.watch_namespace.as_deref()).await;

    let result = result_label(&outcome);
    let duration = start_time.elapsed().as_secs_f64();
    observe_reconcile_duration(result, duration);
    increment_reconcile_total(result);

    info!(
        %name,
        lifecycle = %outcome.lifecycle,
        applied = ?outcome.applied,
        pending = ?outcome.pending,
        result,
        "stream reconciliation complete"
    );
    Ok(next_action(&outcome))
}

/// Delete the remote stream, then release the finalizer once it is gone.
async fn finalize(
    api: &Api<Stream>,
    stream: &Stream,
    ctx: &Context,
    recorder: &Recorder,
    obj_ref: &ObjectReference,
) -> Result<Action, Error> {
    if !has_finalizer(stream) {
        return Ok(Action::await_change());
    }
    let name = stream.name_any();
    let stream_name = stream
        .status
        .as_ref()
        .and_then(|s| s.stream_name.clone())
        .unwrap_or_else(|| stream.spec.name.clone());

    if !stream_name.is_empty() {
        info!(%name, stream = %stream_name, "finalizing stream");
        let outcome = ctx.reconciler.finalize(&stream_name).await;
        for op in &outcome.applied {
            increment_mutations(op.as_str(), &stream.namespace().unwrap_or_default());
        }

        if outcome.lifecycle != Lifecycle::Absent || outcome.error.is_some() {
            let desired = DesiredSpec {
                stream_name: stream_name.clone(),
                ..Default::default()
            };
            let status = build_status(
                stream.status.as_ref(),
                &desired,
                &outcome,
                stream.metadata.generation,
                &chrono_now(),
            );
            patch_status(api, &name, &status).await?;
            increment_reconcile_total(result_label(&outcome));
            return Ok(match outcome.terminal_error() {
                Some(_) => Action::requeue(REQUEUE_ERROR),
                None => Action::requeue(REQUEUE_PENDING),
            });
        }

        recorder
            .publish(
                &Event {
                    type_: EventType::Normal,
                    reason: "StreamDeleted".into(),
                    note: Some(format!("Deleted stream {stream_name}")),
                    action: "Delete".into(),
                    secondary: None,
                },
                obj_ref,
            )
            .await
            .map_err(Error::Kube)?;
    }

    let finalizers: Vec<String> = stream
        .metadata
        .finalizers
        .as_ref()
        .map(|f| f.iter().filter(|x| *x != FINALIZER).cloned().collect())
        .unwrap_or_default();
    let patch = serde_json::json!({
        "metadata": { "finalizers": finalizers }
    });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .map_err(Error::Kube)?;
    increment_reconcile_total("deleted");
    Ok(Action::await_change())
}

fn has_finalizer(stream: &Stream) -> bool {
    stream
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == FINALIZER))
}

/// True on the first cycle for the current spec generation.
fn is_new_generation(status: Option<&StreamResourceStatus>, generation: Option<i64>) -> bool {
    status.map(|s| s.observed_generation) != Some(generation.unwrap_or(0))
}

fn previous_status(status: &StreamResourceStatus) -> Option<StreamStatus> {
    status
        .stream_status
        .as_deref()
        .and_then(|s| StreamStatus::from_str(s).ok())
}

/// Origin of the not-ready latency budget recorded by an earlier cycle.
fn unsettled_since(status: &StreamResourceStatus) -> Option<DateTime<Utc>> {
    let since = status.unsettled_since.as_deref()?;
    DateTime::parse_from_rfc3339(since)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Project an outcome onto the CRD status. Remote fields come from the
/// fresh observation; without one they are cleared only if the stream is
/// known to be absent.
///
/// `unsettledSince` is stamped on the first observation outside ACTIVE and
/// kept until the stream is seen ACTIVE or absent.
pub fn build_status(
    previous: Option<&StreamResourceStatus>,
    desired: &DesiredSpec,
    outcome: &Outcome,
    generation: Option<i64>,
    now: &str,
) -> StreamResourceStatus {
    let mut status = previous.cloned().unwrap_or_default();

    match &outcome.observed {
        Some(o) => {
            status.stream_name = Some(o.stream_name.clone());
            status.stream_arn = Some(o.stream_arn.clone());
            status.stream_status = Some(o.stream_status.to_string());
            status.open_shard_count = o.open_shard_count;
            status.retention_period_hours = o.retention_period_hours;
            status.encryption_type = Some(o.encryption_type.to_string());
            status.key_id = o.key_id.clone();
            if o.is_active() {
                status.unsettled_since = None;
            } else if status.unsettled_since.is_none() {
                status.unsettled_since = Some(now.to_string());
            }
        }
        None if outcome.lifecycle == Lifecycle::Absent => {
            status.unsettled_since = None;
            status.stream_arn = None;
            status.stream_status = None;
            status.open_shard_count = 0;
            status.retention_period_hours = 0;
            status.encryption_type = None;
            status.key_id = None;
        }
        None => {}
    }
    if status.stream_name.is_none() && outcome.applied.contains(&Operation::Create) {
        status.stream_name = Some(desired.stream_name.clone());
    }

    status.observed_generation = generation.unwrap_or(0);
    status.replace_conditions(outcome.conditions(now));
    status
}

async fn patch_status(
    api: &Api<Stream>,
    name: &str,
    status: &StreamResourceStatus,
) -> Result<(), Error> {
    let status_patch = serde_json::json!({
        "apiVersion": "streams.dev/v1alpha1",
        "kind": "Stream",
        "status": status,
    });
    api.patch_status(
        name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(status_patch),
    )
    .await
    .map_err(Error::Kube)?;
    Ok(())
}

async fn publish_outcome(
    recorder: &Recorder,
    obj_ref: &ObjectReference,
    previous: Option<&StreamResourceStatus>,
    desired: &DesiredSpec,
    outcome: &Outcome,
) -> Result<(), Error> {
    let mut events = Vec::new();

    if outcome.applied.contains(&Operation::Create) {
        events.push(Event {
            type_: EventType::Normal,
            reason: "StreamCreated".into(),
            note: Some(format!(
                "Created stream {} with {} shard(s)",
                desired.stream_name, desired.shard_count
            )),
            action: "Create".into(),
            secondary: None,
        });
    }
    let updates: Vec<&str> = outcome
        .applied
        .iter()
        .filter(|op| **op != Operation::Create)
        .map(|op| op.as_str())
        .collect();
    if !updates.is_empty() {
        events.push(Event {
            type_: EventType::Normal,
            reason: "StreamUpdated".into(),
            note: Some(format!("Applied {}", updates.join(", "))),
            action: "Update".into(),
            secondary: None,
        });
    }

    // Only on change, so a rejected spec does not emit one per requeue.
    let previous_message = previous
        .and_then(|s| s.condition(condition_types::SYNCED))
        .map(|c| c.message.as_str());
    match &outcome.error {
        Some(CycleError::Validation(v)) => {
            let message = v.to_string();
            if previous_message != Some(message.as_str()) {
                events.push(Event {
                    type_: EventType::Warning,
                    reason: "ValidationFailed".into(),
                    note: Some(message),
                    action: "Validate".into(),
                    secondary: None,
                });
            }
        }
        Some(
            e @ (CycleError::Fatal(_)
            | CycleError::Stalled { .. }
            | CycleError::UnexpectedTransition { .. }
            | CycleError::Remote { .. }),
        ) => {
            events.push(Event {
                type_: EventType::Warning,
                reason: "ReconcileError".into(),
                note: Some(format!("{}: {e}", e.reason())),
                action: "Reconcile".into(),
                secondary: None,
            });
        }
        _ => {}
    }

    for event in &events {
        recorder
            .publish(event, obj_ref)
            .await
            .map_err(Error::Kube)?;
    }
    Ok(())
}

async fn update_managed_gauge(client: &Client, watch_namespace: Option<&str>) {
    let api = match watch_namespace {
        Some(ns) => Api::<Stream>::namespaced(client.clone(), ns),
        None => Api::<Stream>::all(client.clone()),
    };
    match api.list(&ListParams::default()).await {
        Ok(list) => {
            let mut counts: HashMap<String, i64> = HashMap::new();
            for s in &list.items {
                *counts.entry(s.namespace().unwrap_or_default()).or_default() += 1;
            }
            for (ns, count) in &counts {
                set_managed_streams(ns, *count);
            }
        }
        Err(e) => warn!(error = %e, "failed to list streams for gauge"),
    }
}

fn result_label(outcome: &Outcome) -> &'static str {
    match &outcome.error {
        None if outcome.is_synced() => "synced",
        None => "pending",
        Some(CycleError::Validation(_)) => "invalid",
        Some(e) if e.is_terminal() => "terminal",
        Some(_) => "error",
    }
}

/// Pick the next requeue from the outcome of a cycle.
pub fn next_action(outcome: &Outcome) -> Action {
    match &outcome.error {
        None if outcome.is_synced() => Action::requeue(REQUEUE_SYNCED),
        None => Action::requeue(REQUEUE_PENDING),
        // A corrected spec bumps the generation and triggers a reconcile.
        Some(CycleError::Validation(_)) => Action::requeue(REQUEUE_SYNCED),
        Some(CycleError::Stalled { .. }) => Action::requeue(REQUEUE_SYNCED),
        Some(e) if e.is_terminal() => Action::await_change(),
        Some(
            CycleError::NotReady { .. }
            | CycleError::NotCreated { .. }
            | CycleError::NotDeleted { .. },
        ) => Action::requeue(REQUEUE_PENDING),
        Some(_) => Action::requeue(REQUEUE_ERROR),
    }
}

pub fn error_policy(stream: Arc<Stream>, error: &Error, ctx: Arc<Context>) -> Action {
    increment_reconcile_total("error");
    warn!(%error, "reconciliation failed, requeuing");

    let recorder = Recorder::new(ctx.client.clone(), ctx.reporter.clone());
    let obj_ref = stream.object_ref(&());
    let error_msg = error.to_string();
    tokio::spawn(async move {
        let _ = recorder
            .publish(
                &Event {
                    type_: EventType::Warning,
                    reason: "ReconcileError".into(),
                    note: Some(error_msg),
                    action: "Reconcile".into(),
                    secondary: None,
                },
                &obj_ref,
            )
            .await;
    });

    Action::requeue(REQUEUE_ERROR)
}

fn chrono_now() -> String {
    use chrono::SecondsFormat;
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
