//! [`StreamApi`] wrapper that records per-call metrics.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use stream_api::{ApiError, CreateStreamRequest, EncryptionType, StreamApi, StreamDescription};
use tracing::debug;

use crate::metrics::{increment_api_calls, observe_api_call_duration};

/// Records the operation, outcome and latency of every call to the inner
/// client.
#[derive(Debug, Clone)]
pub struct InstrumentedStreams<C> {
    inner: C,
}

impl<C: StreamApi> InstrumentedStreams<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

fn record<T>(operation: &str, started: Instant, res: Result<T, ApiError>) -> Result<T, ApiError> {
    let outcome = match &res {
        Ok(_) => "success",
        Err(e) if e.is_not_found() => "not_found",
        Err(e) if e.is_retryable() => "retryable",
        Err(_) => "error",
    };
    let elapsed = started.elapsed().as_secs_f64();
    debug!(operation, outcome, elapsed, "stream api call");
    increment_api_calls(operation, outcome);
    observe_api_call_duration(operation, elapsed);
    res
}

impl<C: StreamApi> StreamApi for InstrumentedStreams<C> {
    async fn describe(&self, name: &str) -> Result<Option<StreamDescription>, ApiError> {
        let started = Instant::now();
        record(
            "DescribeStreamSummary",
            started,
            self.inner.describe(name).await,
        )
    }

    async fn create(&self, req: &CreateStreamRequest) -> Result<(), ApiError> {
        let started = Instant::now();
        record("CreateStream", started, self.inner.create(req).await)
    }

    async fn update_shard_count(&self, name: &str, target: i32) -> Result<(), ApiError> {
        let started = Instant::now();
        record(
            "UpdateShardCount",
            started,
            self.inner.update_shard_count(name, target).await,
        )
    }

    async fn update_retention(
        &self,
        name: &str,
        current_hours: i32,
        desired_hours: i32,
    ) -> Result<(), ApiError> {
        let operation = if desired_hours > current_hours {
            "IncreaseStreamRetentionPeriod"
        } else {
            "DecreaseStreamRetentionPeriod"
        };
        let started = Instant::now();
        record(
            operation,
            started,
            self.inner
                .update_retention(name, current_hours, desired_hours)
                .await,
        )
    }

    async fn update_encryption(
        &self,
        name: &str,
        encryption_type: EncryptionType,
        key_id: &str,
    ) -> Result<(), ApiError> {
        let operation = match encryption_type {
            EncryptionType::Kms => "StartStreamEncryption",
            EncryptionType::None => "StopStreamEncryption",
        };
        let started = Instant::now();
        record(
            operation,
            started,
            self.inner
                .update_encryption(name, encryption_type, key_id)
                .await,
        )
    }

    async fn update_tags(
        &self,
        name: &str,
        additions: &BTreeMap<String, String>,
        removals: &[String],
    ) -> Result<(), ApiError> {
        let started = Instant::now();
        record(
            "UpdateTags",
            started,
            self.inner.update_tags(name, additions, removals).await,
        )
    }

    async fn delete(&self, name: &str) -> Result<(), ApiError> {
        let started = Instant::now();
        record("DeleteStream", started, self.inner.delete(name).await)
    }

    async fn list_tags(&self, name: &str) -> Result<BTreeMap<String, String>, ApiError> {
        let started = Instant::now();
        record("ListTagsForStream", started, self.inner.list_tags(name).await)
    }

    fn poll_interval(&self) -> Duration {
        self.inner.poll_interval()
    }
}
