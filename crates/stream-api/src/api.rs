use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use crate::client::ApiError;
use crate::types::{CreateStreamRequest, EncryptionType, StreamDescription};

/// Interval callers should wait between two observations of a stream that
/// is still transitioning.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Operations the reconciler needs from the remote stream service.
///
/// Implementations must be safe to share across concurrently reconciled
/// resources. `describe` maps "not found" to `Ok(None)`; every other call
/// surfaces it as an [`ApiError`] with [`ApiError::is_not_found`] set.
pub trait StreamApi: Send + Sync {
    fn describe(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<StreamDescription>, ApiError>> + Send;

    /// Start creating a stream. Returns once the request is accepted; the
    /// stream is CREATING until a later `describe` says otherwise.
    fn create(&self, req: &CreateStreamRequest)
    -> impl Future<Output = Result<(), ApiError>> + Send;

    fn update_shard_count(
        &self,
        name: &str,
        target: i32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Move retention from `current_hours` to `desired_hours`. The remote
    /// service exposes increase and decrease as separate operations.
    fn update_retention(
        &self,
        name: &str,
        current_hours: i32,
        desired_hours: i32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Start (`Kms`) or stop (`None`) server-side encryption. When stopping,
    /// `key_id` is the key currently in use.
    fn update_encryption(
        &self,
        name: &str,
        encryption_type: EncryptionType,
        key_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Remove `removals` then add or overwrite `additions`.
    fn update_tags(
        &self,
        name: &str,
        additions: &BTreeMap<String, String>,
        removals: &[String],
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn delete(&self, name: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_tags(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, String>, ApiError>> + Send;

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }
}
