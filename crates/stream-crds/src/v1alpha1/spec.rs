use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::StreamResourceStatus;
use super::types::*;

/// Lowest retention the stream service accepts, in hours.
pub const MIN_RETENTION_HOURS: i32 = 24;
/// Highest retention the stream service accepts, in hours.
pub const MAX_RETENTION_HOURS: i32 = 8760;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "streams.dev",
    version = "v1alpha1",
    kind = "Stream",
    namespaced,
    status = "StreamResourceStatus",
    shortname = "strm",
    printcolumn = r#"{"name":"Stream","type":"string","jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.streamStatus"}"#,
    printcolumn = r#"{"name":"Shards","type":"integer","jsonPath":".status.openShardCount"}"#,
    printcolumn = r#"{"name":"Synced","type":"string","jsonPath":".status.conditions[?(@.conditionType==\"Synced\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StreamSpec {
    /// Name of the remote stream. Immutable once the stream is created.
    pub name: String,

    /// Number of shards for a provisioned stream. Ignored for on-demand streams.
    #[serde(default = "default_shard_count")]
    pub shard_count: i32,

    /// How long records stay readable, between 24 and 8760 hours. Left to the
    /// service default when unset.
    #[serde(default)]
    pub retention_period_hours: Option<i32>,

    #[serde(default)]
    #[schemars(schema_with = "encryption_type_schema")]
    pub encryption_type: Option<EncryptionType>,

    /// KMS key ARN, alias or id. Required with `KMS`, forbidden otherwise.
    #[serde(default, rename = "keyID")]
    pub key_id: Option<String>,

    /// Capacity mode. Only honoured when the stream is created.
    #[serde(default)]
    pub stream_mode: Option<StreamMode>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_shard_count() -> i32 {
    1
}

impl StreamSpec {
    /// Encryption type with unset folded into `NONE`.
    pub fn encryption(&self) -> EncryptionType {
        self.encryption_type.unwrap_or_default()
    }

    /// Key id with the empty string folded into `None`.
    pub fn key(&self) -> Option<&str> {
        self.key_id.as_deref().filter(|k| !k.is_empty())
    }
}
