use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote lifecycle status of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    Creating,
    Deleting,
    Active,
    Updating,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Creating => "CREATING",
            StreamStatus::Deleting => "DELETING",
            StreamStatus::Active => "ACTIVE",
            StreamStatus::Updating => "UPDATING",
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StreamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATING" => Ok(StreamStatus::Creating),
            "DELETING" => Ok(StreamStatus::Deleting),
            "ACTIVE" => Ok(StreamStatus::Active),
            "UPDATING" => Ok(StreamStatus::Updating),
            other => Err(format!("unknown stream status {other:?}")),
        }
    }
}

/// Server-side encryption applied to stream records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionType {
    #[default]
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "KMS")]
    Kms,
}

impl EncryptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionType::None => "NONE",
            EncryptionType::Kms => "KMS",
        }
    }
}

impl fmt::Display for EncryptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capacity mode. Shard counts only apply to provisioned streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamMode {
    #[default]
    Provisioned,
    OnDemand,
}

/// Latest description of a remote stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescription {
    pub name: String,
    pub arn: String,
    pub status: StreamStatus,
    pub mode: StreamMode,
    pub open_shard_count: i32,
    pub retention_period_hours: i32,
    pub encryption_type: EncryptionType,
    pub key_id: Option<String>,
    /// Seconds since the Unix epoch.
    pub creation_timestamp: Option<f64>,
}

/// Parameters accepted by the remote create call. Retention and encryption
/// are not among them; they are applied by update calls once the stream is
/// ACTIVE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateStreamRequest {
    pub name: String,
    /// Ignored for on-demand streams.
    pub shard_count: i32,
    pub mode: StreamMode,
    pub tags: BTreeMap<String, String>,
}

// --- Wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StreamNameInput<'a> {
    pub stream_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeStreamSummaryOutput {
    pub stream_description_summary: StreamDescriptionSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StreamDescriptionSummary {
    pub stream_name: String,
    #[serde(rename = "StreamARN", default)]
    pub stream_arn: String,
    pub stream_status: StreamStatus,
    #[serde(default)]
    pub stream_mode_details: Option<StreamModeDetails>,
    #[serde(default)]
    pub retention_period_hours: i32,
    #[serde(default)]
    pub stream_creation_timestamp: Option<f64>,
    #[serde(default)]
    pub encryption_type: Option<EncryptionType>,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub open_shard_count: i32,
}

impl From<StreamDescriptionSummary> for StreamDescription {
    fn from(s: StreamDescriptionSummary) -> Self {
        Self {
            name: s.stream_name,
            arn: s.stream_arn,
            status: s.stream_status,
            mode: s.stream_mode_details.map(|d| d.stream_mode).unwrap_or_default(),
            open_shard_count: s.open_shard_count,
            retention_period_hours: s.retention_period_hours,
            encryption_type: s.encryption_type.unwrap_or_default(),
            key_id: s.key_id.filter(|k| !k.is_empty()),
            creation_timestamp: s.stream_creation_timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StreamModeDetails {
    pub stream_mode: StreamMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateStreamInput<'a> {
    pub stream_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<i32>,
    pub stream_mode_details: StreamModeDetails,
    #[serde(skip_serializing_if = "no_tags")]
    pub tags: &'a BTreeMap<String, String>,
}

fn no_tags(tags: &&BTreeMap<String, String>) -> bool {
    tags.is_empty()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UpdateShardCountInput<'a> {
    pub stream_name: &'a str,
    pub target_shard_count: i32,
    pub scaling_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RetentionPeriodInput<'a> {
    pub stream_name: &'a str,
    pub retention_period_hours: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EncryptionInput<'a> {
    pub stream_name: &'a str,
    pub encryption_type: EncryptionType,
    pub key_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AddTagsInput<'a> {
    pub stream_name: &'a str,
    pub tags: BTreeMap<&'a str, &'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RemoveTagsInput<'a> {
    pub stream_name: &'a str,
    pub tag_keys: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListTagsInput<'a> {
    pub stream_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_tag_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListTagsOutput {
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub has_more_tags: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeleteStreamInput<'a> {
    pub stream_name: &'a str,
    pub enforce_consumer_deletion: bool,
}
