use std::collections::BTreeMap;

use stream_api::{CreateStreamRequest, EncryptionType, StreamDescription, StreamMode, StreamStatus};
use stream_crds::StreamSpec;

use crate::compare::is_system_tag;

/// User-declared target state for one stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredSpec {
    pub stream_name: String,
    pub shard_count: i32,
    pub mode: StreamMode,
    pub retention_period_hours: Option<i32>,
    /// Unset and the empty string are folded into `NONE`.
    pub encryption_type: EncryptionType,
    /// The empty string is folded into `None`.
    pub key_id: Option<String>,
    /// User-supplied tags. Keys in the reserved namespaces are ignored.
    pub tags: BTreeMap<String, String>,
    /// Controller-owned tags maintained alongside the user tags.
    pub system_tags: BTreeMap<String, String>,
}

impl DesiredSpec {
    pub fn from_spec(spec: &StreamSpec, system_tags: BTreeMap<String, String>) -> Self {
        let encryption_type = match spec.encryption() {
            stream_crds::EncryptionType::None => EncryptionType::None,
            stream_crds::EncryptionType::Kms => EncryptionType::Kms,
        };
        let mode = match spec.stream_mode.unwrap_or_default() {
            stream_crds::StreamMode::Provisioned => StreamMode::Provisioned,
            stream_crds::StreamMode::OnDemand => StreamMode::OnDemand,
        };
        Self {
            stream_name: spec.name.clone(),
            shard_count: spec.shard_count,
            mode,
            retention_period_hours: spec.retention_period_hours,
            encryption_type,
            key_id: spec.key().map(str::to_string),
            tags: spec.tags.clone(),
            system_tags,
        }
    }

    /// Full tag set the controller converges on: user tags plus system tags.
    /// System tags win over user tags with the same key.
    pub fn managed_tags(&self) -> BTreeMap<String, String> {
        let mut tags: BTreeMap<String, String> = self
            .tags
            .iter()
            .filter(|(k, _)| !is_system_tag(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        tags.extend(self.system_tags.clone());
        tags
    }

    /// User tag keys dropped from [`managed_tags`](Self::managed_tags)
    /// because they fall in a reserved namespace.
    pub fn ignored_tags(&self) -> Vec<&str> {
        self.tags
            .keys()
            .map(String::as_str)
            .filter(|k| is_system_tag(k))
            .collect()
    }

    /// Create call for this stream. Retention and encryption converge on
    /// later cycles.
    pub fn create_request(&self) -> CreateStreamRequest {
        CreateStreamRequest {
            name: self.stream_name.clone(),
            shard_count: self.shard_count,
            mode: self.mode,
            tags: self.managed_tags(),
        }
    }
}

/// Last-fetched remote description of a stream. Replaced wholesale on
/// every refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedState {
    pub stream_name: String,
    pub stream_arn: String,
    pub stream_status: StreamStatus,
    pub mode: StreamMode,
    pub open_shard_count: i32,
    pub retention_period_hours: i32,
    pub encryption_type: EncryptionType,
    pub key_id: Option<String>,
    /// Every tag on the stream, system tags included.
    pub tags: BTreeMap<String, String>,
    pub stream_creation_timestamp: Option<f64>,
}

impl ObservedState {
    pub fn new(desc: StreamDescription, tags: BTreeMap<String, String>) -> Self {
        Self {
            stream_name: desc.name,
            stream_arn: desc.arn,
            stream_status: desc.status,
            mode: desc.mode,
            open_shard_count: desc.open_shard_count,
            retention_period_hours: desc.retention_period_hours,
            encryption_type: desc.encryption_type,
            key_id: desc.key_id,
            tags,
            stream_creation_timestamp: desc.creation_timestamp,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream_status == StreamStatus::Active
    }
}
