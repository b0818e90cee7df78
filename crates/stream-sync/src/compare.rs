//! Field-level comparison of desired and observed stream state.

use std::collections::BTreeMap;

use stream_api::{EncryptionType, StreamMode};
use stream_crds::{MAX_RETENTION_HOURS, MIN_RETENTION_HOURS};

use crate::error::ValidationError;
use crate::model::{DesiredSpec, ObservedState};

/// Prefix of the tag keys owned by this controller.
pub const SYSTEM_TAG_PREFIX: &str = "streams.dev/";
pub const NAMESPACE_TAG: &str = "streams.dev/namespace";
pub const CONTROLLER_VERSION_TAG: &str = "streams.dev/controller-version";

const RESERVED_TAG_PREFIXES: [&str; 2] = [SYSTEM_TAG_PREFIX, "aws:"];

/// Whether `key` belongs to a reserved namespace the user cannot manage.
pub fn is_system_tag(key: &str) -> bool {
    RESERVED_TAG_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Tags the controller stamps on every stream it creates.
pub fn system_tags(namespace: &str, controller_version: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NAMESPACE_TAG.to_string(), namespace.to_string()),
        (
            CONTROLLER_VERSION_TAG.to_string(),
            controller_version.to_string(),
        ),
    ])
}

/// Mutation kinds in the order they are applied: lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeltaKind {
    ShardCountChange,
    RetentionChange,
    EncryptionChange,
    TagsChange,
}

impl DeltaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShardCountChange => "ShardCountChange",
            Self::RetentionChange => "RetentionChange",
            Self::EncryptionChange => "EncryptionChange",
            Self::TagsChange => "TagsChange",
        }
    }

    /// Structural changes put the stream into UPDATING; the remote service
    /// accepts one at a time.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::TagsChange)
    }
}

impl std::fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagsDelta {
    pub added_or_updated: BTreeMap<String, String>,
    pub removed: Vec<String>,
}

impl TagsDelta {
    pub fn is_empty(&self) -> bool {
        self.added_or_updated.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    ShardCount { from: i32, to: i32 },
    Retention { from: i32, to: i32 },
    /// `key_id` is the desired key when starting encryption and the key
    /// currently in use when stopping it.
    Encryption {
        encryption_type: EncryptionType,
        key_id: String,
    },
    Tags(TagsDelta),
}

impl Delta {
    pub fn kind(&self) -> DeltaKind {
        match self {
            Self::ShardCount { .. } => DeltaKind::ShardCountChange,
            Self::Retention { .. } => DeltaKind::RetentionChange,
            Self::Encryption { .. } => DeltaKind::EncryptionChange,
            Self::Tags(_) => DeltaKind::TagsChange,
        }
    }
}

/// Check the desired spec before any delta is proposed.
pub fn validate(desired: &DesiredSpec) -> Result<(), ValidationError> {
    if desired.mode == StreamMode::Provisioned && desired.shard_count <= 0 {
        return Err(ValidationError::InvalidShardCount);
    }
    if let Some(hours) = desired.retention_period_hours
        && !(MIN_RETENTION_HOURS..=MAX_RETENTION_HOURS).contains(&hours)
    {
        return Err(ValidationError::RetentionOutOfRange);
    }
    match (desired.encryption_type, desired.key_id.as_deref()) {
        (EncryptionType::Kms, None) => Err(ValidationError::MissingKeyId),
        (EncryptionType::None, Some(_)) => Err(ValidationError::UnexpectedKeyId),
        _ => Ok(()),
    }
}

/// Validate, then list every field that differs, ordered by [`DeltaKind`].
///
/// Each field is compared independently; an unchanged field never hides a
/// change in another.
pub fn diff(desired: &DesiredSpec, observed: &ObservedState) -> Result<Vec<Delta>, ValidationError> {
    validate(desired)?;

    let mut deltas = Vec::new();

    if observed.mode == StreamMode::Provisioned
        && desired.mode == StreamMode::Provisioned
        && desired.shard_count != observed.open_shard_count
    {
        deltas.push(Delta::ShardCount {
            from: observed.open_shard_count,
            to: desired.shard_count,
        });
    }

    if let Some(hours) = desired.retention_period_hours
        && hours != observed.retention_period_hours
    {
        deltas.push(Delta::Retention {
            from: observed.retention_period_hours,
            to: hours,
        });
    }

    if let Some(delta) = encryption_delta(desired, observed) {
        deltas.push(delta);
    }

    let tags = tags_delta(&desired.managed_tags(), &observed.tags);
    if !tags.is_empty() {
        deltas.push(Delta::Tags(tags));
    }

    deltas.sort_by_key(Delta::kind);
    Ok(deltas)
}

/// KMS is (re)started whenever the key differs, which also covers a key
/// rotation on an already encrypted stream. Disabling passes the key the
/// stream currently uses.
fn encryption_delta(desired: &DesiredSpec, observed: &ObservedState) -> Option<Delta> {
    match (desired.encryption_type, observed.encryption_type) {
        (EncryptionType::Kms, EncryptionType::Kms) if desired.key_id == observed.key_id => None,
        (EncryptionType::Kms, _) => Some(Delta::Encryption {
            encryption_type: EncryptionType::Kms,
            key_id: desired.key_id.clone().unwrap_or_default(),
        }),
        (EncryptionType::None, EncryptionType::Kms) => Some(Delta::Encryption {
            encryption_type: EncryptionType::None,
            key_id: observed.key_id.clone().unwrap_or_default(),
        }),
        (EncryptionType::None, EncryptionType::None) => None,
    }
}

/// Compute tag additions/updates and removals.
///
/// `desired` is the full managed set (user plus system tags). Observed keys
/// missing from it are removed unless they are in a reserved namespace.
pub fn tags_delta(
    desired: &BTreeMap<String, String>,
    observed: &BTreeMap<String, String>,
) -> TagsDelta {
    let added_or_updated = desired
        .iter()
        .filter(|(k, v)| observed.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let removed = observed
        .keys()
        .filter(|k| !desired.contains_key(*k) && !is_system_tag(k))
        .cloned()
        .collect();
    TagsDelta {
        added_or_updated,
        removed,
    }
}
