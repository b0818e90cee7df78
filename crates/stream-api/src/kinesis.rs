use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::api::{DEFAULT_POLL_INTERVAL, StreamApi};
use crate::client::{ApiError, HttpClient};
use crate::types::*;

/// Upper bound on tags per AddTagsToStream / RemoveTagsFromStream call.
pub const MAX_TAGS_PER_CALL: usize = 10;

/// Client for the Kinesis Data Streams JSON API.
#[derive(Debug, Clone)]
pub struct KinesisClient {
    http: HttpClient,
    poll_interval: Duration,
}

impl KinesisClient {
    pub fn new(endpoint: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http: HttpClient::new(endpoint)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override how often transitioning streams are re-described.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl StreamApi for KinesisClient {
    async fn describe(&self, name: &str) -> Result<Option<StreamDescription>, ApiError> {
        let out: Result<DescribeStreamSummaryOutput, ApiError> = self
            .http
            .call(
                "DescribeStreamSummary",
                &StreamNameInput { stream_name: name },
            )
            .await;
        match out {
            Ok(out) => Ok(Some(out.stream_description_summary.into())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, req: &CreateStreamRequest) -> Result<(), ApiError> {
        let shard_count = match req.mode {
            StreamMode::Provisioned => Some(req.shard_count),
            StreamMode::OnDemand => None,
        };
        self.http
            .call_unit(
                "CreateStream",
                &CreateStreamInput {
                    stream_name: &req.name,
                    shard_count,
                    stream_mode_details: StreamModeDetails {
                        stream_mode: req.mode,
                    },
                    tags: &req.tags,
                },
            )
            .await
    }

    async fn update_shard_count(&self, name: &str, target: i32) -> Result<(), ApiError> {
        self.http
            .call_unit(
                "UpdateShardCount",
                &UpdateShardCountInput {
                    stream_name: name,
                    target_shard_count: target,
                    scaling_type: "UNIFORM_SCALING",
                },
            )
            .await
    }

    async fn update_retention(
        &self,
        name: &str,
        current_hours: i32,
        desired_hours: i32,
    ) -> Result<(), ApiError> {
        let operation = match desired_hours.cmp(&current_hours) {
            std::cmp::Ordering::Greater => "IncreaseStreamRetentionPeriod",
            std::cmp::Ordering::Less => "DecreaseStreamRetentionPeriod",
            std::cmp::Ordering::Equal => return Ok(()),
        };
        self.http
            .call_unit(
                operation,
                &RetentionPeriodInput {
                    stream_name: name,
                    retention_period_hours: desired_hours,
                },
            )
            .await
    }

    async fn update_encryption(
        &self,
        name: &str,
        encryption_type: EncryptionType,
        key_id: &str,
    ) -> Result<(), ApiError> {
        // Both operations name the KMS key; stopping names the key in use.
        let operation = match encryption_type {
            EncryptionType::Kms => "StartStreamEncryption",
            EncryptionType::None => "StopStreamEncryption",
        };
        self.http
            .call_unit(
                operation,
                &EncryptionInput {
                    stream_name: name,
                    encryption_type: EncryptionType::Kms,
                    key_id,
                },
            )
            .await
    }

    async fn update_tags(
        &self,
        name: &str,
        additions: &BTreeMap<String, String>,
        removals: &[String],
    ) -> Result<(), ApiError> {
        for keys in removals.chunks(MAX_TAGS_PER_CALL) {
            debug!(stream = %name, count = keys.len(), "removing tags");
            self.http
                .call_unit(
                    "RemoveTagsFromStream",
                    &RemoveTagsInput {
                        stream_name: name,
                        tag_keys: keys,
                    },
                )
                .await?;
        }

        let pairs: Vec<(&str, &str)> = additions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        for batch in pairs.chunks(MAX_TAGS_PER_CALL) {
            debug!(stream = %name, count = batch.len(), "adding tags");
            self.http
                .call_unit(
                    "AddTagsToStream",
                    &AddTagsInput {
                        stream_name: name,
                        tags: batch.iter().copied().collect(),
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.http
            .call_unit(
                "DeleteStream",
                &DeleteStreamInput {
                    stream_name: name,
                    enforce_consumer_deletion: false,
                },
            )
            .await
    }

    async fn list_tags(&self, name: &str) -> Result<BTreeMap<String, String>, ApiError> {
        let mut tags = BTreeMap::new();
        let mut start_key: Option<String> = None;
        loop {
            let page: ListTagsOutput = self
                .http
                .call(
                    "ListTagsForStream",
                    &ListTagsInput {
                        stream_name: name,
                        exclusive_start_tag_key: start_key.as_deref(),
                    },
                )
                .await?;
            let last_key = page.tags.last().map(|t| t.key.clone());
            for tag in page.tags {
                tags.insert(tag.key, tag.value.unwrap_or_default());
            }
            match (page.has_more_tags, last_key) {
                (true, Some(key)) => start_key = Some(key),
                _ => break,
            }
        }
        Ok(tags)
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
