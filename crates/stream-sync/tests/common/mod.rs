//! In-memory stand-in for the remote stream service.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stream_api::{
    ApiError, CreateStreamRequest, EncryptionType, StreamApi, StreamDescription, StreamMode,
    StreamStatus,
};
use stream_sync::DesiredSpec;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Describe,
    ListTags,
    Create(CreateStreamRequest),
    UpdateShardCount(i32),
    UpdateRetention { from: i32, to: i32 },
    UpdateEncryption(EncryptionType, String),
    UpdateTags {
        added: BTreeMap<String, String>,
        removed: Vec<String>,
    },
    Delete,
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::Describe | Call::ListTags)
    }
}

struct Remote {
    desc: StreamDescription,
    tags: BTreeMap<String, String>,
    /// Describes left before a transitional status settles.
    countdown: usize,
}

#[derive(Default)]
struct Inner {
    stream: Option<Remote>,
    calls: Vec<Call>,
    settle_after: usize,
    failures: HashMap<&'static str, VecDeque<ApiError>>,
}

/// Fake service. Mutations apply immediately but leave the stream
/// UPDATING (or CREATING/DELETING) for `settle_after` further describes.
#[derive(Clone, Default)]
pub struct FakeStreams {
    inner: Arc<Mutex<Inner>>,
}

pub fn service_error(code: &str) -> ApiError {
    ApiError::Service {
        status: 400,
        code: code.to_string(),
        message: format!("{code} from fake"),
    }
}

pub fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn desired(name: &str, shards: i32) -> DesiredSpec {
    DesiredSpec {
        stream_name: name.to_string(),
        shard_count: shards,
        system_tags: tags(&[("streams.dev/namespace", "default")]),
        ..Default::default()
    }
}

impl FakeStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an ACTIVE stream.
    pub fn with_active_stream(name: &str, shards: i32, retention: i32) -> Self {
        let fake = Self::new();
        {
            let mut inner = fake.inner.lock().unwrap();
            inner.stream = Some(Remote {
                desc: StreamDescription {
                    name: name.to_string(),
                    arn: format!("arn:aws:kinesis:us-west-2:000000000000:stream/{name}"),
                    status: StreamStatus::Active,
                    mode: StreamMode::Provisioned,
                    open_shard_count: shards,
                    retention_period_hours: retention,
                    encryption_type: EncryptionType::None,
                    key_id: None,
                    creation_timestamp: Some(1_718_000_000.0),
                },
                tags: tags(&[("streams.dev/namespace", "default")]),
                countdown: 0,
            });
        }
        fake
    }

    pub fn settle_after(self, describes: usize) -> Self {
        self.inner.lock().unwrap().settle_after = describes;
        self
    }

    pub fn set_status(&self, status: StreamStatus, countdown: usize) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(remote) = inner.stream.as_mut() {
            remote.desc.status = status;
            remote.countdown = countdown;
        }
    }

    pub fn set_tags(&self, tags: BTreeMap<String, String>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(remote) = inner.stream.as_mut() {
            remote.tags = tags;
        }
    }

    pub fn set_encryption(&self, encryption_type: EncryptionType, key_id: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(remote) = inner.stream.as_mut() {
            remote.desc.encryption_type = encryption_type;
            remote.desc.key_id = key_id.map(str::to_string);
        }
    }

    /// Make the next call to `operation` fail with `err`.
    pub fn fail_next(&self, operation: &'static str, err: ApiError) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn snapshot(&self) -> Option<(StreamDescription, BTreeMap<String, String>)> {
        let inner = self.inner.lock().unwrap();
        inner
            .stream
            .as_ref()
            .map(|r| (r.desc.clone(), r.tags.clone()))
    }

    fn begin(&self, call: Call, operation: &'static str) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        match inner.failures.get_mut(operation).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Run `f` against an ACTIVE stream, then mark it UPDATING.
    fn mutate(&self, f: impl FnOnce(&mut Remote)) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let settle_after = inner.settle_after;
        let Some(remote) = inner.stream.as_mut() else {
            return Err(service_error("ResourceNotFoundException"));
        };
        if remote.desc.status != StreamStatus::Active {
            return Err(service_error("ResourceInUseException"));
        }
        f(remote);
        remote.desc.status = StreamStatus::Updating;
        remote.countdown = settle_after;
        Ok(())
    }
}

impl StreamApi for FakeStreams {
    async fn describe(&self, _name: &str) -> Result<Option<StreamDescription>, ApiError> {
        self.begin(Call::Describe, "DescribeStreamSummary")?;
        let mut inner = self.inner.lock().unwrap();
        let Some(remote) = inner.stream.as_mut() else {
            return Ok(None);
        };
        if remote.desc.status != StreamStatus::Active {
            if remote.countdown == 0 {
                if remote.desc.status == StreamStatus::Deleting {
                    inner.stream = None;
                    return Ok(None);
                }
                remote.desc.status = StreamStatus::Active;
            } else {
                remote.countdown -= 1;
            }
        }
        Ok(Some(remote.desc.clone()))
    }

    async fn create(&self, req: &CreateStreamRequest) -> Result<(), ApiError> {
        self.begin(Call::Create(req.clone()), "CreateStream")?;
        let mut inner = self.inner.lock().unwrap();
        if inner.stream.is_some() {
            return Err(service_error("ResourceInUseException"));
        }
        let countdown = inner.settle_after;
        inner.stream = Some(Remote {
            desc: StreamDescription {
                name: req.name.clone(),
                arn: format!("arn:aws:kinesis:us-west-2:000000000000:stream/{}", req.name),
                status: StreamStatus::Creating,
                mode: req.mode,
                open_shard_count: req.shard_count,
                // Retention and encryption are not create parameters.
                retention_period_hours: 24,
                encryption_type: EncryptionType::None,
                key_id: None,
                creation_timestamp: Some(1_718_000_000.0),
            },
            tags: req.tags.clone(),
            countdown,
        });
        Ok(())
    }

    async fn update_shard_count(&self, _name: &str, target: i32) -> Result<(), ApiError> {
        self.begin(Call::UpdateShardCount(target), "UpdateShardCount")?;
        self.mutate(|r| r.desc.open_shard_count = target)
    }

    async fn update_retention(
        &self,
        _name: &str,
        current_hours: i32,
        desired_hours: i32,
    ) -> Result<(), ApiError> {
        self.begin(
            Call::UpdateRetention {
                from: current_hours,
                to: desired_hours,
            },
            "UpdateRetention",
        )?;
        self.mutate(|r| r.desc.retention_period_hours = desired_hours)
    }

    async fn update_encryption(
        &self,
        _name: &str,
        encryption_type: EncryptionType,
        key_id: &str,
    ) -> Result<(), ApiError> {
        self.begin(
            Call::UpdateEncryption(encryption_type, key_id.to_string()),
            "UpdateEncryption",
        )?;
        self.mutate(|r| {
            r.desc.encryption_type = encryption_type;
            r.desc.key_id = match encryption_type {
                EncryptionType::Kms => Some(key_id.to_string()),
                EncryptionType::None => None,
            };
        })
    }

    async fn update_tags(
        &self,
        _name: &str,
        additions: &BTreeMap<String, String>,
        removals: &[String],
    ) -> Result<(), ApiError> {
        self.begin(
            Call::UpdateTags {
                added: additions.clone(),
                removed: removals.to_vec(),
            },
            "UpdateTags",
        )?;
        // Tagging does not change the stream status.
        let mut inner = self.inner.lock().unwrap();
        let Some(remote) = inner.stream.as_mut() else {
            return Err(service_error("ResourceNotFoundException"));
        };
        for key in removals {
            remote.tags.remove(key);
        }
        remote
            .tags
            .extend(additions.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn delete(&self, _name: &str) -> Result<(), ApiError> {
        self.begin(Call::Delete, "DeleteStream")?;
        let mut inner = self.inner.lock().unwrap();
        let countdown = inner.settle_after;
        let Some(remote) = inner.stream.as_mut() else {
            return Err(service_error("ResourceNotFoundException"));
        };
        remote.desc.status = StreamStatus::Deleting;
        remote.countdown = countdown;
        Ok(())
    }

    async fn list_tags(&self, _name: &str) -> Result<BTreeMap<String, String>, ApiError> {
        self.begin(Call::ListTags, "ListTagsForStream")?;
        let inner = self.inner.lock().unwrap();
        match inner.stream.as_ref() {
            Some(remote) => Ok(remote.tags.clone()),
            None => Err(service_error("ResourceNotFoundException")),
        }
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(1)
    }
}
