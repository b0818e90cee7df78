mod api;
mod client;
mod kinesis;
mod types;

pub use api::{DEFAULT_POLL_INTERVAL, StreamApi};
pub use client::{ApiError, HttpClient, TARGET_PREFIX};
pub use kinesis::{KinesisClient, MAX_TAGS_PER_CALL};
pub use types::{CreateStreamRequest, EncryptionType, StreamDescription, StreamMode, StreamStatus};
