use std::time::Duration;

use kube::Client;
use kube::runtime::events::Reporter;
use stream_api::{ApiError, KinesisClient};
use stream_sync::{Settings, StreamReconciler};
use tracing::{info, warn};

use crate::remote::InstrumentedStreams;

/// Stream service endpoint used when `STREAM_API_ENDPOINT` is unset.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4567";

pub type Reconciler = StreamReconciler<InstrumentedStreams<KinesisClient>>;

pub struct Context {
    pub client: Client,
    /// Shared by every concurrently reconciled `Stream`.
    pub reconciler: Reconciler,
    /// Reporter identity used when publishing Kubernetes Events.
    pub reporter: Reporter,
    pub watch_namespace: Option<String>,
}

impl Context {
    pub fn new(client: Client) -> Result<Self, ApiError> {
        let endpoint =
            std::env::var("STREAM_API_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.into());
        let settings = Settings {
            settle_timeout: env_secs("SETTLE_TIMEOUT_SECS", Settings::default().settle_timeout),
            not_ready_budget: env_secs(
                "NOT_READY_BUDGET_SECS",
                Settings::default().not_ready_budget,
            ),
        };
        info!(%endpoint, ?settings, "configured stream service");

        let streams = InstrumentedStreams::new(KinesisClient::new(&endpoint)?);
        Ok(Self {
            client,
            reconciler: StreamReconciler::new(streams, settings),
            reporter: Reporter {
                controller: "stream-operator".into(),
                instance: std::env::var("POD_NAME").ok(),
            },
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.is_empty()),
        })
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    parse_secs(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_secs(key: &str, raw: Option<&str>, default: Duration) -> Duration {
    match raw.map(str::parse::<u64>) {
        None => default,
        Some(Ok(secs)) => Duration::from_secs(secs),
        Some(Err(e)) => {
            warn!(%key, error = %e, ?default, "ignoring invalid duration");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_secs_falls_back_to_default() {
        let default = Duration::from_secs(20);
        assert_eq!(parse_secs("X", None, default), default);
        assert_eq!(parse_secs("X", Some("abc"), default), default);
        assert_eq!(parse_secs("X", Some("-5"), default), default);
        assert_eq!(parse_secs("X", Some("45"), default), Duration::from_secs(45));
    }
}
