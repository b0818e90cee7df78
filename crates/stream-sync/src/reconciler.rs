use std::future::Future;

use stream_api::StreamApi;

use crate::engine::{self, Cycle, Outcome, Settings};

/// A reconciler for one kind of remote resource.
///
/// The controller dispatches on [`ResourceReconciler::KIND`]; each
/// implementation owns the client for its remote service.
pub trait ResourceReconciler: Send + Sync {
    const KIND: &'static str;

    /// Converge the remote resource towards the cycle's desired state.
    fn sync(&self, cycle: &Cycle<'_>) -> impl Future<Output = Outcome> + Send;

    /// Remove the remote resource. Already-absent is success.
    fn finalize(&self, name: &str) -> impl Future<Output = Outcome> + Send;
}

/// Reconciler for `Stream` resources.
#[derive(Debug, Clone)]
pub struct StreamReconciler<C> {
    client: C,
    settings: Settings,
}

impl<C: StreamApi> StreamReconciler<C> {
    pub fn new(client: C, settings: Settings) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl<C: StreamApi> ResourceReconciler for StreamReconciler<C> {
    const KIND: &'static str = "Stream";

    async fn sync(&self, cycle: &Cycle<'_>) -> Outcome {
        engine::sync(&self.client, cycle, &self.settings).await
    }

    async fn finalize(&self, name: &str) -> Outcome {
        engine::ensure_deleted(&self.client, name, &self.settings).await
    }
}
