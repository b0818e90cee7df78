//! Kubernetes controller for `Stream` resources.

pub mod context;
pub mod controller;
pub mod metrics;
pub mod remote;
pub mod server;
pub mod telemetry;
