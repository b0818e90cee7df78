//! Desired-state reconciliation for remote streams.
//!
//! [`compare`] turns a [`DesiredSpec`] and an [`ObservedState`] into
//! field-level deltas, [`engine`] applies them one structural change per
//! cycle, and [`conditions`] projects each [`Outcome`] into the `Synced`
//! and `Ready` conditions.

pub mod compare;
pub mod conditions;
pub mod engine;
mod error;
pub mod lifecycle;
mod model;
mod reconciler;

pub use compare::{Delta, DeltaKind, TagsDelta};
pub use engine::{Cycle, Operation, Outcome, Settings};
pub use error::{CycleError, FatalError, ValidationError};
pub use lifecycle::{Lifecycle, Transition};
pub use model::{DesiredSpec, ObservedState};
pub use reconciler::{ResourceReconciler, StreamReconciler};
