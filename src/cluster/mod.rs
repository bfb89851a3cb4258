//! Cluster module for MirrorFS
//!
//! Tracks replica liveness, decides aggregate volume up/down transitions,
//! and propagates lifecycle events between the replicas below and the
//! namespace layer above.

pub mod liveness;

pub use liveness::{LivenessTracker, ReplicaEvent, VolumeEvent};
