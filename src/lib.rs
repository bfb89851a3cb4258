//! MirrorFS - Replication Dispatch Engine
//!
//! MirrorFS sits between a single logical filesystem namespace and N
//! independent storage replicas, making every namespace operation appear
//! atomic and consistent to callers while physically executing it against
//! some or all of the replicas.
//!
//! # Architecture
//!
//! Incoming operations enter the [`dispatch::Dispatcher`], which consults
//! the [`replica::ReplicaSet`] for the live replica subset, issues one
//! concurrent sub-call per target replica, and folds completions into one
//! outcome through a per-operation aggregation policy. The
//! [`cluster::LivenessTracker`] runs alongside, reacting to replica
//! connect/disconnect notifications and keeping the registry the dispatcher
//! reads in sync.
//!
//! # Features
//!
//! - Fan-out/aggregate execution with first-success, count-complete, and
//!   min-capacity aggregation policies
//! - A single virtual inode-number space over N independent replicas
//! - Replica liveness tracking with lock-capability gating and exactly-once
//!   volume up/down transitions
//! - Pending-operation changelog bookkeeping seeding external self-heal

pub mod config;
pub mod error;
pub mod ops;
pub mod inode;
pub mod replica;
pub mod cluster;
pub mod changelog;
pub mod dispatch;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::changelog::{ChangelogSink, PendingChangelog};
    pub use crate::cluster::{LivenessTracker, ReplicaEvent, VolumeEvent};
    pub use crate::config::Config;
    pub use crate::dispatch::{Dispatcher, Lookup, Namespace};
    pub use crate::error::{Error, Result};
    pub use crate::ops::{OpReply, OpRequest};
    pub use crate::replica::{ReplicaBackend, ReplicaSet};
}
