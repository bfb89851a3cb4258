//! Replica backend contract

use async_trait::async_trait;

use crate::error::Result;
use crate::ops::{OpRequest, OpReply};

/// Uniform operation surface exposed by one storage replica.
///
/// A backend wraps whatever transport reaches the replica; the dispatch
/// engine only sees this contract. Every call returns success with a payload
/// or a typed error; the capability probe (`OpRequest::ProbeLocks`) must fail
/// with an error for which [`crate::Error::is_unsupported`] holds when the
/// replica lacks lock support.
#[async_trait]
pub trait ReplicaBackend: Send + Sync {
    /// Stable replica name, used for registry identity, logs, and errors
    fn name(&self) -> &str;

    /// Execute a single operation against this replica
    async fn call(&self, request: OpRequest) -> Result<OpReply>;

    /// Deliver a parent-up notification to this replica
    async fn notify_parent_up(&self) -> Result<()>;
}
