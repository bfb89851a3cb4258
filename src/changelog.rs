//! Pending-operation changelog primitives
//!
//! Per-replica markers meaning "this replica may be missing an operation",
//! consumed by an external reconciliation process. This module owns the
//! delta constants and the call contract around write-class dispatches;
//! persistence of the per-file flags is the sink's concern.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::replica::registry::ReplicaSet;

/// Delta marking a replica as possibly behind
pub const PENDING_MARK: i32 = 1;

/// Delta clearing a pending marker
pub const PENDING_CLEAR: i32 = -1;

/// Wire form of a delta: big-endian fixed-width integer
pub fn encode_delta(delta: i32) -> [u8; 4] {
    delta.to_be_bytes()
}

/// Persistence collaborator consuming pending-marker deltas.
///
/// Applying the same delta twice is safe; the delta is a fixed constant,
/// not a running sum consumed directly.
#[async_trait]
pub trait ChangelogSink: Send + Sync {
    /// Apply a pending-marker delta for one replica
    async fn apply(&self, replica_index: usize, delta: i32) -> Result<()>;
}

/// In-process sink keeping per-replica delta totals
pub struct MemoryChangelog {
    counters: Mutex<Vec<i32>>,
}

impl MemoryChangelog {
    /// Create a sink with one counter per replica
    pub fn new(replica_count: usize) -> Self {
        Self {
            counters: Mutex::new(vec![0; replica_count]),
        }
    }

    /// Snapshot of the per-replica totals
    pub fn counters(&self) -> Vec<i32> {
        self.counters.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangelogSink for MemoryChangelog {
    async fn apply(&self, replica_index: usize, delta: i32) -> Result<()> {
        let mut counters = self.counters.lock().unwrap();
        counters[replica_index] += delta;
        Ok(())
    }
}

/// Front-end applying mark/clear deltas around write-class dispatches.
///
/// Deltas are sourced from the registry's per-replica arrays so the sink
/// observes exactly the constants fixed at construction.
pub struct PendingChangelog {
    replicas: Arc<ReplicaSet>,
    sink: Arc<dyn ChangelogSink>,
}

impl PendingChangelog {
    /// Create a changelog front-end over a sink
    pub fn new(replicas: Arc<ReplicaSet>, sink: Arc<dyn ChangelogSink>) -> Self {
        Self { replicas, sink }
    }

    /// Mark one replica as possibly behind
    pub async fn mark_pending(&self, index: usize) -> Result<()> {
        self.sink
            .apply(index, self.replicas.pending_increment(index))
            .await
    }

    /// Clear the pending marker for one replica
    pub async fn clear_pending(&self, index: usize) -> Result<()> {
        self.sink
            .apply(index, self.replicas.pending_decrement(index))
            .await
    }

    /// Mark every replica that is NOT in the dispatch target set.
    ///
    /// Must complete before the write-class operation is issued.
    pub async fn mark_missing(&self, targets: &[usize]) -> Result<()> {
        for index in 0..self.replicas.count() {
            if !targets.contains(&index) {
                debug!("marking replica {} pending", self.replicas.name(index));
                self.mark_pending(index).await?;
            }
        }
        Ok(())
    }

    /// Clear the markers for every targeted replica after the fold completes
    pub async fn clear_targets(&self, targets: &[usize]) -> Result<()> {
        for &index in targets {
            self.clear_pending(index).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::ops::{OpReply, OpRequest};
    use crate::replica::backend::ReplicaBackend;

    struct StubReplica {
        name: String,
    }

    #[async_trait]
    impl ReplicaBackend for StubReplica {
        fn name(&self) -> &str {
            &self.name
        }

        async fn call(&self, _request: OpRequest) -> Result<OpReply> {
            Ok(OpReply::Done)
        }

        async fn notify_parent_up(&self) -> Result<()> {
            Ok(())
        }
    }

    fn replica_set(count: usize) -> Arc<ReplicaSet> {
        let replicas = (0..count)
            .map(|i| {
                Arc::new(StubReplica { name: format!("r{}", i) }) as Arc<dyn ReplicaBackend>
            })
            .collect();
        Arc::new(ReplicaSet::new(replicas, None).unwrap())
    }

    #[test]
    fn delta_wire_form_is_big_endian() {
        assert_eq!(encode_delta(PENDING_MARK), [0, 0, 0, 1]);
        assert_eq!(encode_delta(PENDING_CLEAR), [0xff, 0xff, 0xff, 0xff]);
    }

    #[tokio::test]
    async fn mark_and_clear_apply_fixed_deltas() {
        let replicas = replica_set(2);
        let sink = Arc::new(MemoryChangelog::new(2));
        let changelog = PendingChangelog::new(replicas, Arc::clone(&sink) as Arc<dyn ChangelogSink>);

        changelog.mark_pending(0).await.unwrap();
        changelog.mark_pending(0).await.unwrap();
        changelog.clear_pending(0).await.unwrap();
        changelog.mark_pending(1).await.unwrap();

        assert_eq!(sink.counters(), vec![1, 1]);
    }

    #[tokio::test]
    async fn mark_missing_touches_only_non_targets() {
        let replicas = replica_set(4);
        let sink = Arc::new(MemoryChangelog::new(4));
        let changelog = PendingChangelog::new(replicas, Arc::clone(&sink) as Arc<dyn ChangelogSink>);

        changelog.mark_missing(&[0, 2]).await.unwrap();
        assert_eq!(sink.counters(), vec![0, 1, 0, 1]);

        changelog.clear_targets(&[0, 2]).await.unwrap();
        assert_eq!(sink.counters(), vec![-1, 1, -1, 1]);
    }
}
