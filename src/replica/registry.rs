//! Replica set registry
//!
//! Ordered list of replica backends plus the liveness bitmap consulted for
//! every dispatch decision. Liveness reads and writes, and every dependent
//! live-count computation, share one mutex so a replica cannot be selected
//! mid-transition to down.

use std::sync::{Arc, Mutex};

use crate::changelog::{PENDING_CLEAR, PENDING_MARK};
use crate::error::{Error, Result};
use crate::replica::backend::ReplicaBackend;

/// Registry of replica backends for one replicated volume
pub struct ReplicaSet {
    replicas: Vec<Arc<dyn ReplicaBackend>>,
    preferred_read: Option<usize>,
    pending_inc: Vec<i32>,
    pending_dec: Vec<i32>,
    live: Mutex<Vec<bool>>,
}

impl ReplicaSet {
    /// Create a registry over an ordered backend list.
    ///
    /// All replicas start not-live; the liveness tracker marks them up as
    /// connectivity events arrive. `preferred_read` names the replica favored
    /// for single-replica read operations.
    pub fn new(
        replicas: Vec<Arc<dyn ReplicaBackend>>,
        preferred_read: Option<&str>,
    ) -> Result<Self> {
        if replicas.is_empty() {
            return Err(Error::Config("replica set cannot be empty".to_string()));
        }

        for (i, replica) in replicas.iter().enumerate() {
            if replicas[..i].iter().any(|r| r.name() == replica.name()) {
                return Err(Error::Config(format!(
                    "duplicate replica name: {}",
                    replica.name()
                )));
            }
        }

        let preferred_read = match preferred_read {
            Some(name) => Some(
                replicas
                    .iter()
                    .position(|r| r.name() == name)
                    .ok_or_else(|| Error::ReplicaNotFound(name.to_string()))?,
            ),
            None => None,
        };

        let count = replicas.len();
        Ok(Self {
            replicas,
            preferred_read,
            pending_inc: vec![PENDING_MARK; count],
            pending_dec: vec![PENDING_CLEAR; count],
            live: Mutex::new(vec![false; count]),
        })
    }

    /// Number of replicas, fixed at construction
    pub fn count(&self) -> usize {
        self.replicas.len()
    }

    /// Backend handle for a replica index
    pub fn backend(&self, index: usize) -> Arc<dyn ReplicaBackend> {
        Arc::clone(&self.replicas[index])
    }

    /// All backend handles, in index order
    pub fn backends(&self) -> Vec<Arc<dyn ReplicaBackend>> {
        self.replicas.iter().map(Arc::clone).collect()
    }

    /// Replica name for an index
    pub fn name(&self, index: usize) -> &str {
        self.replicas[index].name()
    }

    /// Find a replica's index by its stable name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.replicas.iter().position(|r| r.name() == name)
    }

    /// Check whether one replica is live
    pub fn is_live(&self, index: usize) -> bool {
        self.live.lock().unwrap()[index]
    }

    /// Number of live replicas
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().iter().filter(|up| **up).count()
    }

    /// Mark a replica up or down; returns the live count recomputed from the
    /// whole bitmap under the same lock.
    pub fn set_live(&self, index: usize, up: bool) -> usize {
        let mut live = self.live.lock().unwrap();
        live[index] = up;
        live.iter().filter(|up| **up).count()
    }

    /// First live replica in ascending index order
    pub fn first_live(&self) -> Option<usize> {
        self.live.lock().unwrap().iter().position(|up| *up)
    }

    /// Snapshot of all live replica indices
    pub fn live_set(&self) -> Vec<usize> {
        self.live
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, up)| **up)
            .map(|(i, _)| i)
            .collect()
    }

    /// Replica serving single-replica reads: the preferred read replica when
    /// it is live, otherwise the first live replica.
    pub fn read_replica(&self) -> Option<usize> {
        let live = self.live.lock().unwrap();
        match self.preferred_read {
            Some(preferred) if live[preferred] => Some(preferred),
            _ => live.iter().position(|up| *up),
        }
    }

    /// Configured preferred read replica, if any
    pub fn preferred_read(&self) -> Option<usize> {
        self.preferred_read
    }

    /// Changelog delta marking a replica as possibly behind
    pub fn pending_increment(&self, index: usize) -> i32 {
        self.pending_inc[index]
    }

    /// Changelog delta clearing a pending marker
    pub fn pending_decrement(&self, index: usize) -> i32 {
        self.pending_dec[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::ops::{OpReply, OpRequest};

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

    fn set(names: &[&str], preferred: Option<&str>) -> ReplicaSet {
        let replicas = names
            .iter()
            .map(|n| Arc::new(StubReplica { name: n.to_string() }) as Arc<dyn ReplicaBackend>)
            .collect();
        ReplicaSet::new(replicas, preferred).unwrap()
    }

    #[test]
    fn starts_all_down() {
        let replicas = set(&["r0", "r1", "r2"], None);
        assert_eq!(replicas.count(), 3);
        assert_eq!(replicas.live_count(), 0);
        assert!(replicas.first_live().is_none());
        assert!(replicas.live_set().is_empty());
    }

    #[test]
    fn liveness_transitions() {
        let replicas = set(&["r0", "r1", "r2"], None);

        assert_eq!(replicas.set_live(1, true), 1);
        assert_eq!(replicas.set_live(2, true), 2);
        assert!(replicas.is_live(1));
        assert!(!replicas.is_live(0));
        assert_eq!(replicas.first_live(), Some(1));
        assert_eq!(replicas.live_set(), vec![1, 2]);

        assert_eq!(replicas.set_live(1, false), 1);
        assert_eq!(replicas.set_live(2, false), 0);
        assert!(replicas.first_live().is_none());
    }

    #[test]
    fn index_by_name() {
        let replicas = set(&["r0", "r1"], None);
        assert_eq!(replicas.index_of("r1"), Some(1));
        assert_eq!(replicas.index_of("r9"), None);
    }

    #[test]
    fn read_replica_prefers_configured() {
        let replicas = set(&["r0", "r1", "r2"], Some("r2"));
        assert!(replicas.read_replica().is_none());

        replicas.set_live(0, true);
        replicas.set_live(2, true);
        assert_eq!(replicas.read_replica(), Some(2));

        // Falls back to first live when the preferred replica goes down
        replicas.set_live(2, false);
        assert_eq!(replicas.read_replica(), Some(0));
    }

    #[test]
    fn pending_deltas_fixed_at_construction() {
        let replicas = set(&["r0", "r1"], None);
        for i in 0..replicas.count() {
            assert_eq!(replicas.pending_increment(i), 1);
            assert_eq!(replicas.pending_decrement(i), -1);
        }
    }

    #[test]
    fn rejects_bad_construction() {
        let replicas: Vec<Arc<dyn ReplicaBackend>> = vec![];
        assert!(ReplicaSet::new(replicas, None).is_err());

        let duplicated = vec![
            Arc::new(StubReplica { name: "r0".to_string() }) as Arc<dyn ReplicaBackend>,
            Arc::new(StubReplica { name: "r0".to_string() }) as Arc<dyn ReplicaBackend>,
        ];
        assert!(ReplicaSet::new(duplicated, None).is_err());

        let replicas = vec![Arc::new(StubReplica { name: "r0".to_string() }) as Arc<dyn ReplicaBackend>];
        assert!(matches!(
            ReplicaSet::new(replicas, Some("r9")),
            Err(Error::ReplicaNotFound(_))
        ));
    }
}
