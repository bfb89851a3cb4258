//! Replica liveness and quorum tracking
//!
//! Consumes connectivity events from the transport layer, gates each
//! newly-up replica behind a lock-capability probe, and emits aggregate
//! volume up/down events upward exactly once per genuine transition.

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ops::OpRequest;
use crate::replica::registry::ReplicaSet;

/// Lifecycle event consumed from the transport layer
#[derive(Debug, Clone)]
pub enum ReplicaEvent {
    /// Replica became reachable
    Up(String),
    /// Replica became unreachable
    Down(String),
    /// The layer above this volume came up; forwarded to every replica
    ParentUp,
}

/// Aggregate lifecycle event produced upward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeEvent {
    /// At least one replica is live
    Up,
    /// No replica is live
    Down,
}

/// Tracks replica liveness and aggregate volume state
pub struct LivenessTracker {
    replicas: Arc<ReplicaSet>,
    volume_tx: mpsc::Sender<VolumeEvent>,
    volume_up: Mutex<bool>,
}

impl LivenessTracker {
    /// Create a tracker emitting volume events on `volume_tx`
    pub fn new(replicas: Arc<ReplicaSet>, volume_tx: mpsc::Sender<VolumeEvent>) -> Self {
        Self {
            replicas,
            volume_tx,
            volume_up: Mutex::new(false),
        }
    }

    /// Consume lifecycle events until the channel closes
    pub async fn run(&self, mut events: mpsc::Receiver<ReplicaEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event).await {
                warn!("lifecycle event failed: {}", e);
            }
        }
        debug!("lifecycle event channel closed");
    }

    /// Apply one lifecycle event
    pub async fn handle_event(&self, event: ReplicaEvent) -> Result<()> {
        match event {
            ReplicaEvent::Up(name) => self.replica_up(&name).await,
            ReplicaEvent::Down(name) => self.replica_down(&name).await,
            ReplicaEvent::ParentUp => self.parent_up().await,
        }
    }

    async fn replica_up(&self, name: &str) -> Result<()> {
        let index = self
            .replicas
            .index_of(name)
            .ok_or_else(|| Error::ReplicaNotFound(name.to_string()))?;

        // Admission is gated on the lock-capability probe
        match self.probe_locks(index).await {
            Err(e) if e.is_unsupported() => {
                warn!(
                    "replica {} has no lock support, excluding it; data will not be replicated on it",
                    name
                );
                return Ok(());
            }
            Err(e) => debug!("lock probe on {} returned {}", name, e),
            Ok(()) => debug!("replica {} supports locking", name),
        }

        let live = self.replicas.set_live(index, true);
        info!("replica {} is up, {} of {} live", name, live, self.replicas.count());
        self.announce_transition(live).await;
        Ok(())
    }

    async fn replica_down(&self, name: &str) -> Result<()> {
        let index = self
            .replicas
            .index_of(name)
            .ok_or_else(|| Error::ReplicaNotFound(name.to_string()))?;

        let live = self.replicas.set_live(index, false);
        info!("replica {} is down, {} of {} live", name, live, self.replicas.count());
        self.announce_transition(live).await;
        Ok(())
    }

    /// Parent-up is forwarded to every replica unconditionally
    async fn parent_up(&self) -> Result<()> {
        let backends = self.replicas.backends();
        let results = join_all(backends.iter().map(|b| b.notify_parent_up())).await;
        for (index, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                warn!("parent-up notify failed for {}: {}", self.replicas.name(index), e);
            }
        }
        Ok(())
    }

    async fn probe_locks(&self, index: usize) -> Result<()> {
        self.replicas
            .backend(index)
            .call(OpRequest::ProbeLocks)
            .await
            .map(|_| ())
    }

    /// Emit a volume event when the aggregate state genuinely changed.
    /// The stored flag keeps transitions at most-once: a second replica
    /// coming up, or a down event while already down, emits nothing.
    async fn announce_transition(&self, live: usize) {
        let event = {
            let mut up = self.volume_up.lock().unwrap();
            if live > 0 && !*up {
                *up = true;
                Some(VolumeEvent::Up)
            } else if live == 0 && *up {
                *up = false;
                Some(VolumeEvent::Down)
            } else {
                None
            }
        };

        if let Some(event) = event {
            info!("volume transition: {:?}", event);
            if self.volume_tx.send(event).await.is_err() {
                warn!("volume event receiver dropped");
            }
        }
    }
}
