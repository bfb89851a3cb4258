//! Fan-out dispatcher
//!
//! Implements the upward namespace surface: selects the target replica set
//! for each operation, issues one concurrent sub-call per target, and folds
//! completions through the operation's aggregation policy. Partial failures
//! never abort sibling sub-calls; the caller sees exactly one result.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;

use crate::changelog::PendingChangelog;
use crate::dispatch::context::OperationContext;
use crate::dispatch::policy::Policy;
use crate::dispatch::{Lookup, Namespace};
use crate::error::{Error, Result};
use crate::inode::{self, INO_NONE};
use crate::ops::{
    AttrChanges, CapacityInfo, DirEntry, EntryReply, FileMetadata, OpReply, OpRequest,
};
use crate::replica::registry::ReplicaSet;

/// Replication dispatcher for one volume
pub struct Dispatcher {
    replicas: Arc<ReplicaSet>,
    changelog: PendingChangelog,
}

impl Dispatcher {
    /// Create a dispatcher over a replica set
    pub fn new(replicas: Arc<ReplicaSet>, changelog: PendingChangelog) -> Self {
        Self { replicas, changelog }
    }

    /// The replica set this dispatcher consults
    pub fn replicas(&self) -> &Arc<ReplicaSet> {
        &self.replicas
    }

    fn live_targets(&self) -> Result<Vec<usize>> {
        let targets = self.replicas.live_set();
        if targets.is_empty() {
            return Err(Error::ReplicaUnavailable);
        }
        Ok(targets)
    }

    fn read_target(&self) -> Result<Vec<usize>> {
        let index = self.replicas.read_replica().ok_or(Error::ReplicaUnavailable)?;
        Ok(vec![index])
    }

    /// Issue one sub-call per target and await the folded outcome.
    ///
    /// Each sub-call runs as its own task carrying the replica index as
    /// correlation token; the context delivers through the oneshot when the
    /// last reply folds in. Sub-calls run to completion even if this future
    /// is dropped.
    async fn fan_out(
        &self,
        targets: Vec<usize>,
        request: OpRequest,
        policy: Policy,
    ) -> Result<OpReply> {
        debug!(
            "{}: dispatching to {} of {} replicas",
            request.name(),
            targets.len(),
            self.replicas.count()
        );

        let (tx, rx) = oneshot::channel();
        let ctx = Arc::new(OperationContext::new(
            targets.len(),
            policy,
            self.replicas.count(),
            tx,
        ));

        for index in targets {
            let backend = self.replicas.backend(index);
            let ctx = Arc::clone(&ctx);
            let request = request.clone();
            tokio::spawn(async move {
                let result = backend.call(request).await;
                if let Err(ref e) = result {
                    debug!("replica {} replied with {}", backend.name(), e);
                }
                ctx.complete(index, result);
            });
        }

        rx.await.map_err(|_| Error::Aborted)?
    }

    async fn fan_out_all(&self, request: OpRequest, policy: Policy) -> Result<OpReply> {
        let targets = self.live_targets()?;
        self.fan_out(targets, request, policy).await
    }

    async fn fan_out_read(&self, request: OpRequest) -> Result<OpReply> {
        let target = self.read_target()?;
        self.fan_out(target, request, Policy::FirstSuccess).await
    }

    /// Write-class fan-out wrapped in changelog bookkeeping: replicas left
    /// out of the target set are marked pending before the operation is
    /// issued, targeted replicas are cleared once the fold completes.
    async fn fan_out_write(&self, request: OpRequest) -> Result<OpReply> {
        let targets = self.live_targets()?;
        self.changelog.mark_missing(&targets).await?;
        let outcome = self
            .fan_out(targets.clone(), request, Policy::CountComplete)
            .await;
        self.changelog.clear_targets(&targets).await?;
        outcome
    }
}

#[async_trait]
impl Namespace for Dispatcher {
    async fn lookup(&self, lookup: Lookup) -> Result<EntryReply> {
        match lookup {
            Lookup::Fresh { path, need_xattrs } => {
                let reply = self
                    .fan_out_all(OpRequest::Lookup { path, need_xattrs }, Policy::FirstSuccess)
                    .await?;
                into_entry(reply)
            }
            Lookup::Revalidate { path, ino, need_xattrs } => {
                let count = self.replicas.count();
                if ino == INO_NONE {
                    return Err(Error::TopologyMismatch { ino, count });
                }
                let index = inode::inverse(ino, count);
                if index >= count {
                    return Err(Error::TopologyMismatch { ino, count });
                }
                debug!("revalidate on replica {}", self.replicas.name(index));
                let reply = self
                    .fan_out(
                        vec![index],
                        OpRequest::Lookup { path, need_xattrs },
                        Policy::FirstSuccess,
                    )
                    .await?;
                into_entry(reply)
            }
        }
    }

    async fn stat(&self, path: &str) -> Result<FileMetadata> {
        let reply = self
            .fan_out_all(OpRequest::Stat { path: path.to_string() }, Policy::FirstSuccess)
            .await?;
        Ok(into_entry(reply)?.metadata)
    }

    async fn access(&self, path: &str, mask: u32) -> Result<()> {
        self.fan_out_read(OpRequest::Access { path: path.to_string(), mask })
            .await
            .map(|_| ())
    }

    async fn readlink(&self, path: &str) -> Result<String> {
        let reply = self
            .fan_out_read(OpRequest::Readlink { path: path.to_string() })
            .await?;
        into_target(reply)
    }

    async fn getxattr(&self, path: &str, name: &str) -> Result<Vec<u8>> {
        let reply = self
            .fan_out_read(OpRequest::Getxattr {
                path: path.to_string(),
                name: name.to_string(),
            })
            .await?;
        into_data(reply)
    }

    async fn read(&self, path: &str, offset: u64, size: u32) -> Result<Vec<u8>> {
        let reply = self
            .fan_out_read(OpRequest::Read { path: path.to_string(), offset, size })
            .await?;
        into_data(reply)
    }

    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let reply = self
            .fan_out_read(OpRequest::Readdir { path: path.to_string() })
            .await?;
        into_entries(reply)
    }

    async fn open(&self, path: &str, flags: u32) -> Result<()> {
        self.fan_out_all(
            OpRequest::Open { path: path.to_string(), flags },
            Policy::CountComplete,
        )
        .await
        .map(|_| ())
    }

    async fn flush(&self, path: &str) -> Result<()> {
        self.fan_out_all(
            OpRequest::Flush { path: path.to_string() },
            Policy::CountComplete,
        )
        .await
        .map(|_| ())
    }

    async fn write(&self, path: &str, offset: u64, data: Vec<u8>) -> Result<u32> {
        let reply = self
            .fan_out_write(OpRequest::Write { path: path.to_string(), offset, data })
            .await?;
        into_written(reply)
    }

    async fn truncate(&self, path: &str, size: u64) -> Result<()> {
        self.fan_out_write(OpRequest::Truncate { path: path.to_string(), size })
            .await
            .map(|_| ())
    }

    async fn setattr(&self, path: &str, changes: AttrChanges) -> Result<()> {
        self.fan_out_write(OpRequest::Setattr { path: path.to_string(), changes })
            .await
            .map(|_| ())
    }

    async fn create(&self, path: &str, permissions: u32, flags: u32) -> Result<EntryReply> {
        let reply = self
            .fan_out_write(OpRequest::Create { path: path.to_string(), permissions, flags })
            .await?;
        into_entry(reply)
    }

    async fn mknod(&self, path: &str, permissions: u32, rdev: u32) -> Result<EntryReply> {
        let reply = self
            .fan_out_write(OpRequest::Mknod { path: path.to_string(), permissions, rdev })
            .await?;
        into_entry(reply)
    }

    async fn mkdir(&self, path: &str, permissions: u32) -> Result<EntryReply> {
        let reply = self
            .fan_out_write(OpRequest::Mkdir { path: path.to_string(), permissions })
            .await?;
        into_entry(reply)
    }

    async fn unlink(&self, path: &str) -> Result<()> {
        self.fan_out_write(OpRequest::Unlink { path: path.to_string() })
            .await
            .map(|_| ())
    }

    async fn rmdir(&self, path: &str) -> Result<()> {
        self.fan_out_write(OpRequest::Rmdir { path: path.to_string() })
            .await
            .map(|_| ())
    }

    async fn symlink(&self, target: &str, link_path: &str) -> Result<EntryReply> {
        let reply = self
            .fan_out_write(OpRequest::Symlink {
                target: target.to_string(),
                link_path: link_path.to_string(),
            })
            .await?;
        into_entry(reply)
    }

    async fn link(&self, path: &str, new_path: &str) -> Result<EntryReply> {
        let reply = self
            .fan_out_write(OpRequest::Link {
                path: path.to_string(),
                new_path: new_path.to_string(),
            })
            .await?;
        into_entry(reply)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.fan_out_write(OpRequest::Rename { from: from.to_string(), to: to.to_string() })
            .await
            .map(|_| ())
    }

    async fn statfs(&self, path: &str) -> Result<CapacityInfo> {
        let reply = self
            .fan_out_all(OpRequest::Statfs { path: path.to_string() }, Policy::MinCapacity)
            .await?;
        into_capacity(reply)
    }
}

fn unexpected(reply: OpReply) -> Error {
    Error::Internal(format!("unexpected reply payload: {:?}", reply))
}

fn into_entry(reply: OpReply) -> Result<EntryReply> {
    match reply {
        OpReply::Entry(entry) => Ok(entry),
        other => Err(unexpected(other)),
    }
}

fn into_data(reply: OpReply) -> Result<Vec<u8>> {
    match reply {
        OpReply::Data(data) => Ok(data),
        other => Err(unexpected(other)),
    }
}

fn into_target(reply: OpReply) -> Result<String> {
    match reply {
        OpReply::Target(target) => Ok(target),
        other => Err(unexpected(other)),
    }
}

fn into_entries(reply: OpReply) -> Result<Vec<DirEntry>> {
    match reply {
        OpReply::Entries(entries) => Ok(entries),
        other => Err(unexpected(other)),
    }
}

fn into_written(reply: OpReply) -> Result<u32> {
    match reply {
        OpReply::Written(size) => Ok(size),
        other => Err(unexpected(other)),
    }
}

fn into_capacity(reply: OpReply) -> Result<CapacityInfo> {
    match reply {
        OpReply::Capacity(capacity) => Ok(capacity),
        other => Err(unexpected(other)),
    }
}
