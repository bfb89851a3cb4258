//! Fan-out/aggregate dispatch for MirrorFS
//!
//! One incoming namespace operation becomes one concurrent sub-call per
//! target replica; replies are folded into a single outcome under a shared
//! completion state, per-operation aggregation policy deciding the fold.

pub mod context;
pub mod engine;
pub mod policy;

pub use context::OperationContext;
pub use engine::Dispatcher;
pub use policy::Policy;

use async_trait::async_trait;

use crate::error::Result;
use crate::ops::{AttrChanges, CapacityInfo, DirEntry, EntryReply, FileMetadata};

/// Lookup variants with distinct target-set selection rules.
///
/// A fresh lookup fans out to every live replica; a revalidation carries a
/// previously issued virtual inode and goes only to the replica that inode
/// decodes to.
#[derive(Debug, Clone)]
pub enum Lookup {
    Fresh { path: String, need_xattrs: bool },
    Revalidate { path: String, ino: u64, need_xattrs: bool },
}

/// Namespace operation surface exposed upward by the dispatcher.
///
/// Callers see exactly one result per operation: success with the aggregated
/// payload, or the representative failure chosen by the active policy.
#[async_trait]
pub trait Namespace: Send + Sync {
    async fn lookup(&self, lookup: Lookup) -> Result<EntryReply>;
    async fn stat(&self, path: &str) -> Result<FileMetadata>;
    async fn access(&self, path: &str, mask: u32) -> Result<()>;
    async fn readlink(&self, path: &str) -> Result<String>;
    async fn getxattr(&self, path: &str, name: &str) -> Result<Vec<u8>>;
    async fn read(&self, path: &str, offset: u64, size: u32) -> Result<Vec<u8>>;
    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>>;
    async fn open(&self, path: &str, flags: u32) -> Result<()>;
    async fn flush(&self, path: &str) -> Result<()>;
    async fn write(&self, path: &str, offset: u64, data: Vec<u8>) -> Result<u32>;
    async fn truncate(&self, path: &str, size: u64) -> Result<()>;
    async fn setattr(&self, path: &str, changes: AttrChanges) -> Result<()>;
    async fn create(&self, path: &str, permissions: u32, flags: u32) -> Result<EntryReply>;
    async fn mknod(&self, path: &str, permissions: u32, rdev: u32) -> Result<EntryReply>;
    async fn mkdir(&self, path: &str, permissions: u32) -> Result<EntryReply>;
    async fn unlink(&self, path: &str) -> Result<()>;
    async fn rmdir(&self, path: &str) -> Result<()>;
    async fn symlink(&self, target: &str, link_path: &str) -> Result<EntryReply>;
    async fn link(&self, path: &str, new_path: &str) -> Result<EntryReply>;
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
    async fn statfs(&self, path: &str) -> Result<CapacityInfo>;
}
