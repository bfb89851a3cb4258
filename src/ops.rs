//! Operation requests and replies exchanged with storage replicas

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::inode;

pub use crate::inode::INO_NONE;

/// Kind of a filesystem object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

/// File metadata returned by lookup/stat-class operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub ino: u64,
    pub size: u64,
    pub kind: FileKind,
    pub permissions: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub accessed_ms: u64,
    pub modified_ms: u64,
    pub changed_ms: u64,
}

/// Extended attributes carried with a lookup reply
pub type XattrMap = std::collections::HashMap<String, Vec<u8>>;

/// Metadata plus optional extended attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryReply {
    pub metadata: FileMetadata,
    pub xattrs: Option<XattrMap>,
}

/// Filesystem capacity as reported by statfs
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CapacityInfo {
    pub block_size: u32,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
}

/// Single directory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub ino: u64,
    pub kind: FileKind,
}

/// Attribute changes applied by setattr
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttrChanges {
    pub permissions: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub accessed_ms: Option<u64>,
    pub modified_ms: Option<u64>,
}

/// Request issued to a single replica
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OpRequest {
    // === Lookup & metadata ===
    Lookup { path: String, need_xattrs: bool },
    Stat { path: String },
    Access { path: String, mask: u32 },
    Readlink { path: String },
    Getxattr { path: String, name: String },

    // === Data ===
    Read { path: String, offset: u64, size: u32 },
    Readdir { path: String },
    Open { path: String, flags: u32 },
    Flush { path: String },
    Write { path: String, offset: u64, data: Vec<u8> },
    Truncate { path: String, size: u64 },
    Setattr { path: String, changes: AttrChanges },

    // === Namespace mutation ===
    Create { path: String, permissions: u32, flags: u32 },
    Mknod { path: String, permissions: u32, rdev: u32 },
    Mkdir { path: String, permissions: u32 },
    Unlink { path: String },
    Rmdir { path: String },
    Symlink { target: String, link_path: String },
    Link { path: String, new_path: String },
    Rename { from: String, to: String },

    // === Volume ===
    Statfs { path: String },
    /// Capability probe: fails with an "unsupported" error on replicas
    /// lacking lock support
    ProbeLocks,
}

impl OpRequest {
    /// Short operation name for logging
    pub fn name(&self) -> &'static str {
        match self {
            OpRequest::Lookup { .. } => "lookup",
            OpRequest::Stat { .. } => "stat",
            OpRequest::Access { .. } => "access",
            OpRequest::Readlink { .. } => "readlink",
            OpRequest::Getxattr { .. } => "getxattr",
            OpRequest::Read { .. } => "read",
            OpRequest::Readdir { .. } => "readdir",
            OpRequest::Open { .. } => "open",
            OpRequest::Flush { .. } => "flush",
            OpRequest::Write { .. } => "write",
            OpRequest::Truncate { .. } => "truncate",
            OpRequest::Setattr { .. } => "setattr",
            OpRequest::Create { .. } => "create",
            OpRequest::Mknod { .. } => "mknod",
            OpRequest::Mkdir { .. } => "mkdir",
            OpRequest::Unlink { .. } => "unlink",
            OpRequest::Rmdir { .. } => "rmdir",
            OpRequest::Symlink { .. } => "symlink",
            OpRequest::Link { .. } => "link",
            OpRequest::Rename { .. } => "rename",
            OpRequest::Statfs { .. } => "statfs",
            OpRequest::ProbeLocks => "probe-locks",
        }
    }
}

/// Reply from a single replica
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OpReply {
    /// Metadata for lookup/stat/create-class operations
    Entry(EntryReply),
    /// Raw bytes for read/getxattr
    Data(Vec<u8>),
    /// Symlink target
    Target(String),
    /// Directory listing
    Entries(Vec<DirEntry>),
    /// Bytes accepted by a write
    Written(u32),
    /// Capacity for statfs
    Capacity(CapacityInfo),
    /// Operation completed with no payload
    Done,
}

impl OpReply {
    /// Rewrite every replica-local inode number in this reply into the
    /// virtual inode space, using the replying replica's index.
    pub fn rewrite_inodes(&mut self, replica_count: usize, replica_index: usize) {
        match self {
            OpReply::Entry(entry) => {
                let scaled = inode::forward(entry.metadata.ino, replica_count, replica_index);
                trace!("scaling inode {} to {}", entry.metadata.ino, scaled);
                entry.metadata.ino = scaled;
            }
            OpReply::Entries(entries) => {
                for entry in entries.iter_mut() {
                    entry.ino = inode::forward(entry.ino, replica_count, replica_index);
                }
            }
            _ => {}
        }
    }
}

/// Serialize a request for transmission
pub fn encode_request(request: &OpRequest) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(request)
}

/// Deserialize a request from bytes
pub fn decode_request(data: &[u8]) -> Result<OpRequest, bincode::Error> {
    bincode::deserialize(data)
}

/// Serialize a reply for transmission
pub fn encode_reply(reply: &OpReply) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(reply)
}

/// Deserialize a reply from bytes
pub fn decode_reply(data: &[u8]) -> Result<OpReply, bincode::Error> {
    bincode::deserialize(data)
}
