//! Error types for MirrorFS

use thiserror::Error;

/// Result type alias using MirrorFS Error
pub type Result<T> = std::result::Result<T, Error>;

/// MirrorFS error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Request/reply codec error
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// No live replica can serve the operation
    #[error("No replica available")]
    ReplicaUnavailable,

    /// Replica handle is not registered in the replica set
    #[error("Replica not found: {0}")]
    ReplicaNotFound(String),

    /// Replica lacks a capability required for replication
    #[error("Replica {replica} does not support {capability}")]
    UnsupportedCapability { replica: String, capability: String },

    /// Virtual inode does not map into the current replica topology
    #[error("Inconsistent replica topology: inode {ino} does not map into {count} replicas")]
    TopologyMismatch { ino: u64, count: usize },

    /// Failure reported by a single replica, carried as an errno
    #[error("Replica {replica} failed with errno {errno}")]
    ReplicaOp { replica: String, errno: i32 },

    /// Entry does not exist on any replica
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation completion state was torn down before delivery
    #[error("Operation aborted before completion")]
    Aborted,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert to a libc error code for the FUSE-facing layer
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            Error::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            Error::ReplicaOp { errno, .. } => *errno,
            Error::NotFound(_) => libc::ENOENT,
            Error::ReplicaUnavailable => libc::ENOTCONN,
            Error::TopologyMismatch { .. } => libc::ESTALE,
            Error::UnsupportedCapability { .. } => libc::ENOSYS,
            Error::Aborted => libc::EINTR,
            _ => libc::EIO,
        }
    }

    /// Check if this error means the replica lacks a required capability
    pub fn is_unsupported(&self) -> bool {
        match self {
            Error::UnsupportedCapability { .. } => true,
            Error::ReplicaOp { errno, .. } => *errno == libc::ENOSYS,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(Error::ReplicaUnavailable.to_errno(), libc::ENOTCONN);
        assert_eq!(
            Error::TopologyMismatch { ino: 42, count: 3 }.to_errno(),
            libc::ESTALE
        );
        assert_eq!(
            Error::ReplicaOp { replica: "r0".into(), errno: libc::EACCES }.to_errno(),
            libc::EACCES
        );
        assert_eq!(Error::NotFound("/a".into()).to_errno(), libc::ENOENT);
    }

    #[test]
    fn unsupported_detection() {
        let probe = Error::UnsupportedCapability {
            replica: "r1".into(),
            capability: "locks".into(),
        };
        assert!(probe.is_unsupported());
        assert!(Error::ReplicaOp { replica: "r1".into(), errno: libc::ENOSYS }.is_unsupported());
        assert!(!Error::ReplicaOp { replica: "r1".into(), errno: libc::EIO }.is_unsupported());
        assert!(!Error::ReplicaUnavailable.is_unsupported());
    }
}
