//! Error types for the termscount library.
//!
//! All failures are represented by the [`TermsCountError`] enum. Errors fall
//! into two groups: request-level errors that abort a terms count before any
//! shard is contacted (missing index, cluster block), and shard-level errors
//! that the coordinator contains and reports as shard failures.
//!
//! # Examples
//!
//! ```
//! use termscount::error::{Result, TermsCountError};
//!
//! fn lookup(name: &str) -> Result<()> {
//!     Err(TermsCountError::index_not_found(name))
//! }
//!
//! match lookup("books") {
//!     Ok(_) => println!("found"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

use crate::cluster::ShardId;

/// The main error type for termscount operations.
#[derive(Error, Debug)]
pub enum TermsCountError {
    /// I/O errors (file operations, fixture loading, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A named index does not exist in the cluster metadata.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// A cluster or index block forbids the operation.
    #[error("Cluster blocked: {0}")]
    ClusterBlocked(String),

    /// The local term scan of a shard failed.
    #[error("Shard {shard} unreadable: {source}")]
    PartitionUnreadable {
        shard: ShardId,
        #[source]
        source: io::Error,
    },

    /// The node owning a shard could not be reached.
    #[error("Shard {shard} unreachable on node [{node}]: {reason}")]
    PartitionUnreachable {
        shard: ShardId,
        node: String,
        reason: String,
    },

    /// The owning node executed the shard operation and reported a failure.
    #[error("Shard {shard} failed on node [{node}]: {reason}")]
    RemoteShardFailure {
        shard: ShardId,
        node: String,
        reason: String,
    },

    /// The shard is no longer active on the node it was routed to.
    #[error("Shard {0} is not active")]
    NotServable(ShardId),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Binary (wire) serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Thread join errors
    #[error("Thread join error: {0}")]
    ThreadJoinError(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Failure carrying the context it happened in, such as the file being read
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with TermsCountError.
pub type Result<T> = std::result::Result<T, TermsCountError>;

impl TermsCountError {
    /// Create a new index-not-found error.
    pub fn index_not_found<S: Into<String>>(index: S) -> Self {
        TermsCountError::IndexNotFound(index.into())
    }

    /// Create a new cluster-blocked error.
    pub fn cluster_blocked<S: Into<String>>(msg: S) -> Self {
        TermsCountError::ClusterBlocked(msg.into())
    }

    /// Create a new shard-unreadable error.
    pub fn partition_unreadable(shard: ShardId, source: io::Error) -> Self {
        TermsCountError::PartitionUnreadable { shard, source }
    }

    /// Create a new shard-unreachable error.
    pub fn partition_unreachable<N: Into<String>, S: Into<String>>(
        shard: ShardId,
        node: N,
        reason: S,
    ) -> Self {
        TermsCountError::PartitionUnreachable {
            shard,
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Create a new remote shard failure.
    pub fn remote_shard_failure<N: Into<String>, S: Into<String>>(
        shard: ShardId,
        node: N,
        reason: S,
    ) -> Self {
        TermsCountError::RemoteShardFailure {
            shard,
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        TermsCountError::Timeout(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        TermsCountError::InvalidConfig(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        TermsCountError::InvalidOperation(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        TermsCountError::Other(format!("Internal error: {}", msg.into()))
    }

    /// Whether the error means the shard was skipped rather than failed.
    pub fn is_not_servable(&self) -> bool {
        matches!(self, TermsCountError::NotServable(_))
    }
}

impl From<bincode::Error> for TermsCountError {
    fn from(err: bincode::Error) -> Self {
        TermsCountError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = TermsCountError::index_not_found("books");
        assert_eq!(error.to_string(), "Index not found: books");

        let error = TermsCountError::cluster_blocked("index read-only");
        assert_eq!(error.to_string(), "Cluster blocked: index read-only");

        let error = TermsCountError::partition_unreachable(ShardId::new("books", 1), "node-2", "closed");
        assert_eq!(
            error.to_string(),
            "Shard [books][1] unreachable on node [node-2]: closed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = TermsCountError::from(io_error);

        match error {
            TermsCountError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_unreadable_keeps_source() {
        use std::error::Error as _;

        let error = TermsCountError::partition_unreadable(
            ShardId::new("books", 0),
            io::Error::other("segment truncated"),
        );
        assert!(error.source().is_some());
        assert!(error.to_string().contains("segment truncated"));
        assert!(!error.is_not_servable());
        assert!(TermsCountError::NotServable(ShardId::new("books", 0)).is_not_servable());
    }
}
