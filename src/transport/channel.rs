//! Channel to the node owning a shard.

use crate::error::Result;
use crate::transport::message::{ShardTermsRequest, ShardTermsResponse};

/// Runs the shard-level operation on the node owning the shard.
///
/// Errors are reported per shard: `NotServable` when the shard is no longer
/// active there, `PartitionUnreachable` when the node cannot be reached and
/// `RemoteShardFailure` when the node ran the operation and it failed.
pub trait ShardChannel: Send + Sync {
    fn run_on_owner(&self, node: &str, request: ShardTermsRequest) -> Result<ShardTermsResponse>;
}
