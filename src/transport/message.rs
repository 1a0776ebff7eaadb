//! Wire messages of the shard-level terms count operation.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::cluster::ShardId;
use crate::error::{Result, TermsCountError};
use crate::shard::aggregator::TermCounts;

/// Action name of the shard-level operation.
pub const SHARD_TERMS_COUNT_ACTION: &str = "indices/termscount[s]";

/// Request to count the terms of one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTermsRequest {
    pub shard: ShardId,
    pub field: Option<String>,
}

impl ShardTermsRequest {
    pub fn new(shard: ShardId, field: Option<String>) -> Self {
        Self { shard, field }
    }
}

/// Local term counts of one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTermsResponse {
    pub shard: ShardId,
    pub terms: TermCounts,
}

/// Reply frame sent back by the owning node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportResponse {
    Ok(ShardTermsResponse),

    /// The shard is not active on the receiving node.
    NotServable(ShardId),

    /// The shard operation failed on the receiving node.
    Failed { shard: ShardId, reason: String },
}

impl TransportResponse {
    /// Build the reply for the outcome of a local shard operation.
    pub fn from_result(shard: &ShardId, result: Result<ShardTermsResponse>) -> Self {
        match result {
            Ok(response) => TransportResponse::Ok(response),
            Err(TermsCountError::NotServable(shard)) => TransportResponse::NotServable(shard),
            Err(e) => TransportResponse::Failed {
                shard: shard.clone(),
                reason: e.to_string(),
            },
        }
    }

    /// Turn the reply into the caller-side result.
    pub fn into_result(self, node: &str) -> Result<ShardTermsResponse> {
        match self {
            TransportResponse::Ok(response) => Ok(response),
            TransportResponse::NotServable(shard) => Err(TermsCountError::NotServable(shard)),
            TransportResponse::Failed { shard, reason } => {
                Err(TermsCountError::remote_shard_failure(shard, node, reason))
            }
        }
    }
}

/// Encode a message into a frame.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(message)?)
}

/// Decode a frame.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(frame)?)
}
