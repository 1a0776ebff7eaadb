//! Shards hosted by one node.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cluster::ShardId;
use crate::error::{Result, TermsCountError};
use crate::shard::aggregator::ShardTermsAggregator;
use crate::shard::reader::ShardReader;
use crate::transport::message::{ShardTermsRequest, ShardTermsResponse};

/// Registry of the shards a node currently serves.
#[derive(Debug)]
pub struct IndicesService {
    node_id: String,
    shards: RwLock<HashMap<ShardId, Arc<dyn ShardReader>>>,
    aggregator: ShardTermsAggregator,
}

impl IndicesService {
    pub fn new<S: Into<String>>(node_id: S, aggregator: ShardTermsAggregator) -> Self {
        Self {
            node_id: node_id.into(),
            shards: RwLock::new(HashMap::new()),
            aggregator,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Start serving a shard. Replaces any reader already registered for it.
    pub fn add_shard(&self, shard_id: ShardId, reader: Arc<dyn ShardReader>) {
        log::debug!("node [{}] serving shard {shard_id}", self.node_id);
        self.shards.write().insert(shard_id, reader);
    }

    /// Stop serving a shard.
    pub fn remove_shard(&self, shard_id: &ShardId) -> Option<Arc<dyn ShardReader>> {
        log::debug!("node [{}] dropping shard {shard_id}", self.node_id);
        self.shards.write().remove(shard_id)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.read().len()
    }

    /// The reader of a shard served by this node.
    pub fn shard_safe(&self, shard_id: &ShardId) -> Result<Arc<dyn ShardReader>> {
        self.shards
            .read()
            .get(shard_id)
            .cloned()
            .ok_or_else(|| TermsCountError::NotServable(shard_id.clone()))
    }

    /// Count the terms of one hosted shard.
    pub fn terms_count(&self, request: &ShardTermsRequest) -> Result<ShardTermsResponse> {
        let reader = self.shard_safe(&request.shard)?;
        let terms =
            self.aggregator
                .aggregate(&request.shard, reader.as_ref(), request.field.as_deref())?;
        Ok(ShardTermsResponse {
            shard: request.shard.clone(),
            terms,
        })
    }
}
