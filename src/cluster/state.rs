//! Immutable cluster state snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cluster::block::{ClusterBlock, ClusterBlocks};
use crate::cluster::routing::{IndexRoutingTable, RoutingTable, ShardId, ShardRouting, ShardState};
use crate::error::{Result, TermsCountError};

/// Metadata associated with an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Index name.
    pub name: String,

    /// Number of primary shards.
    pub number_of_shards: u32,

    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl IndexMetadata {
    pub fn new<S: Into<String>>(name: S, number_of_shards: u32) -> Self {
        Self {
            name: name.into(),
            number_of_shards,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Metadata of every known index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub indices: BTreeMap<String, IndexMetadata>,
}

impl Metadata {
    pub fn has_index(&self, index: &str) -> bool {
        self.indices.contains_key(index)
    }

    /// Index names in sorted order.
    pub fn index_names(&self) -> Vec<String> {
        self.indices.keys().cloned().collect()
    }
}

/// A point-in-time view of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterState {
    /// Monotonic version, bumped on every publish.
    pub version: u64,
    pub metadata: Metadata,
    pub routing_table: RoutingTable,
    pub blocks: ClusterBlocks,
}

impl ClusterState {
    pub fn builder() -> ClusterStateBuilder {
        ClusterStateBuilder::default()
    }

    /// Builder seeded with this state, for publishing a modified copy.
    pub fn to_builder(&self) -> ClusterStateBuilder {
        ClusterStateBuilder {
            state: self.clone(),
        }
    }
}

/// Assembles a [`ClusterState`].
#[derive(Debug, Default)]
pub struct ClusterStateBuilder {
    state: ClusterState,
}

impl ClusterStateBuilder {
    /// Register an index with all primaries unassigned.
    pub fn put_index(mut self, metadata: IndexMetadata) -> Self {
        let table = IndexRoutingTable::unassigned(&metadata.name, metadata.number_of_shards);
        self.state
            .routing_table
            .indices
            .insert(metadata.name.clone(), table);
        self.state
            .metadata
            .indices
            .insert(metadata.name.clone(), metadata);
        self
    }

    /// Place the primary of `index`/`shard` on `node` in `state`.
    pub fn route_primary(
        mut self,
        index: &str,
        shard: u32,
        node: &str,
        state: ShardState,
    ) -> Result<Self> {
        let table = self
            .state
            .routing_table
            .indices
            .get_mut(index)
            .ok_or_else(|| TermsCountError::index_not_found(index))?;
        let routing = table.shards.get_mut(&shard).ok_or_else(|| {
            TermsCountError::invalid_operation(format!(
                "shard {} does not exist",
                ShardId::new(index, shard)
            ))
        })?;
        *routing = ShardRouting {
            shard_id: ShardId::new(index, shard),
            state,
            node_id: match state {
                ShardState::Unassigned => None,
                _ => Some(node.to_string()),
            },
        };
        Ok(self)
    }

    /// Move a primary back to the unassigned state.
    pub fn unassign_primary(self, index: &str, shard: u32) -> Result<Self> {
        self.route_primary(index, shard, "", ShardState::Unassigned)
    }

    pub fn global_block(mut self, block: ClusterBlock) -> Self {
        self.state.blocks.global.push(block);
        self
    }

    pub fn index_block(mut self, index: &str, block: ClusterBlock) -> Self {
        self.state
            .blocks
            .indices
            .entry(index.to_string())
            .or_default()
            .push(block);
        self
    }

    pub fn version(mut self, version: u64) -> Self {
        self.state.version = version;
        self
    }

    pub fn build(self) -> ClusterState {
        self.state
    }
}
