//! Cluster model consumed by the terms count action.
//!
//! This module provides:
//! - Index metadata and the primary routing table
//! - Global and per-index operational blocks
//! - A [`ClusterService`] that hands out immutable state snapshots

pub mod block;
pub mod routing;
pub mod service;
pub mod state;

pub use block::{ClusterBlock, ClusterBlockLevel, ClusterBlocks};
pub use routing::{
    GroupedShards, IndexRoutingTable, RoutingTable, ShardGroup, ShardId, ShardRouting, ShardState,
    ShardTarget,
};
pub use service::{ClusterService, StaticClusterService};
pub use state::{ClusterState, ClusterStateBuilder, IndexMetadata, Metadata};
