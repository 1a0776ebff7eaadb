//! # termscount
//!
//! Distributed term counting over the primary shards of a cluster.
//!
//! ## Features
//!
//! - Index expression resolution with `_all` and wildcards
//! - Concurrent per-shard aggregation on local and remote nodes
//! - Additive merge with per-shard success and failure accounting
//! - Point-in-time shard snapshots
//! - In-process multi-node clusters for tools and tests

pub mod action;
pub mod cli;
pub mod cluster;
pub mod error;
pub mod local_cluster;
pub mod shard;
pub mod transport;

pub mod prelude {
    pub use crate::action::{
        OperationThreading, TermsCountAction, TermsCountConfig, TermsCountRequest,
        TermsCountResponse,
    };
    pub use crate::cluster::{ClusterService, ClusterState, ShardId, StaticClusterService};
    pub use crate::error::{Result, TermsCountError};
    pub use crate::local_cluster::{ClusterFixture, LocalCluster};
    pub use crate::shard::{Document, IndicesService, MemoryShard, ShardReader, TermCounts};
    pub use crate::transport::{InProcessTransport, ShardChannel};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
