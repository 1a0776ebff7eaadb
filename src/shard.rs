//! Shard-local term access and aggregation.
//!
//! This module provides functionality to:
//! - Read a shard's term space through point-in-time snapshots
//! - Count terms of a single shard, optionally restricted to one field
//! - Host the shards of one node and run the per-shard operation

pub mod aggregator;
pub mod indices;
pub mod memory;
pub mod reader;

pub use aggregator::{ShardTermsAggregator, TermCounts};
pub use indices::IndicesService;
pub use memory::{Document, MemoryShard};
pub use reader::{FieldTerm, ShardReader, TermSnapshot};
