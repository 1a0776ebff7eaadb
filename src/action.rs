//! The terms count action: scatter a per-shard term count over the active
//! primaries of the requested indices and gather the results.
//!
//! This module provides functionality to:
//! - Resolve the shards a request targets
//! - Dispatch one shard operation per target and collect every outcome once
//! - Merge the outcomes into one response with shard accounting
//! - Monitor execution metrics

pub mod config;
pub mod coordinator;
pub mod merger;
pub mod metrics;
pub mod outcome;
pub mod request;
pub mod resolver;
pub mod response;

pub use config::TermsCountConfig;
pub use coordinator::TermsCountAction;
pub use merger::ShardResultsMerger;
pub use metrics::{TermsCountMetrics, TermsCountMetricsCollector};
pub use outcome::{OutcomeSlots, ShardOutcome};
pub use request::{OperationThreading, TermsCountRequest, TermsCountRequestBuilder};
pub use resolver::ShardTargetResolver;
pub use response::{ShardFailure, TermsCountResponse};

/// Name of the cluster-level action.
pub const TERMS_COUNT_ACTION: &str = "indices/termscount";
