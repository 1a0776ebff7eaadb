//! Resolution of index expressions to shard targets.

use regex::Regex;

use crate::cluster::{ClusterBlockLevel, ClusterState, GroupedShards};
use crate::error::{Result, TermsCountError};

/// Expression selecting every index.
pub const ALL_INDICES: &str = "_all";

/// Turns the indices named by a request into the shards to query.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShardTargetResolver;

impl ShardTargetResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `indices` against `state` into active primary shards grouped
    /// by index.
    ///
    /// Fails before anything is dispatched when a metadata block applies or a
    /// named index does not exist.
    pub fn resolve(&self, state: &ClusterState, indices: &[String]) -> Result<GroupedShards> {
        if let Some(err) = state.blocks.global_blocked_error(ClusterBlockLevel::Metadata) {
            return Err(err);
        }

        let concrete = self.concrete_indices(state, indices)?;

        if let Some(err) = state
            .blocks
            .indices_blocked_error(ClusterBlockLevel::Metadata, &concrete)
        {
            return Err(err);
        }

        let grouped = state.routing_table.active_primary_shards_grouped(&concrete);
        log::debug!(
            "resolved {} indices to {} active primary shards (state version {})",
            concrete.len(),
            grouped.size(),
            state.version
        );
        Ok(grouped)
    }

    /// Expand index expressions into existing index names.
    ///
    /// An empty list or `_all` means every index. Expressions containing `*`
    /// match index names as wildcards and may match nothing. Any other name
    /// must exist. Each index appears once, in first-mention order.
    pub fn concrete_indices(&self, state: &ClusterState, indices: &[String]) -> Result<Vec<String>> {
        let known = state.metadata.index_names();
        if indices.is_empty() || indices.iter().any(|name| name == ALL_INDICES) {
            return Ok(known);
        }

        let mut concrete: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !concrete.iter().any(|existing| existing == name) {
                concrete.push(name.to_string());
            }
        };

        for expression in indices {
            if expression.contains('*') {
                let pattern = wildcard_regex(expression)?;
                known
                    .iter()
                    .filter(|name| pattern.is_match(name.as_str()))
                    .for_each(|name| push(name.as_str()));
            } else if state.metadata.has_index(expression) {
                push(expression.as_str());
            } else {
                return Err(TermsCountError::index_not_found(expression.as_str()));
            }
        }
        Ok(concrete)
    }
}

fn wildcard_regex(expression: &str) -> Result<Regex> {
    let body = expression
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
        .map_err(|e| TermsCountError::invalid_operation(format!("bad index pattern: {e}")))
}
