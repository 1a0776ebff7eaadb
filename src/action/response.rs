//! The merged terms count response.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cluster::ShardId;
use crate::error::Result;
use crate::shard::aggregator::TermCounts;

/// Why one shard did not contribute to the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardFailure {
    pub index: String,
    pub shard: u32,
    pub reason: String,
}

impl ShardFailure {
    pub fn new<S: Into<String>>(shard_id: &ShardId, reason: S) -> Self {
        Self {
            index: shard_id.index.clone(),
            shard: shard_id.shard,
            reason: reason.into(),
        }
    }

    pub fn shard_id(&self) -> ShardId {
        ShardId::new(self.index.as_str(), self.shard)
    }
}

impl fmt::Display for ShardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}] {}", self.index, self.shard, self.reason)
    }
}

/// Global term counts together with shard accounting.
///
/// `total_shards` is the number of shards the request was sent to.
/// `successful_shards + failed_shards` can be lower when shards turned out
/// not to be active on their owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsCountResponse {
    total_shards: usize,
    successful_shards: usize,
    failed_shards: usize,
    shard_failures: Vec<ShardFailure>,
    #[serde(with = "term_entries")]
    terms: TermCounts,
}

impl TermsCountResponse {
    pub fn new(
        total_shards: usize,
        successful_shards: usize,
        failed_shards: usize,
        shard_failures: Vec<ShardFailure>,
        terms: TermCounts,
    ) -> Self {
        Self {
            total_shards,
            successful_shards,
            failed_shards,
            shard_failures,
            terms,
        }
    }

    pub fn total_shards(&self) -> usize {
        self.total_shards
    }

    pub fn successful_shards(&self) -> usize {
        self.successful_shards
    }

    pub fn failed_shards(&self) -> usize {
        self.failed_shards
    }

    pub fn shard_failures(&self) -> &[ShardFailure] {
        &self.shard_failures
    }

    pub fn terms(&self) -> &TermCounts {
        &self.terms
    }

    /// Global count of one term, zero when absent.
    pub fn count(&self, term: &str) -> u64 {
        self.terms.get(term).copied().unwrap_or(0)
    }

    /// Terms in lexicographic order.
    pub fn sorted_terms(&self) -> Vec<(&str, u64)> {
        let mut terms: Vec<(&str, u64)> = self
            .terms
            .iter()
            .map(|(term, count)| (term.as_str(), *count))
            .collect();
        terms.sort_unstable();
        terms
    }

    /// True when no shard failed, so the counts cover every queried shard.
    pub fn is_complete(&self) -> bool {
        self.failed_shards == 0
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Terms travel as `(term, count)` entries sorted by term. Repeated entries
/// for the same term are summed when read back, saturating at `u64::MAX`.
mod term_entries {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::shard::aggregator::TermCounts;

    pub fn serialize<S: Serializer>(
        terms: &TermCounts,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut entries: Vec<(&String, &u64)> = terms.iter().collect();
        entries.sort_unstable();
        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
        for entry in entries {
            seq.serialize_element(&entry)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<TermCounts, D::Error> {
        let entries: Vec<(String, u64)> = Vec::deserialize(deserializer)?;
        let mut terms = TermCounts::with_capacity(entries.len());
        for (term, count) in entries {
            let total = terms.entry(term).or_insert(0);
            *total = total.saturating_add(count);
        }
        Ok(terms)
    }
}
