//! Term counting over a single shard.

use std::collections::HashMap;

use crate::cluster::ShardId;
use crate::error::{Result, TermsCountError};
use crate::shard::reader::ShardReader;

/// Mapping from term text to occurrence count.
pub type TermCounts = HashMap<String, u64>;

/// Default marker of internal fields.
pub const RESERVED_FIELD_PREFIX: char = '_';

/// Counts the terms of one shard.
#[derive(Debug, Clone)]
pub struct ShardTermsAggregator {
    reserved_prefix: char,
}

impl Default for ShardTermsAggregator {
    fn default() -> Self {
        Self::new(RESERVED_FIELD_PREFIX)
    }
}

impl ShardTermsAggregator {
    pub fn new(reserved_prefix: char) -> Self {
        Self { reserved_prefix }
    }

    pub fn reserved_prefix(&self) -> char {
        self.reserved_prefix
    }

    /// Count every term of `reader`, or only those of `field` when given.
    ///
    /// Reserved fields never count, even when named by the filter. The
    /// snapshot is released before returning, whatever the outcome.
    pub fn aggregate(
        &self,
        shard: &ShardId,
        reader: &dyn ShardReader,
        field: Option<&str>,
    ) -> Result<TermCounts> {
        let mut snapshot = reader
            .acquire_snapshot()
            .map_err(|e| unreadable(shard, e))?;

        let mut counts = TermCounts::new();
        while let Some(term) = snapshot.next_term().map_err(|e| unreadable(shard, e))? {
            if term.field.starts_with(self.reserved_prefix) {
                continue;
            }
            if field.is_some_and(|wanted| wanted != term.field) {
                continue;
            }
            *counts.entry(term.text).or_insert(0) += 1;
        }

        log::trace!("shard {shard} counted {} distinct terms", counts.len());
        Ok(counts)
    }
}

fn unreadable(shard: &ShardId, err: TermsCountError) -> TermsCountError {
    match err {
        TermsCountError::Io(source) => TermsCountError::partition_unreadable(shard.clone(), source),
        err @ TermsCountError::PartitionUnreadable { .. } => err,
        other => TermsCountError::partition_unreadable(
            shard.clone(),
            std::io::Error::other(other.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::memory::{Document, MemoryShard};

    fn shard_id() -> ShardId {
        ShardId::new("books", 0)
    }

    fn sample_shard() -> MemoryShard {
        MemoryShard::from_documents(vec![
            Document::new()
                .add_text("title", "red fox")
                .add_text("body", "red")
                .add_keyword("_id", "1"),
            Document::new()
                .add_text("title", "blue")
                .add_text("body", "red red red")
                .add_keyword("_id", "2"),
        ])
    }

    #[test]
    fn test_counts_all_non_reserved_fields() {
        let counts = ShardTermsAggregator::default()
            .aggregate(&shard_id(), &sample_shard(), None)
            .unwrap();

        // red: title(doc1) + body(doc1) + body(doc2)
        assert_eq!(counts.get("red"), Some(&3));
        assert_eq!(counts.get("fox"), Some(&1));
        assert_eq!(counts.get("blue"), Some(&1));
        assert!(!counts.contains_key("1"));
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_field_filter_is_exact() {
        let aggregator = ShardTermsAggregator::default();
        let counts = aggregator
            .aggregate(&shard_id(), &sample_shard(), Some("title"))
            .unwrap();
        assert_eq!(counts.get("red"), Some(&1));
        assert_eq!(counts.get("blue"), Some(&1));
        assert_eq!(counts.get("fox"), Some(&1));

        let counts = aggregator
            .aggregate(&shard_id(), &sample_shard(), Some("titl"))
            .unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn test_reserved_fields_never_count() {
        let counts = ShardTermsAggregator::default()
            .aggregate(&shard_id(), &sample_shard(), Some("_id"))
            .unwrap();
        assert!(counts.is_empty());

        let custom = ShardTermsAggregator::new('#');
        let shard = MemoryShard::from_documents(vec![
            Document::new()
                .add_keyword("#meta", "x")
                .add_keyword("_kept", "y"),
        ]);
        let counts = custom.aggregate(&shard_id(), &shard, None).unwrap();
        assert_eq!(counts.keys().collect::<Vec<_>>(), vec!["y"]);
    }

    #[test]
    fn test_failure_releases_snapshot() {
        let shard = sample_shard();
        shard.inject_read_failure(1);

        let err = ShardTermsAggregator::default()
            .aggregate(&shard_id(), &shard, None)
            .unwrap_err();
        match err {
            TermsCountError::PartitionUnreadable { shard: id, .. } => assert_eq!(id, shard_id()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(shard.open_snapshots(), 0);
    }
}
