//! Merging of per-shard outcomes into one response.

use crate::action::outcome::ShardOutcome;
use crate::action::response::TermsCountResponse;
use crate::shard::aggregator::TermCounts;

/// Combines shard outcomes into a [`TermsCountResponse`].
///
/// Term counts are summed across successful shards, so the result does not
/// depend on the order outcomes are given in.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShardResultsMerger;

impl ShardResultsMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge every outcome of one request.
    ///
    /// `total_shards` is the number of outcomes. Not-servable shards count
    /// towards neither successes nor failures. Failures are ordered by index
    /// and shard.
    pub fn merge<'a, I>(&self, outcomes: I) -> TermsCountResponse
    where
        I: IntoIterator<Item = &'a ShardOutcome>,
    {
        let mut total_shards = 0;
        let mut successful_shards = 0;
        let mut failed_shards = 0;
        let mut shard_failures = Vec::new();
        let mut terms = TermCounts::new();

        for outcome in outcomes {
            total_shards += 1;
            match outcome {
                ShardOutcome::NotServable(shard) => {
                    log::debug!("shard {shard} not active, skipped");
                }
                ShardOutcome::Failure(failure) => {
                    failed_shards += 1;
                    shard_failures.push(failure.clone());
                }
                ShardOutcome::Success(response) => {
                    successful_shards += 1;
                    add_counts(&mut terms, &response.terms);
                }
            }
        }
        shard_failures.sort_by(|a, b| {
            (&a.index, a.shard, &a.reason).cmp(&(&b.index, b.shard, &b.reason))
        });

        TermsCountResponse::new(
            total_shards,
            successful_shards,
            failed_shards,
            shard_failures,
            terms,
        )
    }
}

/// Add every count of `local` into `global`. Counts saturate at `u64::MAX`.
pub fn add_counts(global: &mut TermCounts, local: &TermCounts) {
    for (term, count) in local {
        match global.get_mut(term) {
            Some(total) => *total = total.saturating_add(*count),
            None => {
                global.insert(term.clone(), *count);
            }
        }
    }
}
