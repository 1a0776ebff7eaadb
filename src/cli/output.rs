//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::action::{ShardFailure, TermsCountResponse};
use crate::cli::args::{OutputFormat, TermsCountArgs};
use crate::cluster::GroupedShards;
use crate::error::Result;

/// Result structure for a terms count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResult {
    pub total_shards: usize,
    pub successful_shards: usize,
    pub failed_shards: usize,
    pub shard_failures: Vec<ShardFailure>,
    /// Terms by descending count, ties by term.
    pub terms: Vec<TermEntry>,
    pub duration_ms: u64,
}

/// One term and its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub term: String,
    pub count: u64,
}

impl CountResult {
    pub fn new(response: &TermsCountResponse, duration_ms: u64) -> Self {
        let mut terms: Vec<TermEntry> = response
            .sorted_terms()
            .into_iter()
            .map(|(term, count)| TermEntry {
                term: term.to_string(),
                count,
            })
            .collect();
        // sorted_terms is ordered by term, so a stable sort keeps ties by term
        terms.sort_by(|a, b| b.count.cmp(&a.count));

        Self {
            total_shards: response.total_shards(),
            successful_shards: response.successful_shards(),
            failed_shards: response.failed_shards(),
            shard_failures: response.shard_failures().to_vec(),
            terms,
            duration_ms,
        }
    }
}

/// Shards a request resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardListing {
    pub indices: Vec<IndexShards>,
}

/// Resolved shards of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexShards {
    pub index: String,
    pub shards: Vec<ShardPlacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardPlacement {
    pub shard: u32,
    pub node: String,
}

impl From<&GroupedShards> for ShardListing {
    fn from(grouped: &GroupedShards) -> Self {
        Self {
            indices: grouped
                .groups
                .iter()
                .map(|group| IndexShards {
                    index: group.index.clone(),
                    shards: group
                        .targets
                        .iter()
                        .map(|target| ShardPlacement {
                            shard: target.shard_id.shard,
                            node: target.node_id.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Results that know how to print themselves for people.
pub trait HumanOutput {
    fn print_human(&self, args: &TermsCountArgs, limit: Option<usize>);
}

impl HumanOutput for CountResult {
    fn print_human(&self, args: &TermsCountArgs, limit: Option<usize>) {
        println!(
            "Shards: {} total, {} successful, {} failed",
            self.total_shards, self.successful_shards, self.failed_shards
        );
        for failure in &self.shard_failures {
            println!("  failed {failure}");
        }
        if args.verbosity() > 1 {
            println!("Took {} ms", self.duration_ms);
        }
        println!();

        if self.terms.is_empty() {
            println!("No terms found.");
            return;
        }

        let shown = limit.unwrap_or(self.terms.len()).min(self.terms.len());
        let width = self.terms[..shown]
            .iter()
            .map(|entry| entry.term.chars().count())
            .max()
            .unwrap_or(0);
        for entry in &self.terms[..shown] {
            println!("{:<width$}  {}", entry.term, entry.count);
        }
        if shown < self.terms.len() {
            println!("... {} more terms", self.terms.len() - shown);
        }
    }
}

impl HumanOutput for ShardListing {
    fn print_human(&self, _args: &TermsCountArgs, _limit: Option<usize>) {
        if self.indices.is_empty() {
            println!("No indices matched.");
            return;
        }
        for index in &self.indices {
            println!("{} ({} active primaries)", index.index, index.shards.len());
            for placement in &index.shards {
                println!("  [{}] -> {}", placement.shard, placement.node);
            }
        }
    }
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &TermsCountArgs,
    limit: Option<usize>,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            result.print_human(args, limit);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &TermsCountArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}
