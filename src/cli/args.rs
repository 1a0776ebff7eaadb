//! Command line argument parsing for the termscount CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::action::OperationThreading;

/// termscount - count terms across the shards of a local cluster
#[derive(Parser, Debug, Clone)]
#[command(name = "termscount")]
#[command(about = "Count term occurrences across the primary shards of a cluster")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct TermsCountArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl TermsCountArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Count terms over the shards of the selected indices
    Count(CountArgs),

    /// Show the shards a request would be sent to
    Shards(ShardsArgs),
}

/// Arguments for counting terms
#[derive(Parser, Debug, Clone)]
pub struct CountArgs {
    /// Cluster fixture file (JSON)
    #[arg(value_name = "FIXTURE")]
    pub fixture: PathBuf,

    /// Index names or wildcard patterns (default: all indices)
    #[arg(short, long = "index", value_name = "INDEX")]
    pub indices: Vec<String>,

    /// Only count terms of this field
    #[arg(long)]
    pub field: Option<String>,

    /// How shards on the coordinating node are scheduled
    #[arg(long)]
    pub threading: Option<Threading>,

    /// Give up if not every shard answered within this many milliseconds
    #[arg(long, value_name = "MILLIS")]
    pub timeout_ms: Option<u64>,

    /// Action configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Coordinating node (default: the fixture's local node)
    #[arg(long)]
    pub node: Option<String>,

    /// Maximum number of terms to print (human output only)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for listing resolved shards
#[derive(Parser, Debug, Clone)]
pub struct ShardsArgs {
    /// Cluster fixture file (JSON)
    #[arg(value_name = "FIXTURE")]
    pub fixture: PathBuf,

    /// Index names or wildcard patterns (default: all indices)
    #[arg(short, long = "index", value_name = "INDEX")]
    pub indices: Vec<String>,
}

/// Scheduling of shards owned by the coordinating node
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Threading {
    /// Run on the calling thread
    NoThreads,
    /// Run one after another on a single worker
    SingleThread,
    /// Run each shard on its own worker task
    ThreadPerShard,
}

impl From<Threading> for OperationThreading {
    fn from(threading: Threading) -> Self {
        match threading {
            Threading::NoThreads => OperationThreading::NoThreads,
            Threading::SingleThread => OperationThreading::SingleThread,
            Threading::ThreadPerShard => OperationThreading::ThreadPerShard,
        }
    }
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_count_command() {
        let args = TermsCountArgs::try_parse_from([
            "termscount",
            "count",
            "cluster.json",
            "-i",
            "books",
            "--index",
            "mov*",
            "--field",
            "title",
            "--threading",
            "single-thread",
            "--timeout-ms",
            "250",
        ])
        .unwrap();

        if let Command::Count(count_args) = args.command {
            assert_eq!(count_args.fixture, PathBuf::from("cluster.json"));
            assert_eq!(count_args.indices, vec!["books", "mov*"]);
            assert_eq!(count_args.field.as_deref(), Some("title"));
            assert_eq!(count_args.threading, Some(Threading::SingleThread));
            assert_eq!(count_args.timeout_ms, Some(250));
            assert!(count_args.config.is_none());
            assert!(count_args.node.is_none());
        } else {
            panic!("Expected Count command");
        }
    }

    #[test]
    fn test_shards_command() {
        let args =
            TermsCountArgs::try_parse_from(["termscount", "shards", "cluster.json"]).unwrap();

        if let Command::Shards(shards_args) = args.command {
            assert_eq!(shards_args.fixture, PathBuf::from("cluster.json"));
            assert!(shards_args.indices.is_empty());
        } else {
            panic!("Expected Shards command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        // Default verbosity
        let args = TermsCountArgs::try_parse_from(["termscount", "shards", "c.json"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args =
            TermsCountArgs::try_parse_from(["termscount", "shards", "c.json", "-vv"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        // Quiet overrides verbose
        let args =
            TermsCountArgs::try_parse_from(["termscount", "-v", "-q", "shards", "c.json"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args = TermsCountArgs::try_parse_from([
            "termscount",
            "count",
            "c.json",
            "--format",
            "json",
            "--pretty",
        ])
        .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(args.pretty);

        assert!(
            TermsCountArgs::try_parse_from(["termscount", "count", "c.json", "--format", "yaml"])
                .is_err()
        );
    }

    #[test]
    fn test_threading_conversion() {
        assert_eq!(
            OperationThreading::from(Threading::NoThreads),
            OperationThreading::NoThreads
        );
        assert_eq!(
            OperationThreading::from(Threading::ThreadPerShard),
            OperationThreading::ThreadPerShard
        );
    }
}
