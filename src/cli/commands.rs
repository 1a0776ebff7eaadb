//! Command implementations for the termscount CLI.

use std::time::Duration;

use crate::action::metrics::Timer;
use crate::action::{ShardTargetResolver, TermsCountConfig};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::Result;
use crate::local_cluster::{ClusterFixture, LocalCluster};

/// Execute a CLI command.
pub fn execute_command(args: TermsCountArgs) -> Result<()> {
    match &args.command {
        Command::Count(count_args) => count_terms(count_args.clone(), &args),
        Command::Shards(shards_args) => list_shards(shards_args.clone(), &args),
    }
}

/// Start the fixture cluster and count terms from the coordinating node.
fn count_terms(args: CountArgs, cli_args: &TermsCountArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            log::info!("loading configuration from {}", path.display());
            TermsCountConfig::from_file(path)?
        }
        None => TermsCountConfig::default(),
    };

    let cluster = LocalCluster::from_file(&args.fixture, &config)?;
    let action = match &args.node {
        Some(node) => cluster.action_on(node, config)?,
        None => cluster.action(config)?,
    };

    let mut builder = action.prepare_execute().set_indices(args.indices.iter());
    if let Some(field) = &args.field {
        builder = builder.set_field(field.as_str());
    }
    if let Some(threading) = args.threading {
        builder = builder.set_operation_threading(threading.into());
    }
    if let Some(millis) = args.timeout_ms {
        builder = builder.set_timeout(Duration::from_millis(millis));
    }

    let timer = Timer::start();
    let response = builder.execute()?;
    let duration_ms = timer.stop().as_millis() as u64;

    if !response.is_complete() {
        log::warn!(
            "{} of {} shards failed",
            response.failed_shards(),
            response.total_shards()
        );
    }

    output_result(
        &format!("Terms counted from node [{}]", action.local_node_id()),
        &CountResult::new(&response, duration_ms),
        cli_args,
        args.limit,
    )
}

/// Resolve the requested indices without dispatching anything.
fn list_shards(args: ShardsArgs, cli_args: &TermsCountArgs) -> Result<()> {
    let fixture = ClusterFixture::from_file(&args.fixture)?;
    let state = fixture.cluster_state()?;
    let grouped = ShardTargetResolver::new().resolve(&state, &args.indices)?;

    output_result(
        &format!("{} shards resolved", grouped.size()),
        &ShardListing::from(&grouped),
        cli_args,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"{
        "local_node": "node-1",
        "nodes": ["node-1", "node-2"],
        "indices": [
            { "name": "books", "shards": [
                { "id": 0, "node": "node-1", "documents": [{ "title": "red blue" }] },
                { "id": 1, "node": "node-2", "documents": [{ "title": "red" }] }
            ] }
        ]
    }"#;

    fn fixture_file(dir: &TempDir) -> String {
        let path = dir.path().join("cluster.json");
        fs::write(&path, FIXTURE).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_count_and_shards_commands() {
        let dir = TempDir::new().unwrap();
        let fixture = fixture_file(&dir);

        let args = TermsCountArgs::try_parse_from([
            "termscount",
            "-q",
            "--format",
            "json",
            "count",
            fixture.as_str(),
            "--node",
            "node-2",
        ])
        .unwrap();
        assert!(execute_command(args).is_ok());

        let args =
            TermsCountArgs::try_parse_from(["termscount", "-q", "shards", fixture.as_str()])
                .unwrap();
        assert!(execute_command(args).is_ok());
    }

    #[test]
    fn test_command_errors() {
        let dir = TempDir::new().unwrap();
        let fixture = fixture_file(&dir);

        // Unknown index
        let args = TermsCountArgs::try_parse_from([
            "termscount",
            "count",
            fixture.as_str(),
            "-i",
            "music",
        ])
        .unwrap();
        assert!(execute_command(args).is_err());

        // Missing fixture
        let missing = dir.path().join("missing.json").to_string_lossy().to_string();
        let args = TermsCountArgs::try_parse_from(["termscount", "shards", missing.as_str()])
        .unwrap();
        assert!(execute_command(args).is_err());

        // Invalid configuration
        let config = dir.path().join("config.json");
        fs::write(&config, r#"{ "thread_pool_size": 0 }"#).unwrap();
        let config = config.to_string_lossy().to_string();
        let args = TermsCountArgs::try_parse_from([
            "termscount",
            "count",
            fixture.as_str(),
            "--config",
            config.as_str(),
        ])
        .unwrap();
        assert!(execute_command(args).is_err());
    }
}
