//! End-to-end terms count scenarios on in-process clusters.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use termscount::action::{
    OperationThreading, TermsCountAction, TermsCountConfig, TermsCountRequest,
};
use termscount::cluster::{ClusterBlock, ClusterBlockLevel, ClusterService, ShardId, ShardState};
use termscount::error::{Result, TermsCountError};
use termscount::local_cluster::{ClusterFixture, LocalCluster};
use termscount::shard::{Document, MemoryShard};
use termscount::transport::{ShardChannel, ShardTermsRequest, ShardTermsResponse};

const COLORS: &str = r#"{
    "local_node": "node-1",
    "nodes": ["node-1", "node-2"],
    "indices": [
        { "name": "colors", "shards": [
            { "id": 0, "node": "node-1", "documents": [
                { "body": "red blue" },
                { "body": "red" }
            ] },
            { "id": 1, "node": "node-2", "documents": [
                { "body": "red" }
            ] }
        ] }
    ]
}"#;

const LIBRARY: &str = r#"{
    "local_node": "node-1",
    "nodes": ["node-1", "node-2", "node-3"],
    "indices": [
        { "name": "books", "keyword_fields": ["_source_id"], "shards": [
            { "id": 0, "node": "node-1", "documents": [
                { "title": "the quick fox", "body": "fox fox dog", "_source_id": "fox" }
            ] },
            { "id": 1, "node": "node-2", "documents": [
                { "title": "lazy dog", "body": "the fox" }
            ] },
            { "id": 2, "node": "node-3", "documents": [
                { "title": "fox tales", "body": "a dog" }
            ] }
        ] },
        { "name": "music", "shards": [
            { "id": 0, "node": "node-2", "documents": [{ "title": "fox on the run" }] },
            { "id": 1, "node": "node-3", "state": "initializing", "documents": [{ "title": "fox" }] }
        ] },
        { "name": "movies", "number_of_shards": 2, "shards": [
            { "id": 0, "node": "node-3", "documents": [{ "title": "fantastic mr fox" }] }
        ] }
    ]
}"#;

fn start(fixture: &str) -> LocalCluster {
    let fixture = ClusterFixture::from_json(fixture).unwrap();
    LocalCluster::from_fixture(&fixture, &TermsCountConfig::default()).unwrap()
}

#[test]
fn test_two_shard_end_to_end() -> Result<()> {
    let cluster = start(COLORS);
    let action = cluster.action(TermsCountConfig::default())?;

    let response = action.execute(&TermsCountRequest::all())?;

    assert_eq!(response.total_shards(), 2);
    assert_eq!(response.successful_shards(), 2);
    assert_eq!(response.failed_shards(), 0);
    assert!(response.shard_failures().is_empty());
    assert_eq!(response.sorted_terms(), vec![("blue", 1), ("red", 3)]);
    assert!(response.is_complete());

    Ok(())
}

#[test]
fn test_failing_shard_is_isolated() -> Result<()> {
    let cluster = start(LIBRARY);
    let action = cluster.action(TermsCountConfig::default())?;
    let baseline = action.execute(&TermsCountRequest::new(["books"]))?;

    // Shard 1 lives on another node, so the failure travels over the transport
    cluster
        .shard(&ShardId::new("books", 1))
        .unwrap()
        .inject_read_failure(1);

    let response = action.execute(&TermsCountRequest::new(["books"]))?;
    assert_eq!(response.total_shards(), 3);
    assert_eq!(response.successful_shards(), 2);
    assert_eq!(response.failed_shards(), 1);

    let failure = &response.shard_failures()[0];
    assert_eq!(failure.index, "books");
    assert_eq!(failure.shard, 1);
    assert!(failure.reason.contains("simulated read failure"));

    // Shards 0 and 2 only: "lazy dog" / "the fox" no longer count
    assert_eq!(response.count("fox"), baseline.count("fox") - 1);
    assert_eq!(response.count("dog"), baseline.count("dog") - 1);
    assert_eq!(response.count("lazy"), 0);
    assert_eq!(response.count("quick"), 1);

    Ok(())
}

#[test]
fn test_field_filter_is_exact() -> Result<()> {
    let cluster = start(LIBRARY);
    let action = cluster.action(TermsCountConfig::default())?;

    let title = action
        .prepare_execute()
        .set_indices(["books"])
        .set_field("title")
        .execute()?;
    assert_eq!(title.count("fox"), 2);
    assert_eq!(title.count("dog"), 1);
    assert_eq!(title.count("a"), 0);

    let body = action
        .prepare_execute()
        .set_indices(["books"])
        .set_field("body")
        .execute()?;
    // Distinct per document: "fox fox dog" contributes one fox
    assert_eq!(body.count("fox"), 2);
    assert_eq!(body.count("dog"), 2);
    assert_eq!(body.count("quick"), 0);

    let missing = action
        .prepare_execute()
        .set_indices(["books"])
        .set_field("summary")
        .execute()?;
    assert!(missing.terms().is_empty());
    assert_eq!(missing.successful_shards(), 3);

    Ok(())
}

#[test]
fn test_reserved_fields_are_never_counted() -> Result<()> {
    let cluster = start(LIBRARY);
    let action = cluster.action(TermsCountConfig::default())?;

    let all = action.execute(&TermsCountRequest::new(["books"]))?;
    let title = action.execute(&TermsCountRequest::new(["books"]).with_field("title"))?;
    let reserved = action.execute(&TermsCountRequest::new(["books"]).with_field("_source_id"))?;

    // "fox" is also the _source_id keyword of shard 0 and must not add to it
    assert_eq!(all.count("fox"), 4);
    assert_eq!(title.count("fox"), 2);
    assert!(reserved.terms().is_empty());

    Ok(())
}

#[test]
fn test_zero_indices_cover_every_active_primary() -> Result<()> {
    let cluster = start(LIBRARY);
    let action = cluster.action(TermsCountConfig::default())?;

    let response = action.execute(&TermsCountRequest::all())?;
    // books 3, music 1 (shard 1 initializing), movies 1 (shard 1 unassigned)
    assert_eq!(response.total_shards(), 5);
    assert_eq!(response.successful_shards(), 5);
    assert_eq!(response.count("fantastic"), 1);
    assert_eq!(response.count("run"), 1);

    let wildcard = action.execute(&TermsCountRequest::new(["m*"]))?;
    assert_eq!(wildcard.total_shards(), 2);

    let explicit = action.execute(&TermsCountRequest::new(["_all"]))?;
    assert_eq!(explicit, response);

    Ok(())
}

#[test]
fn test_result_is_independent_of_coordinator_and_threading() -> Result<()> {
    let cluster = start(LIBRARY);
    let expected = cluster
        .action(TermsCountConfig::default())?
        .execute(&TermsCountRequest::all())?;

    for node in ["node-1", "node-2", "node-3"] {
        let action = cluster.action_on(node, TermsCountConfig::default().with_thread_pool_size(2))?;
        for threading in [
            OperationThreading::NoThreads,
            OperationThreading::SingleThread,
            OperationThreading::ThreadPerShard,
        ] {
            let response =
                action.execute(&TermsCountRequest::all().with_operation_threading(threading))?;
            assert_eq!(response, expected, "node {node}, {threading:?}");
        }
    }

    Ok(())
}

#[test]
fn test_disconnected_node_fails_its_shards() -> Result<()> {
    let cluster = start(LIBRARY);
    let action = cluster.action(TermsCountConfig::default())?;

    assert!(cluster.transport().disconnect_node("node-3"));
    assert!(!cluster.transport().is_connected("node-3"));

    let response = action.execute(&TermsCountRequest::all())?;
    assert_eq!(response.total_shards(), 5);
    assert_eq!(response.successful_shards(), 3);
    assert_eq!(response.failed_shards(), 2);
    for failure in response.shard_failures() {
        assert!(failure.reason.contains("node-3"), "{failure}");
    }
    assert_eq!(response.count("fantastic"), 0);

    Ok(())
}

#[test]
fn test_shard_moved_after_resolution_is_skipped() -> Result<()> {
    let cluster = start(COLORS);
    let action = cluster.action(TermsCountConfig::default())?;

    // Routing still points at node-2 but the shard is gone there
    cluster
        .node("node-2")
        .unwrap()
        .remove_shard(&ShardId::new("colors", 1));

    let response = action.execute(&TermsCountRequest::all())?;
    assert_eq!(response.total_shards(), 2);
    assert_eq!(response.successful_shards(), 1);
    assert_eq!(response.failed_shards(), 0);
    assert!(response.successful_shards() + response.failed_shards() <= response.total_shards());
    assert_eq!(response.count("red"), 2);

    Ok(())
}

#[test]
fn test_routing_changes_apply_to_the_next_request() -> Result<()> {
    let cluster = start(COLORS);
    let action = cluster.action(TermsCountConfig::default())?;

    // Move shard 1 to node-1
    let storage = cluster
        .node("node-2")
        .unwrap()
        .remove_shard(&ShardId::new("colors", 1))
        .unwrap();
    cluster
        .node("node-1")
        .unwrap()
        .add_shard(ShardId::new("colors", 1), storage);
    let state = cluster
        .cluster_service()
        .state()
        .to_builder()
        .route_primary("colors", 1, "node-1", ShardState::Started)?
        .build();
    cluster.cluster_service().publish(state);

    let response = action.execute(&TermsCountRequest::all())?;
    assert_eq!(response.successful_shards(), 2);
    assert_eq!(response.count("red"), 3);

    Ok(())
}

#[test]
fn test_resolution_errors_abort_the_call() -> Result<()> {
    let cluster = start(LIBRARY);
    let action = cluster.action(TermsCountConfig::default())?;

    let err = action
        .execute(&TermsCountRequest::new(["books", "podcasts"]))
        .unwrap_err();
    assert!(matches!(err, TermsCountError::IndexNotFound(ref name) if name == "podcasts"));

    let blocked = cluster
        .cluster_service()
        .state()
        .to_builder()
        .global_block(ClusterBlock::new(
            1,
            "state not recovered",
            vec![ClusterBlockLevel::Read, ClusterBlockLevel::Metadata],
        ))
        .build();
    cluster.cluster_service().publish(blocked);

    let err = action.execute(&TermsCountRequest::all()).unwrap_err();
    assert!(matches!(err, TermsCountError::ClusterBlocked(_)));
    assert!(err.to_string().contains("state not recovered"));

    let metrics = action.metrics();
    assert_eq!(metrics.failed_requests, 2);
    assert_eq!(metrics.shards_total, 0);

    Ok(())
}

#[test]
fn test_timeout_returns_no_partial_result() -> Result<()> {
    struct StalledChannel;

    impl ShardChannel for StalledChannel {
        fn run_on_owner(
            &self,
            _node: &str,
            request: ShardTermsRequest,
        ) -> Result<ShardTermsResponse> {
            std::thread::sleep(Duration::from_millis(500));
            Err(TermsCountError::partition_unreachable(request.shard, "node-2", "stalled"))
        }
    }

    let cluster = start(COLORS);
    let service = Arc::new(cluster.cluster_service().for_node("node-1"));
    let action = TermsCountAction::new(
        TermsCountConfig::default().with_default_timeout(Duration::from_millis(50)),
        service,
        Arc::clone(cluster.node("node-1").unwrap()),
        Arc::new(StalledChannel),
    )?;

    let err = action.execute(&TermsCountRequest::all()).unwrap_err();
    assert!(matches!(err, TermsCountError::Timeout(_)));

    // A per-request timeout overrides the configured default
    let response = action.execute(&TermsCountRequest::all().with_timeout(Duration::from_secs(5)))?;
    assert_eq!(response.failed_shards(), 1);

    Ok(())
}

#[test]
fn test_snapshots_are_released_after_every_request() -> Result<()> {
    let cluster = start(COLORS);
    let action = cluster.action(TermsCountConfig::default())?;
    let local = Arc::clone(cluster.shard(&ShardId::new("colors", 0)).unwrap());

    action.execute(&TermsCountRequest::all())?;
    assert_eq!(local.open_snapshots(), 0);

    local.inject_read_failure(0);
    let response = action.execute(&TermsCountRequest::all())?;
    assert_eq!(response.failed_shards(), 1);
    assert_eq!(local.open_snapshots(), 0);

    // Documents added later are seen by the next request
    local.clear_read_failure();
    local.add_document(&Document::new().add_text("body", "Blue"));
    let response = action.execute(&TermsCountRequest::all())?;
    assert_eq!(response.count("blue"), 2);

    Ok(())
}

#[test]
fn test_fixture_file_and_custom_reserved_prefix() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("cluster.json");
    fs::write(
        &path,
        r##"{
            "local_node": "a",
            "nodes": ["a"],
            "indices": [{ "name": "logs", "shards": [
                { "id": 0, "node": "a", "documents": [{ "msg": "disk full", "#host": "db1", "_level": "warn" }] }
            ] }]
        }"##,
    )?;

    let config = TermsCountConfig {
        reserved_field_prefix: '#',
        ..TermsCountConfig::default()
    };
    let cluster = LocalCluster::from_file(&path, &config)?;
    let response = cluster.action(config)?.execute(&TermsCountRequest::all())?;

    assert_eq!(response.count("disk"), 1);
    assert_eq!(response.count("db1"), 0);
    assert_eq!(response.count("warn"), 1);

    Ok(())
}

#[test]
fn test_memory_shard_can_be_added_directly() -> Result<()> {
    let cluster = start(COLORS);
    let shard = Arc::new(MemoryShard::from_documents([
        Document::new().add_text("body", "green"),
    ]));
    // Not routed, so never queried
    cluster
        .node("node-1")
        .unwrap()
        .add_shard(ShardId::new("colors", 7), shard);

    let response = cluster
        .action(TermsCountConfig::default())?
        .execute(&TermsCountRequest::all())?;
    assert_eq!(response.count("green"), 0);
    assert_eq!(response.total_shards(), 2);

    Ok(())
}

#[tokio::test]
async fn test_execute_async_from_runtime() -> Result<()> {
    let cluster = start(COLORS);
    let action = Arc::new(cluster.action(TermsCountConfig::default())?);

    let handles: Vec<_> = (0..4)
        .map(|_| tokio::spawn(Arc::clone(&action).execute_async(TermsCountRequest::all())))
        .collect();

    for handle in handles {
        let response = handle.await.unwrap()?;
        assert_eq!(response.count("red"), 3);
        assert_eq!(response.count("blue"), 1);
    }
    assert_eq!(action.metrics().total_requests, 4);

    Ok(())
}
