//! A multi-node cluster running inside one process.
//!
//! The cluster is described by a [`ClusterFixture`], usually loaded from a
//! JSON file:
//!
//! ```json
//! {
//!   "local_node": "node-1",
//!   "nodes": ["node-1", "node-2"],
//!   "indices": [
//!     {
//!       "name": "books",
//!       "keyword_fields": ["tag"],
//!       "shards": [
//!         { "id": 0, "node": "node-1", "documents": [{ "title": "red blue" }] },
//!         { "id": 1, "node": "node-2", "state": "relocating", "documents": [] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::action::{TermsCountAction, TermsCountConfig};
use crate::cluster::{
    ClusterBlocks, ClusterService, ClusterState, IndexMetadata, ShardId, ShardState,
    StaticClusterService,
};
use crate::error::{Result, TermsCountError};
use crate::shard::{Document, IndicesService, MemoryShard, ShardTermsAggregator};
use crate::transport::InProcessTransport;

/// Serializable description of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterFixture {
    /// Node that coordinates by default.
    pub local_node: String,

    /// Every node of the cluster.
    pub nodes: Vec<String>,

    #[serde(default)]
    pub indices: Vec<IndexFixture>,

    #[serde(default)]
    pub blocks: ClusterBlocks,
}

/// One index and the placement of its primaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFixture {
    pub name: String,

    /// Defaults to one past the highest listed shard id.
    #[serde(default)]
    pub number_of_shards: Option<u32>,

    /// Fields indexed verbatim instead of tokenized.
    #[serde(default)]
    pub keyword_fields: Vec<String>,

    #[serde(default)]
    pub shards: Vec<ShardFixture>,
}

/// Placement and content of one primary shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardFixture {
    pub id: u32,

    #[serde(default)]
    pub node: Option<String>,

    #[serde(default = "started")]
    pub state: ShardState,

    /// Documents as field name to value maps.
    #[serde(default)]
    pub documents: Vec<BTreeMap<String, String>>,
}

fn started() -> ShardState {
    ShardState::Started
}

impl ClusterFixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read cluster fixture {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Build the cluster state the fixture describes.
    pub fn cluster_state(&self) -> Result<ClusterState> {
        let mut builder = ClusterState::builder();
        for index in &self.indices {
            builder = builder.put_index(IndexMetadata::new(&index.name, index.shard_count()));
            for shard in &index.shards {
                let node = match (&shard.node, shard.state) {
                    (_, ShardState::Unassigned) => "",
                    (Some(node), _) => {
                        self.check_node(node)?;
                        node.as_str()
                    }
                    (None, state) => {
                        return Err(TermsCountError::invalid_config(format!(
                            "shard {} is {state:?} but has no node",
                            ShardId::new(&index.name, shard.id)
                        )));
                    }
                };
                builder = builder.route_primary(&index.name, shard.id, node, shard.state)?;
            }
        }

        let mut state = builder.build();
        state.blocks = self.blocks.clone();
        Ok(state)
    }

    fn check_node(&self, node: &str) -> Result<()> {
        if self.nodes.iter().any(|known| known == node) {
            Ok(())
        } else {
            Err(TermsCountError::invalid_config(format!(
                "unknown node [{node}]"
            )))
        }
    }
}

impl IndexFixture {
    fn shard_count(&self) -> u32 {
        self.number_of_shards.unwrap_or_else(|| {
            self.shards
                .iter()
                .map(|shard| shard.id + 1)
                .max()
                .unwrap_or(0)
        })
    }

    fn document(&self, fields: &BTreeMap<String, String>) -> Document {
        fields.iter().fold(Document::new(), |doc, (field, value)| {
            if self.keyword_fields.contains(field) {
                doc.add_keyword(field, value)
            } else {
                doc.add_text(field, value)
            }
        })
    }
}

/// Nodes, their shards and the transport between them.
pub struct LocalCluster {
    cluster: Arc<StaticClusterService>,
    nodes: BTreeMap<String, Arc<IndicesService>>,
    shards: HashMap<ShardId, Arc<MemoryShard>>,
    transport: Arc<InProcessTransport>,
}

impl LocalCluster {
    /// Start every node of `fixture` and connect them.
    ///
    /// Data nodes count terms with `config.reserved_field_prefix` and the
    /// transport waits up to `config.transport_timeout` for replies.
    pub fn from_fixture(fixture: &ClusterFixture, config: &TermsCountConfig) -> Result<Self> {
        config.validate()?;
        fixture.check_node(&fixture.local_node)?;
        let state = fixture.cluster_state()?;

        let nodes: BTreeMap<String, Arc<IndicesService>> = fixture
            .nodes
            .iter()
            .map(|node| {
                let aggregator = ShardTermsAggregator::new(config.reserved_field_prefix);
                let service = IndicesService::new(node.as_str(), aggregator);
                (node.clone(), Arc::new(service))
            })
            .collect();

        let mut shards = HashMap::new();
        for index in &fixture.indices {
            for shard in &index.shards {
                let Some(node) = shard.node.as_ref().and_then(|node| nodes.get(node)) else {
                    continue;
                };
                if shard.state == ShardState::Unassigned {
                    continue;
                }
                let shard_id = ShardId::new(&index.name, shard.id);
                let memory = Arc::new(MemoryShard::from_documents(
                    shard.documents.iter().map(|fields| index.document(fields)),
                ));
                node.add_shard(shard_id.clone(), memory.clone());
                shards.insert(shard_id, memory);
            }
        }

        let transport = Arc::new(InProcessTransport::new(config.transport_timeout));
        for service in nodes.values() {
            transport.register_node(Arc::clone(service))?;
        }

        log::info!(
            "local cluster started: {} nodes, {} shards, coordinator [{}]",
            nodes.len(),
            shards.len(),
            fixture.local_node
        );

        Ok(Self {
            cluster: Arc::new(StaticClusterService::new(fixture.local_node.as_str(), state)),
            nodes,
            shards,
            transport,
        })
    }

    /// Load a fixture file and start the cluster it describes.
    pub fn from_file<P: AsRef<Path>>(path: P, config: &TermsCountConfig) -> Result<Self> {
        Self::from_fixture(&ClusterFixture::from_file(path)?, config)
    }

    /// Terms count action coordinated by the default local node.
    pub fn action(&self, config: TermsCountConfig) -> Result<TermsCountAction> {
        let node = self.cluster.local_node_id().to_string();
        self.action_on(&node, config)
    }

    /// Terms count action coordinated by `node`.
    pub fn action_on(&self, node: &str, config: TermsCountConfig) -> Result<TermsCountAction> {
        let indices = self
            .nodes
            .get(node)
            .ok_or_else(|| TermsCountError::invalid_config(format!("unknown node [{node}]")))?;
        TermsCountAction::new(
            config,
            Arc::new(self.cluster.for_node(node)),
            Arc::clone(indices),
            self.transport.clone(),
        )
    }

    pub fn cluster_service(&self) -> &Arc<StaticClusterService> {
        &self.cluster
    }

    pub fn node(&self, node: &str) -> Option<&Arc<IndicesService>> {
        self.nodes.get(node)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Storage of a started shard.
    pub fn shard(&self, shard_id: &ShardId) -> Option<&Arc<MemoryShard>> {
        self.shards.get(shard_id)
    }

    pub fn transport(&self) -> &Arc<InProcessTransport> {
        &self.transport
    }
}
