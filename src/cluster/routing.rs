//! Primary shard routing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one shard of one index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId {
    /// Index name.
    pub index: String,

    /// Shard ordinal within the index.
    pub shard: u32,
}

impl ShardId {
    /// Create a new shard id.
    pub fn new<S: Into<String>>(index: S, shard: u32) -> Self {
        Self {
            index: index.into(),
            shard,
        }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.index, self.shard)
    }
}

/// Allocation state of a shard copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardState {
    /// Not allocated to any node.
    Unassigned,

    /// Allocated but still recovering.
    Initializing,

    /// Allocated and serving.
    Started,

    /// Serving while moving to another node.
    Relocating,
}

impl ShardState {
    /// Whether a copy in this state can serve reads.
    pub fn is_active(&self) -> bool {
        matches!(self, ShardState::Started | ShardState::Relocating)
    }
}

/// Routing entry for the primary copy of a shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRouting {
    /// The shard this entry routes.
    pub shard_id: ShardId,

    /// Current allocation state.
    pub state: ShardState,

    /// Node currently holding the primary, if assigned.
    pub node_id: Option<String>,
}

impl ShardRouting {
    /// Create an unassigned routing entry.
    pub fn unassigned(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            state: ShardState::Unassigned,
            node_id: None,
        }
    }

    /// Whether the primary is active on some node.
    pub fn active(&self) -> bool {
        self.state.is_active() && self.node_id.is_some()
    }
}

/// Primary routing entries of one index, keyed by shard ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRoutingTable {
    pub index: String,
    pub shards: BTreeMap<u32, ShardRouting>,
}

impl IndexRoutingTable {
    /// Create a routing table with `number_of_shards` unassigned primaries.
    pub fn unassigned(index: &str, number_of_shards: u32) -> Self {
        let shards = (0..number_of_shards)
            .map(|shard| (shard, ShardRouting::unassigned(ShardId::new(index, shard))))
            .collect();
        Self {
            index: index.to_string(),
            shards,
        }
    }

    /// Active primaries in ascending shard order.
    pub fn active_primaries(&self) -> impl Iterator<Item = &ShardRouting> {
        self.shards.values().filter(|routing| routing.active())
    }
}

/// Routing table of the whole cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub indices: BTreeMap<String, IndexRoutingTable>,
}

impl RoutingTable {
    /// Routing entries of one index.
    pub fn index(&self, index: &str) -> Option<&IndexRoutingTable> {
        self.indices.get(index)
    }

    /// Group the active primary shards of `indices` by index.
    ///
    /// Shards whose primary is not active are left out entirely, so every
    /// returned target can produce a real success or failure.
    pub fn active_primary_shards_grouped(&self, indices: &[String]) -> GroupedShards {
        let groups = indices
            .iter()
            .map(|index| {
                let targets = self
                    .index(index)
                    .map(|table| {
                        table
                            .active_primaries()
                            .filter_map(|routing| {
                                routing.node_id.as_ref().map(|node| ShardTarget {
                                    shard_id: routing.shard_id.clone(),
                                    node_id: node.clone(),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                ShardGroup {
                    index: index.clone(),
                    targets,
                }
            })
            .collect();
        GroupedShards { groups }
    }
}

/// One shard to query and the node owning its primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTarget {
    pub shard_id: ShardId,
    pub node_id: String,
}

/// Targets of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardGroup {
    pub index: String,
    pub targets: Vec<ShardTarget>,
}

/// Targets grouped by index, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedShards {
    pub groups: Vec<ShardGroup>,
}

impl GroupedShards {
    /// Total number of targets across all groups.
    pub fn size(&self) -> usize {
        self.groups.iter().map(|group| group.targets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Iterate targets in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &ShardTarget> {
        self.groups.iter().flat_map(|group| group.targets.iter())
    }

    /// Flatten into dispatch order.
    pub fn into_targets(self) -> Vec<ShardTarget> {
        self.groups
            .into_iter()
            .flat_map(|group| group.targets.into_iter())
            .collect()
    }
}
