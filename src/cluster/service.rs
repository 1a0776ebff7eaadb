//! Access to the current cluster state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::cluster::state::ClusterState;

/// Source of cluster state snapshots for the local node.
pub trait ClusterService: Send + Sync {
    /// The current state. Callers keep the returned snapshot for the whole
    /// operation, so later publications do not affect it.
    fn state(&self) -> Arc<ClusterState>;

    /// Id of the node this service runs on.
    fn local_node_id(&self) -> &str;
}

/// Cluster service holding a state that is replaced wholesale on publish.
#[derive(Debug)]
pub struct StaticClusterService {
    local_node_id: String,
    state: Arc<RwLock<Arc<ClusterState>>>,
}

impl StaticClusterService {
    pub fn new<S: Into<String>>(local_node_id: S, state: ClusterState) -> Self {
        Self {
            local_node_id: local_node_id.into(),
            state: Arc::new(RwLock::new(Arc::new(state))),
        }
    }

    /// Replace the current state. The version is bumped past the previous one.
    pub fn publish(&self, mut state: ClusterState) {
        let mut current = self.state.write();
        if state.version <= current.version {
            state.version = current.version + 1;
        }
        log::debug!("publishing cluster state version {}", state.version);
        *current = Arc::new(state);
    }

    /// Same service as seen from another node. Both share one state, so a
    /// publish through either is visible to the other.
    pub fn for_node<S: Into<String>>(&self, local_node_id: S) -> Self {
        Self {
            local_node_id: local_node_id.into(),
            state: Arc::clone(&self.state),
        }
    }
}

impl ClusterService for StaticClusterService {
    fn state(&self) -> Arc<ClusterState> {
        Arc::clone(&self.state.read())
    }

    fn local_node_id(&self) -> &str {
        &self.local_node_id
    }
}
