//! Transport between nodes living in the same process.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, TermsCountError};
use crate::shard::indices::IndicesService;
use crate::transport::channel::ShardChannel;
use crate::transport::message::{
    SHARD_TERMS_COUNT_ACTION, ShardTermsRequest, ShardTermsResponse, TransportResponse, decode,
    encode,
};

/// A request frame and the channel its reply goes to.
struct Envelope {
    frame: Vec<u8>,
    reply: Sender<Vec<u8>>,
}

/// Connects nodes of one process through channels carrying encoded frames.
///
/// Every registered node gets a handler thread that decodes requests, runs
/// the shard operation against the node's [`IndicesService`] and sends back
/// an encoded [`TransportResponse`].
pub struct InProcessTransport {
    nodes: RwLock<HashMap<String, Sender<Envelope>>>,
    handlers: Mutex<Vec<JoinHandle<()>>>,
    reply_timeout: Duration,
}

impl InProcessTransport {
    pub fn new(reply_timeout: Duration) -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            handlers: Mutex::new(Vec::new()),
            reply_timeout,
        }
    }

    /// Connect a node. Re-registering a node replaces its previous handler.
    pub fn register_node(&self, indices: Arc<IndicesService>) -> Result<()> {
        let node_id = indices.node_id().to_string();
        let (sender, receiver) = crossbeam_channel::unbounded();

        let handle = thread::Builder::new()
            .name(format!("transport-{node_id}"))
            .spawn(move || handle_requests(indices, receiver))?;

        log::debug!("transport: node [{node_id}] connected");
        self.nodes.write().insert(node_id, sender);
        self.handlers.lock().push(handle);
        Ok(())
    }

    /// Disconnect a node. Pending and later requests to it fail as unreachable.
    pub fn disconnect_node(&self, node_id: &str) -> bool {
        let removed = self.nodes.write().remove(node_id).is_some();
        if removed {
            log::debug!("transport: node [{node_id}] disconnected");
        }
        removed
    }

    pub fn is_connected(&self, node_id: &str) -> bool {
        self.nodes.read().contains_key(node_id)
    }

    /// Disconnect every node and wait for the handler threads to exit.
    pub fn shutdown(&self) {
        self.nodes.write().clear();
        let handles: Vec<JoinHandle<()>> = self.handlers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                log::warn!("transport: handler thread panicked");
            }
        }
    }
}

impl ShardChannel for InProcessTransport {
    fn run_on_owner(&self, node: &str, request: ShardTermsRequest) -> Result<ShardTermsResponse> {
        let shard = request.shard.clone();
        let unreachable =
            |reason: String| TermsCountError::partition_unreachable(shard.clone(), node, reason);

        let sender = self
            .nodes
            .read()
            .get(node)
            .cloned()
            .ok_or_else(|| unreachable("node not connected".to_string()))?;

        let frame = encode(&request)?;
        let (reply_sender, reply_receiver) = crossbeam_channel::bounded(1);
        sender
            .send(Envelope {
                frame,
                reply: reply_sender,
            })
            .map_err(|_| unreachable("connection closed".to_string()))?;

        log::trace!("sent [{SHARD_TERMS_COUNT_ACTION}] for {} to [{node}]", request.shard);

        let reply = reply_receiver
            .recv_timeout(self.reply_timeout)
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    unreachable(format!("no reply within {:?}", self.reply_timeout))
                }
                RecvTimeoutError::Disconnected => {
                    unreachable("connection closed before reply".to_string())
                }
            })?;

        decode::<TransportResponse>(&reply)?.into_result(node)
    }
}

impl Drop for InProcessTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn handle_requests(indices: Arc<IndicesService>, receiver: Receiver<Envelope>) {
    for envelope in receiver.iter() {
        match handle_frame(&indices, &envelope.frame) {
            Ok(reply) => {
                // The caller may have given up waiting.
                let _ = envelope.reply.send(reply);
            }
            Err(e) => {
                log::warn!(
                    "node [{}] dropped [{SHARD_TERMS_COUNT_ACTION}] request: {e}",
                    indices.node_id()
                );
            }
        }
    }
    log::debug!("transport: handler for node [{}] stopped", indices.node_id());
}

fn handle_frame(indices: &IndicesService, frame: &[u8]) -> Result<Vec<u8>> {
    let request: ShardTermsRequest = decode(frame)?;
    let result = panic::catch_unwind(AssertUnwindSafe(|| indices.terms_count(&request)))
        .unwrap_or_else(|_| {
            Err(TermsCountError::internal(format!(
                "shard operation on {} panicked",
                request.shard
            )))
        });
    encode(&TransportResponse::from_result(&request.shard, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ShardId;
    use crate::shard::aggregator::ShardTermsAggregator;
    use crate::shard::memory::{Document, MemoryShard};

    fn node_with_shard(node: &str, shard_id: &ShardId) -> Arc<IndicesService> {
        let indices = Arc::new(IndicesService::new(node, ShardTermsAggregator::default()));
        indices.add_shard(
            shard_id.clone(),
            Arc::new(MemoryShard::from_documents(vec![
                Document::new().add_text("title", "red blue"),
                Document::new().add_text("title", "red"),
            ])),
        );
        indices
    }

    #[test]
    fn test_remote_round_trip() {
        let shard_id = ShardId::new("books", 0);
        let transport = InProcessTransport::new(Duration::from_secs(5));
        transport
            .register_node(node_with_shard("node-2", &shard_id))
            .unwrap();
        assert!(transport.is_connected("node-2"));

        let response = transport
            .run_on_owner("node-2", ShardTermsRequest::new(shard_id.clone(), None))
            .unwrap();
        assert_eq!(response.shard, shard_id);
        assert_eq!(response.terms.get("red"), Some(&2));
        assert_eq!(response.terms.get("blue"), Some(&1));
    }

    #[test]
    fn test_unknown_node_is_unreachable() {
        let transport = InProcessTransport::new(Duration::from_secs(5));
        let err = transport
            .run_on_owner(
                "node-9",
                ShardTermsRequest::new(ShardId::new("books", 0), None),
            )
            .unwrap_err();
        assert!(matches!(err, TermsCountError::PartitionUnreachable { .. }));
    }

    #[test]
    fn test_disconnected_node_is_unreachable() {
        let shard_id = ShardId::new("books", 0);
        let transport = InProcessTransport::new(Duration::from_secs(5));
        transport
            .register_node(node_with_shard("node-2", &shard_id))
            .unwrap();

        assert!(transport.disconnect_node("node-2"));
        assert!(!transport.disconnect_node("node-2"));

        let err = transport
            .run_on_owner("node-2", ShardTermsRequest::new(shard_id, None))
            .unwrap_err();
        assert!(matches!(err, TermsCountError::PartitionUnreachable { .. }));
    }

    #[test]
    fn test_missing_remote_shard_is_not_servable() {
        let transport = InProcessTransport::new(Duration::from_secs(5));
        transport
            .register_node(node_with_shard("node-2", &ShardId::new("books", 0)))
            .unwrap();

        let err = transport
            .run_on_owner(
                "node-2",
                ShardTermsRequest::new(ShardId::new("books", 1), None),
            )
            .unwrap_err();
        assert!(err.is_not_servable());
        transport.shutdown();
        assert!(!transport.is_connected("node-2"));
    }
}
