//! Shard-level request/response exchange with the node owning a shard.
//!
//! The coordinator only depends on the [`ShardChannel`] trait. The
//! [`InProcessTransport`] implementation runs one handler thread per node and
//! passes bincode-encoded frames between them.

pub mod channel;
pub mod in_process;
pub mod message;

pub use channel::ShardChannel;
pub use in_process::InProcessTransport;
pub use message::{ShardTermsRequest, ShardTermsResponse, TransportResponse};
