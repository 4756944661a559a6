pub mod cluster;
pub mod simulated;

pub use cluster::*;
pub use simulated::*;

use thiserror::Error;

use crate::{
    config::ConfigError,
    consensus::{codec::CommandError, peers::ReplicaId},
};

/*
    The transport is best-effort and fire-and-forget: a send schedules
    delivery after the configured latency and returns immediately. There is
    no acknowledgment and no retry. Messages from one sender to one receiver
    arrive in send order.
*/

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("unknown peer {0}")]
    UnknownPeer(ReplicaId),
    #[error("link {from} -> {to} is closed")]
    LinkClosed { from: ReplicaId, to: ReplicaId },
    #[error("inbox of replica {0} is closed")]
    InboxClosed(ReplicaId),
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    #[error("rejected command: {0}")]
    Command(#[from] CommandError),
}

/// What a replica's inbox carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Framed wire payload.
    Payload(Vec<u8>),
    /// Client command to queue for proposal.
    Submit(String),
}

pub trait Transport: Send + Sync {
    /// Deliver `payload` to every peer except `from`.
    fn broadcast(&self, from: ReplicaId, payload: Vec<u8>) -> Result<(), NetworkError>;

    fn unicast(&self, from: ReplicaId, to: ReplicaId, payload: Vec<u8>) -> Result<(), NetworkError>;
}
