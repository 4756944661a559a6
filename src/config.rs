use std::time::Duration;

use thiserror::Error;

use crate::consensus::peers::ReplicaId;

pub const DEFAULT_TX_SIZE: usize = 4096;
pub const DEFAULT_NETWORK_DELAY: Duration = Duration::from_millis(1);
pub const DEFAULT_REPLICAS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("replica count must be at least 1")]
    NoReplicas,
    #[error("transaction size must be greater than zero")]
    ZeroTxSize,
    #[error("replica id {id} out of range for {n_replicas} replicas")]
    ReplicaOutOfRange { id: ReplicaId, n_replicas: usize },
    #[error("quorum threshold {threshold} exceeds replica count {n_replicas}")]
    UnreachableQuorum { threshold: usize, n_replicas: usize },
}

/// How many signatures complete a QC for a given replica count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QuorumRule {
    /// floor(2n/3) + 1. Matches 2f+1 only when n = 3f+1.
    #[default]
    TwoThirdsPlusOne,
    /// 2f+1 for an explicit fault tolerance f.
    ByzantineFaults(usize),
}

impl QuorumRule {
    pub fn threshold(&self, n_replicas: usize) -> usize {
        match self {
            QuorumRule::TwoThirdsPlusOne => 2 * n_replicas / 3 + 1,
            QuorumRule::ByzantineFaults(f) => 2 * f + 1,
        }
    }
}

/// Parameters shared by every replica of a run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Outbound payloads are padded or truncated to exactly this many bytes.
    pub tx_size: usize,
    /// Fixed delivery latency applied by the transport.
    pub network_delay: Duration,
    pub n_replicas: usize,
    pub quorum: QuorumRule,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            tx_size: DEFAULT_TX_SIZE,
            network_delay: DEFAULT_NETWORK_DELAY,
            n_replicas: DEFAULT_REPLICAS,
            quorum: QuorumRule::default(),
        }
    }
}

impl RunConfig {
    pub fn new(n_replicas: usize) -> Self {
        RunConfig {
            n_replicas,
            ..Default::default()
        }
    }

    pub fn with_tx_size(mut self, tx_size: usize) -> Self {
        self.tx_size = tx_size;
        self
    }

    pub fn with_network_delay(mut self, network_delay: Duration) -> Self {
        self.network_delay = network_delay;
        self
    }

    pub fn with_quorum(mut self, quorum: QuorumRule) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn quorum_threshold(&self) -> usize {
        self.quorum.threshold(self.n_replicas)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_replicas == 0 {
            return Err(ConfigError::NoReplicas);
        }
        if self.tx_size == 0 {
            return Err(ConfigError::ZeroTxSize);
        }
        let threshold = self.quorum_threshold();
        if threshold > self.n_replicas {
            return Err(ConfigError::UnreachableQuorum {
                threshold,
                n_replicas: self.n_replicas,
            });
        }
        Ok(())
    }

    /// Validated configuration for the replica with identity `id`.
    pub fn for_replica(&self, id: ReplicaId) -> Result<ReplicaConfig, ConfigError> {
        self.validate()?;
        if id >= self.n_replicas {
            return Err(ConfigError::ReplicaOutOfRange {
                id,
                n_replicas: self.n_replicas,
            });
        }
        Ok(ReplicaConfig {
            id,
            run: self.clone(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct ReplicaConfig {
    pub id: ReplicaId,
    pub run: RunConfig,
}
