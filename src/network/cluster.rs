use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info};

use super::{ClusterError, Inbound, NetworkError, SimulatedNetwork};
use crate::{
    common::{
        crypto::{Ed25519Signer, PlaceholderSigner, VoteSigner},
        hash::GENESIS_HASH,
    },
    config::RunConfig,
    consensus::{
        codec::{check_command, encode_message, frame},
        executor::CommandLog,
        message::Message,
        peers::{LeaderElection, ReplicaId},
        processor::ConsensusProcessor,
        qc::QuorumCertificate,
        replica::{Replica, ReplicaStatus},
    },
};

const INBOX_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SignatureScheme {
    #[default]
    Placeholder,
    Ed25519,
}

#[derive(Clone, Debug)]
pub struct ReplicaReport {
    pub status: ReplicaStatus,
    pub executed: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ClusterReport {
    pub replicas: Vec<ReplicaReport>,
}

impl ClusterReport {
    pub fn all_reached_consensus(&self) -> bool {
        self.replicas
            .iter()
            .all(|r| r.status.metrics.reached_consensus)
    }
}

/// n isolated replicas in one process, connected by a [`SimulatedNetwork`].
///
/// There is no view change, so the cluster plays the part that would
/// otherwise send NEW_VIEW: each round it certifies the leader's latest
/// proposal and hands the leader the next view.
pub struct Cluster {
    config: RunConfig,
    leader: ReplicaId,
    network: SimulatedNetwork,
    inboxes: Vec<mpsc::Sender<Inbound>>,
    statuses: Vec<watch::Receiver<ReplicaStatus>>,
    logs: Vec<CommandLog>,
    processors: Vec<JoinHandle<()>>,
    round_interval: Duration,
}

impl Cluster {
    /// Spawn one processor per replica. Must be called from within a tokio runtime.
    pub fn start(config: RunConfig, scheme: SignatureScheme) -> Result<Self, ClusterError> {
        config.validate()?;
        let n = config.n_replicas;

        let signers: Vec<Box<dyn VoteSigner>> = match scheme {
            SignatureScheme::Placeholder => (0..n)
                .map(|id| Box::new(PlaceholderSigner::new(id)) as Box<dyn VoteSigner>)
                .collect(),
            SignatureScheme::Ed25519 => Ed25519Signer::generate_committee(n)
                .into_iter()
                .map(|signer| Box::new(signer) as Box<dyn VoteSigner>)
                .collect(),
        };

        let (inboxes, receivers): (Vec<_>, Vec<_>) =
            (0..n).map(|_| mpsc::channel(INBOX_CAPACITY)).unzip();
        let network = SimulatedNetwork::new(&inboxes, config.network_delay);
        let start = Instant::now();

        let mut statuses = Vec::with_capacity(n);
        let mut logs = Vec::with_capacity(n);
        let mut processors = Vec::with_capacity(n);
        for ((id, signer), msg_rx) in signers.into_iter().enumerate().zip(receivers) {
            let log = CommandLog::new(id);
            let replica = Replica::new(config.for_replica(id)?, signer, Box::new(log.clone()));
            let (mut processor, status_rx) =
                ConsensusProcessor::new(replica, msg_rx, network.clone(), start);
            processors.push(tokio::spawn(async move {
                processor.run().await;
            }));
            statuses.push(status_rx);
            logs.push(log);
        }

        info!(replicas = n, ?scheme, delay = ?config.network_delay, "cluster started");
        Ok(Cluster {
            round_interval: config.network_delay * 10,
            leader: LeaderElection::default().leader(0),
            config,
            network,
            inboxes,
            statuses,
            logs,
            processors,
        })
    }

    pub fn leader(&self) -> ReplicaId {
        self.leader
    }

    pub fn len(&self) -> usize {
        self.inboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }

    /// Queue a client command at the leader.
    pub async fn submit(&self, command: impl Into<String>) -> Result<(), ClusterError> {
        let command = command.into();
        check_command(&command)?;
        self.deliver(self.leader, Inbound::Submit(command)).await?;
        Ok(())
    }

    /// Start `view` at the leader, extending its latest proposal (genesis
    /// before the first one).
    pub async fn new_view(&self, view: u64) -> Result<(), NetworkError> {
        let (node_hash, height) = match self.status(self.leader).last_proposal {
            Some(tip) => (tip.hash, tip.height),
            None => (GENESIS_HASH.to_string(), 0),
        };
        debug!(view, node = %node_hash, "issuing new view");
        let qc = QuorumCertificate::new(view, height, node_hash);
        let payload = frame(encode_message(&Message::NewView(qc)), self.config.tx_size);
        self.deliver(self.leader, Inbound::Payload(payload)).await
    }

    /// Drive views `1..=rounds`, waiting `round_interval` after each.
    pub async fn run_rounds(&self, rounds: u64) -> Result<ClusterReport, NetworkError> {
        for view in 1..=rounds {
            self.new_view(view).await?;
            tokio::time::sleep(self.round_interval).await;
        }
        Ok(self.report())
    }

    pub fn status(&self, id: ReplicaId) -> ReplicaStatus {
        self.statuses
            .get(id)
            .map(|rx| rx.borrow().clone())
            .unwrap_or_default()
    }

    /// Commands replica `id` has executed, in order.
    pub fn executed(&self, id: ReplicaId) -> Vec<String> {
        self.logs.get(id).map(CommandLog::executed).unwrap_or_default()
    }

    pub fn report(&self) -> ClusterReport {
        let replicas = (0..self.len())
            .map(|id| ReplicaReport {
                status: self.status(id),
                executed: self.executed(id),
            })
            .collect();
        ClusterReport { replicas }
    }

    pub fn shutdown(self) {
        self.network.shutdown();
        for processor in &self.processors {
            processor.abort();
        }
    }

    async fn deliver(&self, to: ReplicaId, inbound: Inbound) -> Result<(), NetworkError> {
        let inbox = self.inboxes.get(to).ok_or(NetworkError::UnknownPeer(to))?;
        inbox
            .send(inbound)
            .await
            .map_err(|_| NetworkError::InboxClosed(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_round_proposes_on_genesis() {
        let cluster = Cluster::start(RunConfig::new(4), SignatureScheme::Placeholder).unwrap();
        cluster.run_rounds(1).await.unwrap();

        let tip = cluster.status(0).last_proposal.unwrap();
        assert_eq!(tip.height, 1);
        assert_eq!(tip.view, 1);
        for id in 1..4 {
            assert_eq!(cluster.status(id).high_qc.as_deref(), Some(GENESIS_HASH));
        }
        cluster.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config() {
        assert!(matches!(
            Cluster::start(RunConfig::new(0), SignatureScheme::Placeholder),
            Err(ClusterError::Config(_))
        ));
    }
}
