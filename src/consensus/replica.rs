use std::{collections::VecDeque, time::Duration};

use tracing::{debug, info, trace, warn};

use super::{
    aggregator::{VoteAggregator, VoteOutcome},
    codec::{check_command, decode_message, encode_message, frame, unframe, CommandError},
    executor::CommandExecutor,
    message::{Block, Message, MessageKind, Vote},
    metrics::{LatencyTracker, ReplicaMetrics},
    peers::{ConsensusRole, Peers, ReplicaId},
    qc::QuorumCertificate,
    safety::SafetyEngine,
    store::BlockStore,
};
use crate::{common::crypto::VoteSigner, config::ReplicaConfig};

/*
    One replica of the chained protocol. The replica is a plain state
    machine: it takes one inbound message at a time and returns the
    messages it wants sent. It never blocks, has no timers and never
    retries; a round that does not gather a quorum simply stalls.

    Leader:
        NEW_VIEW(qc)     -> extend highQC's block, broadcast PREPARE
        vote             -> aggregate; on quorum broadcast the phase picked
                            by the QC view (and apply DECIDE locally)
    Any replica:
        PREPARE(b)       -> SafeNode? record, UpdateHighQC, vote PRECOMMIT
        PRECOMMIT(b)     -> SafeNode? maybe lock, vote COMMIT
        DECIDE(b)        -> UpdateHighQC, SafeNode? commit and execute
*/

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Send to every peer except this replica.
    Broadcast(Vec<u8>),
    Unicast(ReplicaId, Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSummary {
    pub hash: String,
    pub height: u64,
    pub view: u64,
}

impl From<&Block> for BlockSummary {
    fn from(block: &Block) -> Self {
        BlockSummary {
            hash: block.hash.clone(),
            height: block.height,
            view: block.justify.view,
        }
    }
}

/// Snapshot of a replica for the harness.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplicaStatus {
    pub id: ReplicaId,
    pub view: u64,
    pub high_qc: Option<String>,
    pub locked_qc: Option<String>,
    pub committed_qc: Option<String>,
    pub last_proposal: Option<BlockSummary>,
    pub metrics: ReplicaMetrics,
}

pub struct Replica {
    config: ReplicaConfig,
    peers: Peers,
    current_view: u64,
    store: BlockStore,
    safety: SafetyEngine,
    aggregator: VoteAggregator,
    signer: Box<dyn VoteSigner>,
    executor: Box<dyn CommandExecutor>,
    pending_commands: VecDeque<String>,
    last_proposal: Option<BlockSummary>,
    metrics: ReplicaMetrics,
    latency: LatencyTracker,
}

impl Replica {
    pub fn new(
        config: ReplicaConfig,
        signer: Box<dyn VoteSigner>,
        executor: Box<dyn CommandExecutor>,
    ) -> Self {
        let peers = Peers::new(config.id, config.run.n_replicas);
        let aggregator = VoteAggregator::new(config.run.quorum_threshold());
        Replica {
            config,
            peers,
            current_view: 0,
            store: BlockStore::with_genesis(),
            safety: SafetyEngine::new(),
            aggregator,
            signer,
            executor,
            pending_commands: VecDeque::new(),
            last_proposal: None,
            metrics: ReplicaMetrics::default(),
            latency: LatencyTracker::default(),
        }
    }

    pub fn id(&self) -> ReplicaId {
        self.config.id
    }

    pub fn role(&self) -> ConsensusRole {
        self.peers.role(self.current_view)
    }

    pub fn is_leader(&self) -> bool {
        self.role() == ConsensusRole::Leader
    }

    pub fn current_view(&self) -> u64 {
        self.current_view
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn safety(&self) -> &SafetyEngine {
        &self.safety
    }

    pub fn metrics(&self) -> &ReplicaMetrics {
        &self.metrics
    }

    /// Queue a client command for the next block this replica proposes.
    pub fn submit(&mut self, command: String) -> Result<(), CommandError> {
        check_command(&command)?;
        self.pending_commands.push_back(command);
        Ok(())
    }

    pub fn status(&self) -> ReplicaStatus {
        ReplicaStatus {
            id: self.id(),
            view: self.current_view,
            high_qc: self.safety.high_qc().map(str::to_string),
            locked_qc: self.safety.locked_qc().map(str::to_string),
            committed_qc: self.safety.committed_qc().map(str::to_string),
            last_proposal: self.last_proposal.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Handle one framed payload from the transport.
    pub fn handle_payload(&mut self, payload: &[u8], now: Duration) -> Vec<Outbound> {
        let Some(message) = decode_message(unframe(payload), self.role()) else {
            debug!(replica = self.id(), len = payload.len(), "dropping undecodable payload");
            return Vec::new();
        };
        self.metrics.messages_received += 1;
        self.handle_message(message, now)
    }

    pub fn handle_message(&mut self, message: Message, now: Duration) -> Vec<Outbound> {
        let leader = self.is_leader();
        match message {
            Message::NewView(qc) if leader => self.on_new_view(qc),
            Message::Vote(vote) if leader => self.on_vote(vote),
            Message::Proposal(MessageKind::Prepare, block) => self.on_prepare(block, now),
            Message::Proposal(MessageKind::PreCommit, block) => self.on_precommit(block, now),
            Message::Proposal(MessageKind::Decide, block) => {
                self.on_decide(block);
                Vec::new()
            }
            other => {
                debug!(replica = self.id(), kind = ?other.kind(), leader, "ignoring message");
                Vec::new()
            }
        }
    }

    fn on_new_view(&mut self, qc: QuorumCertificate) -> Vec<Outbound> {
        if !self.safety.advances_high_qc(&self.store, &qc) {
            trace!(replica = self.id(), view = qc.view, "new view does not advance high qc");
            return Vec::new();
        }
        if !self.safety.update_high_qc(&self.store, &qc) {
            warn!(replica = self.id(), node = %qc.node_hash, "new view certifies an unknown block");
            return Vec::new();
        }
        self.current_view = self.current_view.max(qc.view);

        let Some(parent) = self.safety.high_qc().and_then(|hash| self.store.get(hash)) else {
            return Vec::new();
        };
        let command = self.pending_commands.pop_front().unwrap_or_default();
        let block = Block::extend(parent, self.current_view, command, qc);

        info!(
            replica = self.id(),
            view = self.current_view,
            height = block.height,
            block = %block.hash,
            "proposing block"
        );
        self.last_proposal = Some(BlockSummary::from(&block));
        self.store.put(block.clone());
        vec![self.broadcast(Message::Proposal(MessageKind::Prepare, block))]
    }

    fn on_prepare(&mut self, block: Block, now: Duration) -> Vec<Outbound> {
        if !self.safety.safe_node(&self.store, &block, &block.justify) {
            warn!(
                replica = self.id(),
                block = %block.hash,
                view = block.justify.view,
                "rejecting unsafe proposal"
            );
            return Vec::new();
        }
        self.current_view = self.current_view.max(block.justify.view);
        self.store.put(block.clone());
        self.safety.update_high_qc(&self.store, &block.justify);

        debug!(replica = self.id(), block = %block.hash, "voting for proposal");
        self.latency.log_sent(&block.hash, now);
        vec![self.vote(MessageKind::PreCommit, block)]
    }

    fn on_precommit(&mut self, block: Block, now: Duration) -> Vec<Outbound> {
        if !self.safety.safe_node(&self.store, &block, &block.justify) {
            warn!(replica = self.id(), block = %block.hash, "rejecting unsafe pre-commit");
            return Vec::new();
        }
        self.store.put(block.clone());
        if self.safety.try_lock(&self.store, &block) {
            debug!(replica = self.id(), block = %block.hash, view = block.justify.view, "locked");
        }
        if let Some(latency) = self.latency.log_received(&block.hash, now) {
            self.metrics.latency_samples += 1;
            self.metrics.total_latency += latency;
            debug!(replica = self.id(), block = %block.hash, ?latency, "pre-commit latency");
        }
        vec![self.vote(MessageKind::Commit, block)]
    }

    fn on_vote(&mut self, vote: Vote) -> Vec<Outbound> {
        if !self.signer.verify(&vote.signature, &vote.block.hash) {
            warn!(replica = self.id(), block = %vote.block.hash, "dropping vote with invalid signature");
            return Vec::new();
        }
        match self
            .aggregator
            .add_vote(&mut self.store, &vote.block.hash, vote.signature)
        {
            VoteOutcome::QuorumFormed { phase, block } => {
                info!(
                    replica = self.id(),
                    block = %block.hash,
                    view = block.justify.view,
                    votes = block.justify.signatures.len(),
                    ?phase,
                    "quorum formed"
                );
                let outbound = self.broadcast(Message::Proposal(phase, block.clone()));
                if phase == MessageKind::Decide {
                    self.on_decide(block);
                }
                vec![outbound]
            }
            VoteOutcome::UnknownBlock => {
                warn!(replica = self.id(), block = %vote.block.hash, "vote for unknown block");
                Vec::new()
            }
            VoteOutcome::Pending { votes } | VoteOutcome::AlreadyFormed { votes } => {
                trace!(replica = self.id(), block = %vote.block.hash, votes, "vote recorded");
                Vec::new()
            }
        }
    }

    fn on_decide(&mut self, block: Block) {
        self.safety.update_high_qc(&self.store, &block.justify);
        if !self.safety.safe_node(&self.store, &block, &block.justify) {
            warn!(replica = self.id(), block = %block.hash, "refusing to commit unsafe block");
            return;
        }
        self.store.put(block.clone());
        info!(replica = self.id(), block = %block.hash, height = block.height, "committed block");
        self.safety.commit(&block);
        self.metrics.reached_consensus = true;
        self.executor.execute(&block.command);
    }

    fn vote(&mut self, kind: MessageKind, block: Block) -> Outbound {
        let signature = self.signer.sign(&block.hash);
        let leader = self.peers.get_leader(self.current_view);
        self.metrics.messages_sent += 1;
        Outbound::Unicast(leader, self.frame(&Message::Vote(Vote { kind, signature, block })))
    }

    fn broadcast(&mut self, message: Message) -> Outbound {
        self.metrics.messages_sent += self.peers.others().count() as u64;
        Outbound::Broadcast(self.frame(&message))
    }

    fn frame(&self, message: &Message) -> Vec<u8> {
        frame(encode_message(message), self.config.run.tx_size)
    }
}
