use std::collections::HashSet;

use super::{
    message::{Block, MessageKind},
    store::BlockStore,
};

/// Phase the leader broadcasts once a block's QC completes, picked by the
/// QC's view: 0 -> PRECOMMIT, 1 -> COMMIT, 2 -> DECIDE.
pub fn next_phase(view: u64) -> MessageKind {
    match view % 3 {
        0 => MessageKind::PreCommit,
        1 => MessageKind::Commit,
        _ => MessageKind::Decide,
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum VoteOutcome {
    /// No block with that hash is recorded.
    UnknownBlock,
    /// Vote recorded, quorum not reached yet.
    Pending { votes: usize },
    /// This vote completed the QC. `block` carries the aggregated signatures.
    QuorumFormed { phase: MessageKind, block: Block },
    /// Vote recorded on a block whose quorum was already reported.
    AlreadyFormed { votes: usize },
}

/// Leader-side tally. Votes are appended to the QC embedded in the voted
/// block, in arrival order and without deduplication.
pub struct VoteAggregator {
    threshold: usize,
    formed: HashSet<String>,
}

impl VoteAggregator {
    pub fn new(threshold: usize) -> Self {
        VoteAggregator {
            threshold,
            formed: HashSet::new(),
        }
    }

    pub fn add_vote(&mut self, store: &mut BlockStore, block_hash: &str, signature: String) -> VoteOutcome {
        let Some(block) = store.get_mut(block_hash) else {
            return VoteOutcome::UnknownBlock;
        };
        block.justify.add_signature(signature);
        let votes = block.justify.signatures.len();

        if self.formed.contains(block_hash) {
            return VoteOutcome::AlreadyFormed { votes };
        }
        if !block.justify.is_complete(self.threshold) {
            return VoteOutcome::Pending { votes };
        }

        self.formed.insert(block_hash.to_string());
        VoteOutcome::QuorumFormed {
            phase: next_phase(block.justify.view),
            block: block.clone(),
        }
    }
}
