use super::qc::QuorumCertificate;
use crate::common::hash::{block_id, GENESIS_HASH};

/*
    Every message starts with a single ASCII digit naming its kind. The
    leader carries blocks in PREPARE, PRECOMMIT, COMMIT and DECIDE; replicas
    answer with votes tagged PRECOMMIT (for a prepared block) or COMMIT (for
    a pre-committed block). NEW_VIEW carries a bare QC.
*/

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum MessageKind {
    NewView,
    Prepare,
    PreCommit,
    Commit,
    Decide,
}

impl MessageKind {
    pub fn digit(&self) -> u8 {
        match self {
            MessageKind::NewView => b'0',
            MessageKind::Prepare => b'1',
            MessageKind::PreCommit => b'2',
            MessageKind::Commit => b'3',
            MessageKind::Decide => b'4',
        }
    }

    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            b'0' => Some(MessageKind::NewView),
            b'1' => Some(MessageKind::Prepare),
            b'2' => Some(MessageKind::PreCommit),
            b'3' => Some(MessageKind::Commit),
            b'4' => Some(MessageKind::Decide),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Block {
    pub hash: String,
    /// Empty for genesis.
    pub parent_hash: String,
    pub command: String,
    pub height: u64,
    /// QC that authorized this proposal. The leader also aggregates votes for
    /// this block into it.
    pub justify: QuorumCertificate,
}

impl Block {
    /// Block a leader proposes at `view` on top of `parent`.
    pub fn extend(parent: &Block, view: u64, command: String, justify: QuorumCertificate) -> Self {
        Block {
            hash: block_id(view, &parent.hash),
            parent_hash: parent.hash.clone(),
            command,
            height: parent.height + 1,
            justify,
        }
    }

    pub fn genesis() -> Self {
        Block {
            hash: GENESIS_HASH.to_string(),
            parent_hash: String::new(),
            command: String::new(),
            height: 0,
            justify: QuorumCertificate::new(0, 0, GENESIS_HASH.to_string()),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Message {
    NewView(QuorumCertificate),
    Proposal(MessageKind, Block),
    Vote(Vote),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::NewView(_) => MessageKind::NewView,
            Message::Proposal(kind, _) => *kind,
            Message::Vote(vote) => vote.kind,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Vote {
    /// PreCommit for a vote on a prepared block, Commit for a vote on a
    /// pre-committed one.
    pub kind: MessageKind,
    pub signature: String,
    pub block: Block,
}
