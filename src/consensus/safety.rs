use tracing::debug;

use super::{message::Block, qc::QuorumCertificate, store::BlockStore};

/// The three chain pointers a replica maintains, each a hash into its
/// [`BlockStore`].
///
/// A pointer's "view" is the view of the QC justifying the block it points
/// at. `high_qc` only ever moves to a higher view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SafetyEngine {
    high_qc: Option<String>,
    locked_qc: Option<String>,
    committed_qc: Option<String>,
}

impl SafetyEngine {
    pub fn new() -> Self {
        SafetyEngine::default()
    }

    pub fn high_qc(&self) -> Option<&str> {
        self.high_qc.as_deref()
    }

    pub fn locked_qc(&self) -> Option<&str> {
        self.locked_qc.as_deref()
    }

    pub fn committed_qc(&self) -> Option<&str> {
        self.committed_qc.as_deref()
    }

    pub fn high_qc_view(&self, store: &BlockStore) -> Option<u64> {
        justify_view(store, self.high_qc.as_deref())
    }

    pub fn locked_view(&self, store: &BlockStore) -> Option<u64> {
        justify_view(store, self.locked_qc.as_deref())
    }

    /// SafeNode: accept `candidate` if nothing is locked, if it extends the
    /// locked block, or if `qc` is from a later view than the lock.
    pub fn safe_node(&self, store: &BlockStore, candidate: &Block, qc: &QuorumCertificate) -> bool {
        let Some(locked) = self.locked_qc.as_deref() else {
            return true;
        };
        if store.is_ancestor(candidate, locked) {
            return true;
        }
        match self.locked_view(store) {
            Some(locked_view) => qc.view > locked_view,
            None => true,
        }
    }

    /// Whether `qc` would move `high_qc` forward.
    pub fn advances_high_qc(&self, store: &BlockStore, qc: &QuorumCertificate) -> bool {
        match self.high_qc_view(store) {
            Some(high_view) => qc.view > high_view,
            None => true,
        }
    }

    /// UpdateHighQC: point `high_qc` at the block `qc` certifies when `qc`
    /// has a higher view. Returns whether the pointer moved; a certified
    /// block missing from the store leaves it untouched.
    pub fn update_high_qc(&mut self, store: &BlockStore, qc: &QuorumCertificate) -> bool {
        if !self.advances_high_qc(store, qc) {
            return false;
        }
        if !store.contains(&qc.node_hash) {
            debug!(node = %qc.node_hash, view = qc.view, "high qc target not found");
            return false;
        }
        self.high_qc = Some(qc.node_hash.clone());
        true
    }

    /// Lock on `block` if its QC is from a later view than the current lock.
    pub fn try_lock(&mut self, store: &BlockStore, block: &Block) -> bool {
        let later = match self.locked_view(store) {
            Some(locked_view) => block.justify.view > locked_view,
            None => true,
        };
        if later {
            self.locked_qc = Some(block.hash.clone());
        }
        later
    }

    pub fn commit(&mut self, block: &Block) {
        self.committed_qc = Some(block.hash.clone());
    }
}

fn justify_view(store: &BlockStore, hash: Option<&str>) -> Option<u64> {
    hash.and_then(|h| store.get(h)).map(|block| block.justify.view)
}
