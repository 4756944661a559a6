use std::collections::HashMap;

use super::message::Block;

/// Append-only arena of every block a replica has recorded, keyed by hash.
///
/// Replica pointers (high, locked, committed) are hashes into this store.
/// Blocks are never removed.
pub struct BlockStore {
    blocks: HashMap<String, Block>,
}

impl BlockStore {
    pub fn new() -> Self {
        BlockStore {
            blocks: HashMap::new(),
        }
    }

    /// Store seeded with the genesis block.
    pub fn with_genesis() -> Self {
        let mut store = BlockStore::new();
        store.put(Block::genesis());
        store
    }

    /// Record `block`. Returns false if a block with that hash was already
    /// present, in which case the stored copy is kept.
    pub fn put(&mut self, block: Block) -> bool {
        if self.blocks.contains_key(&block.hash) {
            return false;
        }
        self.blocks.insert(block.hash.clone(), block);
        true
    }

    pub fn get(&self, hash: &str) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn get_mut(&mut self, hash: &str) -> Option<&mut Block> {
        self.blocks.get_mut(hash)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.blocks.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether `ancestor_hash` is `descendant` itself or lies on its parent chain.
    ///
    /// The walk stops at an empty parent, at a parent missing from the store,
    /// or after visiting more links than there are blocks (a malformed cycle).
    pub fn is_ancestor(&self, descendant: &Block, ancestor_hash: &str) -> bool {
        let mut current = descendant;
        for _ in 0..=self.blocks.len() {
            if current.hash == ancestor_hash {
                return true;
            }
            if current.parent_hash.is_empty() {
                return false;
            }
            match self.blocks.get(&current.parent_hash) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

impl Default for BlockStore {
    fn default() -> Self {
        BlockStore::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::qc::QuorumCertificate;

    fn child(parent: &Block, view: u64) -> Block {
        let justify = QuorumCertificate::new(view, parent.height, parent.hash.clone());
        Block::extend(parent, view, format!("cmd-{view}"), justify)
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut store = BlockStore::with_genesis();
        let genesis = Block::genesis();
        let a = child(&genesis, 1);

        assert!(store.put(a.clone()));
        let mut altered = a.clone();
        altered.command = "other".to_string();
        assert!(!store.put(altered));

        assert_eq!(store.get(&a.hash), Some(&a));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_unknown() {
        let store = BlockStore::with_genesis();
        assert!(store.get("missing").is_none());
        assert!(!store.contains("missing"));
    }

    #[test]
    fn test_ancestry() {
        let mut store = BlockStore::with_genesis();
        let genesis = Block::genesis();
        let a = child(&genesis, 1);
        let b = child(&a, 2);
        let c = child(&b, 3);
        for block in [&a, &b, &c] {
            store.put(block.clone());
        }

        assert!(store.is_ancestor(&c, &genesis.hash));
        assert!(store.is_ancestor(&c, &a.hash));
        assert!(store.is_ancestor(&c, &c.hash));
        assert!(!store.is_ancestor(&a, &c.hash));
        assert!(!store.is_ancestor(&b, "missing"));
    }

    #[test]
    fn test_ancestry_stops_at_missing_parent() {
        let mut store = BlockStore::with_genesis();
        let genesis = Block::genesis();
        let a = child(&genesis, 1);
        let b = child(&a, 2);
        // `a` is never recorded
        store.put(b.clone());

        assert!(!store.is_ancestor(&b, &genesis.hash));
    }

    #[test]
    fn test_ancestry_terminates_on_cycle() {
        let mut store = BlockStore::new();
        let x = Block {
            hash: "x".to_string(),
            parent_hash: "y".to_string(),
            ..Default::default()
        };
        let y = Block {
            hash: "y".to_string(),
            parent_hash: "x".to_string(),
            ..Default::default()
        };
        store.put(x.clone());
        store.put(y);

        assert!(!store.is_ancestor(&x, "genesis"));
    }
}
