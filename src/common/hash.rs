use sha2::{Digest, Sha256};

/// Id of the block every replica starts from.
pub const GENESIS_HASH: &str = "genesis";

/// Deterministic id of the block a leader proposes at `view` on top of `parent_hash`.
pub fn block_id(view: u64, parent_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(view.to_be_bytes());
    hasher.update(parent_hash.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_is_deterministic() {
        assert_eq!(block_id(1, GENESIS_HASH), block_id(1, GENESIS_HASH));
        assert_eq!(block_id(1, GENESIS_HASH).len(), 64);
    }

    #[test]
    fn test_block_id_depends_on_view_and_parent() {
        assert_ne!(block_id(1, GENESIS_HASH), block_id(2, GENESIS_HASH));
        assert_ne!(block_id(1, GENESIS_HASH), block_id(1, "other"));
    }
}
