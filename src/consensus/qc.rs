/*
    A Quorum Certificate over a block is a collection of signatures from
    replicas that voted for it at a given view. Signatures are kept in
    arrival order and are not deduplicated.
*/

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct QuorumCertificate {
    pub view: u64,
    pub height: u64,
    pub node_hash: String,
    pub signatures: Vec<String>,
}

impl QuorumCertificate {
    pub fn new(view: u64, height: u64, node_hash: String) -> Self {
        QuorumCertificate {
            view,
            height,
            node_hash,
            signatures: Vec::new(),
        }
    }

    pub fn add_signature(&mut self, sig: String) {
        self.signatures.push(sig);
    }

    pub fn is_complete(&self, threshold: usize) -> bool {
        self.signatures.len() >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuorumRule;

    #[test]
    fn test_completeness_at_threshold() {
        let threshold = QuorumRule::TwoThirdsPlusOne.threshold(4);
        let mut qc = QuorumCertificate::new(1, 1, "abc".to_string());

        qc.add_signature("1_sig".to_string());
        qc.add_signature("2_sig".to_string());
        assert!(!qc.is_complete(threshold));

        qc.add_signature("3_sig".to_string());
        assert!(qc.is_complete(threshold));
    }

    #[test]
    fn test_duplicates_count() {
        let mut qc = QuorumCertificate::new(1, 1, "abc".to_string());
        for _ in 0..3 {
            qc.add_signature("1_sig".to_string());
        }
        assert_eq!(qc.signatures, vec!["1_sig", "1_sig", "1_sig"]);
        assert!(qc.is_complete(3));
    }
}
