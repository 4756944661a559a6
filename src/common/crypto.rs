use std::sync::Arc;

use ed25519_dalek::{ed25519::{self, signature::Signer}, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::consensus::peers::ReplicaId;

/*
    Votes carry a signature token per endorsing replica. The token travels
    inside the comma-separated signature list of a QC, so a scheme must never
    produce ',' or '|' in a token.

    The placeholder scheme produces "<replicaId>_sig" and accepts anything,
    which is what the protocol runs with by default. The ed25519 scheme
    produces "<replicaId>_<hex signature>" and checks it against a shared
    key registry.
*/

pub trait VoteSigner: Send {
    /// Token endorsing `block_hash` on behalf of this replica.
    fn sign(&self, block_hash: &str) -> String;

    /// Whether `token` is a valid endorsement of `block_hash`.
    fn verify(&self, token: &str, block_hash: &str) -> bool;
}

#[derive(Clone, Debug)]
pub struct PlaceholderSigner {
    id: ReplicaId,
}

impl PlaceholderSigner {
    pub fn new(id: ReplicaId) -> Self {
        PlaceholderSigner { id }
    }
}

impl VoteSigner for PlaceholderSigner {
    fn sign(&self, _block_hash: &str) -> String {
        format!("{}_sig", self.id)
    }

    fn verify(&self, _token: &str, _block_hash: &str) -> bool {
        true
    }
}

pub struct Keypair {
    pubkey: Pubkey,
    dalek_signer: SigningKey,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Pubkey {
    pub key: [u8; 32],
}

impl Keypair {
    pub fn new_pair() -> Self {
        let mut csprng = OsRng;
        let dalek_signer = SigningKey::generate(&mut csprng);
        let pubkey = Pubkey::from(&dalek_signer.verifying_key().to_bytes());

        Keypair {
            pubkey,
            dalek_signer,
        }
    }

    pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
        self.dalek_signer.sign(msg).to_bytes()
    }

    pub fn pubkey(&self) -> Pubkey {
        self.pubkey.clone()
    }
}

impl From<&[u8; 32]> for Pubkey {
    fn from(bytes: &[u8; 32]) -> Self {
        Pubkey { key: *bytes }
    }
}

impl Pubkey {
    pub fn verify(&self, msg: &[u8], sig: &[u8; 64]) -> bool {
        let dalek_sig = ed25519::Signature::from_bytes(sig);
        match VerifyingKey::from_bytes(&self.key) {
            Ok(dalek_pubkey) => dalek_pubkey.verify_strict(msg, &dalek_sig).is_ok(),
            Err(_) => false,
        }
    }
}

/// Public keys of every replica, indexed by replica id.
pub type KeyRegistry = Arc<Vec<Pubkey>>;

pub struct Ed25519Signer {
    id: ReplicaId,
    keypair: Keypair,
    registry: KeyRegistry,
}

impl Ed25519Signer {
    pub fn new(id: ReplicaId, keypair: Keypair, registry: KeyRegistry) -> Self {
        Ed25519Signer {
            id,
            keypair,
            registry,
        }
    }

    /// Generate one keypair per replica and hand back signers sharing a registry.
    pub fn generate_committee(n: usize) -> Vec<Ed25519Signer> {
        let keypairs: Vec<Keypair> = (0..n).map(|_| Keypair::new_pair()).collect();
        let registry: KeyRegistry = Arc::new(keypairs.iter().map(Keypair::pubkey).collect());
        keypairs
            .into_iter()
            .enumerate()
            .map(|(id, keypair)| Ed25519Signer::new(id, keypair, registry.clone()))
            .collect()
    }
}

impl VoteSigner for Ed25519Signer {
    fn sign(&self, block_hash: &str) -> String {
        let sig = self.keypair.sign(block_hash.as_bytes());
        format!("{}_{}", self.id, hex::encode(sig))
    }

    fn verify(&self, token: &str, block_hash: &str) -> bool {
        let Some((signer, sig_hex)) = token.split_once('_') else {
            return false;
        };
        let Ok(signer) = signer.parse::<ReplicaId>() else {
            return false;
        };
        let Some(pubkey) = self.registry.get(signer) else {
            return false;
        };
        let mut sig = [0u8; 64];
        if hex::decode_to_slice(sig_hex, &mut sig).is_err() {
            return false;
        }
        pubkey.verify(block_hash.as_bytes(), &sig)
    }
}
