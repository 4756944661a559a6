pub mod crypto;
pub mod hash;
