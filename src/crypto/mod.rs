pub mod hash;
pub mod signature;

pub use signature::{Ed25519Signer, TransactionSigner};
