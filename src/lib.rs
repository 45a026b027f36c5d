//! Client-side engine for a shielded-pool token protocol
//!
//! This crate implements everything a client must run off-chain to hold and
//! spend shielded notes:
//! - Baby Jubjub arithmetic over the BN254 scalar field
//! - Poseidon hashing with the canonical circom parameters
//! - Keypairs derived from a host-chain wallet signature, plus ECDH
//! - The note model: Pedersen commitments, note commitments, nullifiers
//! - A mirror of the on-chain incremental Merkle tree with a 30-root history
//! - The sealed memo channel carrying note secrets through public event logs
//! - Witness assembly for the transfer and withdraw statements, and the
//!   256-byte ABI proof encoding the verifier expects
//!
//! The SNARK prover itself and the on-chain verifier are external: the
//! engine prepares exactly what they consume and interprets exactly what
//! they emit.

pub mod constants;
pub mod curve;
pub mod error;
pub mod hash;
pub mod keys;
pub mod memo;
pub mod merkle;
pub mod note;
pub mod nullifier;
pub mod prover;
pub mod spend;
pub mod store;
pub mod wallet;

// Re-exports for convenience
pub use curve::Point;
pub use error::Error;
pub use keys::Keypair;
pub use memo::{open as open_memo, seal as seal_memo, MemoPlaintext};
pub use merkle::{MerklePath, MerkleTree};
pub use note::{Note, NoteCommitment, TokenAddress};
pub use nullifier::{Nullifier, NullifierSet};
pub use prover::{
    build_transfer, build_withdraw, decode_proof, encode_proof, TransferWitness, WithdrawWitness,
};
pub use spend::{SpendJob, SpendKind, SpendState};
pub use store::NoteStore;
pub use wallet::{scan_events, NoteEvent, PoolEvent, Wallet};
