//! Error taxonomy for the engine
//!
//! Algebraic and validation errors are raised at the boundary of the failing
//! component with no partial state changes to the note store or tree. Memo
//! failures collapse into the single opaque `MemoReject` so a scanner leaks
//! nothing about why a candidate memo was not ours.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Scalar outside [1, L-1]
    #[error("scalar outside the Baby Jubjub subgroup order range")]
    InvalidScalar,

    /// Affine pair does not satisfy the curve equation
    #[error("point is not on the Baby Jubjub curve")]
    PointNotOnCurve,

    /// Point is on-curve but outside the prime-order subgroup
    #[error("point is not in the prime-order subgroup")]
    PointNotInSubgroup,

    /// Field inversion of zero
    #[error("attempted to invert zero in the field")]
    InverseOfZero,

    /// Amount outside [0, 2^64) or zero where a positive amount is required
    #[error("amount outside the 64-bit range")]
    AmountOutOfRange,

    /// Amount or blinding sums disagree over the integers. Should be
    /// unreachable; checked explicitly before proving.
    #[error("amount or blinding conservation violated")]
    ConservationViolation,

    /// Recomputed Merkle root does not match the supplied root
    #[error("merkle path does not verify against the supplied root")]
    MerklePathInvalid,

    /// Memo could not be opened: wrong length, bad point, tag mismatch or
    /// malformed plaintext. Deliberately a single kind.
    #[error("memo is not addressed to this key")]
    MemoReject,

    /// Proof pieces are not the expected field shape
    #[error("proof does not fit the 256-byte ABI encoding")]
    ProofEncodeMalformed,

    /// The verifier returned false or the contract reverted (unknown root,
    /// spent nullifier). Local state rolls back to pre-submit.
    #[error("on-chain verifier rejected the transaction")]
    ChainReject,

    /// The tree already holds 2^DEPTH leaves
    #[error("merkle tree is full")]
    TreeFull,

    /// Operation requires a note that has been assigned a leaf index
    #[error("note has not been inserted into the tree")]
    NoteNotFinalized,

    /// Input note is smaller than the requested spend
    #[error("input note does not cover the requested amount")]
    InsufficientFunds,

    /// The supplied keypair does not own the input note
    #[error("keypair does not match the note owner")]
    OwnerMismatch,

    /// Recipient key failed the canonical-point checks (identity or zero y)
    #[error("recipient public key is not a canonical curve point")]
    RecipientInvalid,

    /// The input note is already locked by a pending spend
    #[error("a spend of this note is already in flight")]
    SpendInProgress,

    /// The input note has already been spent
    #[error("note has already been spent")]
    NoteSpent,

    /// Spend state machine transition not allowed from the current state
    #[error("spend job is not in the required state")]
    InvalidStateTransition,

    /// Chain events must be ingested in leaf order
    #[error("event leaf index does not match the local tree head")]
    EventOutOfOrder,
}

pub type Result<T> = std::result::Result<T, Error>;
