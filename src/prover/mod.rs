//! The proving-system boundary
//!
//! The SNARK prover itself is an external, fixed Groth16 routine over
//! BN254. This module owns everything on our side of that line:
//!
//! - `witness`: assembles the field-aligned inputs for the two statement
//!   variants (transfer, withdraw) and validates every algebraic
//!   precondition first - it is cheaper to fail here than to have the
//!   prover fail opaquely.
//! - `codec`: encodes the returned proof into the exact 256-byte ABI layout
//!   the on-chain verifier expects, including the G2 inner-pair swap.

pub mod codec;
pub mod witness;

pub use codec::{decode_proof, encode_proof};
pub use witness::{
    build_transfer, build_withdraw, TransferBundle, TransferWitness, WithdrawBundle,
    WithdrawWitness,
};
