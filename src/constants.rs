//! Protocol constants shared with the on-chain verifier and circuits
//!
//! Everything here is bit-exact: a client that disagrees on any of these
//! values produces proofs the verifier rejects, or memos nobody can open.
//! Curve literals are decimal strings parsed once at first use (see
//! `curve.rs`).

/// Merkle tree depth - 20 levels allows for 2^20 (~1 million) notes,
/// matching the on-chain incremental tree
pub const TREE_DEPTH: usize = 20;

/// Number of recent Merkle roots the verifier accepts, tolerating proofs
/// generated against a slightly stale root
pub const ROOT_HISTORY_SIZE: usize = 30;

/// Twisted Edwards coefficient `a` of Baby Jubjub
pub const EDWARDS_A: u64 = 168700;

/// Twisted Edwards coefficient `d` of Baby Jubjub
pub const EDWARDS_D: u64 = 168696;

/// Order of the prime-order subgroup of Baby Jubjub (cofactor 8)
pub const SUBGROUP_ORDER_DEC: &str =
    "2736030358979909402780800718157159386076813972158567259200215660948447373041";

/// Generator point of Baby Jubjub; keypairs use `Base8 = 8 * G`
pub const GENERATOR_X_DEC: &str =
    "995203441582195749578291179787384436505546430278305826713579947235728471134";
pub const GENERATOR_Y_DEC: &str =
    "5472060717959818805561601436314318772137091100104008585924551046643952123905";

/// ASCII seed for deriving the independent Pedersen base `H` by
/// hash-to-curve. Nobody knows log_G(H).
pub const PEDERSEN_H_SEED: &[u8] = b"zktoken_pedersen_h";

/// Bit widths of the scalar decompositions used for Pedersen commitments,
/// matching the in-circuit algorithm
pub const AMOUNT_BITS: usize = 64;
pub const BLINDING_BITS: usize = 254;

/// Uniform secrets (blinding, note secret, nullifier preimage) are sampled
/// as 31-byte integers so they embed losslessly in the BN254 scalar field
pub const SECRET_BYTES: usize = 31;

/// Memo wire layout:
/// - 32 bytes: ephemeral public key x
/// - 32 bytes: ephemeral public key y
/// - 12 bytes: AEAD nonce
/// - 144 bytes: ciphertext (128-byte plaintext + 16-byte tag)
pub const MEMO_EPK_BYTES: usize = 64;
pub const MEMO_NONCE_BYTES: usize = 12;
pub const MEMO_PLAINTEXT_BYTES: usize = 128;
pub const MEMO_CIPHERTEXT_BYTES: usize = MEMO_PLAINTEXT_BYTES + 16;
pub const MEMO_BYTES: usize = MEMO_EPK_BYTES + MEMO_NONCE_BYTES + MEMO_CIPHERTEXT_BYTES;

/// Encoded Groth16 proof: ABI tuple (uint256[2], uint256[2][2], uint256[2])
pub const PROOF_BYTES: usize = 256;

/// Message prefix signed by the host-chain wallet to derive the shielded
/// keypair; the full message is this prefix followed by the lowercase
/// host address
pub const KEY_DERIVATION_PREFIX: &str = "zktoken-shielded-key-v1:";

/// HKDF info string for the memo channel's symmetric key
pub const MEMO_KDF_INFO: &[u8] = b"zktoken-memo-v1";
