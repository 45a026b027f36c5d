//! Note structure - the fundamental unit of value in the pool
//!
//! A note is the private record behind one on-chain commitment. It carries:
//! - amount: 64-bit token amount,
//! - blinding: Pedersen blinding factor (uniform 31-byte integer),
//! - secret + nullifier_preimage: the two scalars that gate spending,
//! - owner_pub: the Baby Jubjub key that can spend it,
//! - token: an opaque tag partitioning notes per token contract.
//!
//! On-chain the note exists only as its note commitment,
//! Poseidon5(pedersen.x, pedersen.y, secret, nullifier_preimage,
//! owner_pub.x), where pedersen = amount*G + blinding*H is additively
//! homomorphic so the circuit can check value conservation in-curve.
//!
//! A freshly minted note has no leaf index; once the chain assigns one,
//! `finalized` produces the spendable copy with its nullifier fixed.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use rand::{CryptoRng, RngCore};
use std::fmt;

use crate::constants::{AMOUNT_BITS, BLINDING_BITS, SECRET_BYTES};
use crate::curve::{fr_to_be_bytes, generator, pedersen_h, Point};
use crate::error::{Error, Result};
use crate::hash::hash5;
use crate::nullifier::Nullifier;

/// Opaque tag identifying the token contract a note belongs to
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenAddress([u8; 20]);

impl TokenAddress {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        self.0
    }
}

impl fmt::Debug for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenAddress(0x{:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A note commitment - the public representation of a note.
/// This is what gets stored in the Merkle tree.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NoteCommitment {
    inner: Fr,
}

impl NoteCommitment {
    pub fn from_field(f: Fr) -> Self {
        Self { inner: f }
    }

    pub fn to_field(&self) -> Fr {
        self.inner
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        fr_to_be_bytes(&self.inner)
    }
}

impl fmt::Debug for NoteCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "NoteCommitment({:02x}{:02x}..)", bytes[0], bytes[1])
    }
}

/// Pedersen commitment amount*G + blinding*H, with the same fixed scalar
/// decompositions the circuit uses: 64 bits for the amount, 254 bits for
/// the blinding.
pub fn pedersen_commit(amount: u64, blinding: &Fr) -> Result<Point> {
    let value_part = generator().mul_bits(&amount.to_be_bytes(), AMOUNT_BITS)?;
    let blinding_part = pedersen_h().mul_bits(&fr_to_be_bytes(blinding), BLINDING_BITS)?;
    value_part.add(&blinding_part)
}

/// A shielded note
#[derive(Clone, Debug)]
pub struct Note {
    amount: u64,
    blinding: Fr,
    secret: Fr,
    nullifier_preimage: Fr,
    owner_pub: Point,
    token: TokenAddress,
    /// None until the chain assigns a position
    leaf_index: Option<u64>,
    /// Fixed at finalization; depends on the leaf index
    nullifier: Option<Nullifier>,
    spent: bool,
}

impl Note {
    /// Mint a new note with fresh uniform secrets. Deposit amounts must be
    /// positive.
    pub fn new<R: RngCore + CryptoRng>(
        amount: u64,
        owner_pub: Point,
        token: TokenAddress,
        rng: &mut R,
    ) -> Result<Self> {
        if amount == 0 {
            return Err(Error::AmountOutOfRange);
        }
        owner_pub.validate()?;
        Ok(Self::output(amount, owner_pub, token, rng))
    }

    /// Construct an output note; transfer change may legitimately carry a
    /// zero amount. Callers validate ownership points at the spend boundary.
    pub(crate) fn output<R: RngCore + CryptoRng>(
        amount: u64,
        owner_pub: Point,
        token: TokenAddress,
        rng: &mut R,
    ) -> Self {
        Self {
            amount,
            blinding: random_uniform_scalar(rng),
            secret: random_uniform_scalar(rng),
            nullifier_preimage: random_uniform_scalar(rng),
            owner_pub,
            token,
            leaf_index: None,
            nullifier: None,
            spent: false,
        }
    }

    /// Reassemble a note from known parts (memo recovery, tests)
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        amount: u64,
        blinding: Fr,
        secret: Fr,
        nullifier_preimage: Fr,
        owner_pub: Point,
        token: TokenAddress,
        leaf_index: Option<u64>,
    ) -> Self {
        let nullifier =
            leaf_index.map(|idx| Nullifier::derive(nullifier_preimage, secret, idx));
        Self {
            amount,
            blinding,
            secret,
            nullifier_preimage,
            owner_pub,
            token,
            leaf_index,
            nullifier,
            spent: false,
        }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn blinding(&self) -> Fr {
        self.blinding
    }

    pub fn secret(&self) -> Fr {
        self.secret
    }

    pub fn nullifier_preimage(&self) -> Fr {
        self.nullifier_preimage
    }

    pub fn owner_pub(&self) -> &Point {
        &self.owner_pub
    }

    pub fn token(&self) -> TokenAddress {
        self.token
    }

    pub fn leaf_index(&self) -> Option<u64> {
        self.leaf_index
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }

    pub(crate) fn set_spent(&mut self, spent: bool) {
        self.spent = spent;
    }

    /// The note's Pedersen commitment
    pub fn pedersen(&self) -> Result<Point> {
        pedersen_commit(self.amount, &self.blinding)
    }

    /// The note commitment that goes into the Merkle tree
    pub fn commitment(&self) -> Result<NoteCommitment> {
        let ped = self.pedersen()?;
        Ok(NoteCommitment::from_field(hash5([
            ped.x,
            ped.y,
            self.secret,
            self.nullifier_preimage,
            self.owner_pub.x,
        ])))
    }

    /// The nullifier; requires finalization
    pub fn nullifier(&self) -> Result<Nullifier> {
        self.nullifier.ok_or(Error::NoteNotFinalized)
    }

    /// Bind the note to its chain-assigned leaf index. Returns a new value;
    /// the original is untouched.
    pub fn finalized(&self, leaf_index: u64) -> Note {
        let mut note = self.clone();
        note.leaf_index = Some(leaf_index);
        note.nullifier = Some(Nullifier::derive(
            self.nullifier_preimage,
            self.secret,
            leaf_index,
        ));
        note
    }
}

/// Uniform 31-byte integer, embedded in the field. Used for blindings,
/// secrets and nullifier preimages; never reduced modulo the subgroup
/// order.
pub fn random_uniform_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Fr {
    let mut bytes = [0u8; SECRET_BYTES];
    rng.fill_bytes(&mut bytes);
    Fr::from_be_bytes_mod_order(&bytes)
}
