//! Witness assembly for the two spend statements
//!
//! Both statements spend exactly one note and must mirror, field by field,
//! the ordering of the external prover's compiled circuit:
//!
//! - Transfer keeps everything private and produces two output notes
//!   (recipient + change). Public signals:
//!   `[merkle_root, nullifier_hash, new_commitment_1, new_commitment_2]`.
//! - Withdraw reveals the withdrawn amount and produces at most one change
//!   note. Public signals:
//!   `[merkle_root, nullifier_hash, amount, change_commitment]`.
//!
//! Conservation is checked over the integers, never modulo the subgroup
//! order: the circuit compares field elements, and a mod-L reduction of a
//! blinding would shift the sum by a multiple of L inside GF(p). The
//! recipient blinding is therefore sampled uniformly in [0, blinding_in)
//! so the change blinding is a plain non-negative difference.

use ark_bn254::Fr;
use ark_ff::{PrimeField, Zero};
use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero as _;
use rand::{CryptoRng, RngCore};

use crate::constants::TREE_DEPTH;
use crate::curve::{biguint_to_fr, fr_to_biguint, Point};
use crate::error::{Error, Result};
use crate::keys::Keypair;
use crate::merkle::MerklePath;
use crate::note::{Note, NoteCommitment, random_uniform_scalar};
use crate::nullifier::Nullifier;

/// Per-output private assignment
#[derive(Clone, Debug)]
pub struct OutputSlot {
    pub amount: u64,
    pub blinding: Fr,
    pub secret: Fr,
    pub nullifier_preimage: Fr,
    pub owner_pub: Point,
}

impl OutputSlot {
    fn from_note(note: &Note) -> Self {
        Self {
            amount: note.amount(),
            blinding: note.blinding(),
            secret: note.secret(),
            nullifier_preimage: note.nullifier_preimage(),
            owner_pub: *note.owner_pub(),
        }
    }

    fn push_into(&self, out: &mut Vec<Fr>) {
        out.push(Fr::from(self.amount));
        out.push(self.blinding);
        out.push(self.secret);
        out.push(self.nullifier_preimage);
        out.push(self.owner_pub.x);
        out.push(self.owner_pub.y);
    }
}

/// Private input-note assignment shared by both statements
#[derive(Clone, Debug)]
struct InputSlot {
    amount: u64,
    blinding: Fr,
    secret: Fr,
    nullifier_preimage: Fr,
    owner_priv: Fr,
    leaf_index: u64,
    path_elements: Vec<Fr>,
    path_indices: Vec<u8>,
}

impl InputSlot {
    fn push_into(&self, out: &mut Vec<Fr>) {
        out.push(Fr::from(self.amount));
        out.push(self.blinding);
        out.push(self.secret);
        out.push(self.nullifier_preimage);
        out.push(self.owner_priv);
        out.push(Fr::from(self.leaf_index));
        out.extend_from_slice(&self.path_elements);
        out.extend(self.path_indices.iter().map(|b| Fr::from(*b as u64)));
    }
}

/// Fully assembled transfer statement
#[derive(Clone, Debug)]
pub struct TransferWitness {
    pub merkle_root: Fr,
    pub nullifier_hash: Nullifier,
    pub output_commitments: [NoteCommitment; 2],
    input: InputSlot,
    outputs: [OutputSlot; 2],
}

impl TransferWitness {
    /// Public signals in verifier order
    pub fn public_signals(&self) -> [Fr; 4] {
        [
            self.merkle_root,
            self.nullifier_hash.to_field(),
            self.output_commitments[0].to_field(),
            self.output_commitments[1].to_field(),
        ]
    }

    /// Flat field-aligned assignment, public signals first, then the input
    /// note (amount, blinding, secret, preimage, owner_priv, leaf_index,
    /// path elements, path indices), then each output (amount, blinding,
    /// secret, preimage, pk.x, pk.y)
    pub fn to_vec(&self) -> Vec<Fr> {
        let mut out = Vec::with_capacity(4 + 6 + 2 * TREE_DEPTH + 12);
        out.extend_from_slice(&self.public_signals());
        self.input.push_into(&mut out);
        for slot in &self.outputs {
            slot.push_into(&mut out);
        }
        out
    }

    pub fn outputs(&self) -> &[OutputSlot; 2] {
        &self.outputs
    }
}

/// Witness plus the freshly sampled output notes the caller must seal into
/// memos and track until confirmation
#[derive(Clone, Debug)]
pub struct TransferBundle {
    pub witness: TransferWitness,
    pub recipient_note: Note,
    pub change_note: Note,
}

/// Fully assembled withdraw statement
#[derive(Clone, Debug)]
pub struct WithdrawWitness {
    pub merkle_root: Fr,
    pub nullifier_hash: Nullifier,
    /// Revealed on-chain
    pub amount: u64,
    /// Zero when the withdrawal consumes the whole note
    pub change_commitment: NoteCommitment,
    input: InputSlot,
    change: OutputSlot,
}

impl WithdrawWitness {
    pub fn public_signals(&self) -> [Fr; 4] {
        [
            self.merkle_root,
            self.nullifier_hash.to_field(),
            Fr::from(self.amount),
            self.change_commitment.to_field(),
        ]
    }

    pub fn to_vec(&self) -> Vec<Fr> {
        let mut out = Vec::with_capacity(4 + 6 + 2 * TREE_DEPTH + 6);
        out.extend_from_slice(&self.public_signals());
        self.input.push_into(&mut out);
        self.change.push_into(&mut out);
        out
    }

    pub fn change(&self) -> &OutputSlot {
        &self.change
    }
}

#[derive(Clone, Debug)]
pub struct WithdrawBundle {
    pub witness: WithdrawWitness,
    /// None for a full withdrawal
    pub change_note: Option<Note>,
}

/// Assemble a transfer witness spending `input`, sending `amount` to
/// `recipient_pub` and returning the rest to the spender.
pub fn build_transfer<R: RngCore + CryptoRng>(
    input: &Note,
    keypair: &Keypair,
    path: &MerklePath,
    recipient_pub: &Point,
    amount: u64,
    rng: &mut R,
) -> Result<TransferBundle> {
    let (input_slot, nullifier_hash) = validate_input(input, keypair, path)?;
    validate_recipient(recipient_pub)?;

    if amount == 0 {
        return Err(Error::AmountOutOfRange);
    }
    let change_amount = input
        .amount()
        .checked_sub(amount)
        .ok_or(Error::InsufficientFunds)?;

    // Integer split of the blinding; the difference stays non-negative by
    // sampling the recipient share below the input blinding.
    let blinding_in = fr_to_biguint(&input.blinding());
    let recipient_blinding = if blinding_in.is_zero() {
        BigUint::from(0u8)
    } else {
        rng.gen_biguint_below(&blinding_in)
    };
    let change_blinding = &blinding_in - &recipient_blinding;

    let recipient_note = Note::from_parts(
        amount,
        biguint_to_fr(&recipient_blinding),
        random_uniform_scalar(rng),
        random_uniform_scalar(rng),
        *recipient_pub,
        input.token(),
        None,
    );
    let change_note = Note::from_parts(
        change_amount,
        biguint_to_fr(&change_blinding),
        random_uniform_scalar(rng),
        random_uniform_scalar(rng),
        *keypair.public(),
        input.token(),
        None,
    );

    check_conservation(
        input,
        &[&recipient_note, &change_note],
        None,
    )?;

    let witness = TransferWitness {
        merkle_root: path.root,
        nullifier_hash,
        output_commitments: [recipient_note.commitment()?, change_note.commitment()?],
        input: input_slot,
        outputs: [
            OutputSlot::from_note(&recipient_note),
            OutputSlot::from_note(&change_note),
        ],
    };

    Ok(TransferBundle {
        witness,
        recipient_note,
        change_note,
    })
}

/// Assemble a withdraw witness revealing `amount` publicly. The change
/// note, when present, carries the entire input blinding: the withdrawn
/// portion is public and needs none.
pub fn build_withdraw<R: RngCore + CryptoRng>(
    input: &Note,
    keypair: &Keypair,
    path: &MerklePath,
    amount: u64,
    rng: &mut R,
) -> Result<WithdrawBundle> {
    let (input_slot, nullifier_hash) = validate_input(input, keypair, path)?;

    if amount == 0 {
        return Err(Error::AmountOutOfRange);
    }
    let change_amount = input
        .amount()
        .checked_sub(amount)
        .ok_or(Error::InsufficientFunds)?;

    let (change_commitment, change, change_note) = if change_amount == 0 {
        // Full withdrawal: no change note exists; the circuit still takes a
        // zeroed slot and checks blinding_in == change_blinding.
        let slot = OutputSlot {
            amount: 0,
            blinding: input.blinding(),
            secret: Fr::zero(),
            nullifier_preimage: Fr::zero(),
            owner_pub: *keypair.public(),
        };
        (NoteCommitment::from_field(Fr::zero()), slot, None)
    } else {
        let note = Note::from_parts(
            change_amount,
            input.blinding(),
            random_uniform_scalar(rng),
            random_uniform_scalar(rng),
            *keypair.public(),
            input.token(),
            None,
        );
        let commitment = note.commitment()?;
        (commitment, OutputSlot::from_note(&note), Some(note))
    };

    if let Some(note) = &change_note {
        check_conservation(input, &[note], Some(amount))?;
    } else if u128::from(amount) != u128::from(input.amount()) {
        return Err(Error::ConservationViolation);
    }

    let witness = WithdrawWitness {
        merkle_root: path.root,
        nullifier_hash,
        amount,
        change_commitment,
        input: input_slot,
        change,
    };

    Ok(WithdrawBundle {
        witness,
        change_note,
    })
}

/// Shared input-side validation: ownership, finalization, path integrity
fn validate_input(
    input: &Note,
    keypair: &Keypair,
    path: &MerklePath,
) -> Result<(InputSlot, Nullifier)> {
    let leaf_index = input.leaf_index().ok_or(Error::NoteNotFinalized)?;

    if keypair.public() != input.owner_pub() {
        return Err(Error::OwnerMismatch);
    }
    if path.leaf_index != leaf_index
        || path.elements.len() != TREE_DEPTH
        || path.indices.len() != TREE_DEPTH
    {
        return Err(Error::MerklePathInvalid);
    }
    if !path.verify(input.commitment()?.to_field(), path.root) {
        return Err(Error::MerklePathInvalid);
    }

    let nullifier_hash = input.nullifier()?;

    let owner_priv = Fr::from_be_bytes_mod_order(&keypair.secret().to_bytes());
    Ok((
        InputSlot {
            amount: input.amount(),
            blinding: input.blinding(),
            secret: input.secret(),
            nullifier_preimage: input.nullifier_preimage(),
            owner_priv,
            leaf_index,
            path_elements: path.elements.clone(),
            path_indices: path.indices.clone(),
        },
        nullifier_hash,
    ))
}

/// Only the x-coordinate binds the owner inside the commitment hash, so an
/// ambiguous y (zero, or the identity) is refused outright.
fn validate_recipient(recipient: &Point) -> Result<()> {
    recipient.validate()?;
    if recipient.is_identity() || recipient.y.is_zero() {
        return Err(Error::RecipientInvalid);
    }
    Ok(())
}

/// Explicit pre-prover conservation check over the integers. Unreachable
/// when the builders are correct, which is exactly why it is asserted.
fn check_conservation(input: &Note, outputs: &[&Note], public_amount: Option<u64>) -> Result<()> {
    let mut amount_sum: u128 = public_amount.map(u128::from).unwrap_or(0);
    let mut blinding_sum = BigUint::from(0u8);
    for note in outputs {
        amount_sum += u128::from(note.amount());
        blinding_sum += fr_to_biguint(&note.blinding());
    }

    if amount_sum != u128::from(input.amount()) {
        return Err(Error::ConservationViolation);
    }
    if blinding_sum != fr_to_biguint(&input.blinding()) {
        return Err(Error::ConservationViolation);
    }
    Ok(())
}
