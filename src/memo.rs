//! Note-secret delivery through public event logs
//!
//! When sending a shielded note, the sender seals the four scalars the
//! recipient needs (amount, blinding, secret, nullifier preimage) so only
//! the holder of the matching private key can recover them. The channel is:
//!
//! 1. Ephemeral Baby Jubjub keypair `(e, E = e*Base8)`.
//! 2. Shared point `S = e * recipient_pub`; symmetric key via HKDF-SHA-256
//!    over the 32-byte big-endian x-coordinate of S.
//! 3. ChaCha20Poly1305 over a fixed 128-byte plaintext with a fresh
//!    12-byte nonce.
//!
//! The sealed memo is always exactly `MEMO_BYTES` long:
//!
//! ```text
//! | epk.x (32B) | epk.y (32B) | nonce (12B) | ciphertext+tag (144B) |
//! ```
//!
//! Opening answers only "mine" or "not mine": length, curve, subgroup, tag
//! and plaintext-shape failures all collapse into the single `MemoReject`,
//! so scanning a public log leaks nothing per candidate memo.

use ark_bn254::Fr;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;

use crate::constants::{
    MEMO_BYTES, MEMO_CIPHERTEXT_BYTES, MEMO_KDF_INFO, MEMO_NONCE_BYTES, MEMO_PLAINTEXT_BYTES,
    SECRET_BYTES,
};
use crate::curve::{fr_from_be_canonical, fr_to_be_bytes, fr_to_biguint, Point};
use crate::error::{Error, Result};
use crate::keys::Keypair;
use crate::note::{Note, NoteCommitment, TokenAddress};

/// The four scalars a recipient needs to reconstruct a note
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoPlaintext {
    pub amount: u64,
    pub blinding: Fr,
    pub secret: Fr,
    pub nullifier_preimage: Fr,
}

impl MemoPlaintext {
    pub fn from_note(note: &Note) -> Self {
        Self {
            amount: note.amount(),
            blinding: note.blinding(),
            secret: note.secret(),
            nullifier_preimage: note.nullifier_preimage(),
        }
    }

    /// Fixed layout: four 32-byte big-endian scalars
    fn encode(&self) -> [u8; MEMO_PLAINTEXT_BYTES] {
        let mut out = [0u8; MEMO_PLAINTEXT_BYTES];
        out[24..32].copy_from_slice(&self.amount.to_be_bytes());
        out[32..64].copy_from_slice(&fr_to_be_bytes(&self.blinding));
        out[64..96].copy_from_slice(&fr_to_be_bytes(&self.secret));
        out[96..128].copy_from_slice(&fr_to_be_bytes(&self.nullifier_preimage));
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != MEMO_PLAINTEXT_BYTES {
            return Err(Error::MemoReject);
        }
        // The amount occupies the low 8 bytes of its word
        if bytes[..24].iter().any(|b| *b != 0) {
            return Err(Error::MemoReject);
        }
        let amount = u64::from_be_bytes(bytes[24..32].try_into().expect("fixed width"));

        let blinding = decode_uniform_scalar(&bytes[32..64])?;
        let secret = decode_uniform_scalar(&bytes[64..96])?;
        let nullifier_preimage = decode_uniform_scalar(&bytes[96..128])?;

        Ok(Self {
            amount,
            blinding,
            secret,
            nullifier_preimage,
        })
    }
}

/// Uniform secrets are 31-byte integers; anything wider is malformed
fn decode_uniform_scalar(bytes: &[u8]) -> Result<Fr> {
    let word: [u8; 32] = bytes.try_into().map_err(|_| Error::MemoReject)?;
    let scalar = fr_from_be_canonical(&word).ok_or(Error::MemoReject)?;
    if fr_to_biguint(&scalar) >> (SECRET_BYTES * 8) != BigUint::from(0u8) {
        return Err(Error::MemoReject);
    }
    Ok(scalar)
}

/// Seal a memo to the recipient's public key
pub fn seal<R: RngCore + CryptoRng>(
    plaintext: &MemoPlaintext,
    recipient_pub: &Point,
    rng: &mut R,
) -> Result<[u8; MEMO_BYTES]> {
    recipient_pub.validate()?;

    let ephemeral = Keypair::generate(rng)?;
    let shared = ephemeral.ecdh(recipient_pub)?;
    let key = derive_memo_key(&shared);

    let mut nonce = [0u8; MEMO_NONCE_BYTES];
    rng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new_from_slice(&key).expect("32-byte key");
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.encode().as_ref())
        .map_err(|_| Error::MemoReject)?;
    debug_assert_eq!(ciphertext.len(), MEMO_CIPHERTEXT_BYTES);

    let mut out = [0u8; MEMO_BYTES];
    out[..32].copy_from_slice(&fr_to_be_bytes(&ephemeral.public().x));
    out[32..64].copy_from_slice(&fr_to_be_bytes(&ephemeral.public().y));
    out[64..76].copy_from_slice(&nonce);
    out[76..].copy_from_slice(&ciphertext);
    Ok(out)
}

/// Attempt to open a memo with our private scalar. Every failure mode is
/// the same `MemoReject`.
pub fn open(memo: &[u8], keypair: &Keypair) -> Result<MemoPlaintext> {
    if memo.len() != MEMO_BYTES {
        return Err(Error::MemoReject);
    }

    let epk_x = fr_from_be_canonical(memo[..32].try_into().expect("fixed width"))
        .ok_or(Error::MemoReject)?;
    let epk_y = fr_from_be_canonical(memo[32..64].try_into().expect("fixed width"))
        .ok_or(Error::MemoReject)?;
    let epk = Point { x: epk_x, y: epk_y };

    // ecdh validates on-curve and subgroup membership
    let shared = keypair.ecdh(&epk).map_err(|_| Error::MemoReject)?;
    let key = derive_memo_key(&shared);

    let cipher = ChaCha20Poly1305::new_from_slice(&key).expect("32-byte key");
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&memo[64..76]), &memo[76..])
        .map_err(|_| Error::MemoReject)?;

    MemoPlaintext::decode(&plaintext)
}

/// Recover a finalized note from an event's memo. Returns None unless the
/// memo opens with our key and the reconstructed commitment matches the
/// event's.
pub fn recover_note(
    memo: &[u8],
    commitment: NoteCommitment,
    leaf_index: u64,
    keypair: &Keypair,
    token: TokenAddress,
) -> Option<Note> {
    let plaintext = open(memo, keypair).ok()?;
    let note = Note::from_parts(
        plaintext.amount,
        plaintext.blinding,
        plaintext.secret,
        plaintext.nullifier_preimage,
        *keypair.public(),
        token,
        Some(leaf_index),
    );
    match note.commitment() {
        Ok(c) if c == commitment => Some(note),
        _ => None,
    }
}

fn derive_memo_key(shared: &Point) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, &fr_to_be_bytes(&shared.x));
    let mut key = [0u8; 32];
    hk.expand(MEMO_KDF_INFO, &mut key)
        .expect("32 bytes is a valid HKDF output length");
    key
}
