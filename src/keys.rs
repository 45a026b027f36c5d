//! Keypairs on Baby Jubjub
//!
//! A keypair is `(priv, pub)` with `pub = priv * Base8` and `priv` a scalar
//! in `[1, L-1]`. Keys come from three places:
//!
//! - fresh randomness (rejection-sampled below the subgroup order),
//! - an imported raw scalar,
//! - deterministically from a host-chain wallet signature, so a user can
//!   recover the same shielded keypair on any client by re-signing the
//!   fixed derivation message.
//!
//! ECDH over these keys seals the memo channel: both sides of a transfer
//! derive the same shared point from their own scalar and the other's
//! public key.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use sha3::{Digest, Keccak256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::KEY_DERIVATION_PREFIX;
use crate::curve::{base8, biguint_to_be_bytes, subgroup_order, Point};
use crate::error::{Error, Result};

/// A private scalar in [1, L-1], stored big-endian. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretScalar {
    bytes: [u8; 32],
}

impl SecretScalar {
    /// Big-endian canonical encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        self.bytes
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.bytes)
    }

    fn from_biguint(n: &BigUint) -> Result<Self> {
        if n.is_zero() || n >= subgroup_order() {
            return Err(Error::InvalidScalar);
        }
        let bytes = biguint_to_be_bytes(n, 32)
            .try_into()
            .expect("fixed width");
        Ok(Self { bytes })
    }
}

impl fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScalar")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A Baby Jubjub keypair
#[derive(Clone, Debug)]
pub struct Keypair {
    secret: SecretScalar,
    public: Point,
}

impl Keypair {
    /// Sample a fresh keypair. The scalar is rejection-sampled: top bits are
    /// masked to the bit length of L, then candidates outside [1, L-1] are
    /// discarded.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let order = subgroup_order();
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            bytes[0] &= 0x07; // L < 2^251

            let candidate = BigUint::from_bytes_be(&bytes);
            if candidate.is_zero() || &candidate >= order {
                continue;
            }
            return Self::from_secret(SecretScalar { bytes });
        }
    }

    /// Import a raw private scalar; fails with `InvalidScalar` outside
    /// [1, L-1].
    pub fn from_private(scalar_be: &[u8; 32]) -> Result<Self> {
        let n = BigUint::from_bytes_be(scalar_be);
        Self::from_secret(SecretScalar::from_biguint(&n)?)
    }

    /// Deterministic derivation from a host-chain wallet signature over
    /// `signing_message(address)`: priv = keccak256(signature) mod L, with
    /// zero mapped to one. Idempotent: the same wallet always produces the
    /// same keypair. The address binds the signed message, not the KDF
    /// itself.
    pub fn from_host_signature(_address: &str, signature: &[u8]) -> Result<Self> {
        let mut hasher = Keccak256::new();
        hasher.update(signature);
        let digest = hasher.finalize();

        let mut scalar = BigUint::from_bytes_be(&digest) % subgroup_order();
        if scalar.is_zero() {
            scalar = BigUint::from(1u8);
        }
        Self::from_secret(SecretScalar::from_biguint(&scalar)?)
    }

    /// The exact ASCII message the host wallet must sign for key derivation
    pub fn signing_message(address: &str) -> String {
        format!("{}{}", KEY_DERIVATION_PREFIX, address.to_lowercase())
    }

    fn from_secret(secret: SecretScalar) -> Result<Self> {
        let public = base8().mul_bits(&secret.bytes, 256)?;
        Ok(Self { secret, public })
    }

    pub fn public(&self) -> &Point {
        &self.public
    }

    pub fn secret(&self) -> &SecretScalar {
        &self.secret
    }

    /// Diffie-Hellman: `priv * their_pub`. The peer point is validated
    /// before use; both parties obtain the same point.
    pub fn ecdh(&self, their_pub: &Point) -> Result<Point> {
        their_pub.validate()?;
        their_pub.mul_bits(&self.secret.bytes, 256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_generated_key_is_valid() {
        let kp = Keypair::generate(&mut OsRng).unwrap();
        assert!(kp.public().is_on_curve());
        assert!(kp.public().is_in_subgroup());
        assert!(!kp.public().is_identity());
    }

    #[test]
    fn test_from_private_rejects_out_of_range() {
        assert!(matches!(
            Keypair::from_private(&[0u8; 32]),
            Err(Error::InvalidScalar)
        ));
        // L itself is out of range
        let order_bytes: [u8; 32] = biguint_to_be_bytes(subgroup_order(), 32)
            .try_into()
            .unwrap();
        assert!(matches!(
            Keypair::from_private(&order_bytes),
            Err(Error::InvalidScalar)
        ));
        let mut one = [0u8; 32];
        one[31] = 1;
        assert!(Keypair::from_private(&one).is_ok());
    }

    #[test]
    fn test_host_signature_derivation_is_deterministic() {
        let sig = [0x5a_u8; 65];
        let a = Keypair::from_host_signature("0xAbCd00000000000000000000000000000000Ef12", &sig)
            .unwrap();
        let b = Keypair::from_host_signature("0xabcd00000000000000000000000000000000ef12", &sig)
            .unwrap();
        assert_eq!(a.secret.bytes, b.secret.bytes);
        assert_eq!(a.public(), b.public());

        let other = Keypair::from_host_signature("0xabcd", &[0x11_u8; 65]).unwrap();
        assert_ne!(a.secret.bytes, other.secret.bytes);
    }

    #[test]
    fn test_signing_message_lowercases_address() {
        let msg = Keypair::signing_message("0xDEADbeef");
        assert_eq!(msg, "zktoken-shielded-key-v1:0xdeadbeef");
    }

    #[test]
    fn test_ecdh_agreement() {
        for _ in 0..50 {
            let a = Keypair::generate(&mut OsRng).unwrap();
            let b = Keypair::generate(&mut OsRng).unwrap();

            let s_ab = a.ecdh(b.public()).unwrap();
            let s_ba = b.ecdh(a.public()).unwrap();
            assert_eq!(s_ab, s_ba);
        }
    }

    #[test]
    fn test_ecdh_rejects_invalid_point() {
        use ark_bn254::Fr;
        let kp = Keypair::generate(&mut OsRng).unwrap();
        let bad = Point {
            x: Fr::from(1u64),
            y: Fr::from(1u64),
        };
        assert!(matches!(kp.ecdh(&bad), Err(Error::PointNotOnCurve)));
    }
}
