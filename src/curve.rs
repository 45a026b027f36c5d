//! Baby Jubjub arithmetic over the BN254 scalar field
//!
//! Baby Jubjub is a twisted Edwards curve whose base field is the BN254
//! scalar field, which is what lets the external circuit check curve
//! equations natively. This module provides the affine point type, the
//! unified addition law, fixed-shape scalar multiplication, and the three
//! distinguished bases:
//!
//! - `G`: the curve generator,
//! - `Base8 = 8 * G`: the base for all keypairs,
//! - `H`: an independent Pedersen base derived by hash-to-curve so that
//!   nobody knows log_G(H).
//!
//! Points arriving from outside (recipient keys, ephemeral memo keys) must
//! pass `validate()` before use; the engine refuses to operate on points
//! off the curve or outside the prime-order subgroup.

use ark_bn254::Fr;
use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use num_bigint::BigUint;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::constants::{
    EDWARDS_A, EDWARDS_D, GENERATOR_X_DEC, GENERATOR_Y_DEC, PEDERSEN_H_SEED, SUBGROUP_ORDER_DEC,
};
use crate::error::{Error, Result};

/// An affine point on Baby Jubjub. The identity is (0, 1).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: Fr,
    pub y: Fr,
}

impl Point {
    pub fn identity() -> Self {
        Self {
            x: Fr::zero(),
            y: Fr::one(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.x.is_zero() && self.y.is_one()
    }

    /// Check the curve equation a*x^2 + y^2 = 1 + d*x^2*y^2
    pub fn is_on_curve(&self) -> bool {
        let xx = self.x.square();
        let yy = self.y.square();
        edwards_a() * xx + yy == Fr::one() + edwards_d() * xx * yy
    }

    /// Check membership in the prime-order subgroup: L * P = identity
    pub fn is_in_subgroup(&self) -> bool {
        match self.mul_bits(&subgroup_order_bytes(), 256) {
            Ok(p) => p.is_identity(),
            Err(_) => false,
        }
    }

    /// Full validation for externally supplied points
    pub fn validate(&self) -> Result<()> {
        if !self.is_on_curve() {
            return Err(Error::PointNotOnCurve);
        }
        if !self.is_in_subgroup() {
            return Err(Error::PointNotInSubgroup);
        }
        Ok(())
    }

    /// Unified twisted Edwards addition:
    ///
    /// ```text
    /// x3 = (x1*y2 + y1*x2) / (1 + d*x1*x2*y1*y2)
    /// y3 = (y1*y2 - a*x1*x2) / (1 - d*x1*x2*y1*y2)
    /// ```
    ///
    /// Complete for this curve (a is a square, d is not), so the
    /// denominators never vanish for on-curve inputs.
    pub fn add(&self, other: &Point) -> Result<Point> {
        let x1x2 = self.x * other.x;
        let y1y2 = self.y * other.y;
        let dxy = edwards_d() * x1x2 * y1y2;

        let x_den = (Fr::one() + dxy).inverse().ok_or(Error::InverseOfZero)?;
        let y_den = (Fr::one() - dxy).inverse().ok_or(Error::InverseOfZero)?;

        Ok(Point {
            x: (self.x * other.y + self.y * other.x) * x_den,
            y: (y1y2 - edwards_a() * x1x2) * y_den,
        })
    }

    pub fn double(&self) -> Result<Point> {
        self.add(self)
    }

    /// Left-to-right double-and-add over exactly `n_bits` bits of a
    /// big-endian scalar. The addition is performed on every iteration and
    /// the bit only selects the result, so the operation sequence does not
    /// depend on the scalar value.
    pub fn mul_bits(&self, scalar_be: &[u8], n_bits: usize) -> Result<Point> {
        debug_assert!(n_bits <= scalar_be.len() * 8);

        let mut acc = Point::identity();
        for i in (0..n_bits).rev() {
            acc = acc.double()?;
            let byte = scalar_be[scalar_be.len() - 1 - i / 8];
            let bit = (byte >> (i % 8)) & 1;
            let with_base = acc.add(self)?;
            if bit == 1 {
                acc = with_base;
            }
        }
        Ok(acc)
    }

    /// Scalar multiplication by an arbitrary-width integer
    pub fn mul_biguint(&self, k: &BigUint, n_bits: usize) -> Result<Point> {
        let bytes = biguint_to_be_bytes(k, (n_bits + 7) / 8);
        self.mul_bits(&bytes, n_bits)
    }

    /// Clear the cofactor by three doublings (8 * P lands in the
    /// prime-order subgroup for any on-curve P)
    pub fn mul_cofactor(&self) -> Result<Point> {
        self.double()?.double()?.double()
    }

    /// Recover a point from its x-coordinate, solving
    /// y^2 = (1 - a*x^2) / (1 - d*x^2). Returns the canonical root (the
    /// smaller of y and -y as integers), or None when x is not on the curve.
    pub fn from_x(x: Fr) -> Option<Point> {
        let xx = x.square();
        let den = (Fr::one() - edwards_d() * xx).inverse()?;
        let yy = (Fr::one() - edwards_a() * xx) * den;
        let y = yy.sqrt()?;
        let neg = -y;
        let y = if fr_to_biguint(&neg) < fr_to_biguint(&y) {
            neg
        } else {
            y
        };
        Some(Point { x, y })
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xb = fr_to_be_bytes(&self.x);
        let yb = fr_to_be_bytes(&self.y);
        write!(
            f,
            "Point({:02x}{:02x}.., {:02x}{:02x}..)",
            xb[0], xb[1], yb[0], yb[1]
        )
    }
}

/// The curve generator G
pub fn generator() -> Point {
    static G: OnceLock<Point> = OnceLock::new();
    *G.get_or_init(|| Point {
        x: fr_from_dec(GENERATOR_X_DEC),
        y: fr_from_dec(GENERATOR_Y_DEC),
    })
}

/// Base8 = 8 * G, the base point for all keypairs
pub fn base8() -> Point {
    static BASE8: OnceLock<Point> = OnceLock::new();
    *BASE8.get_or_init(|| {
        generator()
            .mul_cofactor()
            .expect("curve addition is complete")
    })
}

/// The independent Pedersen base H, derived from the protocol seed by
/// hash-to-curve and cofactor clearing. Deterministic across clients.
pub fn pedersen_h() -> Point {
    static H: OnceLock<Point> = OnceLock::new();
    *H.get_or_init(derive_pedersen_base)
}

/// Order L of the prime subgroup
pub fn subgroup_order() -> &'static BigUint {
    static L: OnceLock<BigUint> = OnceLock::new();
    L.get_or_init(|| {
        BigUint::parse_bytes(SUBGROUP_ORDER_DEC.as_bytes(), 10)
            .expect("valid decimal literal")
    })
}

fn subgroup_order_bytes() -> [u8; 32] {
    biguint_to_be_bytes(subgroup_order(), 32)
        .try_into()
        .expect("fixed width")
}

fn edwards_a() -> Fr {
    Fr::from(EDWARDS_A)
}

fn edwards_d() -> Fr {
    Fr::from(EDWARDS_D)
}

fn derive_pedersen_base() -> Point {
    // Keccak counter stream over the seed; first x that lifts to the curve
    // and survives cofactor clearing wins.
    let mut counter: u64 = 0;
    loop {
        let mut hasher = Keccak256::new();
        hasher.update(PEDERSEN_H_SEED);
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();

        let x = Fr::from_be_bytes_mod_order(&digest);
        if let Some(candidate) = Point::from_x(x) {
            if let Ok(cleared) = candidate.mul_cofactor() {
                if !cleared.is_identity() {
                    return cleared;
                }
            }
        }
        counter += 1;
    }
}

/// Parse a decimal field-element literal
pub fn fr_from_dec(s: &str) -> Fr {
    Fr::from_str(s).unwrap_or_else(|_| panic!("invalid field literal"))
}

/// Canonical 32-byte big-endian encoding of a field element
pub fn fr_to_be_bytes(f: &Fr) -> [u8; 32] {
    f.into_bigint()
        .to_bytes_be()
        .try_into()
        .expect("fixed width")
}

/// Parse a canonical 32-byte big-endian field element, rejecting
/// encodings at or above the modulus
pub fn fr_from_be_canonical(bytes: &[u8; 32]) -> Option<Fr> {
    let value = BigUint::from_bytes_be(bytes);
    if value >= Fr::MODULUS.into() {
        return None;
    }
    Some(Fr::from_be_bytes_mod_order(bytes))
}

/// Integer view of a field element
pub fn fr_to_biguint(f: &Fr) -> BigUint {
    BigUint::from_bytes_be(&fr_to_be_bytes(f))
}

/// Field view of an integer; caller guarantees `n < p`
pub fn biguint_to_fr(n: &BigUint) -> Fr {
    Fr::from_be_bytes_mod_order(&n.to_bytes_be())
}

/// Fixed-width big-endian encoding of an integer
pub fn biguint_to_be_bytes(n: &BigUint, width: usize) -> Vec<u8> {
    let raw = n.to_bytes_be();
    debug_assert!(raw.len() <= width);
    let mut out = vec![0u8; width];
    out[width - raw.len()..].copy_from_slice(&raw);
    out
}
