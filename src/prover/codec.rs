//! Groth16 proof wire encoding
//!
//! The verifier contract takes the proof as the ABI tuple
//! `(uint256[2], uint256[2][2], uint256[2])` - 256 bytes of big-endian
//! base-field coordinates for pi_A (G1), pi_B (G2) and pi_C (G1).
//!
//! The G2 coordinates live in Fq2 = Fq[u]/(u^2 + 1). The prover library
//! orders each coordinate `[c0, c1]` but the pairing precompile expects
//! `[c1, c0]`, so the encoder swaps the inner pair on both components of
//! pi_B. An implementation that omits the swap produces proofs that verify
//! against the library but fail on-chain.

use ark_bn254::{Bn254, Fq, G1Affine, G2Affine};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::Proof;
use num_bigint::BigUint;

use crate::constants::PROOF_BYTES;
use crate::error::{Error, Result};

/// Encode a proof into the exact on-chain layout. Fails with
/// `ProofEncodeMalformed` on points at infinity; the tuple has no encoding
/// for them.
pub fn encode_proof(proof: &Proof<Bn254>) -> Result<[u8; PROOF_BYTES]> {
    if proof.a.infinity || proof.b.infinity || proof.c.infinity {
        return Err(Error::ProofEncodeMalformed);
    }

    let mut out = [0u8; PROOF_BYTES];
    write_fq(&mut out[0..32], &proof.a.x);
    write_fq(&mut out[32..64], &proof.a.y);

    // pi_B with the inner pair swapped: x = [c1, c0], y = [c1, c0]
    write_fq(&mut out[64..96], &proof.b.x.c1);
    write_fq(&mut out[96..128], &proof.b.x.c0);
    write_fq(&mut out[128..160], &proof.b.y.c1);
    write_fq(&mut out[160..192], &proof.b.y.c0);

    write_fq(&mut out[192..224], &proof.c.x);
    write_fq(&mut out[224..256], &proof.c.y);
    Ok(out)
}

/// Decode an on-chain proof encoding back into library form, undoing the
/// G2 inner-pair swap. Every coordinate is range-checked against the base
/// field modulus and both points are curve- and subgroup-checked.
pub fn decode_proof(bytes: &[u8]) -> Result<Proof<Bn254>> {
    if bytes.len() != PROOF_BYTES {
        return Err(Error::ProofEncodeMalformed);
    }

    let a = g1_from_coords(read_fq(&bytes[0..32])?, read_fq(&bytes[32..64])?)?;

    let x = ark_bn254::Fq2::new(read_fq(&bytes[96..128])?, read_fq(&bytes[64..96])?);
    let y = ark_bn254::Fq2::new(read_fq(&bytes[160..192])?, read_fq(&bytes[128..160])?);
    let b = G2Affine::new_unchecked(x, y);
    if !b.is_on_curve() || !b.is_in_correct_subgroup_assuming_on_curve() {
        return Err(Error::ProofEncodeMalformed);
    }

    let c = g1_from_coords(read_fq(&bytes[192..224])?, read_fq(&bytes[224..256])?)?;

    Ok(Proof { a, b, c })
}

fn g1_from_coords(x: Fq, y: Fq) -> Result<G1Affine> {
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(Error::ProofEncodeMalformed);
    }
    Ok(point)
}

fn write_fq(buf: &mut [u8], value: &Fq) {
    buf.copy_from_slice(&value.into_bigint().to_bytes_be());
}

fn read_fq(bytes: &[u8]) -> Result<Fq> {
    let value = BigUint::from_bytes_be(bytes);
    if value >= Fq::MODULUS.into() {
        return Err(Error::ProofEncodeMalformed);
    }
    Ok(Fq::from_be_bytes_mod_order(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{Fr, G1Projective, G2Projective};
    use ark_ec::{AffineRepr, CurveGroup, Group};

    /// Deterministic fixture proof from small multiples of the generators
    fn fixture_proof(k: u64) -> Proof<Bn254> {
        let a = (G1Projective::generator() * Fr::from(k)).into_affine();
        let b = (G2Projective::generator() * Fr::from(k + 1)).into_affine();
        let c = (G1Projective::generator() * Fr::from(k + 2)).into_affine();
        Proof { a, b, c }
    }

    #[test]
    fn test_encoding_is_256_bytes_and_deterministic() {
        for k in 1..=8u64 {
            let proof = fixture_proof(k);
            let e1 = encode_proof(&proof).unwrap();
            let e2 = encode_proof(&proof).unwrap();
            assert_eq!(e1.len(), PROOF_BYTES);
            assert_eq!(e1, e2);
        }
    }

    #[test]
    fn test_roundtrip_preserves_proof() {
        for k in 1..=8u64 {
            let proof = fixture_proof(k);
            let encoded = encode_proof(&proof).unwrap();
            let decoded = decode_proof(&encoded).unwrap();
            assert_eq!(decoded.a, proof.a);
            assert_eq!(decoded.b, proof.b);
            assert_eq!(decoded.c, proof.c);
        }
    }

    #[test]
    fn test_g2_inner_pair_is_swapped() {
        let proof = fixture_proof(3);
        let encoded = encode_proof(&proof).unwrap();

        let mut c1 = [0u8; 32];
        write_fq(&mut c1, &proof.b.x.c1);
        let mut c0 = [0u8; 32];
        write_fq(&mut c0, &proof.b.x.c0);

        // On the wire, c1 comes first
        assert_eq!(&encoded[64..96], &c1);
        assert_eq!(&encoded[96..128], &c0);
    }

    #[test]
    fn test_infinity_is_malformed() {
        let mut proof = fixture_proof(1);
        proof.a = G1Affine::identity();
        assert!(matches!(
            encode_proof(&proof),
            Err(Error::ProofEncodeMalformed)
        ));
    }

    #[test]
    fn test_decode_rejects_bad_lengths_and_ranges() {
        assert!(matches!(
            decode_proof(&[0u8; 64]),
            Err(Error::ProofEncodeMalformed)
        ));

        // Coordinate above the field modulus
        let bad = [0xffu8; PROOF_BYTES];
        assert!(matches!(
            decode_proof(&bad),
            Err(Error::ProofEncodeMalformed)
        ));

        // Valid-range coordinates that are not on the curve
        let mut off_curve = [0u8; PROOF_BYTES];
        off_curve[31] = 1;
        off_curve[63] = 1;
        assert!(matches!(
            decode_proof(&off_curve),
            Err(Error::ProofEncodeMalformed)
        ));
    }
}
