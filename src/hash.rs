//! Poseidon hashing with the canonical circom parameters
//!
//! Three arities are used by the protocol, all over the BN254 scalar field:
//!
//! - 2-input (state width 3, 8 full + 57 partial rounds): Merkle tree nodes,
//! - 3-input: nullifiers (preimage, secret, leaf index),
//! - 5-input (state width 6): note commitments.
//!
//! Parity with the on-chain hash is the hard requirement here; any deviation
//! silently invalidates every proof. The permutation comes from
//! `light-poseidon`, which carries the canonical round constants and MDS
//! matrices for these widths. Hashers are constructed as local values, so
//! there is no process-wide mutable hash state.

use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher};

/// Merkle node hash: two children, zero capacity
pub fn hash2(left: Fr, right: Fr) -> Fr {
    let mut poseidon = Poseidon::<Fr>::new_circom(2).expect("width-3 parameters");
    poseidon.hash(&[left, right]).expect("two inputs")
}

/// Nullifier hash over (nullifier_preimage, secret, leaf_index)
pub fn hash3(a: Fr, b: Fr, c: Fr) -> Fr {
    let mut poseidon = Poseidon::<Fr>::new_circom(3).expect("width-4 parameters");
    poseidon.hash(&[a, b, c]).expect("three inputs")
}

/// Note commitment hash over
/// (pedersen.x, pedersen.y, secret, nullifier_preimage, owner_pub.x)
pub fn hash5(inputs: [Fr; 5]) -> Fr {
    let mut poseidon = Poseidon::<Fr>::new_circom(5).expect("width-6 parameters");
    poseidon.hash(&inputs).expect("five inputs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::fr_from_dec;
    use ark_ff::Zero;

    // Known-input/known-output pairs from the canonical reference
    // implementation. These pin the round constants: if either fails, every
    // commitment and root this client produces is wrong on-chain.

    #[test]
    fn test_hash2_conformance_one_two() {
        let out = hash2(Fr::from(1u64), Fr::from(2u64));
        assert_eq!(
            out,
            fr_from_dec(
                "7853200120776062878684798364095072458815029376092732009249414926327459813530"
            )
        );
    }

    #[test]
    fn test_hash2_conformance_zero_zero() {
        let out = hash2(Fr::zero(), Fr::zero());
        assert_eq!(
            out,
            fr_from_dec(
                "14744269619966411208579211824598458697587494354926760081771325075741142829156"
            )
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = Fr::from(123u64);
        let b = Fr::from(456u64);
        assert_eq!(hash2(a, b), hash2(a, b));
        assert_eq!(hash3(a, b, a), hash3(a, b, a));
        assert_eq!(hash5([a, b, a, b, a]), hash5([a, b, a, b, a]));
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let a = Fr::from(123u64);
        let b = Fr::from(456u64);
        assert_ne!(hash2(a, b), hash2(b, a));
        assert_ne!(hash3(a, b, b), hash3(b, a, b));
        assert_ne!(hash5([a, b, b, b, b]), hash5([b, a, b, b, b]));
    }

    #[test]
    fn test_arities_are_domain_separated() {
        // Padding with zeros must not collide across arities
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);
        assert_ne!(hash2(a, b), hash3(a, b, Fr::zero()));
        assert_ne!(hash3(a, b, Fr::zero()), hash5([a, b, Fr::zero(), Fr::zero(), Fr::zero()]));
    }
}
