//! Nullifier derivation
//!
//! The nullifier is a one-shot public token revealed when a note is spent;
//! the chain records it to prevent the note from being spent twice.
//!
//! nf = Poseidon3(nullifier_preimage, secret, leaf_index)
//!
//! Folding the leaf index in means two deposits with identical secrets still
//! yield distinct nullifiers. Only the note owner knows the preimage and
//! secret, so only the owner can compute nf ahead of time; observers cannot
//! link a published nullifier back to its commitment.

use ark_bn254::Fr;
use std::fmt;

use crate::curve::fr_to_be_bytes;
use crate::hash::hash3;

/// A nullifier - revealed when spending a note to prevent double-spending
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nullifier {
    inner: Fr,
}

// Fr does not implement Hash; key on the canonical encoding
impl std::hash::Hash for Nullifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl Nullifier {
    /// Derive the nullifier for a note that sits at `leaf_index`
    pub fn derive(nullifier_preimage: Fr, secret: Fr, leaf_index: u64) -> Self {
        Self {
            inner: hash3(nullifier_preimage, secret, Fr::from(leaf_index)),
        }
    }

    pub fn from_field(f: Fr) -> Self {
        Self { inner: f }
    }

    pub fn to_field(&self) -> Fr {
        self.inner
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        fr_to_be_bytes(&self.inner)
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Option<Self> {
        // Reject non-canonical encodings (>= p)
        crate::curve::fr_from_be_canonical(bytes).map(|inner| Self { inner })
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "Nullifier({:02x}{:02x}..)", bytes[0], bytes[1])
    }
}

/// Local mirror of the chain's nullifier registry, used to make event
/// ingestion idempotent
#[derive(Default, Clone)]
pub struct NullifierSet {
    nullifiers: std::collections::HashSet<Nullifier>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a nullifier has been observed (note already spent)
    pub fn contains(&self, nf: &Nullifier) -> bool {
        self.nullifiers.contains(nf)
    }

    /// Record a nullifier; returns false if already present
    pub fn insert(&mut self, nf: Nullifier) -> bool {
        self.nullifiers.insert(nf)
    }

    pub fn len(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nullifiers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullifier_depends_on_leaf_index() {
        let preimage = Fr::from(1111u64);
        let secret = Fr::from(2222u64);

        let nf0 = Nullifier::derive(preimage, secret, 0);
        let nf1 = Nullifier::derive(preimage, secret, 1);
        assert_ne!(nf0, nf1);

        // Deterministic for a fixed index
        assert_eq!(nf0, Nullifier::derive(preimage, secret, 0));
    }

    #[test]
    fn test_nullifier_bytes_roundtrip() {
        let nf = Nullifier::derive(Fr::from(5u64), Fr::from(9u64), 42);
        let bytes = nf.to_bytes();
        assert_eq!(Nullifier::from_bytes(&bytes), Some(nf));
    }

    #[test]
    fn test_from_bytes_rejects_non_canonical() {
        assert!(Nullifier::from_bytes(&[0xff; 32]).is_none());
    }

    #[test]
    fn test_nullifier_set_detects_double_spend() {
        let nf = Nullifier::derive(Fr::from(1u64), Fr::from(2u64), 3);
        let mut set = NullifierSet::new();

        assert!(set.insert(nf));
        assert!(!set.insert(nf));
        assert!(set.contains(&nf));
        assert_eq!(set.len(), 1);
    }
}
