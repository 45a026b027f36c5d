//! Client-side mirror of the on-chain incremental Merkle tree
//!
//! The on-chain tree is append-only, depth 20, Poseidon-hashed. The mirror
//! reproduces it exactly: insertion order determines the root, and two
//! clients ingesting the same leaves in the same order land on identical
//! roots. The verifier accepts any of its last 30 roots, so the mirror keeps
//! the same ring.
//!
//! Inserts are O(depth) using the rightmost filled subtree at each level;
//! no path material is stored. Paths are recomputed on demand by replaying
//! the leaf sequence level by level.

use ark_bn254::Fr;
use ark_ff::Zero;
use std::fmt;

use crate::constants::{ROOT_HISTORY_SIZE, TREE_DEPTH};
use crate::error::{Error, Result};
use crate::hash::hash2;

/// A Merkle path proving membership of a leaf under `root`.
/// `indices` is the LSB-first bit decomposition of the leaf index: one bit
/// per level, 0 when the running hash is the left child.
#[derive(Clone, Debug)]
pub struct MerklePath {
    pub root: Fr,
    pub elements: Vec<Fr>,
    pub indices: Vec<u8>,
    pub leaf_index: u64,
}

impl MerklePath {
    /// Fold a leaf up through the path and return the implied root
    pub fn compute_root(&self, leaf: Fr) -> Fr {
        let mut current = leaf;
        for (sibling, bit) in self.elements.iter().zip(&self.indices) {
            current = if *bit == 0 {
                hash2(current, *sibling)
            } else {
                hash2(*sibling, current)
            };
        }
        current
    }

    /// Verify the path connects `leaf` to `expected_root`
    pub fn verify(&self, leaf: Fr, expected_root: Fr) -> bool {
        self.compute_root(leaf) == expected_root
    }
}

/// The incremental tree mirror
#[derive(Clone)]
pub struct MerkleTree {
    /// Every inserted leaf, in chain order
    leaves: Vec<Fr>,
    /// Rightmost filled subtree hash per level
    filled_subtrees: Vec<Fr>,
    /// zeros[i] is the hash of an empty subtree of height i
    zeros: Vec<Fr>,
    /// Ring of the most recent roots, matching the verifier's history
    roots: Vec<Fr>,
    root_index: usize,
    next_index: u64,
}

impl MerkleTree {
    pub fn new() -> Self {
        let mut zeros = Vec::with_capacity(TREE_DEPTH + 1);
        zeros.push(Fr::zero());
        for i in 0..TREE_DEPTH {
            let prev = zeros[i];
            zeros.push(hash2(prev, prev));
        }

        let filled_subtrees = zeros[..TREE_DEPTH].to_vec();
        let mut roots = vec![Fr::zero(); ROOT_HISTORY_SIZE];
        roots[0] = zeros[TREE_DEPTH];

        Self {
            leaves: Vec::new(),
            filled_subtrees,
            zeros,
            roots,
            root_index: 0,
            next_index: 0,
        }
    }

    /// Append a leaf, returning its assigned index and the new root
    pub fn insert(&mut self, leaf: Fr) -> Result<(u64, Fr)> {
        if self.next_index >= (1u64 << TREE_DEPTH) {
            return Err(Error::TreeFull);
        }

        let index = self.next_index;
        let mut idx = index;
        let mut current = leaf;

        for level in 0..TREE_DEPTH {
            if idx % 2 == 0 {
                self.filled_subtrees[level] = current;
                current = hash2(current, self.zeros[level]);
            } else {
                current = hash2(self.filled_subtrees[level], current);
            }
            idx /= 2;
        }

        self.root_index = (self.root_index + 1) % ROOT_HISTORY_SIZE;
        self.roots[self.root_index] = current;
        self.leaves.push(leaf);
        self.next_index += 1;

        tracing::debug!(index, "merkle leaf inserted");
        Ok((index, current))
    }

    /// The latest root
    pub fn root(&self) -> Fr {
        self.roots[self.root_index]
    }

    /// Whether the verifier would still accept this root
    pub fn is_known_root(&self, root: Fr) -> bool {
        if root.is_zero() {
            return false;
        }
        self.roots.contains(&root)
    }

    pub fn leaf_count(&self) -> u64 {
        self.next_index
    }

    pub fn leaf(&self, index: u64) -> Option<Fr> {
        self.leaves.get(index as usize).copied()
    }

    /// Extract the membership path for an inserted leaf by replaying the
    /// leaf sequence level by level
    pub fn path(&self, index: u64) -> Result<MerklePath> {
        if index >= self.next_index {
            return Err(Error::MerklePathInvalid);
        }

        let mut elements = Vec::with_capacity(TREE_DEPTH);
        let mut indices = Vec::with_capacity(TREE_DEPTH);
        let mut level: Vec<Fr> = self.leaves.clone();
        let mut idx = index as usize;

        for depth in 0..TREE_DEPTH {
            let sibling = if idx % 2 == 0 {
                level.get(idx + 1).copied().unwrap_or(self.zeros[depth])
            } else {
                level[idx - 1]
            };
            elements.push(sibling);
            indices.push((idx % 2) as u8);

            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            for pair in 0..(level.len() + 1) / 2 {
                let left = level[2 * pair];
                let right = level
                    .get(2 * pair + 1)
                    .copied()
                    .unwrap_or(self.zeros[depth]);
                next.push(hash2(left, right));
            }
            level = next;
            idx /= 2;
        }

        debug_assert_eq!(level.len(), 1);
        Ok(MerklePath {
            root: level[0],
            elements,
            indices,
            leaf_index: index,
        })
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MerkleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("leaves", &self.next_index)
            .field("root", &crate::curve::fr_to_be_bytes(&self.root())[..4].to_vec())
            .finish()
    }
}
