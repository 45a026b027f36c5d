//! In-memory note store
//!
//! Notes are partitioned by token and indexed by nullifier so spend-side
//! events resolve in O(1). The store is single-writer: the wallet serializes
//! every mutation, and readers get snapshots. Durable persistence lives
//! outside the core.
//!
//! Notes are never deleted - spent notes stay for audit and recovery.

use std::collections::HashMap;

use crate::note::{Note, NoteCommitment, TokenAddress};
use crate::nullifier::Nullifier;

#[derive(Default)]
pub struct NoteStore {
    notes: HashMap<TokenAddress, Vec<Note>>,
    /// nullifier bytes -> (token, position in its partition)
    by_nullifier: HashMap<[u8; 32], (TokenAddress, usize)>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finalized note. Notes without a nullifier are not
    /// spendable and are kept out of the store by construction.
    pub fn save(&mut self, note: Note) {
        let token = note.token();
        let partition = self.notes.entry(token).or_default();
        if let Ok(nf) = note.nullifier() {
            self.by_nullifier
                .insert(nf.to_bytes(), (token, partition.len()));
        }
        partition.push(note);
    }

    /// Snapshot of all notes, optionally restricted to one token
    pub fn get_all(&self, token: Option<TokenAddress>) -> Vec<Note> {
        match token {
            Some(t) => self.notes.get(&t).cloned().unwrap_or_default(),
            None => self.notes.values().flatten().cloned().collect(),
        }
    }

    /// Snapshot of unspent notes
    pub fn get_unspent(&self, token: Option<TokenAddress>) -> Vec<Note> {
        self.get_all(token)
            .into_iter()
            .filter(|n| !n.is_spent())
            .collect()
    }

    /// Find an unspent note by its commitment
    pub fn find_unspent(
        &self,
        token: TokenAddress,
        commitment: &NoteCommitment,
    ) -> Option<Note> {
        self.notes.get(&token)?.iter().find_map(|n| {
            if n.is_spent() {
                return None;
            }
            match n.commitment() {
                Ok(c) if c == *commitment => Some(n.clone()),
                _ => None,
            }
        })
    }

    /// Flip a note to spent by its nullifier; false if unknown or already
    /// spent
    pub fn mark_spent(&mut self, nf: &Nullifier) -> bool {
        self.set_spent_flag(nf, true)
    }

    /// Unmark a nullifier whose observation turned out to be orphaned
    /// (reorged block)
    pub fn restore_unspent(&mut self, nf: &Nullifier) -> bool {
        self.set_spent_flag(nf, false)
    }

    fn set_spent_flag(&mut self, nf: &Nullifier, spent: bool) -> bool {
        let Some((token, idx)) = self.by_nullifier.get(&nf.to_bytes()).copied() else {
            return false;
        };
        let Some(note) = self.notes.get_mut(&token).and_then(|p| p.get_mut(idx)) else {
            return false;
        };
        if note.is_spent() == spent {
            return false;
        }
        note.set_spent(spent);
        true
    }

    pub fn len(&self) -> usize {
        self.notes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
