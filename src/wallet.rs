//! Wallet orchestration over one shielded pool
//!
//! The wallet is the single writer for all long-lived state: the note
//! store, the tree mirror and the pending spend jobs. Chain events drive
//! every authoritative transition:
//!
//! - new commitments extend the tree mirror in chain order,
//! - a commitment matching one of our pending deposits finalizes it,
//! - memos are tried against our key; unlocked notes enter the store,
//! - an observed nullifier marks the note spent and confirms the matching
//!   pending job.
//!
//! The store's spent flag follows observation of the nullifier on-chain,
//! never local submission: an orphaned spend that the chain silently drops
//! must not strand a note. Double-selection is prevented separately - note
//! selection skips any note whose nullifier is claimed by a pending job,
//! and cancellation or rejection simply releases that claim.

use std::collections::HashMap;

use ark_bn254::{Bn254, Fr};
use ark_groth16::Proof;
use rand::{CryptoRng, RngCore};

use crate::constants::PROOF_BYTES;
use crate::curve::Point;
use crate::error::{Error, Result};
use crate::keys::Keypair;
use crate::memo::{self, MemoPlaintext};
use crate::merkle::{MerklePath, MerkleTree};
use crate::note::{Note, NoteCommitment, TokenAddress};
use crate::nullifier::{Nullifier, NullifierSet};
use crate::prover::{build_transfer, build_withdraw, TransferWitness, WithdrawWitness};
use crate::spend::{SpendJob, SpendKind, SpendState};
use crate::store::NoteStore;

/// One new output note as it appears in the event log
#[derive(Clone, Debug)]
pub struct NoteEvent {
    pub commitment: Fr,
    pub leaf_index: u64,
    pub memo: Vec<u8>,
}

/// One pool transaction as observed in the event log
#[derive(Clone, Debug)]
pub struct PoolEvent {
    pub block: u64,
    /// Present for transfers and withdrawals, absent for deposits
    pub spent_nullifier: Option<Fr>,
    pub outputs: Vec<NoteEvent>,
}

/// Stateless scan over an event stream: returns exactly the notes sealed
/// to `keypair`, each cross-checked against its event commitment
pub fn scan_events(events: &[PoolEvent], keypair: &Keypair, token: TokenAddress) -> Vec<Note> {
    let mut found = Vec::new();
    for event in events {
        for output in &event.outputs {
            if let Some(note) = memo::recover_note(
                &output.memo,
                NoteCommitment::from_field(output.commitment),
                output.leaf_index,
                keypair,
                token,
            ) {
                found.push(note);
            }
        }
    }
    found
}

/// A wallet bound to one pool (one token contract)
pub struct Wallet {
    keypair: Keypair,
    token: TokenAddress,
    tree: MerkleTree,
    store: NoteStore,
    observed: NullifierSet,
    /// Deposits minted locally, awaiting their chain-assigned leaf index
    pending_deposits: Vec<Note>,
    jobs: HashMap<u64, SpendJob>,
    next_job_id: u64,
}

impl Wallet {
    pub fn new(keypair: Keypair, token: TokenAddress) -> Self {
        Self {
            keypair,
            token,
            tree: MerkleTree::new(),
            store: NoteStore::new(),
            observed: NullifierSet::new(),
            pending_deposits: Vec::new(),
            jobs: HashMap::new(),
            next_job_id: 0,
        }
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn token(&self) -> TokenAddress {
        self.token
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    /// Snapshot of spendable notes: unspent in the store and not claimed
    /// by a pending spend job
    pub fn unspent_notes(&self) -> Vec<Note> {
        self.store
            .get_unspent(Some(self.token))
            .into_iter()
            .filter(|n| match n.nullifier() {
                Ok(nf) => !self.has_pending_job(&nf),
                Err(_) => true,
            })
            .collect()
    }

    pub fn job(&self, id: u64) -> Option<&SpendJob> {
        self.jobs.get(&id)
    }

    /// Mint a deposit note and return the commitment to submit on-chain.
    /// Deposits skip the prover entirely; the note finalizes when the chain
    /// reports its leaf index.
    pub fn deposit<R: RngCore + CryptoRng>(
        &mut self,
        amount: u64,
        rng: &mut R,
    ) -> Result<NoteCommitment> {
        let note = Note::new(amount, *self.keypair.public(), self.token, rng)?;
        let commitment = note.commitment()?;
        tracing::info!(amount, "deposit note minted");
        self.pending_deposits.push(note);
        Ok(commitment)
    }

    /// Assemble a transfer spending `input`. Returns the job id and the
    /// witness for the external prover; the job carries the sealed memos
    /// for both outputs (recipient's, and change back to us).
    pub fn begin_transfer<R: RngCore + CryptoRng>(
        &mut self,
        input: &Note,
        recipient_pub: &Point,
        amount: u64,
        rng: &mut R,
    ) -> Result<(u64, TransferWitness)> {
        let path = self.lock_input(input)?;
        let bundle = build_transfer(input, &self.keypair, &path, recipient_pub, amount, rng)?;

        let recipient_memo = memo::seal(
            &MemoPlaintext::from_note(&bundle.recipient_note),
            recipient_pub,
            rng,
        )?;
        let change_memo = memo::seal(
            &MemoPlaintext::from_note(&bundle.change_note),
            self.keypair.public(),
            rng,
        )?;

        let id = self.allocate_job(
            SpendKind::Transfer,
            input.nullifier()?,
            vec![
                (bundle.recipient_note.clone(), recipient_memo),
                (bundle.change_note.clone(), change_memo),
            ],
            bundle.witness.public_signals(),
        );
        Ok((id, bundle.witness))
    }

    /// Assemble a withdrawal revealing `amount` publicly
    pub fn begin_withdraw<R: RngCore + CryptoRng>(
        &mut self,
        input: &Note,
        amount: u64,
        rng: &mut R,
    ) -> Result<(u64, WithdrawWitness)> {
        let path = self.lock_input(input)?;
        let bundle = build_withdraw(input, &self.keypair, &path, amount, rng)?;

        let outputs = match &bundle.change_note {
            Some(change) => {
                let change_memo =
                    memo::seal(&MemoPlaintext::from_note(change), self.keypair.public(), rng)?;
                vec![(change.clone(), change_memo)]
            }
            None => Vec::new(),
        };

        let id = self.allocate_job(
            SpendKind::Withdraw,
            input.nullifier()?,
            outputs,
            bundle.witness.public_signals(),
        );
        Ok((id, bundle.witness))
    }

    /// Attach the externally produced proof; returns the 256-byte encoding
    pub fn attach_proof(&mut self, job_id: u64, proof: &Proof<Bn254>) -> Result<[u8; PROOF_BYTES]> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(Error::InvalidStateTransition)?;
        Ok(*job.attach_proof(proof)?)
    }

    /// Flag the encoded proof as handed to the chain. The store is not
    /// touched here: the spent flag follows the nullifier's on-chain
    /// observation in `ingest`, and the pending job already keeps the input
    /// out of note selection.
    pub fn submit(&mut self, job_id: u64) -> Result<()> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(Error::InvalidStateTransition)?;
        job.mark_submitted()
    }

    /// Cancel a job that has not been submitted; its sampled output secrets
    /// are discarded
    pub fn cancel(&mut self, job_id: u64) -> Result<()> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(Error::InvalidStateTransition)?;
        job.cancel()?;
        self.jobs.remove(&job_id);
        Ok(())
    }

    /// React to a chain rejection: the job is dead, which releases its
    /// claim on the input note. The store never saw an optimistic spent
    /// flag, so there is nothing else to roll back.
    pub fn mark_rejected(&mut self, job_id: u64) -> Result<()> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(Error::InvalidStateTransition)?;
        job.mark_rejected()?;
        tracing::info!(job_id, "chain rejected spend, input released");
        Ok(())
    }

    /// Ingest one pool event, in chain order. Extends the tree mirror,
    /// finalizes pending deposits, scans memos, and applies observed
    /// nullifiers. Returns the notes unlocked for us by this event.
    pub fn ingest(&mut self, event: &PoolEvent) -> Result<Vec<Note>> {
        let mut received = Vec::new();

        for output in &event.outputs {
            // The mirror must agree with the chain on every index; a gap or
            // reorder would silently corrupt every future root
            if self.tree.leaf_count() != output.leaf_index {
                return Err(Error::EventOutOfOrder);
            }
            self.tree.insert(output.commitment)?;

            let commitment = NoteCommitment::from_field(output.commitment);
            if let Some(pos) = self
                .pending_deposits
                .iter()
                .position(|n| n.commitment().ok() == Some(commitment))
            {
                let note = self.pending_deposits.swap_remove(pos);
                let finalized = note.finalized(output.leaf_index);
                tracing::info!(
                    leaf_index = output.leaf_index,
                    "deposit confirmed and finalized"
                );
                self.store.save(finalized.clone());
                received.push(finalized);
                continue;
            }

            if let Some(note) = memo::recover_note(
                &output.memo,
                commitment,
                output.leaf_index,
                &self.keypair,
                self.token,
            ) {
                tracing::info!(
                    leaf_index = output.leaf_index,
                    amount = note.amount(),
                    "incoming note recovered from memo"
                );
                self.store.save(note.clone());
                received.push(note);
            }
        }

        if let Some(nf_field) = event.spent_nullifier {
            let nf = Nullifier::from_field(nf_field);
            if self.observed.insert(nf) {
                self.store.mark_spent(&nf);
                if let Some(job) = self
                    .jobs
                    .values_mut()
                    .find(|j| j.state() == SpendState::Submitted && j.input_nullifier() == nf)
                {
                    job.mark_confirmed()?;
                }
            }
        }

        Ok(received)
    }

    /// Path for a finalized note against the current root
    pub fn path_for(&self, note: &Note) -> Result<MerklePath> {
        let index = note.leaf_index().ok_or(Error::NoteNotFinalized)?;
        self.tree.path(index)
    }

    fn lock_input(&self, input: &Note) -> Result<MerklePath> {
        if input.token() != self.token || input.owner_pub() != self.keypair.public() {
            return Err(Error::OwnerMismatch);
        }
        if input.is_spent() {
            return Err(Error::NoteSpent);
        }
        let nf = input.nullifier()?;
        if self.observed.contains(&nf) {
            return Err(Error::NoteSpent);
        }
        if self.has_pending_job(&nf) {
            return Err(Error::SpendInProgress);
        }
        self.path_for(input)
    }

    fn has_pending_job(&self, nf: &Nullifier) -> bool {
        self.jobs
            .values()
            .any(|j| j.is_pending() && j.input_nullifier() == *nf)
    }

    fn allocate_job(
        &mut self,
        kind: SpendKind,
        nullifier: Nullifier,
        outputs: Vec<(Note, [u8; crate::constants::MEMO_BYTES])>,
        public_signals: [Fr; 4],
    ) -> u64 {
        let id = self.next_job_id;
        self.next_job_id += 1;
        self.jobs
            .insert(id, SpendJob::new(id, kind, nullifier, outputs, public_signals));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{G1Projective, G2Projective};
    use ark_ec::{CurveGroup, Group};
    use rand::rngs::OsRng;

    fn token() -> TokenAddress {
        TokenAddress::from_bytes([0x22; 20])
    }

    fn fixture_proof() -> Proof<Bn254> {
        Proof {
            a: (G1Projective::generator() * Fr::from(5u64)).into_affine(),
            b: (G2Projective::generator() * Fr::from(6u64)).into_affine(),
            c: (G1Projective::generator() * Fr::from(7u64)).into_affine(),
        }
    }

    /// The chain's view: a deposit event for a commitment
    fn deposit_event(commitment: NoteCommitment, leaf_index: u64, block: u64) -> PoolEvent {
        PoolEvent {
            block,
            spent_nullifier: None,
            outputs: vec![NoteEvent {
                commitment: commitment.to_field(),
                leaf_index,
                memo: Vec::new(),
            }],
        }
    }

    /// The chain's view of a confirmed spend job
    fn confirmation_event(job: &SpendJob, first_leaf: u64, block: u64) -> PoolEvent {
        PoolEvent {
            block,
            spent_nullifier: Some(job.input_nullifier().to_field()),
            outputs: job
                .outputs()
                .iter()
                .enumerate()
                .map(|(i, (note, memo))| NoteEvent {
                    commitment: note.commitment().unwrap().to_field(),
                    leaf_index: first_leaf + i as u64,
                    memo: memo.to_vec(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_deposit_finalizes_from_event() {
        let keypair = Keypair::generate(&mut OsRng).unwrap();
        let mut wallet = Wallet::new(keypair, token());

        let commitment = wallet.deposit(1_000_000, &mut OsRng).unwrap();
        assert!(wallet.unspent_notes().is_empty());

        let received = wallet
            .ingest(&deposit_event(commitment, 0, 100))
            .unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].leaf_index(), Some(0));

        let unspent = wallet.unspent_notes();
        assert_eq!(unspent.len(), 1);
        assert_eq!(unspent[0].amount(), 1_000_000);
    }

    #[test]
    fn test_full_transfer_flow_between_two_wallets() {
        let alice_kp = Keypair::generate(&mut OsRng).unwrap();
        let bob_kp = Keypair::generate(&mut OsRng).unwrap();
        let bob_pub = *bob_kp.public();

        let mut alice = Wallet::new(alice_kp, token());
        let mut bob = Wallet::new(bob_kp, token());

        // Alice deposits; both wallets mirror the chain
        let commitment = alice.deposit(1_000_000, &mut OsRng).unwrap();
        let e0 = deposit_event(commitment, 0, 100);
        alice.ingest(&e0).unwrap();
        bob.ingest(&e0).unwrap();

        // Alice sends 700_000 to Bob
        let input = alice.unspent_notes().remove(0);
        let (job_id, witness) = alice
            .begin_transfer(&input, &bob_pub, 700_000, &mut OsRng)
            .unwrap();
        assert_eq!(witness.public_signals()[0], alice.tree().root());

        let encoded = alice.attach_proof(job_id, &fixture_proof()).unwrap();
        assert_eq!(encoded.len(), PROOF_BYTES);
        alice.submit(job_id).unwrap();

        // The pending job keeps the input out of selection; the store's
        // spent flag stays untouched until the nullifier is observed
        assert!(alice.unspent_notes().is_empty());

        // Chain confirms: nullifier + the two output commitments
        let e1 = confirmation_event(alice.job(job_id).unwrap(), 1, 101);
        let alice_received = alice.ingest(&e1).unwrap();
        let bob_received = bob.ingest(&e1).unwrap();

        assert_eq!(alice.job(job_id).unwrap().state(), SpendState::Confirmed);

        // Alice recovered her change, Bob his payment
        assert_eq!(alice_received.len(), 1);
        assert_eq!(alice_received[0].amount(), 300_000);
        assert_eq!(bob_received.len(), 1);
        assert_eq!(bob_received[0].amount(), 700_000);

        // Both mirrors agree on the tree
        assert_eq!(alice.tree().root(), bob.tree().root());
    }

    #[test]
    fn test_chain_rejection_restores_input() {
        let keypair = Keypair::generate(&mut OsRng).unwrap();
        let recipient = Keypair::generate(&mut OsRng).unwrap();
        let mut wallet = Wallet::new(keypair, token());

        let commitment = wallet.deposit(500, &mut OsRng).unwrap();
        wallet.ingest(&deposit_event(commitment, 0, 1)).unwrap();

        let input = wallet.unspent_notes().remove(0);
        let (job_id, _witness) = wallet
            .begin_transfer(&input, recipient.public(), 100, &mut OsRng)
            .unwrap();
        wallet.attach_proof(job_id, &fixture_proof()).unwrap();
        wallet.submit(job_id).unwrap();
        // Claimed by the pending job, not marked spent in the store
        assert!(wallet.unspent_notes().is_empty());

        // Verifier said no (unknown root, spent nullifier, ...)
        wallet.mark_rejected(job_id).unwrap();
        assert_eq!(wallet.unspent_notes().len(), 1);
        assert_eq!(wallet.job(job_id).unwrap().state(), SpendState::Rejected);

        // The restored note can be spent again; local checks still pass
        let restored = wallet.unspent_notes().remove(0);
        assert!(wallet
            .begin_transfer(&restored, recipient.public(), 100, &mut OsRng)
            .is_ok());
    }

    #[test]
    fn test_double_selection_is_blocked_while_pending() {
        let keypair = Keypair::generate(&mut OsRng).unwrap();
        let recipient = Keypair::generate(&mut OsRng).unwrap();
        let mut wallet = Wallet::new(keypair, token());

        let commitment = wallet.deposit(500, &mut OsRng).unwrap();
        wallet.ingest(&deposit_event(commitment, 0, 1)).unwrap();

        let input = wallet.unspent_notes().remove(0);
        wallet
            .begin_transfer(&input, recipient.public(), 100, &mut OsRng)
            .unwrap();

        assert!(matches!(
            wallet.begin_transfer(&input, recipient.public(), 50, &mut OsRng),
            Err(Error::SpendInProgress)
        ));
    }

    #[test]
    fn test_cancel_unlocks_note() {
        let keypair = Keypair::generate(&mut OsRng).unwrap();
        let recipient = Keypair::generate(&mut OsRng).unwrap();
        let mut wallet = Wallet::new(keypair, token());

        let commitment = wallet.deposit(500, &mut OsRng).unwrap();
        wallet.ingest(&deposit_event(commitment, 0, 1)).unwrap();

        let input = wallet.unspent_notes().remove(0);
        let (job_id, _) = wallet
            .begin_transfer(&input, recipient.public(), 100, &mut OsRng)
            .unwrap();

        wallet.cancel(job_id).unwrap();
        assert!(wallet.job(job_id).is_none());
        assert!(wallet
            .begin_transfer(&input, recipient.public(), 100, &mut OsRng)
            .is_ok());
    }

    #[test]
    fn test_out_of_order_event_is_refused() {
        let keypair = Keypair::generate(&mut OsRng).unwrap();
        let mut wallet = Wallet::new(keypair, token());

        let commitment = wallet.deposit(500, &mut OsRng).unwrap();
        // Chain says index 3, but the mirror is empty
        assert!(matches!(
            wallet.ingest(&deposit_event(commitment, 3, 1)),
            Err(Error::EventOutOfOrder)
        ));
    }

    #[test]
    fn test_scan_mixed_stream() {
        let a = Keypair::generate(&mut OsRng).unwrap();
        let b = Keypair::generate(&mut OsRng).unwrap();

        let mut events = Vec::new();
        let mut leaf = 0u64;
        for i in 0..10u64 {
            let recipient = if i < 3 { &a } else { &b };
            let note =
                Note::new(1000 + i, *recipient.public(), token(), &mut OsRng).unwrap();
            let memo = memo::seal(
                &MemoPlaintext::from_note(&note),
                recipient.public(),
                &mut OsRng,
            )
            .unwrap();
            events.push(PoolEvent {
                block: i,
                spent_nullifier: None,
                outputs: vec![NoteEvent {
                    commitment: note.commitment().unwrap().to_field(),
                    leaf_index: leaf,
                    memo: memo.to_vec(),
                }],
            });
            leaf += 1;
        }

        // 3 events addressed to A, 7 to B
        let for_a = scan_events(&events, &a, token());
        let for_b = scan_events(&events, &b, token());
        assert_eq!(for_a.len(), 3);
        assert_eq!(for_b.len(), 7);

        for note in &for_a {
            assert_eq!(note.owner_pub(), a.public());
            assert!(note.nullifier().is_ok());
        }
    }

    #[test]
    fn test_withdraw_flow() {
        let keypair = Keypair::generate(&mut OsRng).unwrap();
        let mut wallet = Wallet::new(keypair, token());

        let commitment = wallet.deposit(1_000, &mut OsRng).unwrap();
        wallet.ingest(&deposit_event(commitment, 0, 1)).unwrap();

        let input = wallet.unspent_notes().remove(0);
        let (job_id, witness) = wallet.begin_withdraw(&input, 400, &mut OsRng).unwrap();
        assert_eq!(witness.public_signals()[2], Fr::from(400u64));

        wallet.attach_proof(job_id, &fixture_proof()).unwrap();
        wallet.submit(job_id).unwrap();

        let event = confirmation_event(wallet.job(job_id).unwrap(), 1, 2);
        let received = wallet.ingest(&event).unwrap();

        // Change note (600) came back through its memo
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].amount(), 600);
        assert_eq!(wallet.unspent_notes().len(), 1);
    }
}
