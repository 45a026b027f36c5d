//! Spend lifecycle
//!
//! A spend walks a fixed state machine:
//!
//! ```text
//! idle -> building_witness -> proving -> encoding_proof -> submitted
//!                                                            |
//!                                              confirmed <---+---> rejected
//! ```
//!
//! The prover and the chain are external: the job pauses at `proving` until
//! the caller attaches the proof, and at `submitted` until a chain event
//! (or rejection) resolves it. Cancellation is local-only and allowed up to
//! submission; the sampled output secrets are simply discarded. After
//! submission the job owns a pending record until the chain answers.

use ark_bn254::{Bn254, Fr};
use ark_groth16::Proof;

use crate::constants::{MEMO_BYTES, PROOF_BYTES};
use crate::error::{Error, Result};
use crate::note::Note;
use crate::nullifier::Nullifier;
use crate::prover::encode_proof;

/// Where a spend job currently sits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpendState {
    Idle,
    BuildingWitness,
    Proving,
    EncodingProof,
    Submitted,
    Confirmed,
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpendKind {
    Transfer,
    Withdraw,
}

/// A pending spend: the witness has been assembled, outputs sampled, and
/// the job is waiting on the external prover / chain.
#[derive(Debug)]
pub struct SpendJob {
    id: u64,
    kind: SpendKind,
    state: SpendState,
    /// Nullifier the chain will record when this spend lands
    input_nullifier: Nullifier,
    /// Output notes awaiting leaf indices, paired with their sealed memos
    outputs: Vec<(Note, [u8; MEMO_BYTES])>,
    public_signals: [Fr; 4],
    proof_bytes: Option<[u8; PROOF_BYTES]>,
}

impl SpendJob {
    pub(crate) fn new(
        id: u64,
        kind: SpendKind,
        input_nullifier: Nullifier,
        outputs: Vec<(Note, [u8; MEMO_BYTES])>,
        public_signals: [Fr; 4],
    ) -> Self {
        tracing::info!(id, ?kind, "spend job created, witness ready");
        Self {
            id,
            kind,
            // Witness assembly happens in the constructor's caller, so the
            // job is born awaiting the prover.
            state: SpendState::Proving,
            input_nullifier,
            outputs,
            public_signals,
            proof_bytes: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> SpendKind {
        self.kind
    }

    pub fn state(&self) -> SpendState {
        self.state
    }

    pub fn input_nullifier(&self) -> Nullifier {
        self.input_nullifier
    }

    pub fn public_signals(&self) -> &[Fr; 4] {
        &self.public_signals
    }

    /// Output notes with their sealed memos, in commitment-signal order
    pub fn outputs(&self) -> &[(Note, [u8; MEMO_BYTES])] {
        &self.outputs
    }

    pub fn proof_bytes(&self) -> Option<&[u8; PROOF_BYTES]> {
        self.proof_bytes.as_ref()
    }

    /// Accept the externally produced proof and encode it for submission
    pub fn attach_proof(&mut self, proof: &Proof<Bn254>) -> Result<&[u8; PROOF_BYTES]> {
        if self.state != SpendState::Proving {
            return Err(Error::InvalidStateTransition);
        }
        // Encode before transitioning so a malformed proof leaves the job
        // retryable in `proving`
        let encoded = encode_proof(proof)?;
        self.proof_bytes = Some(encoded);
        self.state = SpendState::EncodingProof;
        tracing::info!(id = self.id, "proof encoded");
        Ok(self.proof_bytes.as_ref().expect("just set"))
    }

    /// Flag the encoded proof as handed to the chain. From here the job is
    /// no longer cancellable.
    pub fn mark_submitted(&mut self) -> Result<()> {
        if self.state != SpendState::EncodingProof || self.proof_bytes.is_none() {
            return Err(Error::InvalidStateTransition);
        }
        self.state = SpendState::Submitted;
        tracing::info!(id = self.id, "spend submitted");
        Ok(())
    }

    /// Local cancellation; allowed strictly before submission
    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            SpendState::Idle
            | SpendState::BuildingWitness
            | SpendState::Proving
            | SpendState::EncodingProof => {
                self.state = SpendState::Idle;
                self.outputs.clear();
                self.proof_bytes = None;
                tracing::info!(id = self.id, "spend cancelled locally");
                Ok(())
            }
            _ => Err(Error::InvalidStateTransition),
        }
    }

    pub(crate) fn mark_confirmed(&mut self) -> Result<()> {
        if self.state != SpendState::Submitted {
            return Err(Error::InvalidStateTransition);
        }
        self.state = SpendState::Confirmed;
        tracing::info!(id = self.id, "spend confirmed on-chain");
        Ok(())
    }

    pub(crate) fn mark_rejected(&mut self) -> Result<()> {
        if self.state != SpendState::Submitted {
            return Err(Error::InvalidStateTransition);
        }
        self.state = SpendState::Rejected;
        tracing::info!(id = self.id, "spend rejected by chain");
        Ok(())
    }

    /// A job still holding a claim on its input note
    pub fn is_pending(&self) -> bool {
        matches!(
            self.state,
            SpendState::Proving
                | SpendState::EncodingProof
                | SpendState::Submitted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{G1Projective, G2Projective};
    use ark_ec::{CurveGroup, Group};
    use ark_ff::Zero;

    fn fixture_proof() -> Proof<Bn254> {
        Proof {
            a: (G1Projective::generator() * Fr::from(2u64)).into_affine(),
            b: (G2Projective::generator() * Fr::from(3u64)).into_affine(),
            c: (G1Projective::generator() * Fr::from(4u64)).into_affine(),
        }
    }

    fn make_job() -> SpendJob {
        SpendJob::new(
            1,
            SpendKind::Transfer,
            Nullifier::from_field(Fr::from(77u64)),
            Vec::new(),
            [Fr::zero(); 4],
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = make_job();
        assert_eq!(job.state(), SpendState::Proving);
        assert!(job.is_pending());

        job.attach_proof(&fixture_proof()).unwrap();
        assert_eq!(job.state(), SpendState::EncodingProof);
        assert_eq!(job.proof_bytes().unwrap().len(), PROOF_BYTES);

        job.mark_submitted().unwrap();
        assert_eq!(job.state(), SpendState::Submitted);

        job.mark_confirmed().unwrap();
        assert_eq!(job.state(), SpendState::Confirmed);
        assert!(!job.is_pending());
    }

    #[test]
    fn test_rejection_path() {
        let mut job = make_job();
        job.attach_proof(&fixture_proof()).unwrap();
        job.mark_submitted().unwrap();
        job.mark_rejected().unwrap();
        assert_eq!(job.state(), SpendState::Rejected);
    }

    #[test]
    fn test_cancel_before_submission_only() {
        let mut job = make_job();
        job.attach_proof(&fixture_proof()).unwrap();
        assert!(job.cancel().is_ok());
        assert_eq!(job.state(), SpendState::Idle);

        let mut submitted = make_job();
        submitted.attach_proof(&fixture_proof()).unwrap();
        submitted.mark_submitted().unwrap();
        assert!(matches!(
            submitted.cancel(),
            Err(Error::InvalidStateTransition)
        ));
    }

    #[test]
    fn test_out_of_order_transitions_fail() {
        let mut job = make_job();
        // Cannot submit before a proof exists
        assert!(matches!(
            job.mark_submitted(),
            Err(Error::InvalidStateTransition)
        ));
        // Cannot confirm before submission
        assert!(matches!(
            job.mark_confirmed(),
            Err(Error::InvalidStateTransition)
        ));
        // Double attach is rejected
        job.attach_proof(&fixture_proof()).unwrap();
        assert!(matches!(
            job.attach_proof(&fixture_proof()),
            Err(Error::InvalidStateTransition)
        ));
    }
}
