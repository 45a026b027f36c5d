//! Shielded pool engine - narrated demo
//!
//! Walks the full client lifecycle against a simulated chain:
//! 1. Deposit - Alice derives keys from a host-wallet signature, mints a
//!    note, and finalizes it from the deposit event.
//! 2. Shielded transfer - Alice builds a transfer witness sending 700_000
//!    to Bob; both wallets ingest the confirmation event.
//! 3. Withdrawal - Bob reveals an amount publicly and keeps the change.
//!
//! The external Groth16 prover is out of scope here, so the proof step uses
//! a placeholder proof to exercise the 256-byte codec; every other step is
//! the real engine.

use ark_bn254::{Bn254, Fr};
use ark_ec::{CurveGroup, Group};
use ark_groth16::Proof;
use rand::rngs::OsRng;

use zktoken::{
    wallet::{NoteEvent, PoolEvent},
    Keypair, TokenAddress, Wallet,
};

fn main() {
    println!("==============================================");
    println!("  Shielded Pool Client Engine Demonstration");
    println!("==============================================\n");

    let token = TokenAddress::from_bytes([0xab; 20]);

    // ===== Keys from host-wallet signatures =====
    println!("1. Deriving shielded keys from host signatures...");

    let alice_sig = [0x11u8; 65]; // stands in for eth_sign output
    let alice_kp = Keypair::from_host_signature("0xA11CE", &alice_sig).unwrap();
    println!(
        "   Alice signs: \"{}\"",
        Keypair::signing_message("0xA11CE")
    );

    let bob_kp = Keypair::generate(&mut OsRng).unwrap();
    let bob_pub = *bob_kp.public();
    println!("   Bob generated a fresh keypair\n");

    let mut alice = Wallet::new(alice_kp, token);
    let mut bob = Wallet::new(bob_kp, token);

    // ===== Deposit =====
    println!("2. Alice deposits 1_000_000 units...");

    let commitment = alice.deposit(1_000_000, &mut OsRng).unwrap();
    println!("   Commitment submitted: {:?}", commitment);

    // The chain inserts the commitment and reports leaf index 0
    let deposit_event = PoolEvent {
        block: 100,
        spent_nullifier: None,
        outputs: vec![NoteEvent {
            commitment: commitment.to_field(),
            leaf_index: 0,
            memo: Vec::new(),
        }],
    };
    alice.ingest(&deposit_event).unwrap();
    bob.ingest(&deposit_event).unwrap();
    println!("   Deposit confirmed at leaf 0");
    println!("   Merkle root: {:?}\n", alice.tree().root());

    // ===== Shielded transfer =====
    println!("3. Alice sends 700_000 to Bob (shielded)...");

    let input = alice.unspent_notes().remove(0);
    let (job_id, witness) = alice
        .begin_transfer(&input, &bob_pub, 700_000, &mut OsRng)
        .unwrap();

    let signals = witness.public_signals();
    println!("   Public signals:");
    println!("     merkle_root      = {}", short(&signals[0]));
    println!("     nullifier_hash   = {}", short(&signals[1]));
    println!("     new_commitment_1 = {}", short(&signals[2]));
    println!("     new_commitment_2 = {}", short(&signals[3]));
    println!(
        "   Witness assignment: {} field elements, conservation verified",
        witness.to_vec().len()
    );

    // External prover runs here; a placeholder proof exercises the codec
    let proof_bytes = alice.attach_proof(job_id, &placeholder_proof()).unwrap();
    println!("   Encoded proof: {} bytes", proof_bytes.len());
    alice.submit(job_id).unwrap();

    let transfer_event = confirmation(&alice, job_id, 1, 101);
    let change = alice.ingest(&transfer_event).unwrap();
    let received = bob.ingest(&transfer_event).unwrap();

    println!("   Chain confirmed the spend");
    println!("   Alice's change note: {} units", change[0].amount());
    println!("   Bob received: {} units", received[0].amount());
    println!("   Roots agree: {}\n", alice.tree().root() == bob.tree().root());

    // ===== Withdrawal =====
    println!("4. Bob withdraws 250_000 publicly...");

    let bob_input = bob.unspent_notes().remove(0);
    let (withdraw_id, withdraw_witness) = bob
        .begin_withdraw(&bob_input, 250_000, &mut OsRng)
        .unwrap();

    let w_signals = withdraw_witness.public_signals();
    println!("   Public signals:");
    println!("     merkle_root       = {}", short(&w_signals[0]));
    println!("     nullifier_hash    = {}", short(&w_signals[1]));
    println!("     amount (revealed) = {}", 250_000);
    println!("     change_commitment = {}", short(&w_signals[3]));

    bob.attach_proof(withdraw_id, &placeholder_proof()).unwrap();
    bob.submit(withdraw_id).unwrap();

    let withdraw_event = confirmation(&bob, withdraw_id, 3, 102);
    alice.ingest(&withdraw_event).unwrap();
    let bob_change = bob.ingest(&withdraw_event).unwrap();

    println!("   Bob's change note: {} units", bob_change[0].amount());

    // ===== Summary =====
    println!("\n5. Final state:");
    println!(
        "   Alice unspent: {:?}",
        alice
            .unspent_notes()
            .iter()
            .map(|n| n.amount())
            .collect::<Vec<_>>()
    );
    println!(
        "   Bob unspent:   {:?}",
        bob.unspent_notes()
            .iter()
            .map(|n| n.amount())
            .collect::<Vec<_>>()
    );
    println!("   250_000 units left the pool publicly; everything else stayed shielded.");
}

/// Stand-in for the external Groth16 prover's output
fn placeholder_proof() -> Proof<Bn254> {
    use ark_bn254::{G1Projective, G2Projective};
    Proof {
        a: (G1Projective::generator() * Fr::from(2u64)).into_affine(),
        b: (G2Projective::generator() * Fr::from(3u64)).into_affine(),
        c: (G1Projective::generator() * Fr::from(4u64)).into_affine(),
    }
}

/// The chain's confirmation event for a submitted job
fn confirmation(wallet: &Wallet, job_id: u64, first_leaf: u64, block: u64) -> PoolEvent {
    let job = wallet.job(job_id).unwrap();
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

fn short(f: &Fr) -> String {
    let bytes = zktoken::curve::fr_to_be_bytes(f);
    format!("0x{:02x}{:02x}{:02x}{:02x}..", bytes[0], bytes[1], bytes[2], bytes[3])
}
