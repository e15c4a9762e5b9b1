//! End-to-end pipeline tests: ceremony → witness → proof → verification,
//! including the persisted-artifact round trip.

use std::fs;
use std::path::PathBuf;

use ark_bn254::{Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};

use zksquare::artifacts::{self, OriginalInputs, ProofRecord, VerificationKeyFile};
use zksquare::ceremony::{phase1, CeremonyPolicy, CircuitKeys, Phase1Srs, Phase2Setup};
use zksquare::{compile, compute_witness, prove, verify, PublicSignals, ZkSquareError};

const TEST_POWER: u32 = 3;

fn run_ceremony() -> CircuitKeys {
    let policy = CeremonyPolicy::default();
    let (srs, _) = Phase1Srs::new(TEST_POWER)
        .unwrap()
        .contribute("pipeline phase-1 entropy")
        .unwrap();
    let srs = srs.finalize(&policy).unwrap();
    let shape = compile(srs.size_bound()).unwrap();
    let (setup, _) = Phase2Setup::new(&srs, shape)
        .unwrap()
        .contribute("pipeline phase-2 entropy")
        .unwrap();
    setup.finalize(&policy).unwrap()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("zksquare-pipeline-{}-{name}", std::process::id()))
}

#[test]
fn proves_and_verifies_known_squares() {
    let keys = run_ceremony();
    for (x, square) in [(7i64, 49i64), (-5, 25), (123, 15129), (0, 0)] {
        let witness = compute_witness(x, square).unwrap();
        let (proof, signals) = prove(&keys, witness, &mut rand::thread_rng()).unwrap();
        assert_eq!(signals.0[0], Fr::from(square));
        assert!(
            verify(keys.verifying_key(), &signals, &proof).unwrap(),
            "proof for x={x} must verify"
        );
    }
}

#[test]
fn wrong_public_claim_fails_before_proving() {
    assert!(matches!(
        compute_witness(5, 24),
        Err(ZkSquareError::ConstraintUnsatisfied(_))
    ));
}

#[test]
fn proof_record_roundtrip_preserves_verdict() {
    let keys = run_ceremony();
    let witness = compute_witness(7, 49).unwrap();
    let (proof, signals) = prove(&keys, witness, &mut rand::thread_rng()).unwrap();
    let in_memory = verify(keys.verifying_key(), &signals, &proof).unwrap();

    let record = ProofRecord::new(
        &proof,
        &signals,
        OriginalInputs {
            secret_number: 7,
            public_square: 49,
        },
    )
    .unwrap();
    let path = temp_path("roundtrip-proof.json");
    record.save(&path).unwrap();

    let reloaded = ProofRecord::load(&path).unwrap();
    let from_disk = verify(
        keys.verifying_key(),
        &reloaded.signals().unwrap(),
        &reloaded.proof().unwrap(),
    )
    .unwrap();
    assert_eq!(in_memory, from_disk);
    assert!(from_disk);
    fs::remove_file(&path).unwrap();
}

#[test]
fn verification_key_roundtrip() {
    let keys = run_ceremony();
    let witness = compute_witness(123, 15129).unwrap();
    let (proof, signals) = prove(&keys, witness, &mut rand::thread_rng()).unwrap();

    let path = temp_path("vk.json");
    VerificationKeyFile::from_vk(keys.verifying_key())
        .unwrap()
        .save(&path)
        .unwrap();
    let vk = VerificationKeyFile::load(&path).unwrap().to_vk().unwrap();
    assert_eq!(&vk, keys.verifying_key());
    assert!(verify(&vk, &signals, &proof).unwrap());
    fs::remove_file(&path).unwrap();
}

#[test]
fn tampered_proof_fails_closed_without_error() {
    let keys = run_ceremony();
    let witness = compute_witness(7, 49).unwrap();
    let (proof, signals) = prove(&keys, witness, &mut rand::thread_rng()).unwrap();

    // Perturb each proof element in turn; every variant must be rejected as
    // an ordinary `false`, not a structural error.
    let mut bad_a = proof.clone();
    bad_a.a = (bad_a.a + G1Affine::generator()).into_affine();
    let mut bad_b = proof.clone();
    bad_b.b = (bad_b.b + G2Affine::generator()).into_affine();
    let mut bad_c = proof.clone();
    bad_c.c = (bad_c.c + G1Affine::generator()).into_affine();

    for tampered in [bad_a, bad_b, bad_c] {
        assert!(!verify(keys.verifying_key(), &signals, &tampered).unwrap());
    }
}

#[test]
fn tampered_persisted_signal_fails_verification() {
    let keys = run_ceremony();
    let witness = compute_witness(7, 49).unwrap();
    let (proof, signals) = prove(&keys, witness, &mut rand::thread_rng()).unwrap();

    let mut record = ProofRecord::new(
        &proof,
        &signals,
        OriginalInputs {
            secret_number: 7,
            public_square: 49,
        },
    )
    .unwrap();
    record.public_signals[0] = "50".to_string();
    assert!(!verify(
        keys.verifying_key(),
        &record.signals().unwrap(),
        &record.proof().unwrap()
    )
    .unwrap());
}

#[test]
fn out_of_field_persisted_signal_is_malformed() {
    let keys = run_ceremony();
    let witness = compute_witness(7, 49).unwrap();
    let (proof, signals) = prove(&keys, witness, &mut rand::thread_rng()).unwrap();

    let mut record = ProofRecord::new(
        &proof,
        &signals,
        OriginalInputs {
            secret_number: 7,
            public_square: 49,
        },
    )
    .unwrap();
    // BN254 scalar modulus; the smallest out-of-range value.
    record.public_signals[0] =
        "21888242871839275222246405745257275088548364400416034343698204186575808495617".to_string();
    assert!(matches!(
        record.signals(),
        Err(ZkSquareError::MalformedInput(_))
    ));

    record.public_signals[0] = "49".to_string();
    record.proof.pi_a = "0xnothex".to_string();
    assert!(matches!(
        record.proof(),
        Err(ZkSquareError::MalformedInput(_))
    ));
}

#[test]
fn signal_count_mismatch_is_malformed() {
    let keys = run_ceremony();
    let witness = compute_witness(7, 49).unwrap();
    let (proof, signals) = prove(&keys, witness, &mut rand::thread_rng()).unwrap();

    let short = PublicSignals(signals.0[..1].to_vec());
    assert!(matches!(
        verify(keys.verifying_key(), &short, &proof),
        Err(ZkSquareError::MalformedInput(_))
    ));
}

#[test]
fn contribution_after_finalize_is_rejected_and_artifact_intact() {
    let policy = CeremonyPolicy::default();
    let (srs, _) = Phase1Srs::new(TEST_POWER)
        .unwrap()
        .contribute("entropy")
        .unwrap();
    let prepared = srs.finalize(&policy).unwrap();

    // Finalized artifacts only exist on disk in their prepared form; loading
    // one for contribution is a reported trust-boundary violation.
    let path = temp_path("finalized.srs");
    artifacts::write_prepared_srs(&path, &prepared).unwrap();
    assert!(matches!(
        artifacts::read_phase1_srs(&path),
        Err(ZkSquareError::PhaseAlreadyFinalized("phase 1"))
    ));
    assert_eq!(artifacts::read_prepared_srs(&path).unwrap(), prepared);

    let keys = run_ceremony();
    let zkey_path = temp_path("finalized.zkey");
    artifacts::write_circuit_keys(&zkey_path, &keys).unwrap();
    assert!(matches!(
        artifacts::read_phase2_setup(&zkey_path),
        Err(ZkSquareError::PhaseAlreadyFinalized("phase 2"))
    ));

    fs::remove_file(&path).unwrap();
    fs::remove_file(&zkey_path).unwrap();
}

#[test]
fn ceremony_chain_is_independently_verifiable() {
    let initial = Phase1Srs::new(TEST_POWER).unwrap();
    let (first, first_record) = initial.clone().contribute("first party").unwrap();
    let (second, second_record) = first.clone().contribute("second party").unwrap();

    assert!(phase1::verify_contribution(&initial, &first, &first_record).unwrap());
    assert!(phase1::verify_contribution(&first, &second, &second_record).unwrap());
    // Skipping a link in the chain does not verify.
    assert!(!phase1::verify_contribution(&initial, &second, &second_record).unwrap());
}

#[test]
fn proofs_from_independent_ceremonies_do_not_cross_verify() {
    let keys_a = run_ceremony();

    let policy = CeremonyPolicy::default();
    let (srs, _) = Phase1Srs::new(TEST_POWER)
        .unwrap()
        .contribute("a different ceremony")
        .unwrap();
    let srs = srs.finalize(&policy).unwrap();
    let shape = compile(srs.size_bound()).unwrap();
    let (setup, _) = Phase2Setup::new(&srs, shape)
        .unwrap()
        .contribute("different phase 2")
        .unwrap();
    let keys_b = setup.finalize(&policy).unwrap();

    let witness = compute_witness(7, 49).unwrap();
    let (proof, signals) = prove(&keys_a, witness, &mut rand::thread_rng()).unwrap();
    assert!(verify(keys_a.verifying_key(), &signals, &proof).unwrap());
    assert!(!verify(keys_b.verifying_key(), &signals, &proof).unwrap());
}
