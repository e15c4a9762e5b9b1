//! Proof verification. Pure: no side effects, no secret material.

use ark_bn254::Bn254;
use ark_groth16::{prepare_verifying_key, Groth16, Proof, VerifyingKey};
use ark_snark::SNARK;

use crate::errors::{Result, ZkSquareError};
use crate::witness::PublicSignals;

/// Runs the Groth16 pairing check. A well-formed but invalid proof returns
/// `Ok(false)`; only structurally invalid input (wrong signal count) is an
/// error.
pub fn verify(
    vk: &VerifyingKey<Bn254>,
    signals: &PublicSignals,
    proof: &Proof<Bn254>,
) -> Result<bool> {
    let expected = vk.gamma_abc_g1.len().saturating_sub(1);
    if signals.0.len() != expected {
        return Err(ZkSquareError::MalformedInput(format!(
            "expected {expected} public signals, got {}",
            signals.0.len()
        )));
    }

    let pvk = prepare_verifying_key(vk);
    Ok(Groth16::<Bn254>::verify_with_processed_vk(
        &pvk, &signals.0, proof,
    )?)
}
