//! Proof generation. Consumes the witness; nothing secret survives the call.

use ark_bn254::Bn254;
use ark_groth16::{Groth16, Proof};
use ark_snark::SNARK;
use rand_core::{CryptoRng, RngCore};

use crate::ceremony::CircuitKeys;
use crate::errors::{Result, ZkSquareError};
use crate::witness::{PublicSignals, Witness};

/// Produces a proof and the ordered public signals it is bound to. The
/// witness is consumed and dropped on every exit path; it is never logged or
/// retained. Fails with `WitnessMismatch` if the witness shape disagrees with
/// the constraint system the keys were derived from.
pub fn prove<R: RngCore + CryptoRng>(
    keys: &CircuitKeys,
    witness: Witness,
    rng: &mut R,
) -> Result<(Proof<Bn254>, PublicSignals)> {
    if witness.num_instance() != keys.shape.num_instance
        || witness.num_witness() != keys.shape.num_witness
    {
        return Err(ZkSquareError::WitnessMismatch {
            expected_instance: keys.shape.num_instance,
            expected_witness: keys.shape.num_witness,
            actual_instance: witness.num_instance(),
            actual_witness: witness.num_witness(),
        });
    }

    let signals = witness.public_signals();
    let proof = Groth16::<Bn254>::prove(&keys.pk, witness.into_circuit(), rng)?;
    tracing::debug!("generated Groth16 proof");
    Ok((proof, signals))
}
