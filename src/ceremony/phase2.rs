//! Phase 2: circuit-specific Groth16 key generation and contributions.
//!
//! The initial key pair is derived deterministically from the prepared SRS
//! digest and the compiled circuit. Contributions apply the standard Groth16
//! delta update: `delta` gains a factor `d` in both groups while the `h` and
//! `l` query vectors are scaled by `d⁻¹`, which preserves the pairing
//! relations for every valid proof.

use ark_bn254::{Bn254, Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::Field;
use ark_std::UniformRand;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

use super::{audit_rng, chain_transcript, derive_secret, CeremonyPolicy, ContributionRecord};
use crate::circuit::{CircuitShape, SquareCircuit};
use crate::errors::{Result as ZkResult, ZkSquareError};

const PHASE2_DOMAIN: &[u8] = b"zksquare groth16 phase-2 contribution";

/// An open (still contributable) circuit-specific key pair.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct Phase2Setup {
    pub pk: ProvingKey<Bn254>,
    pub num_constraints: u64,
    pub num_instance: u64,
    pub num_witness: u64,
    pub contributions: u64,
    pub transcript: [u8; 32],
}

impl Phase2Setup {
    /// Derives the initial key pair from the prepared SRS and the compiled
    /// circuit. Deterministic given both: the setup randomness is seeded from
    /// the SRS digest, binding the keys to the phase-1 transcript.
    pub fn new(srs: &super::PreparedSrs, shape: CircuitShape) -> ZkResult<Self> {
        if shape.num_constraints > srs.size_bound() {
            return Err(ZkSquareError::MalformedInput(format!(
                "circuit has {} constraints but the SRS supports at most {}",
                shape.num_constraints,
                srs.size_bound()
            )));
        }

        let mut rng = ChaCha20Rng::from_seed(srs.digest()?);
        let (pk, _vk) = Groth16::<Bn254>::circuit_specific_setup(SquareCircuit::blank(), &mut rng)?;

        tracing::info!(
            constraints = shape.num_constraints,
            instance = shape.num_instance,
            witness = shape.num_witness,
            "derived initial circuit keys from prepared SRS"
        );
        Ok(Self {
            pk,
            num_constraints: shape.num_constraints,
            num_instance: shape.num_instance,
            num_witness: shape.num_witness,
            contributions: 0,
            transcript: srs.transcript,
        })
    }

    /// Applies one contribution to the circuit keys. Same contract as the
    /// phase-1 contribution: the secret factor lives only inside this call.
    pub fn contribute(self, entropy: &str) -> ZkResult<(Self, ContributionRecord)> {
        let d = derive_secret(PHASE2_DOMAIN, &self.transcript, entropy)?;
        let d_inv = d.inverse().ok_or_else(|| {
            ZkSquareError::InvalidEntropy("entropy derived a non-invertible secret".to_string())
        })?;

        let mut pk = self.pk;
        pk.delta_g1 = (pk.delta_g1 * d).into_affine();
        pk.vk.delta_g2 = (pk.vk.delta_g2 * d).into_affine();
        pk.h_query = scale_batch(&pk.h_query, d_inv);
        pk.l_query = scale_batch(&pk.l_query, d_inv);

        let s_g1 = (G1Affine::generator() * d).into_affine();
        let s_g2 = (G2Affine::generator() * d).into_affine();
        let new_transcript = chain_transcript(&self.transcript, &s_g1, &s_g2)?;
        let record = ContributionRecord {
            s_g1,
            s_g2,
            prev_transcript: self.transcript,
            new_transcript,
        };

        let next = Self {
            pk,
            num_constraints: self.num_constraints,
            num_instance: self.num_instance,
            num_witness: self.num_witness,
            contributions: self.contributions + 1,
            transcript: new_transcript,
        };
        tracing::info!(contributions = next.contributions, "applied phase-2 contribution");
        Ok((next, record))
    }

    /// Finalizes the circuit keys. Irreversible.
    pub fn finalize(self, policy: &CeremonyPolicy) -> ZkResult<CircuitKeys> {
        policy.check("phase 2", self.contributions)?;
        tracing::info!(contributions = self.contributions, "phase 2 finalized");
        Ok(CircuitKeys {
            pk: self.pk,
            shape: CircuitShape {
                num_constraints: self.num_constraints,
                num_instance: self.num_instance,
                num_witness: self.num_witness,
            },
            contributions: self.contributions,
            transcript: self.transcript,
        })
    }
}

fn scale_batch(points: &[G1Affine], k: Fr) -> Vec<G1Affine> {
    let projective: Vec<G1Projective> = points.iter().map(|p| p.into_group() * k).collect();
    G1Projective::normalize_batch(&projective)
}

/// Checks that `next`'s keys are `prev`'s updated by the delta factor
/// committed in `record`, and that everything else is untouched.
pub fn verify_contribution(
    prev: &Phase2Setup,
    next: &Phase2Setup,
    record: &ContributionRecord,
) -> ZkResult<bool> {
    if next.contributions != prev.contributions + 1
        || next.num_constraints != prev.num_constraints
        || next.num_instance != prev.num_instance
        || next.num_witness != prev.num_witness
    {
        return Ok(false);
    }
    if record.prev_transcript != prev.transcript
        || record.new_transcript != next.transcript
        || chain_transcript(&prev.transcript, &record.s_g1, &record.s_g2)? != next.transcript
    {
        return Ok(false);
    }
    if !record.is_well_formed() {
        return Ok(false);
    }

    // Only delta (and the query vectors it divides) may change.
    let (pvk, nvk) = (&prev.pk.vk, &next.pk.vk);
    if pvk.alpha_g1 != nvk.alpha_g1
        || pvk.beta_g2 != nvk.beta_g2
        || pvk.gamma_g2 != nvk.gamma_g2
        || pvk.gamma_abc_g1 != nvk.gamma_abc_g1
        || prev.pk.beta_g1 != next.pk.beta_g1
        || prev.pk.a_query != next.pk.a_query
        || prev.pk.b_g1_query != next.pk.b_g1_query
        || prev.pk.b_g2_query != next.pk.b_g2_query
        || prev.pk.h_query.len() != next.pk.h_query.len()
        || prev.pk.l_query.len() != next.pk.l_query.len()
    {
        return Ok(false);
    }

    let g1 = G1Affine::generator();
    let g2 = G2Affine::generator();

    // delta' = d * delta, consistently in both groups.
    if Bn254::pairing(next.pk.delta_g1, g2) != Bn254::pairing(prev.pk.delta_g1, record.s_g2) {
        return Ok(false);
    }
    if Bn254::pairing(g1, nvk.delta_g2) != Bn254::pairing(record.s_g1, pvk.delta_g2) {
        return Ok(false);
    }
    if Bn254::pairing(next.pk.delta_g1, g2) != Bn254::pairing(g1, nvk.delta_g2) {
        return Ok(false);
    }

    // h' and l' are the old vectors scaled by d⁻¹ (randomized batch):
    // e(sum r_i * h'_i, s·G2) == e(sum r_i * h_i, G2).
    let mut rng = audit_rng(&prev.transcript, &next.transcript);
    let msm_err = |_| ZkSquareError::MalformedInput("mismatched key batch lengths".to_string());
    for (old, new) in [
        (&prev.pk.h_query, &next.pk.h_query),
        (&prev.pk.l_query, &next.pk.l_query),
    ] {
        let coeffs: Vec<Fr> = (0..old.len()).map(|_| Fr::rand(&mut rng)).collect();
        let old_comb = G1Projective::msm(old, &coeffs).map_err(msm_err)?;
        let new_comb = G1Projective::msm(new, &coeffs).map_err(msm_err)?;
        if Bn254::pairing(new_comb.into_affine(), record.s_g2)
            != Bn254::pairing(old_comb.into_affine(), g2)
        {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Finalized circuit keys: the proving key stays with provers, the
/// verification key is small and freely shareable.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct CircuitKeys {
    pub pk: ProvingKey<Bn254>,
    pub shape: CircuitShape,
    pub contributions: u64,
    pub transcript: [u8; 32],
}

impl CircuitKeys {
    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.pk.vk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceremony::Phase1Srs;
    use crate::circuit::compile;

    fn prepared_srs() -> super::super::PreparedSrs {
        let policy = CeremonyPolicy::default();
        let (srs, _) = Phase1Srs::new(3).unwrap().contribute("phase-1 test").unwrap();
        srs.finalize(&policy).unwrap()
    }

    #[test]
    fn setup_is_deterministic_per_srs() {
        let srs = prepared_srs();
        let shape = compile(srs.size_bound()).unwrap();
        let a = Phase2Setup::new(&srs, shape).unwrap();
        let b = Phase2Setup::new(&srs, shape).unwrap();
        assert_eq!(a.pk.vk.alpha_g1, b.pk.vk.alpha_g1);
        assert_eq!(a.pk.delta_g1, b.pk.delta_g1);
    }

    #[test]
    fn honest_contribution_verifies() {
        let srs = prepared_srs();
        let shape = compile(srs.size_bound()).unwrap();
        let setup = Phase2Setup::new(&srs, shape).unwrap();
        let (next, record) = setup.clone().contribute("phase-2 test").unwrap();
        assert!(verify_contribution(&setup, &next, &record).unwrap());
        assert_ne!(setup.pk.delta_g1, next.pk.delta_g1);
    }

    #[test]
    fn forged_delta_is_rejected() {
        let srs = prepared_srs();
        let shape = compile(srs.size_bound()).unwrap();
        let setup = Phase2Setup::new(&srs, shape).unwrap();
        let (mut next, record) = setup.clone().contribute("phase-2 test").unwrap();
        next.pk.delta_g1 = (next.pk.delta_g1 + G1Affine::generator()).into_affine();
        assert!(!verify_contribution(&setup, &next, &record).unwrap());
    }

    #[test]
    fn oversized_circuit_is_rejected() {
        let srs = prepared_srs();
        let shape = CircuitShape {
            num_constraints: srs.size_bound() + 1,
            num_instance: 3,
            num_witness: 2,
        };
        assert!(matches!(
            Phase2Setup::new(&srs, shape),
            Err(ZkSquareError::MalformedInput(_))
        ));
    }
}
