//! Phase 1: the powers-of-tau structured reference string.
//!
//! The initial SRS is deterministic (tau = 1, every power is the group
//! generator); contributions multiply in fresh secrets. Security rests on at
//! least one contributor destroying their secret.

use ark_bn254::{Bn254, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup, VariableBaseMSM};
use ark_std::UniformRand;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sha3::{Digest, Keccak256};

use super::{audit_rng, chain_transcript, derive_secret, CeremonyPolicy, ContributionRecord};
use crate::errors::{Result as ZkResult, ZkSquareError};

const PHASE1_DOMAIN: &[u8] = b"zksquare powers-of-tau contribution";

/// Largest supported size bound (2^24 constraints).
pub const MAX_POWER: u32 = 24;

/// An open (still contributable) phase-1 SRS.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Phase1Srs {
    pub power: u32,
    pub g1_powers: Vec<G1Affine>,
    pub g2_powers: Vec<G2Affine>,
    pub contributions: u64,
    pub transcript: [u8; 32],
}

impl Phase1Srs {
    /// Allocates the initial SRS for the given size bound. Deterministic:
    /// carries no secret material until someone contributes.
    pub fn new(power: u32) -> ZkResult<Self> {
        if power == 0 || power > MAX_POWER {
            return Err(ZkSquareError::MalformedInput(format!(
                "SRS power must be in 1..={MAX_POWER}, got {power}"
            )));
        }
        let bound = 1usize << power;

        let mut hasher = Keccak256::new();
        hasher.update(b"zksquare powers-of-tau bn254");
        hasher.update(power.to_le_bytes());
        let transcript: [u8; 32] = hasher.finalize().into();

        tracing::info!(power, bound, "allocated initial powers-of-tau SRS");
        Ok(Self {
            power,
            g1_powers: vec![G1Affine::generator(); bound],
            g2_powers: vec![G2Affine::generator(); bound],
            contributions: 0,
            transcript,
        })
    }

    /// Applies one contribution: derives a secret `s` from the entropy and the
    /// running transcript, multiplies the i-th power by `s^i`, and discards
    /// `s`. Returns the successor SRS and a publicly verifiable record.
    pub fn contribute(self, entropy: &str) -> ZkResult<(Self, ContributionRecord)> {
        let s = derive_secret(PHASE1_DOMAIN, &self.transcript, entropy)?;

        let s_powers: Vec<Fr> = (0..self.g1_powers.len())
            .scan(Fr::from(1u64), |acc, _| {
                let val = *acc;
                *acc *= s;
                Some(val)
            })
            .collect();

        let g1_projective: Vec<G1Projective> = self
            .g1_powers
            .iter()
            .zip(&s_powers)
            .map(|(p, k)| p.into_group() * k)
            .collect();
        let g2_projective: Vec<G2Projective> = self
            .g2_powers
            .iter()
            .zip(&s_powers)
            .map(|(p, k)| p.into_group() * k)
            .collect();

        let s_g1 = (G1Affine::generator() * s).into_affine();
        let s_g2 = (G2Affine::generator() * s).into_affine();
        let new_transcript = chain_transcript(&self.transcript, &s_g1, &s_g2)?;
        let record = ContributionRecord {
            s_g1,
            s_g2,
            prev_transcript: self.transcript,
            new_transcript,
        };

        let next = Self {
            power: self.power,
            g1_powers: G1Projective::normalize_batch(&g1_projective),
            g2_powers: G2Projective::normalize_batch(&g2_projective),
            contributions: self.contributions + 1,
            transcript: new_transcript,
        };
        tracing::info!(contributions = next.contributions, "applied phase-1 contribution");
        Ok((next, record))
    }

    /// Finalizes phase 1. Irreversible: the returned artifact accepts no
    /// further phase-1 contributions.
    pub fn finalize(self, policy: &CeremonyPolicy) -> ZkResult<PreparedSrs> {
        policy.check("phase 1", self.contributions)?;
        tracing::info!(contributions = self.contributions, "phase 1 prepared");
        Ok(PreparedSrs {
            power: self.power,
            g1_powers: self.g1_powers,
            g2_powers: self.g2_powers,
            contributions: self.contributions,
            transcript: self.transcript,
        })
    }
}

/// Checks that `next` is `prev` updated by the secret committed in `record`,
/// without learning the secret. Pairing checks:
///   1. the record's G1/G2 commitments share one exponent,
///   2. `next` tau is `prev` tau times that exponent,
///   3. the updated powers form one consistent geometric sequence in both
///      groups (randomized batch).
pub fn verify_contribution(
    prev: &Phase1Srs,
    next: &Phase1Srs,
    record: &ContributionRecord,
) -> ZkResult<bool> {
    if prev.power != next.power
        || prev.g1_powers.len() != next.g1_powers.len()
        || prev.g2_powers.len() != next.g2_powers.len()
        || next.contributions != prev.contributions + 1
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
    // The zeroth power is the untouched generator in both groups.
    if next.g1_powers[0] != G1Affine::generator() || next.g2_powers[0] != G2Affine::generator() {
        return Ok(false);
    }

    let g1 = G1Affine::generator();
    let g2 = G2Affine::generator();

    // tau' = s * tau.
    if Bn254::pairing(next.g1_powers[1], g2) != Bn254::pairing(prev.g1_powers[1], record.s_g2) {
        return Ok(false);
    }
    // The G2 first power tracks the G1 first power.
    if Bn254::pairing(next.g1_powers[1], g2) != Bn254::pairing(g1, next.g2_powers[1]) {
        return Ok(false);
    }

    // Randomized batch check that power i+1 is tau' times power i, in both
    // groups: e(sum r_i * P_{i+1}, G2) == e(sum r_i * P_i, tau'_2).
    let mut rng = audit_rng(&prev.transcript, &next.transcript);
    let n = next.g1_powers.len();
    let coeffs: Vec<Fr> = (0..n - 1).map(|_| Fr::rand(&mut rng)).collect();

    let msm_err = |_| ZkSquareError::MalformedInput("mismatched SRS batch lengths".to_string());
    let g1_hi = G1Projective::msm(&next.g1_powers[1..], &coeffs).map_err(msm_err)?;
    let g1_lo = G1Projective::msm(&next.g1_powers[..n - 1], &coeffs).map_err(msm_err)?;
    if Bn254::pairing(g1_hi.into_affine(), g2)
        != Bn254::pairing(g1_lo.into_affine(), next.g2_powers[1])
    {
        return Ok(false);
    }

    let g2_hi = G2Projective::msm(&next.g2_powers[1..], &coeffs).map_err(msm_err)?;
    let g2_lo = G2Projective::msm(&next.g2_powers[..n - 1], &coeffs).map_err(msm_err)?;
    if Bn254::pairing(g1, g2_hi.into_affine())
        != Bn254::pairing(next.g1_powers[1], g2_lo.into_affine())
    {
        return Ok(false);
    }

    Ok(true)
}

/// Finalized phase-1 output, consumed by the phase-2 setup. Immutable.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct PreparedSrs {
    pub power: u32,
    pub g1_powers: Vec<G1Affine>,
    pub g2_powers: Vec<G2Affine>,
    pub contributions: u64,
    pub transcript: [u8; 32],
}

impl PreparedSrs {
    pub fn size_bound(&self) -> u64 {
        1u64 << self.power
    }

    /// Digest binding phase 2 to this exact artifact and its transcript.
    pub fn digest(&self) -> ZkResult<[u8; 32]> {
        let mut buf = Vec::new();
        self.serialize_compressed(&mut buf)?;
        let mut hasher = Keccak256::new();
        hasher.update(b"zksquare prepared srs");
        hasher.update(&buf);
        Ok(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honest_contribution_verifies() {
        let srs = Phase1Srs::new(3).unwrap();
        let (next, record) = srs.clone().contribute("first contribution").unwrap();
        assert!(verify_contribution(&srs, &next, &record).unwrap());

        let (third, second_record) = next.clone().contribute("second contribution").unwrap();
        assert!(verify_contribution(&next, &third, &second_record).unwrap());
        // Records are not interchangeable between links of the chain.
        assert!(!verify_contribution(&srs, &third, &second_record).unwrap());
    }

    #[test]
    fn forged_record_is_rejected() {
        let srs = Phase1Srs::new(3).unwrap();
        let (next, record) = srs.clone().contribute("honest").unwrap();

        let forged = ContributionRecord {
            s_g2: (G2Affine::generator() * Fr::from(42u64)).into_affine(),
            ..record.clone()
        };
        assert!(!verify_contribution(&srs, &next, &forged).unwrap());

        // Claiming the identity transformation with the honest record fails too.
        assert!(!verify_contribution(&srs, &srs, &record).unwrap());
    }

    #[test]
    fn tampered_power_is_rejected() {
        let srs = Phase1Srs::new(3).unwrap();
        let (mut next, record) = srs.clone().contribute("honest").unwrap();
        next.g1_powers[5] = (next.g1_powers[5] + G1Affine::generator()).into_affine();
        assert!(!verify_contribution(&srs, &next, &record).unwrap());
    }

    #[test]
    fn finalize_enforces_policy() {
        let policy = CeremonyPolicy::default();
        let srs = Phase1Srs::new(3).unwrap();
        assert!(matches!(
            srs.clone().finalize(&policy),
            Err(ZkSquareError::InsufficientContributions { required: 1, actual: 0 })
        ));

        let (srs, _) = srs.contribute("enough entropy").unwrap();
        let prepared = srs.finalize(&policy).unwrap();
        assert_eq!(prepared.contributions, 1);
        assert_eq!(prepared.size_bound(), 8);
    }

    #[test]
    fn rejects_degenerate_power() {
        assert!(Phase1Srs::new(0).is_err());
        assert!(Phase1Srs::new(MAX_POWER + 1).is_err());
    }
}
