//! Two-phase trusted-setup ceremony.
//!
//! Phase 1 produces a circuit-independent powers-of-tau SRS; phase 2
//! specializes it into a Groth16 proving/verification key pair. Both phases
//! accept sequential contributions; each transition consumes the prior
//! artifact and returns a new one, so a finalized artifact can never be
//! mutated in place.

use ark_bn254::{Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_std::{UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use sha3::{Digest, Keccak256};

use crate::errors::{Result as ZkResult, ZkSquareError};

pub mod phase1;
pub mod phase2;

pub use phase1::{Phase1Srs, PreparedSrs};
pub use phase2::{CircuitKeys, Phase2Setup};

/// Operational policy for the ceremony. The original demonstration uses a
/// single contribution per phase; production deployments want more, from
/// independent parties.
#[derive(Clone, Copy, Debug)]
pub struct CeremonyPolicy {
    pub min_contributions: u64,
}

impl Default for CeremonyPolicy {
    fn default() -> Self {
        Self {
            min_contributions: 1,
        }
    }
}

impl CeremonyPolicy {
    pub(crate) fn check(&self, phase: &'static str, contributions: u64) -> ZkResult<()> {
        if contributions < self.min_contributions {
            tracing::error!(phase, contributions, required = self.min_contributions, "refusing to finalize an under-contributed ceremony phase");
            return Err(ZkSquareError::InsufficientContributions {
                required: self.min_contributions,
                actual: contributions,
            });
        }
        Ok(())
    }
}

/// Public record of a single contribution: the contributor's secret exponent
/// `s` committed in both groups, plus the transcript hashes it links. Lets
/// anyone verify the update without learning `s`.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct ContributionRecord {
    pub s_g1: G1Affine,
    pub s_g2: G2Affine,
    pub prev_transcript: [u8; 32],
    pub new_transcript: [u8; 32],
}

impl ContributionRecord {
    /// The two commitments must open to one and the same exponent.
    pub(crate) fn is_well_formed(&self) -> bool {
        use ark_bn254::Bn254;
        use ark_ec::pairing::Pairing;

        !self.s_g1.is_zero()
            && !self.s_g2.is_zero()
            && Bn254::pairing(self.s_g1, G2Affine::generator())
                == Bn254::pairing(G1Affine::generator(), self.s_g2)
    }
}

/// Derives a contribution secret from caller entropy and the running
/// transcript. The secret exists only inside the contributing call; the
/// caller's entropy alone cannot reconstruct a prior contributor's secret
/// because the transcript hash is folded in.
pub(crate) fn derive_secret(domain: &[u8], transcript: &[u8; 32], entropy: &str) -> ZkResult<Fr> {
    if entropy.trim().is_empty() {
        return Err(ZkSquareError::InvalidEntropy(
            "contribution entropy must be non-empty".to_string(),
        ));
    }
    let mut hasher = Keccak256::new();
    hasher.update(domain);
    hasher.update(transcript);
    hasher.update(entropy.as_bytes());
    let seed: [u8; 32] = hasher.finalize().into();

    let mut rng = ChaCha20Rng::from_seed(seed);
    let s = Fr::rand(&mut rng);
    if s.is_zero() {
        return Err(ZkSquareError::InvalidEntropy(
            "entropy derived a zero contribution secret".to_string(),
        ));
    }
    Ok(s)
}

/// Transcript chaining: keccak(prev || s·G1 || s·G2).
pub(crate) fn chain_transcript(
    prev: &[u8; 32],
    s_g1: &G1Affine,
    s_g2: &G2Affine,
) -> ZkResult<[u8; 32]> {
    let mut hasher = Keccak256::new();
    hasher.update(prev);
    let mut buf = Vec::new();
    s_g1.serialize_compressed(&mut buf)?;
    s_g2.serialize_compressed(&mut buf)?;
    hasher.update(&buf);
    Ok(hasher.finalize().into())
}

/// Deterministic RNG for batched pairing checks, seeded from the transcripts
/// under audit so a verifier needs no ambient randomness source.
pub(crate) fn audit_rng(prev: &[u8; 32], next: &[u8; 32]) -> ChaCha20Rng {
    let mut hasher = Keccak256::new();
    hasher.update(b"zksquare contribution audit");
    hasher.update(prev);
    hasher.update(next);
    let seed: [u8; 32] = hasher.finalize().into();
    ChaCha20Rng::from_seed(seed)
}
