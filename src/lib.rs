//! Zero-knowledge proof of square knowledge.
//!
//! A prover convinces a verifier that it knows a secret `x` with
//! `x * x == public_square`, without revealing `x`. Groth16 over BN254 via
//! arkworks: a single-multiplication circuit, a two-phase trusted-setup
//! ceremony with sequential verifiable contributions, and a witness → prove →
//! verify pipeline with file-based artifact exchange.

pub mod artifacts;
pub mod ceremony;
pub mod circuit;
pub mod errors;
pub mod prover;
pub mod verifier;
pub mod witness;

pub use artifacts::{OriginalInputs, ProofRecord, VerificationKeyFile};
pub use ceremony::{CeremonyPolicy, CircuitKeys, ContributionRecord, Phase1Srs, Phase2Setup, PreparedSrs};
pub use circuit::{compile, CircuitShape, SquareCircuit};
pub use errors::{Result, ZkSquareError};
pub use prover::prove;
pub use verifier::verify;
pub use witness::{compute_witness, PublicSignals, Witness};
