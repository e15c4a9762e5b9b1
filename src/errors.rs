use std::path::PathBuf;

use ark_relations::r1cs::SynthesisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZkSquareError {
    #[error("Invalid entropy: {0}")]
    InvalidEntropy(String),
    #[error("{0} is already finalized; no further contributions are accepted")]
    PhaseAlreadyFinalized(&'static str),
    #[error("Ceremony policy requires at least {required} contribution(s), got {actual}")]
    InsufficientContributions { required: u64, actual: u64 },
    #[error("Constraint system is not satisfied: {0}")]
    ConstraintUnsatisfied(String),
    #[error("Witness shape mismatch: expected {expected_instance} instance / {expected_witness} witness variables, got {actual_instance} / {actual_witness}")]
    WitnessMismatch {
        expected_instance: u64,
        expected_witness: u64,
        actual_instance: u64,
        actual_witness: u64,
    },
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),
    #[error("Constraint synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Artifact serialization failed: {0}")]
    Serialization(#[from] ark_serialize::SerializationError),
    #[error("Artifact encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, ZkSquareError>;
