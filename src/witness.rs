//! Witness generation: evaluates the circuit on concrete inputs and extracts
//! the full assignment vector, failing before proving if any constraint is
//! violated.

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};

use crate::circuit::SquareCircuit;
use crate::errors::{Result, ZkSquareError};

/// Ordered public signals a proof is bound to: `[public_square,
/// square_root_exists]`. The order is fixed by the circuit's input
/// declarations and must match between proving and verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicSignals(pub Vec<Fr>);

/// The full satisfying assignment. Owned transiently: `prove` consumes it,
/// and nothing here is ever persisted.
#[derive(Clone, Debug)]
pub struct Witness {
    circuit: SquareCircuit,
    instance: Vec<Fr>,
    witness: Vec<Fr>,
}

impl Witness {
    /// Public signals, excluding the leading constant-one variable.
    pub fn public_signals(&self) -> PublicSignals {
        PublicSignals(self.instance[1..].to_vec())
    }

    pub fn num_instance(&self) -> u64 {
        self.instance.len() as u64
    }

    pub fn num_witness(&self) -> u64 {
        self.witness.len() as u64
    }

    /// Hands the populated circuit to the proving backend, dropping the
    /// assignment vectors.
    pub(crate) fn into_circuit(self) -> SquareCircuit {
        self.circuit
    }
}

/// Evaluates every wire for the given inputs. Deterministic. Fails with
/// `ConstraintUnsatisfied` when the claimed square is wrong; this is where an
/// incorrect public claim is rejected, before any proving work.
pub fn compute_witness(secret: i64, claimed_square: i64) -> Result<Witness> {
    let circuit = SquareCircuit::new(secret, claimed_square);

    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.clone().generate_constraints(cs.clone())?;

    if !cs.is_satisfied()? {
        let which = cs
            .which_is_unsatisfied()?
            .unwrap_or_else(|| "unknown constraint".to_string());
        tracing::debug!(constraint = %which, "witness does not satisfy the circuit");
        return Err(ZkSquareError::ConstraintUnsatisfied(which));
    }

    let inner = cs.into_inner().ok_or_else(|| {
        ZkSquareError::MalformedInput("constraint system has outstanding references".to_string())
    })?;
    Ok(Witness {
        circuit,
        instance: inner.instance_assignment,
        witness: inner.witness_assignment,
    })
}
