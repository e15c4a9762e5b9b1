//! The square circuit: `x * x == public_square`, with `x` kept private.
//!
//! Public signals, in declared order: `[public_square, square_root_exists]`.
//! The boolean output is realized as an equality assertion, so a wrong public
//! claim makes witness generation fail rather than producing a `0` output.

use ark_bn254::Fr;
use ark_std::One;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError, SynthesisMode,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{Result as ZkResult, ZkSquareError};

/// Number of public signals exposed to the verifier (`public_square`,
/// `square_root_exists`), excluding the constant-one variable.
pub const PUBLIC_SIGNAL_COUNT: usize = 2;

#[derive(Clone, Debug, Default)]
pub struct SquareCircuit {
    pub x: Option<Fr>,
    pub public_square: Option<Fr>,
}

impl SquareCircuit {
    /// Circuit with a concrete assignment. Negative secrets map to the
    /// field's additive inverse, so `(-7) * (-7) = 49` holds as-is.
    pub fn new(secret: i64, public_square: i64) -> Self {
        Self {
            x: Some(Fr::from(secret)),
            public_square: Some(Fr::from(public_square)),
        }
    }

    /// Unassigned circuit, used for setup-mode synthesis.
    pub fn blank() -> Self {
        Self::default()
    }
}

impl ConstraintSynthesizer<Fr> for SquareCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> core::result::Result<(), SynthesisError> {
        // Instance variables, in public-signal order.
        let public_square = FpVar::new_input(cs.clone(), || {
            self.public_square.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let square_root_exists = FpVar::new_input(cs.clone(), || Ok(Fr::one()))?;

        let x = FpVar::new_witness(cs.clone(), || {
            self.x.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let square = &x * &x;
        square.enforce_equal(&public_square)?;
        square_root_exists.enforce_equal(&FpVar::constant(Fr::one()))?;

        Ok(())
    }
}

/// Variable and constraint counts of the compiled circuit. Recorded at setup
/// and used by the prover to reject mismatched witnesses.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    CanonicalSerialize,
    CanonicalDeserialize,
)]
pub struct CircuitShape {
    pub num_constraints: u64,
    /// Instance variables, including the leading constant one.
    pub num_instance: u64,
    pub num_witness: u64,
}

/// Synthesizes the circuit in setup mode and reports its shape. Fails if the
/// constraint count exceeds the ceremony's size bound.
pub fn compile(max_constraints: u64) -> ZkResult<CircuitShape> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    cs.set_mode(SynthesisMode::Setup);
    SquareCircuit::blank().generate_constraints(cs.clone())?;
    cs.finalize();

    let shape = CircuitShape {
        num_constraints: cs.num_constraints() as u64,
        num_instance: cs.num_instance_variables() as u64,
        num_witness: cs.num_witness_variables() as u64,
    };
    if shape.num_constraints > max_constraints {
        return Err(ZkSquareError::MalformedInput(format!(
            "circuit has {} constraints, exceeding the ceremony bound of {max_constraints}",
            shape.num_constraints
        )));
    }
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_stable() {
        let shape = compile(1 << 12).unwrap();
        // [one, public_square, square_root_exists]
        assert_eq!(shape.num_instance, 1 + PUBLIC_SIGNAL_COUNT as u64);
        // [x, x * x]
        assert_eq!(shape.num_witness, 2);
        assert!(shape.num_constraints > 0);

        // Deterministic: compiling twice yields the same shape.
        assert_eq!(shape, compile(1 << 12).unwrap());
    }

    #[test]
    fn oversized_bound_is_rejected() {
        let err = compile(0).unwrap_err();
        assert!(matches!(err, ZkSquareError::MalformedInput(_)));
    }
}
