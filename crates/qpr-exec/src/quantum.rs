//! State-vector operations on single quantum resources.
//!
//! Each resource is its own state vector, so a run only ever holds product
//! states. A controlled gate is applied only when its control is in a basis
//! state; anything else would entangle the two resources.

use num_complex::Complex64;
use rand::Rng;

pub use qpr_ir::validate_state;
use qpr_ir::{OperandError, StandardGate, apply_matrix};

const EPSILON: f64 = 1e-9;

/// The basis index a state sits in, or `None` for a superposition.
pub fn basis_value(amps: &[Complex64]) -> Option<usize> {
    let mut found = None;
    for (i, a) in amps.iter().enumerate() {
        let p = a.norm_sqr();
        if (p - 1.0).abs() < EPSILON {
            found = Some(i);
        } else if p > EPSILON {
            return None;
        }
    }
    found
}

/// Apply a single-resource gate.
pub fn apply_gate(gate: &StandardGate, amps: &mut [Complex64]) -> Result<(), OperandError> {
    if amps.len() != 2 {
        return Err(OperandError(format!(
            "gate {} acts on dimension 2, got {}",
            gate.name(),
            amps.len()
        )));
    }
    apply_matrix(&gate.target_matrix(), amps);
    Ok(())
}

/// Sample a basis outcome from the Born probabilities and collapse.
///
/// The surviving amplitude keeps its phase, rescaled to modulus one.
pub fn measure<R: Rng + ?Sized>(amps: &mut [Complex64], rng: &mut R) -> usize {
    let total: f64 = amps.iter().map(Complex64::norm_sqr).sum();
    let mut remaining = rng.gen_range(0.0..1.0) * total;
    let mut outcome = amps.len().saturating_sub(1);
    for (i, a) in amps.iter().enumerate() {
        let p = a.norm_sqr();
        if p <= 0.0 {
            continue;
        }
        if remaining < p {
            outcome = i;
            break;
        }
        remaining -= p;
        outcome = i;
    }

    for (i, a) in amps.iter_mut().enumerate() {
        if i == outcome {
            let norm = a.norm();
            *a = if norm > 0.0 {
                *a / norm
            } else {
                Complex64::new(1.0, 0.0)
            };
        } else {
            *a = Complex64::new(0.0, 0.0);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_basis_value() {
        assert_eq!(basis_value(&[c(1.0, 0.0), c(0.0, 0.0)]), Some(0));
        assert_eq!(basis_value(&[c(0.0, 0.0), c(0.0, -1.0)]), Some(1));
        let h = FRAC_1_SQRT_2;
        assert_eq!(basis_value(&[c(h, 0.0), c(h, 0.0)]), None);
    }

    #[test]
    fn test_measure_basis_state_is_deterministic() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..32 {
            let mut amps = [c(0.0, 0.0), c(1.0, 0.0)];
            assert_eq!(measure(&mut amps, &mut rng), 1);
            assert_eq!(amps, [c(0.0, 0.0), c(1.0, 0.0)]);
        }
    }

    #[test]
    fn test_measure_superposition_collapses() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut seen = [0usize; 2];
        for _ in 0..200 {
            let mut amps = [c(FRAC_1_SQRT_2, 0.0), c(0.0, FRAC_1_SQRT_2)];
            let outcome = measure(&mut amps, &mut rng);
            seen[outcome] += 1;
            assert_eq!(basis_value(&amps), Some(outcome));
        }
        assert!(seen[0] > 50 && seen[1] > 50);
    }

    #[test]
    fn test_apply_gate_dimension() {
        let mut amps = [c(1.0, 0.0), c(0.0, 0.0)];
        apply_gate(&StandardGate::X, &mut amps).unwrap();
        assert_eq!(basis_value(&amps), Some(1));
        let mut wide = [c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)];
        assert!(apply_gate(&StandardGate::H, &mut wide).is_err());
    }

    #[test]
    fn test_validate_state() {
        assert!(validate_state(&[c(0.6, 0.0), c(0.0, 0.8)], 2).is_ok());
        assert!(validate_state(&[c(1.0, 0.0), c(1.0, 0.0)], 2).is_err());
        assert!(validate_state(&[c(1.0, 0.0)], 2).is_err());
    }
}
