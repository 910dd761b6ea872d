//! Quantum gate types.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Z gate.
    CZ,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::CX => "cx",
            StandardGate::CZ => "cz",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CX | StandardGate::CZ => 2,
            _ => 1,
        }
    }

    /// Check if the gate is controlled by its first operand.
    #[inline]
    pub fn is_controlled(&self) -> bool {
        self.num_qubits() == 2
    }

    /// The 2x2 matrix (row-major) applied to the target qubit.
    ///
    /// For controlled gates this is the operator applied when the control
    /// is `|1⟩`.
    pub fn target_matrix(&self) -> [Complex64; 4] {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let i = Complex64::new(0.0, 1.0);
        match self {
            StandardGate::I => [one, zero, zero, one],
            StandardGate::X | StandardGate::CX => [zero, one, one, zero],
            StandardGate::Y => [zero, -i, i, zero],
            StandardGate::Z | StandardGate::CZ => [one, zero, zero, -one],
            StandardGate::H => {
                let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
                [h, h, h, -h]
            }
            StandardGate::S => [one, zero, zero, Complex64::from_polar(1.0, PI / 2.0)],
            StandardGate::Sdg => [one, zero, zero, Complex64::from_polar(1.0, -PI / 2.0)],
            StandardGate::T => [one, zero, zero, Complex64::from_polar(1.0, PI / 4.0)],
            StandardGate::Tdg => [one, zero, zero, Complex64::from_polar(1.0, -PI / 4.0)],
            StandardGate::Rx(theta) => {
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new(0.0, -(theta / 2.0).sin());
                [c, s, s, c]
            }
            StandardGate::Ry(theta) => {
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new((theta / 2.0).sin(), 0.0);
                [c, -s, s, c]
            }
            StandardGate::Rz(theta) => [
                Complex64::from_polar(1.0, -theta / 2.0),
                zero,
                zero,
                Complex64::from_polar(1.0, theta / 2.0),
            ],
        }
    }
}

/// Apply a 2x2 row-major matrix to a two-amplitude state in place.
pub fn apply_matrix(matrix: &[Complex64; 4], state: &mut [Complex64]) {
    if state.len() != 2 {
        return;
    }
    let a = state[0];
    let b = state[1];
    state[0] = matrix[0] * a + matrix[1] * b;
    state[1] = matrix[2] * a + matrix[3] * b;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert!(StandardGate::CZ.is_controlled());
        assert!(!StandardGate::Rx(PI).is_controlled());
        assert_eq!(StandardGate::Rx(0.5).name(), "rx");
    }

    #[test]
    fn test_x_flips_zero() {
        let mut state = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        apply_matrix(&StandardGate::X.target_matrix(), &mut state);
        assert!(approx(state[0], Complex64::new(0.0, 0.0)));
        assert!(approx(state[1], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_hh_is_identity() {
        let mut state = [Complex64::new(0.6, 0.0), Complex64::new(0.0, 0.8)];
        let h = StandardGate::H.target_matrix();
        apply_matrix(&h, &mut state);
        apply_matrix(&h, &mut state);
        assert!(approx(state[0], Complex64::new(0.6, 0.0)));
        assert!(approx(state[1], Complex64::new(0.0, 0.8)));
    }

    #[test]
    fn test_rx_pi_matches_x_up_to_phase() {
        let mut state = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        apply_matrix(&StandardGate::Rx(PI).target_matrix(), &mut state);
        assert!(state[0].norm() < 1e-12);
        assert!((state[1].norm() - 1.0).abs() < 1e-12);
    }
}
