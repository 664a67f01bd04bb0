//! Slater-type radial orbitals.
//!
//! `AtomicOrbital` is the single-exponent hydrogenic trial orbital used for the
//! one- and two-electron systems; `STO` is the contracted multi-term orbital
//! used for the lithium determinant.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use super::traits::{floored_norm, SingleWfn};
use crate::error::{require_positive, QmcError, Result};

/// Atomic orbital φ(r) = (1 + c·r)·exp(-α·r) centered at `center`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AtomicOrbital {
    /// Polynomial coefficient
    pub c: f64,
    /// Orbital exponent
    pub alpha: f64,
    /// Center position of the orbital
    pub center: Vector3<f64>,
}

impl AtomicOrbital {
    pub fn new(c: f64, alpha: f64, center: Vector3<f64>) -> Result<Self> {
        require_positive("orbital exponent alpha", alpha)?;
        if !c.is_finite() {
            return Err(QmcError::InvalidParameter(format!(
                "orbital coefficient c must be finite, got {c}"
            )));
        }
        Ok(Self { c, alpha, center })
    }

    /// Radial derivative dφ/dr at distance `s`.
    fn radial_derivative(&self, s: f64) -> f64 {
        (self.c - self.alpha * (1.0 + self.c * s)) * (-self.alpha * s).exp()
    }
}

impl SingleWfn for AtomicOrbital {
    fn value(&self, r: &Vector3<f64>) -> f64 {
        let s = (r - self.center).norm();
        (1.0 + self.c * s) * (-self.alpha * s).exp()
    }

    fn gradient(&self, r: &Vector3<f64>) -> Vector3<f64> {
        let dr = r - self.center;
        let s = floored_norm(&dr);
        // dr vanishes with s, so the gradient is zero at the center
        dr * (self.radial_derivative(s) / s)
    }

    fn laplacian(&self, r: &Vector3<f64>) -> f64 {
        let s = floored_norm(&(r - self.center));
        let (a, c) = (self.alpha, self.c);
        // φ'' + 2φ'/r
        (a * a * (1.0 + c * s) - 4.0 * a * c + 2.0 * (c - a) / s) * (-a * s).exp()
    }
}

/// Lithium STO exponents shared by both shells.
const LI_EXPONENTS: [f64; 7] = [
    0.72089388, 2.61691643, 0.69257443, 1.37137558,
    3.97864549, 13.52900016, 19.30801440,
];

/// Principal quantum numbers of the primitives (1s, 1s, 2s, 2s, 2s, 2s, 3s).
const LI_POWERS: [i32; 7] = [1, 1, 2, 2, 2, 2, 3];

const LI_COEFFICIENTS: [[f64; 7]; 2] = [
    [-0.12220686, 1.11273225, 0.04125378, 0.09306499, -0.10260021, -0.00034191, 0.00021963],
    [0.47750469, 0.11140449, -1.25954273, -0.18475003, -0.02736293, -0.00025064, 0.00057962],
];

/// Exponent scale per shell; exponents are divided by it.
const LI_SHELL_SCALE: [f64; 2] = [1.00, 0.95];

/// Slater-Type Orbital (STO) basis function.
///
/// ψ(r) = Σᵥ cᵥ r^(pᵥ-1) exp(-ζᵥ r), with cᵥ already carrying the primitive
/// normalization (2ζ)^(p+½)/√((2p)!).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct STO {
    /// Number of primitive functions
    pub num_primitives: usize,
    /// Normalized contraction coefficients
    pub coefficients: Vec<f64>,
    /// Principal quantum numbers of the primitives
    pub powers: Vec<i32>,
    /// Scaled orbital exponents
    pub exponents: Vec<f64>,
    /// Center position
    pub center: Vector3<f64>,
}

fn factorial(n: u32) -> f64 {
    (1..=n).map(f64::from).product()
}

/// Create the lithium STO for principal quantum number `n` (1 or 2).
pub fn init_li_sto(center: Vector3<f64>, n: usize) -> Result<STO> {
    if !(1..=2).contains(&n) {
        return Err(QmcError::InvalidParameter(format!(
            "lithium STO is defined for n = 1 or 2, got {n}"
        )));
    }
    let shell = n - 1;
    let exponents: Vec<f64> = LI_EXPONENTS
        .iter()
        .map(|&z| z / LI_SHELL_SCALE[shell])
        .collect();
    let coefficients = LI_COEFFICIENTS[shell]
        .iter()
        .zip(LI_POWERS.iter())
        .zip(exponents.iter())
        .map(|((&phi, &p), &z)| {
            let norm = (2.0 * z).powf(p as f64 + 0.5) / factorial(2 * p as u32).sqrt();
            norm * phi
        })
        .collect();

    Ok(STO {
        num_primitives: LI_EXPONENTS.len(),
        coefficients,
        powers: LI_POWERS.to_vec(),
        exponents,
        center,
    })
}

impl STO {
    fn primitives(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.coefficients
            .iter()
            .zip(self.powers.iter())
            .zip(self.exponents.iter())
            .map(|((&c, &p), &z)| (c, (p - 1) as f64, z))
    }

    /// First and second radial derivatives summed over primitives.
    fn radial_derivatives(&self, s: f64) -> (f64, f64) {
        self.primitives().fold((0.0, 0.0), |(d1, d2), (c, k, z)| {
            let e = (-z * s).exp();
            let sk = s.powf(k);
            let sk1 = s.powf(k - 1.0);
            let sk2 = s.powf(k - 2.0);
            // f = r^k e^{-ζr}
            let f1 = k * sk1 - z * sk;
            let f2 = k * (k - 1.0) * sk2 - 2.0 * z * k * sk1 + z * z * sk;
            (d1 + c * f1 * e, d2 + c * f2 * e)
        })
    }
}

impl SingleWfn for STO {
    fn value(&self, r: &Vector3<f64>) -> f64 {
        let s = (r - self.center).norm();
        self.primitives()
            .map(|(c, k, z)| c * s.powf(k) * (-z * s).exp())
            .sum()
    }

    fn gradient(&self, r: &Vector3<f64>) -> Vector3<f64> {
        let dr = r - self.center;
        let s = floored_norm(&dr);
        let (d1, _) = self.radial_derivatives(s);
        dr * (d1 / s)
    }

    fn laplacian(&self, r: &Vector3<f64>) -> f64 {
        let s = floored_norm(&(r - self.center));
        let (d1, d2) = self.radial_derivatives(s);
        d2 + 2.0 * d1 / s
    }
}
