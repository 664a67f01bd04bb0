//! Jastrow correlation factors for QMC calculations.
//!
//! Jastrow factors capture electron-electron correlations that are
//! difficult to represent with single-particle orbitals.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use crate::error::{require_positive, Result};
use crate::wavefunction::floored_norm;

/// Padé-Jastrow pair factor: J(r₁₂) = exp(r₁₂ / (2 + 2r₁₂/F))
///
/// The exponent grows with the inter-electron distance and saturates at F/2;
/// its slope at contact is ½, the antiparallel-spin cusp.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SimpleJastrow {
    /// Correlation length controlling how fast the factor saturates
    pub cusp_param: f64,
}

impl SimpleJastrow {
    pub fn new(cusp_param: f64) -> Result<Self> {
        require_positive("Jastrow cusp parameter", cusp_param)?;
        Ok(Self { cusp_param })
    }

    /// u(d), first and second derivatives.
    fn exponent(&self, d: f64) -> (f64, f64, f64) {
        let x = 1.0 + d / self.cusp_param;
        let u = d / (2.0 * x);
        let du = 1.0 / (2.0 * x * x);
        let d2u = -1.0 / (self.cusp_param * x * x * x);
        (u, du, d2u)
    }

    pub fn value(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> f64 {
        let (u, _, _) = self.exponent((r1 - r2).norm());
        u.exp()
    }

    /// (∇₁J, ∇₂J); the second is the negation of the first.
    pub fn gradient(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let g = self.value(r1, r2) * self.log_gradient(r1, r2);
        (g, -g)
    }

    /// (∇₁²J, ∇₂²J); both particles see the same value.
    pub fn laplacian(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> (f64, f64) {
        let r12 = r1 - r2;
        let d = floored_norm(&r12);
        let (u, du, d2u) = self.exponent(r12.norm());
        let l = u.exp() * (du * du + d2u + 2.0 * du / d);
        (l, l)
    }

    /// ∇₁ ln J
    pub fn log_gradient(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> Vector3<f64> {
        let r12 = r1 - r2;
        let d = floored_norm(&r12);
        let (_, du, _) = self.exponent(r12.norm());
        r12 * (du / d)
    }

    /// ∇₁² ln J
    pub fn log_laplacian(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> f64 {
        let r12 = r1 - r2;
        let d = floored_norm(&r12);
        let (_, du, d2u) = self.exponent(r12.norm());
        d2u + 2.0 * du / d
    }
}

/// Correlation factor variants selectable at construction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrelationFactor {
    Simple(SimpleJastrow),
}

impl CorrelationFactor {
    pub fn simple(cusp_param: f64) -> Result<Self> {
        Ok(Self::Simple(SimpleJastrow::new(cusp_param)?))
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Simple(j) => require_positive("Jastrow cusp parameter", j.cusp_param).map(|_| ()),
        }
    }

    pub fn value(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> f64 {
        match self {
            Self::Simple(j) => j.value(r1, r2),
        }
    }

    pub fn gradient(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        match self {
            Self::Simple(j) => j.gradient(r1, r2),
        }
    }

    pub fn laplacian(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> (f64, f64) {
        match self {
            Self::Simple(j) => j.laplacian(r1, r2),
        }
    }

    pub fn log_gradient(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Self::Simple(j) => j.log_gradient(r1, r2),
        }
    }

    pub fn log_laplacian(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> f64 {
        match self {
            Self::Simple(j) => j.log_laplacian(r1, r2),
        }
    }
}
