//! Wave function traits for QMC calculations.
//!
//! Provides `SingleWfn` for single-center wavefunctions (atomic orbitals)
//! and `MultiWfn` for multi-electron trial wavefunctions.

use nalgebra::Vector3;
use rand::Rng;

/// Smallest distance used in any `1/r` term.
///
/// Coincident particles are measure-zero under |ψ|² sampling but must not
/// produce a non-finite value.
pub const DISTANCE_FLOOR: f64 = 1e-10;

/// Norm of `v`, floored at `DISTANCE_FLOOR`.
#[inline]
pub fn floored_norm(v: &Vector3<f64>) -> f64 {
    v.norm().max(DISTANCE_FLOOR)
}

/// Single-center wavefunction trait (e.g., atomic orbitals).
pub trait SingleWfn {
    /// Evaluate the wavefunction at position `r`.
    fn value(&self, r: &Vector3<f64>) -> f64;

    /// Compute the gradient at position `r`.
    fn gradient(&self, r: &Vector3<f64>) -> Vector3<f64>;

    /// Compute the Laplacian at position `r`.
    fn laplacian(&self, r: &Vector3<f64>) -> f64;

    /// Numerical gradient using the 5-point central stencil.
    fn numerical_gradient(&self, r: &Vector3<f64>, h: f64) -> Vector3<f64> {
        let mut grad = Vector3::zeros();
        for axis in 0..3 {
            let shifted = |k: f64| {
                let mut rk = *r;
                rk[axis] += k * h;
                self.value(&rk)
            };
            grad[axis] = (-shifted(2.0) + 8.0 * shifted(1.0) - 8.0 * shifted(-1.0)
                + shifted(-2.0))
                / (12.0 * h);
        }
        grad
    }

    /// Numerical Laplacian using the 7-point stencil.
    fn numerical_laplacian(&self, r: &Vector3<f64>, h: f64) -> f64 {
        let psi = self.value(r);
        let mut laplacian = 0.0;
        for axis in 0..3 {
            let mut r_fwd = *r;
            let mut r_bwd = *r;
            r_fwd[axis] += h;
            r_bwd[axis] -= h;
            laplacian += (self.value(&r_fwd) - 2.0 * psi + self.value(&r_bwd)) / (h * h);
        }
        laplacian
    }
}

/// Multi-electron wavefunction trait.
pub trait MultiWfn {
    /// Number of electrons the wavefunction describes.
    fn num_electrons(&self) -> usize;

    /// Generate starting electron positions.
    fn initialize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Vector3<f64>>;

    /// Evaluate the wavefunction at positions `r`.
    fn value(&self, r: &[Vector3<f64>]) -> f64;

    /// Compute gradients with respect to every electron.
    fn gradient(&self, r: &[Vector3<f64>]) -> Vec<Vector3<f64>>;

    /// Compute Laplacians with respect to every electron.
    fn laplacian(&self, r: &[Vector3<f64>]) -> Vec<f64>;

    /// Unnormalized probability density |ψ|².
    fn density(&self, r: &[Vector3<f64>]) -> f64 {
        self.value(r).powi(2)
    }

    /// Numerical gradients using the 5-point central stencil.
    fn numerical_gradient(&self, r: &[Vector3<f64>], h: f64) -> Vec<Vector3<f64>> {
        let mut grad = vec![Vector3::zeros(); r.len()];
        let mut shifted = r.to_vec();
        for i in 0..r.len() {
            for axis in 0..3 {
                let mut at = |k: f64| {
                    shifted[i][axis] = r[i][axis] + k * h;
                    self.value(&shifted)
                };
                let (p2, p1, m1, m2) = (at(2.0), at(1.0), at(-1.0), at(-2.0));
                shifted[i][axis] = r[i][axis];
                grad[i][axis] = (-p2 + 8.0 * p1 - 8.0 * m1 + m2) / (12.0 * h);
            }
        }
        grad
    }

    /// Numerical Laplacians using the 7-point stencil.
    fn numerical_laplacian(&self, r: &[Vector3<f64>], h: f64) -> Vec<f64> {
        let psi = self.value(r);
        let mut laplacian = vec![0.0; r.len()];
        for i in 0..r.len() {
            for axis in 0..3 {
                let mut r_fwd = r.to_vec();
                let mut r_bwd = r.to_vec();
                r_fwd[i][axis] += h;
                r_bwd[i][axis] -= h;
                laplacian[i] += (self.value(&r_fwd) - 2.0 * psi + self.value(&r_bwd)) / (h * h);
            }
        }
        laplacian
    }
}
