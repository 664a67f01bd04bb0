//! Lithium atom wavefunction for QMC calculations.
//!
//! Ψ = D(r₁, r₂, r₃)·Π_{i<j} J(rᵢ, rⱼ) with a 1s↑ 1s↓ 2s↑ Slater determinant.
//! `LithiumAtom` evaluates everything from scratch; `LithiumWalker` drives the
//! incrementally updated determinant during sampling.

use nalgebra::{DMatrix, Vector3};
use rand::Rng;
use tracing::debug;
use crate::correlation::CorrelationFactor;
use crate::error::{QmcError, Result};
use crate::sampling::{EnergyCalculator, MoveScheme, Proposal, Walker};
use crate::wavefunction::{
    floored_norm, init_li_sto, MultiWfn, SingleWfn, SlaterDeterminant, Spin, RATIO_FLOOR, STO,
};
use super::hydrogen::scatter;

/// Nuclear charge of lithium.
pub const LITHIUM_CHARGE: f64 = 3.0;

/// Lithium atom trial wavefunction.
#[derive(Debug, Clone, PartialEq)]
pub struct LithiumAtom {
    pub nucleus: Vector3<f64>,
    /// 1s, 1s, 2s
    pub orbitals: Vec<STO>,
    /// Spin of electron `i` and orbital `i`
    pub spins: Vec<Spin>,
    pub correlation: Option<CorrelationFactor>,
}

impl LithiumAtom {
    pub fn new(nucleus: Vector3<f64>, correlation: Option<CorrelationFactor>) -> Result<Self> {
        if let Some(factor) = &correlation {
            factor.validate()?;
        }
        Ok(Self {
            nucleus,
            orbitals: vec![
                init_li_sto(nucleus, 1)?,
                init_li_sto(nucleus, 1)?,
                init_li_sto(nucleus, 2)?,
            ],
            spins: vec![Spin::Up, Spin::Down, Spin::Up],
            correlation,
        })
    }

    fn same_spin(&self, i: usize, j: usize) -> bool {
        self.spins[i] == self.spins[j]
    }

    fn slater_matrix(&self, r: &[Vector3<f64>]) -> DMatrix<f64> {
        let n = self.orbitals.len();
        DMatrix::from_fn(n, n, |i, j| {
            if self.same_spin(i, j) {
                self.orbitals[j].value(&r[i])
            } else {
                0.0
            }
        })
    }

    /// Cofactor matrix of the Slater matrix; row `i` does not depend on rᵢ.
    fn cofactors(matrix: &DMatrix<f64>) -> DMatrix<f64> {
        let n = matrix.nrows();
        DMatrix::from_fn(n, n, |i, j| {
            let minor = matrix.clone().remove_row(i).remove_column(j).determinant();
            if (i + j) % 2 == 0 { minor } else { -minor }
        })
    }

    /// (∇ᵢD, ∇ᵢ²D) by cofactor expansion along row `i`.
    fn determinant_derivatives(
        &self,
        r: &[Vector3<f64>],
        cofactors: &DMatrix<f64>,
        i: usize,
    ) -> (Vector3<f64>, f64) {
        (0..self.orbitals.len())
            .filter(|&j| self.same_spin(i, j))
            .fold((Vector3::zeros(), 0.0), |(g, l), j| {
                let orbital = &self.orbitals[j];
                (
                    g + orbital.gradient(&r[i]) * cofactors[(i, j)],
                    l + orbital.laplacian(&r[i]) * cofactors[(i, j)],
                )
            })
    }

    /// Π_{i<j} J(rᵢ, rⱼ)
    pub fn jastrow(&self, r: &[Vector3<f64>]) -> f64 {
        let Some(factor) = &self.correlation else {
            return 1.0;
        };
        let n = r.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| factor.value(&r[i], &r[j]))
            .product()
    }

    /// (∇ᵢU, ∇ᵢ²U) with U = ln Π J.
    pub(crate) fn jastrow_log_derivatives(
        &self,
        r: &[Vector3<f64>],
        i: usize,
    ) -> (Vector3<f64>, f64) {
        let Some(factor) = &self.correlation else {
            return (Vector3::zeros(), 0.0);
        };
        (0..r.len())
            .filter(|&k| k != i)
            .fold((Vector3::zeros(), 0.0), |(g, l), k| {
                (
                    g + factor.log_gradient(&r[i], &r[k]),
                    l + factor.log_laplacian(&r[i], &r[k]),
                )
            })
    }

    /// Jastrow ratio for moving electron `i` from rᵢ to `new`.
    pub(crate) fn jastrow_ratio(&self, r: &[Vector3<f64>], i: usize, new: &Vector3<f64>) -> f64 {
        let Some(factor) = &self.correlation else {
            return 1.0;
        };
        (0..r.len())
            .filter(|&k| k != i)
            .map(|k| factor.value(new, &r[k]) / factor.value(&r[i], &r[k]))
            .product()
    }

    /// Coulomb energy: nuclear attraction plus electron repulsion.
    pub fn potential(&self, r: &[Vector3<f64>]) -> f64 {
        let attraction: f64 = r
            .iter()
            .map(|ri| LITHIUM_CHARGE / floored_norm(&(ri - self.nucleus)))
            .sum();
        let n = r.len();
        let repulsion: f64 = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| 1.0 / floored_norm(&(r[i] - r[j])))
            .sum();
        repulsion - attraction
    }
}

/// -½ Σᵢ ∇ᵢ²Ψ/Ψ from log-derivatives of the determinant and the Jastrow exponent.
fn kinetic_energy(terms: impl Iterator<Item = (Vector3<f64>, f64, Vector3<f64>, f64)>) -> f64 {
    -0.5 * terms
        .map(|(grad_d, lap_d, grad_u, lap_u)| {
            lap_d + lap_u + grad_u.norm_squared() + 2.0 * grad_d.dot(&grad_u)
        })
        .sum::<f64>()
}

impl MultiWfn for LithiumAtom {
    fn num_electrons(&self) -> usize {
        self.orbitals.len()
    }

    fn initialize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Vector3<f64>> {
        (0..self.num_electrons())
            .map(|_| scatter(&self.nucleus, &mut *rng))
            .collect()
    }

    fn value(&self, r: &[Vector3<f64>]) -> f64 {
        self.slater_matrix(r).determinant() * self.jastrow(r)
    }

    fn gradient(&self, r: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        let matrix = self.slater_matrix(r);
        let cofactors = Self::cofactors(&matrix);
        let d = matrix.determinant();
        let j = self.jastrow(r);
        (0..r.len())
            .map(|i| {
                let (grad_d, _) = self.determinant_derivatives(r, &cofactors, i);
                let (grad_u, _) = self.jastrow_log_derivatives(r, i);
                (grad_d + grad_u * d) * j
            })
            .collect()
    }

    fn laplacian(&self, r: &[Vector3<f64>]) -> Vec<f64> {
        let matrix = self.slater_matrix(r);
        let cofactors = Self::cofactors(&matrix);
        let d = matrix.determinant();
        let j = self.jastrow(r);
        (0..r.len())
            .map(|i| {
                let (grad_d, lap_d) = self.determinant_derivatives(r, &cofactors, i);
                let (grad_u, lap_u) = self.jastrow_log_derivatives(r, i);
                j * (lap_d + 2.0 * grad_d.dot(&grad_u) + d * (grad_u.norm_squared() + lap_u))
            })
            .collect()
    }
}

impl EnergyCalculator for LithiumAtom {
    fn local_energy(&self, r: &[Vector3<f64>]) -> f64 {
        let matrix = self.slater_matrix(r);
        let cofactors = Self::cofactors(&matrix);
        let d = matrix.determinant();
        let kinetic = kinetic_energy((0..r.len()).map(|i| {
            let (grad_d, lap_d) = self.determinant_derivatives(r, &cofactors, i);
            let (grad_u, lap_u) = self.jastrow_log_derivatives(r, i);
            (grad_d / d, lap_d / d, grad_u, lap_u)
        }));
        kinetic + self.potential(r)
    }
}

/// Single-electron walker over the incrementally updated determinant.
#[derive(Debug, Clone)]
pub struct LithiumWalker {
    atom: LithiumAtom,
    determinant: SlaterDeterminant,
    energy: f64,
    pending: Option<(usize, Vector3<f64>)>,
}

impl LithiumWalker {
    /// Walker starting at `positions`; the inverse is rebuilt every
    /// `refresh_interval` accepted moves.
    pub fn new(
        atom: LithiumAtom,
        positions: &[Vector3<f64>],
        refresh_interval: usize,
    ) -> Result<Self> {
        let determinant =
            SlaterDeterminant::new(atom.orbitals.clone(), atom.spins.clone(), positions)?
                .with_refresh(refresh_interval, SlaterDeterminant::DEFAULT_DRIFT_TOLERANCE)?;
        let mut walker = Self { atom, determinant, energy: 0.0, pending: None };
        walker.energy = walker.compute_energy();
        if !walker.energy.is_finite() {
            return Err(QmcError::SingularConfiguration(format!(
                "local energy {} at the starting configuration",
                walker.energy
            )));
        }
        Ok(walker)
    }

    /// Walker starting from positions drawn around the nucleus.
    pub fn from_rng<R: Rng + ?Sized>(
        atom: LithiumAtom,
        refresh_interval: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let positions = atom.initialize(rng);
        Self::new(atom, &positions, refresh_interval)
    }

    pub fn atom(&self) -> &LithiumAtom {
        &self.atom
    }

    pub fn determinant(&self) -> &SlaterDeterminant {
        &self.determinant
    }

    fn compute_energy(&self) -> f64 {
        let r = self.determinant.positions();
        let kinetic = kinetic_energy((0..r.len()).map(|i| {
            let (grad_u, lap_u) = self.atom.jastrow_log_derivatives(r, i);
            (self.determinant.gradient(i), self.determinant.laplacian(i), grad_u, lap_u)
        }));
        kinetic + self.atom.potential(r)
    }
}

impl Walker for LithiumWalker {
    fn move_scheme(&self) -> MoveScheme {
        MoveScheme::SingleParticle
    }

    fn positions(&self) -> &[Vector3<f64>] {
        self.determinant.positions()
    }

    fn propose(&mut self, proposal: Proposal) -> Result<f64> {
        let Proposal::Single { index, position } = proposal else {
            return Err(QmcError::InvalidMove(
                "lithium walker moves one electron at a time".to_string(),
            ));
        };
        let det_ratio = self.determinant.propose_move(index, position)?;
        self.pending = Some((index, position));
        // A vanishing ratio lands on a node; price it as impossible
        if det_ratio.abs() < RATIO_FLOOR || !det_ratio.is_finite() {
            debug!(index, det_ratio, "determinant ratio below floor");
            return Ok(0.0);
        }
        let jastrow_ratio = self.atom.jastrow_ratio(self.determinant.positions(), index, &position);
        Ok((det_ratio * jastrow_ratio).powi(2))
    }

    fn accept(&mut self) -> Result<()> {
        let (index, position) = self.pending.take().ok_or(QmcError::NoPendingMove)?;
        self.determinant.commit(index, position)?;
        self.energy = self.compute_energy();
        Ok(())
    }

    fn reject(&mut self) {
        self.pending = None;
        self.determinant.reject();
    }

    fn local_energy(&self) -> f64 {
        self.energy
    }
}
