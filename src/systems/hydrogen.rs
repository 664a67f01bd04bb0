//! Hydrogen atom and H₂ molecule trial wavefunctions.
//!
//! The molecule supports both Valence Bond (product) and Molecular Orbital
//! (sum) compositions of two centered atomic orbitals, multiplied by a Jastrow
//! correlation factor.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use crate::correlation::CorrelationFactor;
use crate::error::{QmcError, Result};
use crate::sampling::EnergyCalculator;
use crate::wavefunction::{floored_norm, AtomicOrbital, MultiWfn, SingleWfn, DISTANCE_FLOOR};

/// One electron bound to a unit nuclear charge at the orbital center.
///
/// With `c = 0` and `alpha = 1` the trial orbital is the exact ground state
/// and the local energy is -0.5 Ha everywhere.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HydrogenAtom {
    pub orbital: AtomicOrbital,
}

impl HydrogenAtom {
    pub fn new(c: f64, alpha: f64) -> Result<Self> {
        Ok(Self { orbital: AtomicOrbital::new(c, alpha, Vector3::zeros())? })
    }

    pub fn density(&self, r: &Vector3<f64>) -> f64 {
        self.orbital.value(r).powi(2)
    }

    pub fn energy(&self, r: &Vector3<f64>) -> f64 {
        let kinetic = -0.5 * self.orbital.laplacian(r) / self.orbital.value(r);
        kinetic - 1.0 / floored_norm(&(r - self.orbital.center))
    }
}

impl MultiWfn for HydrogenAtom {
    fn num_electrons(&self) -> usize {
        1
    }

    fn initialize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Vector3<f64>> {
        vec![scatter(&self.orbital.center, rng)]
    }

    fn value(&self, r: &[Vector3<f64>]) -> f64 {
        self.orbital.value(&r[0])
    }

    fn gradient(&self, r: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        vec![self.orbital.gradient(&r[0])]
    }

    fn laplacian(&self, r: &[Vector3<f64>]) -> Vec<f64> {
        vec![self.orbital.laplacian(&r[0])]
    }
}

impl EnergyCalculator for HydrogenAtom {
    fn local_energy(&self, r: &[Vector3<f64>]) -> f64 {
        self.energy(&r[0])
    }
}

/// How the two atomic orbitals combine into the one-electron orbital O(r).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Composition {
    /// O = φ_A·φ_B (valence bond)
    #[serde(alias = "vb")]
    Product,
    /// O = φ_A + φ_B (molecular orbital)
    #[serde(alias = "mo")]
    Sum,
}

/// H₂ molecule trial wavefunction Ψ = J(r₁, r₂)·O(r₁)·O(r₂).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct H2Molecule {
    /// Atomic orbitals centered on nucleus A and nucleus B
    pub orbitals: [AtomicOrbital; 2],
    /// Jastrow correlation factor
    pub correlation: CorrelationFactor,
    pub composition: Composition,
}

impl H2Molecule {
    pub fn new(
        correlation: CorrelationFactor,
        composition: Composition,
        c: f64,
        alpha: f64,
        nuclei: [Vector3<f64>; 2],
    ) -> Result<Self> {
        correlation.validate()?;
        if (nuclei[0] - nuclei[1]).norm() < DISTANCE_FLOOR {
            return Err(QmcError::InvalidParameter(
                "the two nuclei must not coincide".to_string(),
            ));
        }
        Ok(Self {
            orbitals: [
                AtomicOrbital::new(c, alpha, nuclei[0])?,
                AtomicOrbital::new(c, alpha, nuclei[1])?,
            ],
            correlation,
            composition,
        })
    }

    pub fn nuclei(&self) -> [Vector3<f64>; 2] {
        [self.orbitals[0].center, self.orbitals[1].center]
    }

    /// O(r), ∇O(r) and ∇²O(r) in one pass over the atomic orbitals.
    fn orbital_terms(&self, r: &Vector3<f64>) -> (f64, Vector3<f64>, f64) {
        let [a, b] = &self.orbitals;
        let (va, vb) = (a.value(r), b.value(r));
        let (ga, gb) = (a.gradient(r), b.gradient(r));
        let (la, lb) = (a.laplacian(r), b.laplacian(r));
        match self.composition {
            Composition::Product => (
                va * vb,
                ga * vb + gb * va,
                la * vb + lb * va + 2.0 * ga.dot(&gb),
            ),
            Composition::Sum => (va + vb, ga + gb, la + lb),
        }
    }

    pub fn orbital_value(&self, r: &Vector3<f64>) -> f64 {
        self.orbital_terms(r).0
    }

    pub fn orbital_gradient(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.orbital_terms(r).1
    }

    pub fn orbital_laplacian(&self, r: &Vector3<f64>) -> f64 {
        self.orbital_terms(r).2
    }

    /// |Ψ|², unnormalized.
    pub fn density(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> f64 {
        (self.correlation.value(r1, r2) * self.orbital_value(r1) * self.orbital_value(r2)).powi(2)
    }

    /// Coulomb energy of the configuration.
    pub fn potential(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> f64 {
        let [ra, rb] = self.nuclei();
        let attraction: f64 = [r1, r2]
            .into_iter()
            .flat_map(|r| [r - ra, r - rb])
            .map(|d| 1.0 / floored_norm(&d))
            .sum();
        1.0 / floored_norm(&(r1 - r2)) + 1.0 / floored_norm(&(ra - rb)) - attraction
    }

    /// Local energy HΨ/Ψ in Hartree.
    pub fn energy(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> f64 {
        let (o1, g1, l1) = self.orbital_terms(r1);
        let (o2, g2, l2) = self.orbital_terms(r2);
        let j = self.correlation.value(r1, r2);
        let (gj1, gj2) = self.correlation.gradient(r1, r2);
        let (lj1, lj2) = self.correlation.laplacian(r1, r2);

        let kinetic = -0.5
            * ((lj1 + lj2) / j
                + l1 / o1
                + l2 / o2
                + 2.0 * gj1.dot(&g1) / (j * o1)
                + 2.0 * gj2.dot(&g2) / (j * o2));
        kinetic + self.potential(r1, r2)
    }
}

impl MultiWfn for H2Molecule {
    fn num_electrons(&self) -> usize {
        2
    }

    /// One electron scattered around each nucleus.
    fn initialize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Vector3<f64>> {
        self.nuclei().iter().map(|center| scatter(center, &mut *rng)).collect()
    }

    fn value(&self, r: &[Vector3<f64>]) -> f64 {
        self.correlation.value(&r[0], &r[1]) * self.orbital_value(&r[0]) * self.orbital_value(&r[1])
    }

    fn gradient(&self, r: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        let (o1, g1, _) = self.orbital_terms(&r[0]);
        let (o2, g2, _) = self.orbital_terms(&r[1]);
        let j = self.correlation.value(&r[0], &r[1]);
        let (gj1, gj2) = self.correlation.gradient(&r[0], &r[1]);
        vec![
            o2 * (gj1 * o1 + g1 * j),
            o1 * (gj2 * o2 + g2 * j),
        ]
    }

    fn laplacian(&self, r: &[Vector3<f64>]) -> Vec<f64> {
        let (o1, g1, l1) = self.orbital_terms(&r[0]);
        let (o2, g2, l2) = self.orbital_terms(&r[1]);
        let j = self.correlation.value(&r[0], &r[1]);
        let (gj1, gj2) = self.correlation.gradient(&r[0], &r[1]);
        let (lj1, lj2) = self.correlation.laplacian(&r[0], &r[1]);
        vec![
            o2 * (lj1 * o1 + 2.0 * gj1.dot(&g1) + j * l1),
            o1 * (lj2 * o2 + 2.0 * gj2.dot(&g2) + j * l2),
        ]
    }

    fn density(&self, r: &[Vector3<f64>]) -> f64 {
        H2Molecule::density(self, &r[0], &r[1])
    }
}

impl EnergyCalculator for H2Molecule {
    fn local_energy(&self, r: &[Vector3<f64>]) -> f64 {
        self.energy(&r[0], &r[1])
    }
}

/// Position drawn from a unit Gaussian around `center`.
pub(crate) fn scatter<R: Rng + ?Sized>(center: &Vector3<f64>, rng: &mut R) -> Vector3<f64> {
    center + Vector3::from_fn(|_, _| rng.sample::<f64, _>(StandardNormal))
}
