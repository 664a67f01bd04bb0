//! Traits for Monte Carlo sampling.

use nalgebra::Vector3;
use crate::error::Result;

/// Trait for computing local energy from electron positions.
pub trait EnergyCalculator {
    fn local_energy(&self, positions: &[Vector3<f64>]) -> f64;
}

/// How a walker wants its configuration perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveScheme {
    /// Every electron is displaced in one proposal.
    AllParticle,
    /// Electrons are displaced one at a time.
    SingleParticle,
}

/// A proposed configuration change.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    /// New positions for every electron.
    All(Vec<Vector3<f64>>),
    /// New position for one electron.
    Single { index: usize, position: Vector3<f64> },
}

/// Trait for VMC walker behavior.
///
/// A walker owns the current configuration together with whatever cached
/// wavefunction state it needs to price a proposal. `propose` returns the
/// density ratio |Ψ(new)|²/|Ψ(old)|² and leaves the proposal pending until
/// `accept` or `reject`.
pub trait Walker {
    fn move_scheme(&self) -> MoveScheme;

    fn positions(&self) -> &[Vector3<f64>];

    fn propose(&mut self, proposal: Proposal) -> Result<f64>;

    fn accept(&mut self) -> Result<()>;

    fn reject(&mut self);

    /// Local energy of the current configuration.
    fn local_energy(&self) -> f64;
}
