//! All-electron walker for wavefunctions evaluated from scratch.

use nalgebra::Vector3;
use rand::Rng;
use crate::error::{QmcError, Result};
use crate::wavefunction::MultiWfn;
use super::traits::{EnergyCalculator, MoveScheme, Proposal, Walker};

/// Walker that caches |Ψ|² and the local energy of its configuration.
#[derive(Debug, Clone)]
pub struct DensityWalker<T: MultiWfn + EnergyCalculator> {
    wavefunction: T,
    positions: Vec<Vector3<f64>>,
    density: f64,
    energy: f64,
    pending: Option<(Vec<Vector3<f64>>, f64)>,
}

impl<T: MultiWfn + EnergyCalculator> DensityWalker<T> {
    pub fn new(wavefunction: T, positions: Vec<Vector3<f64>>) -> Result<Self> {
        if positions.len() != wavefunction.num_electrons() {
            return Err(QmcError::InvalidParameter(format!(
                "expected {} electron positions, got {}",
                wavefunction.num_electrons(),
                positions.len()
            )));
        }
        let density = wavefunction.density(&positions);
        if !(density.is_finite() && density > 0.0) {
            return Err(QmcError::SingularConfiguration(format!(
                "density {density} at the starting configuration"
            )));
        }
        let energy = wavefunction.local_energy(&positions);
        if !energy.is_finite() {
            return Err(QmcError::SingularConfiguration(format!(
                "local energy {energy} at the starting configuration"
            )));
        }
        Ok(Self { wavefunction, positions, density, energy, pending: None })
    }

    /// Walker starting from the wavefunction's own initial guess.
    pub fn from_rng<R: Rng + ?Sized>(wavefunction: T, rng: &mut R) -> Result<Self> {
        let positions = wavefunction.initialize(rng);
        Self::new(wavefunction, positions)
    }

    pub fn wavefunction(&self) -> &T {
        &self.wavefunction
    }

    pub fn density(&self) -> f64 {
        self.density
    }
}

impl<T: MultiWfn + EnergyCalculator> Walker for DensityWalker<T> {
    fn move_scheme(&self) -> MoveScheme {
        MoveScheme::AllParticle
    }

    fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    /// Density ratio; zero when the proposed density is zero or not finite.
    fn propose(&mut self, proposal: Proposal) -> Result<f64> {
        let Proposal::All(positions) = proposal else {
            return Err(QmcError::InvalidMove(
                "density walker moves all electrons at once".to_string(),
            ));
        };
        if positions.len() != self.positions.len() {
            return Err(QmcError::InvalidMove(format!(
                "proposal has {} positions, walker has {}",
                positions.len(),
                self.positions.len()
            )));
        }
        let density = self.wavefunction.density(&positions);
        let ratio = if density.is_finite() && density > 0.0 {
            density / self.density
        } else {
            0.0
        };
        self.pending = Some((positions, density));
        Ok(ratio)
    }

    fn accept(&mut self) -> Result<()> {
        let (positions, density) = self.pending.take().ok_or(QmcError::NoPendingMove)?;
        self.energy = self.wavefunction.local_energy(&positions);
        self.positions = positions;
        self.density = density;
        Ok(())
    }

    fn reject(&mut self) {
        self.pending = None;
    }

    fn local_energy(&self) -> f64 {
        self.energy
    }
}
