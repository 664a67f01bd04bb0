//! Sampling module - Metropolis sampling of |Ψ|² for VMC.

mod traits;
mod stats;
mod walker;
mod vmc;
mod batch;

pub use traits::{EnergyCalculator, MoveScheme, Proposal, Walker};
pub use stats::{autocorrelation_time, BlockAverager, RunningStats};
pub use walker::DensityWalker;
pub use vmc::{MCMCParams, MCMCResults, MCMCSimulation, SamplerState};
pub use batch::{combine, run_batch, seeded_batch};
