//! Simple QMC - Variational Monte Carlo in Rust
//!
//! Trial wavefunctions for the hydrogen atom, the H₂ molecule and the lithium
//! atom, analytic local energies, and a Metropolis sampler with adaptive step
//! control and online statistics.

pub mod error;
pub mod wavefunction;
pub mod correlation;
pub mod systems;
pub mod sampling;
pub mod io;

// Re-export commonly used types at crate root
pub use error::{QmcError, Result};
pub use wavefunction::{SingleWfn, MultiWfn, AtomicOrbital, STO, SlaterDeterminant, DeterminantState, Spin, init_li_sto};
pub use correlation::{CorrelationFactor, SimpleJastrow};
pub use systems::{Composition, H2Molecule, HydrogenAtom, LithiumAtom, LithiumWalker};
pub use sampling::{EnergyCalculator, Walker, DensityWalker, MCMCParams, MCMCResults, MCMCSimulation, SamplerState, run_batch, seeded_batch};
pub use io::{read_config, RunConfig, System, SystemConfig};

/// Hartree to electronvolt.
pub const HA_TO_EV: f64 = 27.21138602;
