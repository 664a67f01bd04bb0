//! Wavefunction module - traits, orbitals and the Slater determinant.

mod traits;
mod slater;
mod determinant;

pub use traits::{SingleWfn, MultiWfn, DISTANCE_FLOOR, floored_norm};
pub use slater::{AtomicOrbital, STO, init_li_sto};
pub use determinant::{SlaterDeterminant, DeterminantState, Spin, RATIO_FLOOR, SINGULAR_TOLERANCE};
