//! Systems module - physical systems for QMC calculations.

mod hydrogen;
mod lithium;

pub use hydrogen::{Composition, H2Molecule, HydrogenAtom};
pub use lithium::{LithiumAtom, LithiumWalker, LITHIUM_CHARGE};
