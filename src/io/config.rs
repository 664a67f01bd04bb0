//! YAML run files.
//!
//! ```yaml
//! system:
//!   kind: h2
//!   correlation: { kind: simple, cusp_param: 1.0 }
//!   composition: vb
//!   orbital: { c: 0.5, alpha: 1.0 }
//!   nuclei: [[0.5, 0.0, 0.0], [-0.5, 0.0, 0.0]]
//! sampler:
//!   n_steps: 1000000
//!   seed: 42
//! ```

use std::path::Path;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use crate::correlation::CorrelationFactor;
use crate::error::{QmcError, Result};
use crate::sampling::MCMCParams;
use crate::systems::{Composition, H2Molecule, HydrogenAtom, LithiumAtom};
use crate::wavefunction::SlaterDeterminant;

/// Parameters of the `(1 + c·r)·exp(-α·r)` orbital.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct OrbitalConfig {
    #[serde(default)]
    pub c: f64,
    pub alpha: f64,
}

/// System section of a run file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemConfig {
    HydrogenAtom {
        #[serde(default)]
        c: f64,
        #[serde(default = "unit")]
        alpha: f64,
    },
    H2 {
        correlation: CorrelationFactor,
        composition: Composition,
        orbital: OrbitalConfig,
        nuclei: [Vector3<f64>; 2],
    },
    Lithium {
        #[serde(default = "Vector3::zeros")]
        nucleus: Vector3<f64>,
        #[serde(default)]
        correlation: Option<CorrelationFactor>,
        #[serde(default = "default_refresh_interval")]
        refresh_interval: usize,
    },
}

fn unit() -> f64 {
    1.0
}

fn default_refresh_interval() -> usize {
    SlaterDeterminant::DEFAULT_REFRESH_INTERVAL
}

/// A validated system ready to be sampled.
#[derive(Debug, Clone, PartialEq)]
pub enum System {
    HydrogenAtom(HydrogenAtom),
    H2(H2Molecule),
    Lithium { atom: LithiumAtom, refresh_interval: usize },
}

impl SystemConfig {
    pub fn build(&self) -> Result<System> {
        match *self {
            Self::HydrogenAtom { c, alpha } => Ok(System::HydrogenAtom(HydrogenAtom::new(c, alpha)?)),
            Self::H2 { correlation, composition, orbital, nuclei } => Ok(System::H2(H2Molecule::new(
                correlation,
                composition,
                orbital.c,
                orbital.alpha,
                nuclei,
            )?)),
            Self::Lithium { nucleus, correlation, refresh_interval } => {
                if refresh_interval == 0 {
                    return Err(QmcError::InvalidParameter(
                        "refresh_interval must be at least 1".to_string(),
                    ));
                }
                Ok(System::Lithium {
                    atom: LithiumAtom::new(nucleus, correlation)?,
                    refresh_interval,
                })
            }
        }
    }
}

/// A complete run: what to sample and how.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub system: SystemConfig,
    #[serde(default)]
    pub sampler: MCMCParams,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        self.sampler.validate()?;
        self.system.build().map(|_| ())
    }
}

/// Parse and validate a run file from a YAML string.
pub fn parse_config(text: &str) -> Result<RunConfig> {
    let config: RunConfig = serde_yaml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Read and validate a run file.
pub fn read_config<P: AsRef<Path>>(filename: P) -> Result<RunConfig> {
    let file = std::fs::File::open(filename)?;
    let reader = std::io::BufReader::new(file);
    let config: RunConfig = serde_yaml::from_reader(reader)?;
    config.validate()?;
    Ok(config)
}
