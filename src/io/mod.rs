//! IO module - run file handling.

mod config;

pub use config::{parse_config, read_config, OrbitalConfig, RunConfig, System, SystemConfig};
