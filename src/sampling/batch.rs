//! Independent chains run in parallel.

use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use tracing::info;
use crate::error::Result;
use super::traits::Walker;
use super::vmc::{MCMCParams, MCMCResults, MCMCSimulation};

/// Run every simulation to completion on the rayon pool.
///
/// Each chain owns its walker and RNG, so the results are the same as running
/// the chains one after another.
pub fn run_batch<W, R>(simulations: Vec<MCMCSimulation<W, R>>) -> Result<Vec<MCMCResults>>
where
    W: Walker + Send,
    R: Rng + Send,
{
    info!(chains = simulations.len(), "running VMC batch");
    simulations
        .into_par_iter()
        .map(|mut simulation| simulation.run())
        .collect()
}

/// `n` simulations whose seeds are `seed + i`.
///
/// Without a seed in `params` the base seed is drawn once from the OS.
pub fn seeded_batch<W, F>(params: MCMCParams, n: usize, init: F) -> Result<Vec<MCMCSimulation<W>>>
where
    W: Walker,
    F: Fn(&mut StdRng) -> Result<W>,
{
    let base = params.seed.unwrap_or_else(rand::random);
    (0..n as u64)
        .map(|i| {
            let chain = MCMCParams { seed: Some(base.wrapping_add(i)), ..params };
            MCMCSimulation::with_initializer(chain, &init)
        })
        .collect()
}

/// Mean of the chain energies with the errors combined in quadrature.
pub fn combine(results: &[MCMCResults]) -> (f64, f64) {
    if results.is_empty() {
        return (0.0, 0.0);
    }
    let n = results.len() as f64;
    let energy = results.iter().map(|r| r.energy).sum::<f64>() / n;
    let error = results.iter().map(|r| r.error * r.error).sum::<f64>().sqrt() / n;
    (energy, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::DensityWalker;
    use crate::systems::HydrogenAtom;
    use approx::assert_relative_eq;

    fn init(rng: &mut StdRng) -> Result<DensityWalker<HydrogenAtom>> {
        DensityWalker::from_rng(HydrogenAtom::new(0.1, 1.1)?, rng)
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let params = MCMCParams { n_steps: 500, seed: Some(9), block_size: 50, ..MCMCParams::default() };
        let batch = run_batch(seeded_batch(params, 3, init).unwrap()).unwrap();
        assert_eq!(batch.len(), 3);
        for (i, result) in batch.iter().enumerate() {
            let single = MCMCParams { seed: Some(9 + i as u64), ..params };
            let mut sim = MCMCSimulation::with_initializer(single, init).unwrap();
            assert_eq!(*result, sim.run().unwrap());
        }
    }

    #[test]
    fn test_combine() {
        let base = MCMCResults {
            energy: -1.0,
            std_dev: 0.1,
            error: 0.3,
            autocorrelation_time: 1.0,
            acceptance_rate: 0.5,
            final_step_size: 1.0,
            n_samples: 10,
            non_finite_energies: 0,
        };
        let other = MCMCResults { energy: -2.0, error: 0.4, ..base };
        let (energy, error) = combine(&[base, other]);
        assert_relative_eq!(energy, -1.5);
        assert_relative_eq!(error, 0.25);
        assert_eq!(combine(&[]), (0.0, 0.0));
    }
}
