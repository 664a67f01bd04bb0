use approx::assert_relative_eq;
use nalgebra::Vector3;
use simple_qmc::{
    Composition, CorrelationFactor, DensityWalker, EnergyCalculator, H2Molecule, HydrogenAtom, LithiumAtom,
    LithiumWalker, MCMCParams, MCMCSimulation, Walker,
};

fn params(n_steps: usize, seed: u64) -> MCMCParams {
    MCMCParams { n_steps, seed: Some(seed), ..MCMCParams::default() }
}

fn h2() -> H2Molecule {
    H2Molecule::new(
        CorrelationFactor::simple(1.0).unwrap(),
        Composition::Product,
        0.5,
        1.0,
        [Vector3::new(0.5, 0.0, 0.0), Vector3::new(-0.5, 0.0, 0.0)],
    )
    .unwrap()
}

fn lithium() -> LithiumAtom {
    LithiumAtom::new(Vector3::zeros(), Some(CorrelationFactor::simple(1.0).unwrap())).unwrap()
}

#[test]
fn hydrogen_exact_orbital_gives_exact_energy() {
    let mut sim = MCMCSimulation::with_initializer(params(1_000_000, 1), |rng| {
        DensityWalker::from_rng(HydrogenAtom::new(0.0, 1.0)?, rng)
    })
    .unwrap();
    let results = sim.run().unwrap();
    assert!((results.energy + 0.5).abs() <= 3.0 * results.error + 1e-9);
    assert_eq!(results.n_samples, 1_000_000);
}

#[test]
fn hydrogen_trial_exponent_is_variational() {
    // E(α) = α²/2 - α
    let alpha = 0.9;
    let mut sim = MCMCSimulation::with_initializer(params(1_000_000, 2), |rng| {
        DensityWalker::from_rng(HydrogenAtom::new(0.0, alpha)?, rng)
    })
    .unwrap();
    let results = sim.run().unwrap();
    let exact = 0.5 * alpha * alpha - alpha;
    assert!(results.error > 0.0);
    assert!((results.energy - exact).abs() <= 5.0 * results.error + 2e-3, "{results:?}");
    assert!(results.energy > -0.5 - 5.0 * results.error);
}

#[test]
fn h2_end_to_end() {
    let run = || {
        let mol = h2();
        MCMCSimulation::with_initializer(params(1_000_000, 42), |rng| DensityWalker::from_rng(mol, rng))
            .unwrap()
            .run()
            .unwrap()
    };
    let first = run();
    let (mean, std) = first.mean_and_std();
    assert!(mean.is_finite());
    assert!(std >= 0.0);
    // variational bound with some slack for the statistical error
    assert!(mean > -1.25 && mean < 0.0, "{first:?}");
    assert_eq!(first.non_finite_energies, 0);
    assert!(first.final_step_size >= 0.01 && first.final_step_size <= 2.0);

    let second = run();
    assert_eq!(first.energy.to_bits(), second.energy.to_bits());
    assert_eq!(first.std_dev.to_bits(), second.std_dev.to_bits());
}

#[test]
fn different_seeds_give_different_chains() {
    let run = |seed| {
        MCMCSimulation::with_initializer(params(1000, seed), |rng| DensityWalker::from_rng(h2(), rng))
            .unwrap()
            .run()
            .unwrap()
    };
    assert_ne!(run(1).energy, run(2).energy);
}

#[test]
fn step_size_respects_bounds_every_step() {
    let bounded = MCMCParams {
        min_step_size: 0.3,
        initial_step_size: 0.3,
        max_step_size: 0.4,
        ..params(2000, 5)
    };
    let mut sim = MCMCSimulation::with_initializer(bounded, |rng| LithiumWalker::from_rng(lithium(), 100, rng)).unwrap();
    for _ in 0..2000 {
        sim.step().unwrap();
        assert!(sim.step_size() >= 0.3 && sim.step_size() <= 0.4);
    }
}

#[test]
fn lithium_incremental_energy_matches_full_evaluation() {
    let p = MCMCParams { n_equilibrate: 1000, ..params(20_000, 11) };
    let mut sim = MCMCSimulation::with_initializer(p, |rng| LithiumWalker::from_rng(lithium(), 50, rng)).unwrap();
    let results = sim.run().unwrap();

    let walker = sim.walker();
    let full = walker.atom().local_energy(walker.positions());
    assert_relative_eq!(walker.local_energy(), full, max_relative = 1e-8);
    assert!(walker.determinant().drift() < 1e-8);

    assert!(results.energy.is_finite());
    assert!(results.energy > -7.6 && results.energy < -6.0, "{results:?}");
    assert!(results.acceptance_rate > 0.0);
}

#[test]
fn explicit_start_must_be_valid() {
    let coincident = [Vector3::new(0.2, 0.0, 0.0), Vector3::new(-0.3, 0.1, 0.0), Vector3::new(0.2, 0.0, 0.0)];
    assert!(LithiumWalker::new(lithium(), &coincident, 100).is_err());

    let walker = DensityWalker::new(h2(), vec![Vector3::new(0.5, 0.1, 0.0), Vector3::new(-0.5, 0.0, 0.2)]).unwrap();
    let mut sim = MCMCSimulation::new(walker, params(100, 3)).unwrap();
    assert!(sim.run().is_ok());
}
