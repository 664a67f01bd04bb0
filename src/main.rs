//! VMC command-line interface
//!
//! Reads a YAML run file, samples the configured system and reports the
//! energy in Hartree and eV.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use rand::rngs::StdRng;
use tracing::info;

use simple_qmc::sampling::combine;
use simple_qmc::{
    read_config, run_batch, seeded_batch, DensityWalker, LithiumWalker, MCMCParams, MCMCResults, System,
    Walker, HA_TO_EV,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML run file
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Override the number of accumulated steps
    #[arg(long)]
    steps: Option<usize>,

    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of independent chains
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    chains: u64,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn setup_output(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    setup_output(args.verbose);

    info!("Reading configuration from: {}", args.config);
    let config = read_config(&args.config)
        .wrap_err_with(|| format!("Unable to load run file: {}", args.config))?;

    let mut params = config.sampler;
    if let Some(steps) = args.steps {
        params.n_steps = steps;
    }
    if args.seed.is_some() {
        params.seed = args.seed;
    }
    params.validate().wrap_err("Invalid sampler parameters")?;

    let system = config.system.build().wrap_err("Invalid system definition")?;
    let chains = usize::try_from(args.chains).wrap_err("Too many chains")?;
    let results = match system {
        System::HydrogenAtom(atom) => {
            run_chains(params, chains, |rng| DensityWalker::from_rng(atom.clone(), rng))?
        }
        System::H2(mol) => {
            run_chains(params, chains, |rng| DensityWalker::from_rng(mol.clone(), rng))?
        }
        System::Lithium { atom, refresh_interval } => run_chains(params, chains, |rng| {
            LithiumWalker::from_rng(atom.clone(), refresh_interval, rng)
        })?,
    };

    report(&results);
    Ok(())
}

fn run_chains<W, F>(params: MCMCParams, chains: usize, init: F) -> Result<Vec<MCMCResults>>
where
    W: Walker + Send,
    F: Fn(&mut StdRng) -> simple_qmc::Result<W>,
{
    let simulations = seeded_batch(params, chains, init).wrap_err("Unable to set up the chains")?;
    run_batch(simulations).wrap_err("Sampling failed")
}

fn report(results: &[MCMCResults]) {
    println!("VMC Results");
    println!("----------------------------------------");
    for (i, r) in results.iter().enumerate() {
        println!(
            "chain {:>3}: E = {:.6} ± {:.6} Ha, σ = {:.6}, acceptance = {:.3}, τ = {:.2}, step = {:.3}",
            i, r.energy, r.error, r.std_dev, r.acceptance_rate, r.autocorrelation_time, r.final_step_size
        );
        if r.non_finite_energies > 0 {
            println!("           {} non-finite local energies skipped", r.non_finite_energies);
        }
    }
    let (energy, error) = combine(results);
    println!("Final energy: {:.6} ± {:.6} Ha", energy, error);
    println!("Final energy: {:.6} ± {:.6} eV", energy * HA_TO_EV, error * HA_TO_EV);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_chains_is_an_error() {
        assert!(Args::try_parse_from(["simple_qmc", "--chains", "0"]).is_err());
        let args = Args::try_parse_from(["simple_qmc", "--chains", "3"]).unwrap();
        assert_eq!(args.chains, 3);
        assert_eq!(Args::try_parse_from(["simple_qmc"]).unwrap().chains, 1);
    }
}
