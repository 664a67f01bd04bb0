//! Markov Chain Monte Carlo (MCMC) implementation for Variational Monte Carlo.
//!
//! A single chain samples |Ψ|² with the Metropolis algorithm, adapting the
//! step size towards a target acceptance fraction and accumulating the local
//! energy online.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::error::{require_positive, QmcError, Result};
use super::stats::{autocorrelation_time, BlockAverager, RunningStats};
use super::traits::{MoveScheme, Proposal, Walker};

/// Parameters for MCMC simulation.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MCMCParams {
    /// Accumulated steps
    pub n_steps: usize,
    pub initial_step_size: f64,
    pub min_step_size: f64,
    pub max_step_size: f64,
    pub target_acceptance: f64,
    /// Multiplicative step change applied after every step
    pub adaptation_factor: f64,
    /// Burn-in steps that are not accumulated
    pub n_equilibrate: usize,
    /// Steps per block for the error estimate
    pub block_size: usize,
    pub seed: Option<u64>,
}

impl Default for MCMCParams {
    fn default() -> Self {
        Self {
            n_steps: 100_000,
            initial_step_size: 1.0,
            min_step_size: 0.01,
            max_step_size: 2.0,
            target_acceptance: 0.5,
            adaptation_factor: 1.01,
            n_equilibrate: 0,
            block_size: 1000,
            seed: None,
        }
    }
}

impl MCMCParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_steps == 0 {
            return Err(QmcError::InvalidParameter("n_steps must be at least 1".to_string()));
        }
        if self.block_size == 0 {
            return Err(QmcError::InvalidParameter("block_size must be at least 1".to_string()));
        }
        let initial = require_positive("initial_step_size", self.initial_step_size)?;
        let min = require_positive("min_step_size", self.min_step_size)?;
        let max = require_positive("max_step_size", self.max_step_size)?;
        if !(min <= initial && initial <= max) {
            return Err(QmcError::InvalidParameter(format!(
                "step sizes must satisfy min <= initial <= max, got {min} / {initial} / {max}"
            )));
        }
        if !(self.target_acceptance > 0.0 && self.target_acceptance < 1.0) {
            return Err(QmcError::InvalidParameter(format!(
                "target_acceptance must lie in (0, 1), got {}",
                self.target_acceptance
            )));
        }
        if !(self.adaptation_factor.is_finite() && self.adaptation_factor > 1.0) {
            return Err(QmcError::InvalidParameter(format!(
                "adaptation_factor must be finite and greater than 1, got {}",
                self.adaptation_factor
            )));
        }
        Ok(())
    }

    /// `StdRng` seeded from `seed`, or from the OS when unset.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Lifecycle of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Running,
    Done,
}

/// Results of an MCMC simulation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MCMCResults {
    /// Mean local energy
    pub energy: f64,
    /// Standard deviation of the local energy
    pub std_dev: f64,
    /// Blocking estimate of the standard error of the mean
    pub error: f64,
    pub autocorrelation_time: f64,
    pub acceptance_rate: f64,
    pub final_step_size: f64,
    pub n_samples: usize,
    /// Accepted moves whose local energy was not finite
    pub non_finite_energies: usize,
}

impl MCMCResults {
    pub fn mean_and_std(&self) -> (f64, f64) {
        (self.energy, self.std_dev)
    }
}

/// MCMC simulation engine for variational Monte Carlo.
pub struct MCMCSimulation<W: Walker, R: Rng = StdRng> {
    walker: W,
    params: MCMCParams,
    rng: R,
    step_size: f64,
    state: SamplerState,
    energy: f64,
    accepted: usize,
    attempted: usize,
    stats: RunningStats,
    blocks: BlockAverager,
    non_finite_energies: usize,
}

impl<W: Walker> MCMCSimulation<W> {
    /// Simulation over `walker` with an RNG seeded from `params.seed`.
    pub fn new(walker: W, params: MCMCParams) -> Result<Self> {
        let rng = params.rng();
        Self::with_rng(walker, params, rng)
    }

    /// Build the walker from the simulation's own RNG, so the starting
    /// configuration is reproducible from the seed as well.
    pub fn with_initializer<F>(params: MCMCParams, init: F) -> Result<Self>
    where
        F: FnOnce(&mut StdRng) -> Result<W>,
    {
        params.validate()?;
        let mut rng = params.rng();
        let walker = init(&mut rng)?;
        Self::with_rng(walker, params, rng)
    }
}

impl<W: Walker, R: Rng> MCMCSimulation<W, R> {
    pub fn with_rng(walker: W, params: MCMCParams, rng: R) -> Result<Self> {
        params.validate()?;
        let energy = walker.local_energy();
        if !energy.is_finite() {
            return Err(QmcError::SingularConfiguration(format!(
                "local energy {energy} at the starting configuration"
            )));
        }
        Ok(Self {
            walker,
            params,
            rng,
            step_size: params.initial_step_size,
            state: SamplerState::Idle,
            energy,
            accepted: 0,
            attempted: 0,
            stats: RunningStats::default(),
            blocks: BlockAverager::new(params.block_size),
            non_finite_energies: 0,
        })
    }

    pub fn walker(&self) -> &W {
        &self.walker
    }

    pub fn params(&self) -> &MCMCParams {
        &self.params
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Local energy of the current configuration.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Run burn-in and `n_steps` accumulated steps.
    pub fn run(&mut self) -> Result<MCMCResults> {
        if self.state != SamplerState::Idle {
            return Err(QmcError::SamplerFinished);
        }
        self.state = SamplerState::Running;
        info!(
            n_steps = self.params.n_steps,
            n_equilibrate = self.params.n_equilibrate,
            step_size = self.step_size,
            "starting VMC run"
        );

        for _ in 0..self.params.n_equilibrate {
            self.sweep()?;
        }
        for _ in 0..self.params.n_steps {
            self.step()?;
        }

        self.state = SamplerState::Done;
        let results = self.results();
        info!(
            energy = results.energy,
            error = results.error,
            acceptance = results.acceptance_rate,
            "VMC run finished"
        );
        Ok(results)
    }

    /// One accumulated step; returns the energy it recorded.
    pub fn step(&mut self) -> Result<f64> {
        if self.state == SamplerState::Done {
            return Err(QmcError::SamplerFinished);
        }
        self.state = SamplerState::Running;
        self.sweep()?;
        self.stats.push(self.energy);
        self.blocks.push(self.energy);

        let n = self.stats.count();
        if n % self.params.block_size == 0 {
            debug!(step = n, step_size = self.step_size, acceptance = self.acceptance_rate(), "step snapshot");
        }
        Ok(self.energy)
    }

    /// Statistics accumulated so far.
    pub fn results(&self) -> MCMCResults {
        let n_samples = self.stats.count();
        let error = self.blocks.error();
        MCMCResults {
            energy: self.stats.mean(),
            std_dev: self.stats.std_dev(),
            error,
            autocorrelation_time: autocorrelation_time(n_samples, error, self.stats.variance()),
            acceptance_rate: self.acceptance_rate(),
            final_step_size: self.step_size,
            n_samples,
            non_finite_energies: self.non_finite_energies,
        }
    }

    fn acceptance_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.attempted as f64
    }

    fn offset(&mut self) -> Vector3<f64> {
        let step = self.step_size;
        let rng = &mut self.rng;
        Vector3::from_fn(|_, _| step * rng.gen_range(-1.0f64..1.0))
    }

    /// Propose and accept or reject every electron once, then adapt the step.
    fn sweep(&mut self) -> Result<()> {
        match self.walker.move_scheme() {
            MoveScheme::AllParticle => {
                let mut positions = self.walker.positions().to_vec();
                for r in positions.iter_mut() {
                    *r += self.offset();
                }
                self.attempt(Proposal::All(positions))?;
            }
            MoveScheme::SingleParticle => {
                for index in 0..self.walker.positions().len() {
                    let offset = self.offset();
                    let position = self.walker.positions()[index] + offset;
                    self.attempt(Proposal::Single { index, position })?;
                }
            }
        }
        self.adapt_step_size();
        Ok(())
    }

    fn attempt(&mut self, proposal: Proposal) -> Result<bool> {
        let ratio = self.walker.propose(proposal)?;
        let u: f64 = self.rng.gen();
        self.attempted += 1;

        if !(ratio.is_finite() && (ratio > 1.0 || ratio > u)) {
            self.walker.reject();
            return Ok(false);
        }
        self.walker.accept()?;
        self.accepted += 1;

        let energy = self.walker.local_energy();
        if energy.is_finite() {
            self.energy = energy;
        } else {
            self.non_finite_energies += 1;
            warn!(energy, "non-finite local energy, keeping previous value");
        }
        Ok(true)
    }

    /// Adapt the step size towards the target acceptance fraction.
    fn adapt_step_size(&mut self) {
        let factor = self.params.adaptation_factor;
        if self.acceptance_rate() > self.params.target_acceptance {
            self.step_size *= factor;
        } else {
            self.step_size /= factor;
        }
        self.step_size = self
            .step_size
            .clamp(self.params.min_step_size, self.params.max_step_size);
    }
}
