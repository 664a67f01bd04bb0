//! Error type shared by the wavefunction, sampling and configuration layers.

use thiserror::Error;

/// Errors raised by the QMC core.
#[derive(Error, Debug)]
pub enum QmcError {
    /// Starting configuration has zero or non-finite density.
    #[error("singular configuration: {0}")]
    SingularConfiguration(String),

    /// Slater matrix cannot be inverted.
    #[error("Slater matrix is singular (determinant = {determinant:e})")]
    SingularMatrix { determinant: f64 },

    /// A construction parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// `commit` was called without a preceding `propose_move`.
    #[error("no pending move to commit")]
    NoPendingMove,

    /// `commit` does not match the pending proposal.
    #[error("commit for electron {found} does not match pending move of electron {expected}")]
    MismatchedCommit { expected: usize, found: usize },

    /// The walker cannot handle the proposal it was given.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// `run` was called on a sampler that already started.
    #[error("sampler has already been run")]
    SamplerFinished,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, QmcError>;

/// Reject a parameter that must be strictly positive and finite.
pub(crate) fn require_positive(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(QmcError::InvalidParameter(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}
