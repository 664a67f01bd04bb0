//! Slater determinant with incremental inverse updates.
//!
//! The matrix stores `A[(i, j)] = φⱼ(rᵢ)` when electron `i` and orbital `j`
//! share a spin channel and zero otherwise. Single-electron moves are priced
//! with the determinant ratio `Σⱼ φⱼ(r')·A⁻¹[(j, i)]` and committed with a
//! Sherman–Morrison rank-one update of the inverse.

use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use super::slater::STO;
use super::traits::SingleWfn;
use crate::error::{QmcError, Result};

/// The determinant is treated as singular when it falls below this fraction
/// of the Hadamard bound Πᵢ‖rowᵢ‖.
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Ratios smaller than this force a full rebuild instead of a rank-one update.
pub const RATIO_FLOOR: f64 = 1e-12;

/// Spin channel of an electron or orbital.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Spin {
    Up,
    Down,
}

/// Observable state of the determinant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeterminantState {
    /// Matrix and inverse match the stored coordinates.
    Valid,
    /// A move of electron `index` has been priced but not committed.
    Pending { index: usize },
}

#[derive(Debug, Clone)]
struct PendingMove {
    index: usize,
    position: Vector3<f64>,
    row: DVector<f64>,
    ratio: f64,
}

/// Slater determinant constructed from STOs.
#[derive(Debug, Clone)]
pub struct SlaterDeterminant {
    orbitals: Vec<STO>,
    /// Spin of electron `i` and of orbital `i`
    spins: Vec<Spin>,
    positions: Vec<Vector3<f64>>,
    matrix: DMatrix<f64>,
    inverse: DMatrix<f64>,
    determinant: f64,
    pending: Option<PendingMove>,
    commits_since_refresh: usize,
    refresh_interval: usize,
    drift_tolerance: f64,
}

impl SlaterDeterminant {
    pub const DEFAULT_REFRESH_INTERVAL: usize = 100;
    pub const DEFAULT_DRIFT_TOLERANCE: f64 = 1e-8;

    /// Build the determinant and its inverse at `positions`.
    pub fn new(orbitals: Vec<STO>, spins: Vec<Spin>, positions: &[Vector3<f64>]) -> Result<Self> {
        let n = orbitals.len();
        if n == 0 || spins.len() != n {
            return Err(QmcError::InvalidParameter(format!(
                "need one spin per orbital, got {} orbitals and {} spins",
                n,
                spins.len()
            )));
        }
        let mut det = Self {
            orbitals,
            spins,
            positions: Vec::new(),
            matrix: DMatrix::zeros(n, n),
            inverse: DMatrix::zeros(n, n),
            determinant: 0.0,
            pending: None,
            commits_since_refresh: 0,
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
            drift_tolerance: Self::DEFAULT_DRIFT_TOLERANCE,
        };
        det.initialize(positions)?;
        Ok(det)
    }

    /// Set how often the inverse is rebuilt from scratch.
    pub fn with_refresh(mut self, interval: usize, drift_tolerance: f64) -> Result<Self> {
        if interval == 0 {
            return Err(QmcError::InvalidParameter(
                "refresh interval must be at least 1".to_string(),
            ));
        }
        self.refresh_interval = interval;
        self.drift_tolerance = crate::error::require_positive("drift tolerance", drift_tolerance)?;
        Ok(self)
    }

    pub fn num_electrons(&self) -> usize {
        self.orbitals.len()
    }

    /// Rebuild matrix, determinant and inverse from `positions`.
    pub fn initialize(&mut self, positions: &[Vector3<f64>]) -> Result<()> {
        let n = self.num_electrons();
        if positions.len() != n {
            return Err(QmcError::InvalidParameter(format!(
                "expected {} electron positions, got {}",
                n,
                positions.len()
            )));
        }
        let mut matrix = DMatrix::zeros(n, n);
        for (i, r) in positions.iter().enumerate() {
            matrix.set_row(i, &self.row(i, r).transpose());
        }
        let (determinant, inverse) = invert(&matrix)?;

        self.positions = positions.to_vec();
        self.matrix = matrix;
        self.inverse = inverse;
        self.determinant = determinant;
        self.pending = None;
        self.commits_since_refresh = 0;
        Ok(())
    }

    /// Orbital values for electron `index` placed at `r`.
    fn row(&self, index: usize, r: &Vector3<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.num_electrons(),
            self.orbitals.iter().zip(self.spins.iter()).map(|(orbital, &spin)| {
                if spin == self.spins[index] {
                    orbital.value(r)
                } else {
                    0.0
                }
            }),
        )
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.num_electrons() {
            Ok(())
        } else {
            Err(QmcError::InvalidMove(format!(
                "electron index {} out of range for {} electrons",
                index,
                self.num_electrons()
            )))
        }
    }

    /// Price moving electron `index` to `position`; returns det(new)/det(old).
    pub fn propose_move(&mut self, index: usize, position: Vector3<f64>) -> Result<f64> {
        self.check_index(index)?;
        let row = self.row(index, &position);
        let ratio = row.dot(&self.inverse.column(index));
        self.pending = Some(PendingMove { index, position, row, ratio });
        Ok(ratio)
    }

    /// Accept the pending move of electron `index` to `position`.
    pub fn commit(&mut self, index: usize, position: Vector3<f64>) -> Result<()> {
        let pending = match self.pending.take() {
            None => return Err(QmcError::NoPendingMove),
            Some(p) if p.index != index => {
                let expected = p.index;
                self.pending = Some(p);
                return Err(QmcError::MismatchedCommit { expected, found: index });
            }
            Some(p) if p.position != position => {
                self.pending = Some(p);
                return Err(QmcError::InvalidMove(
                    "commit position differs from the proposed position".to_string(),
                ));
            }
            Some(p) => p,
        };

        if pending.ratio.abs() < RATIO_FLOOR || !pending.ratio.is_finite() {
            debug!(ratio = pending.ratio, "determinant ratio below floor, rebuilding");
            let mut positions = self.positions.clone();
            positions[index] = position;
            return self.initialize(&positions);
        }

        let PendingMove { row, ratio, .. } = pending;
        // w = rowᵀ A⁻¹ - eᵢ, A⁻¹ ← A⁻¹ - A⁻¹eᵢ wᵀ / ratio
        let mut w = self.inverse.tr_mul(&row);
        w[index] -= 1.0;
        let u = self.inverse.column(index).clone_owned();
        self.inverse.ger(-1.0 / ratio, &u, &w, 1.0);

        self.matrix.set_row(index, &row.transpose());
        self.positions[index] = position;
        self.determinant *= ratio;

        self.commits_since_refresh += 1;
        if self.commits_since_refresh >= self.refresh_interval {
            if let Err(err) = self.refresh() {
                // The updated inverse still matches the committed move.
                warn!(%err, "periodic refresh failed, keeping the updated inverse");
                self.commits_since_refresh = 0;
            }
        }
        Ok(())
    }

    /// Discard the pending move, if any.
    pub fn reject(&mut self) {
        self.pending = None;
    }

    /// Recompute determinant and inverse from the stored matrix.
    ///
    /// Returns the drift of the incrementally updated inverse it replaced.
    pub fn refresh(&mut self) -> Result<f64> {
        let drift = self.drift();
        let (determinant, inverse) = invert(&self.matrix)?;
        if drift > self.drift_tolerance {
            warn!(drift, tolerance = self.drift_tolerance, "inverse drift above tolerance");
        } else {
            debug!(drift, "refreshed Slater inverse");
        }
        self.determinant = determinant;
        self.inverse = inverse;
        self.commits_since_refresh = 0;
        Ok(drift)
    }

    /// max |A·A⁻¹ - I|
    pub fn drift(&self) -> f64 {
        let n = self.num_electrons();
        (&self.matrix * &self.inverse - DMatrix::<f64>::identity(n, n)).amax()
    }

    /// ∇ᵢD / D for electron `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`Self::num_electrons`].
    pub fn gradient(&self, index: usize) -> Vector3<f64> {
        let r = &self.positions[index];
        (0..self.num_electrons())
            .filter(|&j| self.spins[j] == self.spins[index])
            .map(|j| self.orbitals[j].gradient(r) * self.inverse[(j, index)])
            .sum()
    }

    /// ∇ᵢ²D / D for electron `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`Self::num_electrons`].
    pub fn laplacian(&self, index: usize) -> f64 {
        let r = &self.positions[index];
        (0..self.num_electrons())
            .filter(|&j| self.spins[j] == self.spins[index])
            .map(|j| self.orbitals[j].laplacian(r) * self.inverse[(j, index)])
            .sum()
    }

    pub fn state(&self) -> DeterminantState {
        match &self.pending {
            Some(p) => DeterminantState::Pending { index: p.index },
            None => DeterminantState::Valid,
        }
    }

    pub fn value(&self) -> f64 {
        self.determinant
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn inverse(&self) -> &DMatrix<f64> {
        &self.inverse
    }
}

fn invert(matrix: &DMatrix<f64>) -> Result<(f64, DMatrix<f64>)> {
    let determinant = matrix.determinant();
    let hadamard: f64 = matrix.row_iter().map(|row| row.norm()).product();
    if !determinant.is_finite() || determinant.abs() <= SINGULAR_TOLERANCE * hadamard {
        return Err(QmcError::SingularMatrix { determinant });
    }
    let inverse = matrix
        .clone()
        .try_inverse()
        .ok_or(QmcError::SingularMatrix { determinant })?;
    Ok((determinant, inverse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wavefunction::init_li_sto;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::Normal;

    fn lithium_orbitals() -> (Vec<STO>, Vec<Spin>) {
        let origin = Vector3::zeros();
        (
            vec![
                init_li_sto(origin, 1).unwrap(),
                init_li_sto(origin, 1).unwrap(),
                init_li_sto(origin, 2).unwrap(),
            ],
            vec![Spin::Up, Spin::Down, Spin::Up],
        )
    }

    fn random_positions(rng: &mut StdRng) -> Vec<Vector3<f64>> {
        let dist = Normal::new(0.0, 1.0).unwrap();
        (0..3).map(|_| Vector3::<f64>::from_distribution(&dist, rng)).collect()
    }

    fn direct_matrix(det: &SlaterDeterminant, positions: &[Vector3<f64>]) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(3, 3);
        for i in 0..3 {
            for j in 0..3 {
                if det.spins[i] == det.spins[j] {
                    m[(i, j)] = det.orbitals[j].value(&positions[i]);
                }
            }
        }
        m
    }

    #[test]
    fn test_spin_blocks_are_zero() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(7);
        let det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng)).unwrap();
        let m = det.matrix();
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(1, 0)], 0.0);
        assert_eq!(m[(1, 2)], 0.0);
        assert_eq!(m[(2, 1)], 0.0);
    }

    #[test]
    fn test_ratio_and_inverse_match_direct_evaluation() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(11);
        let dist = Normal::new(0.0, 0.5).unwrap();

        for _ in 0..20 {
            let positions = random_positions(&mut rng);
            let mut det =
                SlaterDeterminant::new(orbitals.clone(), spins.clone(), &positions).unwrap();

            for index in 0..3 {
                let step = Vector3::<f64>::from_distribution(&dist, &mut rng);
                let new_pos = det.positions()[index] + step;
                let ratio = det.propose_move(index, new_pos).unwrap();
                assert_eq!(det.state(), DeterminantState::Pending { index });

                let mut moved = det.positions().to_vec();
                moved[index] = new_pos;
                let new_matrix = direct_matrix(&det, &moved);
                let current = direct_matrix(&det, det.positions()).determinant();
                assert_relative_eq!(ratio, new_matrix.determinant() / current, max_relative = 1e-9);

                det.commit(index, new_pos).unwrap();
                assert_eq!(det.state(), DeterminantState::Valid);
                let direct_inverse = new_matrix.clone().try_inverse().unwrap();
                for (a, b) in det.inverse().iter().zip(direct_inverse.iter()) {
                    assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-9);
                }
                assert_relative_eq!(det.value(), new_matrix.determinant(), max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn test_reject_keeps_state() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(3);
        let mut det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng)).unwrap();
        let before = det.inverse().clone();
        det.propose_move(1, Vector3::new(0.3, 0.2, 0.1)).unwrap();
        det.reject();
        assert_eq!(det.state(), DeterminantState::Valid);
        assert_eq!(det.inverse(), &before);
        assert!(matches!(
            det.commit(1, Vector3::new(0.3, 0.2, 0.1)),
            Err(QmcError::NoPendingMove)
        ));
    }

    #[test]
    fn test_mismatched_commit_keeps_pending_move() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(5);
        let mut det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng)).unwrap();
        let target = Vector3::new(0.1, -0.4, 0.2);
        det.propose_move(2, target).unwrap();
        assert!(matches!(
            det.commit(0, target),
            Err(QmcError::MismatchedCommit { expected: 2, found: 0 })
        ));
        assert!(matches!(det.commit(2, Vector3::zeros()), Err(QmcError::InvalidMove(_))));
        assert_eq!(det.state(), DeterminantState::Pending { index: 2 });
        det.commit(2, target).unwrap();
        assert_eq!(det.positions()[2], target);
    }

    #[test]
    fn test_singular_initialization_fails() {
        let (orbitals, spins) = lithium_orbitals();
        // Both spin-up electrons on the same point give two identical rows
        let p = Vector3::new(0.4, 0.1, -0.2);
        let positions = vec![p, Vector3::new(-0.5, 0.3, 0.0), p];
        assert!(matches!(
            SlaterDeterminant::new(orbitals, spins, &positions),
            Err(QmcError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_out_of_range_move_is_rejected() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(9);
        let mut det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng)).unwrap();
        assert!(det.propose_move(3, Vector3::zeros()).is_err());
    }

    #[test]
    fn test_long_run_keeps_determinant_consistent() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(13);
        let dist = Normal::new(0.0, 0.3).unwrap();
        let mut det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng))
            .unwrap()
            .with_refresh(10, 1e-8)
            .unwrap();
        for step in 0..500 {
            let index = step % 3;
            let offset = Vector3::<f64>::from_distribution(&dist, &mut rng);
            let new_pos = det.positions()[index] + offset;
            let ratio = det.propose_move(index, new_pos).unwrap();
            if ratio.abs() > 1e-3 {
                det.commit(index, new_pos).unwrap();
            } else {
                det.reject();
            }
        }
        assert!(det.drift() < 1e-8);
        let direct = direct_matrix(&det, det.positions());
        assert_relative_eq!(det.value(), direct.determinant(), max_relative = 1e-8);
    }

    #[test]
    fn test_periodic_refresh_repairs_corrupted_inverse() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(17);
        let tolerance = 1e-8;
        let mut det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng))
            .unwrap()
            .with_refresh(5, tolerance)
            .unwrap();
        det.inverse[(0, 0)] += 1e-6;
        let injected = det.drift();
        assert!(injected > tolerance);

        // Moving the spin-down electron leaves the corrupted spin-up block untouched
        let step = Vector3::new(0.01, -0.02, 0.015);
        for commit in 1..=5 {
            let new_pos = det.positions()[1] + step;
            det.propose_move(1, new_pos).unwrap();
            det.commit(1, new_pos).unwrap();
            if commit < 5 {
                assert_relative_eq!(det.drift(), injected, max_relative = 1e-6);
            } else {
                assert!(det.drift() < tolerance, "drift {} after refresh", det.drift());
            }
        }
    }

    #[test]
    fn test_refresh_returns_replaced_drift() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(19);
        let mut det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng)).unwrap();
        let delta = 1e-6;
        det.inverse[(0, 0)] += delta;
        // A·δe₀e₀ᵀ only touches column 0
        let expected = delta * det.matrix().column(0).amax();
        let drift = det.refresh().unwrap();
        assert_relative_eq!(drift, expected, max_relative = 1e-6);
        assert!(det.drift() < 1e-10);
    }

    #[test]
    fn test_commit_below_ratio_floor_keeps_state() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(23);
        let mut det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng)).unwrap();
        let positions = det.positions().to_vec();
        let inverse = det.inverse().clone();
        let value = det.value();

        // Spin-up electron 0 onto spin-up electron 2 duplicates a row
        let target = positions[2];
        let ratio = det.propose_move(0, target).unwrap();
        assert!(ratio.abs() < RATIO_FLOOR, "ratio {ratio}");
        assert!(matches!(det.commit(0, target), Err(QmcError::SingularMatrix { .. })));

        assert_eq!(det.state(), DeterminantState::Valid);
        assert_eq!(det.positions(), positions.as_slice());
        assert_eq!(det.inverse(), &inverse);
        assert_eq!(det.value(), value);
    }

    #[test]
    fn test_failed_periodic_refresh_keeps_committed_move() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(29);
        let mut det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng))
            .unwrap()
            .with_refresh(1, 1e-8)
            .unwrap();
        // Identical spin-up rows make the rebuild fail while the inverse stays usable
        let row = det.matrix.row(0).clone_owned();
        det.matrix.set_row(2, &row);

        let new_pos = det.positions()[1] + Vector3::new(0.05, 0.0, -0.05);
        det.propose_move(1, new_pos).unwrap();
        assert!(det.commit(1, new_pos).is_ok());
        assert_eq!(det.state(), DeterminantState::Valid);
        assert_eq!(det.positions()[1], new_pos);
        assert_eq!(det.commits_since_refresh, 0);
    }

    #[test]
    #[should_panic]
    fn test_gradient_out_of_range_panics() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(31);
        let det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng)).unwrap();
        det.gradient(3);
    }

    #[test]
    fn test_refresh_interval_must_be_positive() {
        let (orbitals, spins) = lithium_orbitals();
        let mut rng = StdRng::seed_from_u64(1);
        let det = SlaterDeterminant::new(orbitals, spins, &random_positions(&mut rng)).unwrap();
        assert!(det.with_refresh(0, 1e-8).is_err());
    }
}
