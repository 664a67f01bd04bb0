//! Online accumulators for the energy series.

/// Running Σx and Σx² over the accumulated samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl RunningStats {
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    pub fn count(&self) -> usize {
        self.n
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.sum / self.n as f64
    }

    /// Population variance, clamped at zero against round-off.
    pub fn variance(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.n as f64 - mean * mean).max(0.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Blocking estimate of the standard error of a correlated series.
///
/// Samples are averaged in consecutive blocks of `block_size`; the spread of
/// the block means gives the error without storing the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockAverager {
    block_size: usize,
    current: RunningStats,
    blocks: RunningStats,
}

impl BlockAverager {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            current: RunningStats::default(),
            blocks: RunningStats::default(),
        }
    }

    pub fn push(&mut self, x: f64) {
        self.current.push(x);
        if self.current.count() == self.block_size {
            self.blocks.push(self.current.mean());
            self.current = RunningStats::default();
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.count()
    }

    /// Standard error of the mean; zero with fewer than two complete blocks.
    pub fn error(&self) -> f64 {
        let n_blocks = self.blocks.count();
        if n_blocks < 2 {
            return 0.0;
        }
        let unbiased = self.blocks.variance() * n_blocks as f64 / (n_blocks - 1) as f64;
        (unbiased / n_blocks as f64).sqrt()
    }
}

/// Integrated autocorrelation time τ = N·error²/var.
pub fn autocorrelation_time(n_samples: usize, error: f64, variance: f64) -> f64 {
    if variance <= 0.0 || error <= 0.0 {
        return 1.0;
    }
    n_samples as f64 * error * error / variance
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for x in [1.0, 2.0, 3.0, 4.0] {
            stats.push(x);
        }
        assert_eq!(stats.count(), 4);
        assert_relative_eq!(stats.mean(), 2.5);
        assert_relative_eq!(stats.variance(), 1.25);
    }

    #[test]
    fn test_constant_series_has_zero_spread() {
        let mut stats = RunningStats::default();
        for _ in 0..1000 {
            stats.push(-0.1);
        }
        assert!(stats.variance() >= 0.0);
        assert_relative_eq!(stats.std_dev(), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_empty_stats() {
        let stats = RunningStats::default();
        assert_eq!(stats.mean(), 0.0);
        assert_eq!(stats.std_dev(), 0.0);
    }

    #[test]
    fn test_block_error() {
        let mut blocks = BlockAverager::new(2);
        for x in [1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 100.0] {
            blocks.push(x);
        }
        // block means 2, 6, 10; the trailing partial block is ignored
        assert_eq!(blocks.num_blocks(), 3);
        assert_relative_eq!(blocks.error(), (16.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_single_block_has_no_error() {
        let mut blocks = BlockAverager::new(10);
        for x in 0..15 {
            blocks.push(x as f64);
        }
        assert_eq!(blocks.error(), 0.0);
    }

    #[test]
    fn test_autocorrelation_time_defaults_to_one() {
        assert_eq!(autocorrelation_time(100, 0.0, 0.0), 1.0);
        assert_relative_eq!(autocorrelation_time(100, 0.1, 0.5), 2.0);
    }
}
