//! Deviation scoring
//!
//! Computes how far an observation sits from the recent history of its
//! channel, in units of the history's population standard deviation.

/// Relative spread below which a window counts as constant
const SPREAD_EPSILON: f64 = f64::EPSILON;

/// Population statistics of a history window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStats {
    /// Mean of the window
    pub mean: f64,
    /// Population standard deviation (divides by N)
    pub std_dev: f64,
    /// Number of values in the window
    pub count: usize,
}

impl HistoryStats {
    /// Compute mean and population standard deviation
    ///
    /// Returns `None` for an empty window.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let first = values[0];
        if values.iter().all(|&v| v == first) {
            return Some(Self {
                mean: first,
                std_dev: 0.0,
                count,
            });
        }

        let mean = values.iter().sum::<f64>() / count as f64;

        // Two-pass variance for stability
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            count,
        })
    }

    /// Standardized deviation of `observed` from this window
    ///
    /// `None` when the window has no spread beyond rounding noise.
    pub fn score(&self, observed: f64) -> Option<f64> {
        if self.std_dev <= SPREAD_EPSILON * self.mean.abs().max(1.0) {
            return None;
        }

        let z = (observed - self.mean) / self.std_dev;
        z.is_finite().then_some(z)
    }
}

/// Compute `(observed - mean) / std` against a history window
///
/// # Returns
/// * `Some(score)` when the history is non-empty with nonzero spread
/// * `None` for an empty or constant history
pub fn deviation_score(observed: f64, history: &[f64]) -> Option<f64> {
    HistoryStats::from_values(history)?.score(observed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_population_statistics() {
        // 2, 4, 4, 4, 5, 5, 7, 9 -> mean 5, population std 2
        let stats = HistoryStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((stats.mean - 5.0).abs() < EPS);
        assert!((stats.std_dev - 2.0).abs() < EPS);
        assert_eq!(stats.count, 8);
    }

    #[test]
    fn test_score_matches_formula() {
        let history = [27.0, 27.1, 26.9, 27.2, 27.0];
        let mean = history.iter().sum::<f64>() / 5.0;
        let std = (history.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 5.0).sqrt();

        let score = deviation_score(32.0, &history).unwrap();
        assert!((score - (32.0 - mean) / std).abs() < EPS);
        assert!(score > 40.0);
    }

    #[test]
    fn test_order_does_not_matter() {
        let a = deviation_score(3.0, &[1.0, 2.0, 4.0, 8.0]).unwrap();
        let b = deviation_score(3.0, &[8.0, 4.0, 1.0, 2.0]).unwrap();
        assert!((a - b).abs() < EPS);
    }

    #[test]
    fn test_empty_history_is_undefined() {
        assert_eq!(deviation_score(31.0, &[]), None);
        assert!(HistoryStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_constant_history_is_undefined() {
        assert_eq!(deviation_score(25.0, &[25.0, 25.0, 25.0]), None);
        assert_eq!(deviation_score(99.0, &[25.0, 25.0, 25.0]), None);
        assert_eq!(deviation_score(1.0, &[4.2]), None);
    }

    #[test]
    fn test_constant_decimal_history_is_undefined() {
        // Summing these leaves rounding residue in the variance
        assert_eq!(deviation_score(0.1, &[0.1, 0.1, 0.1]), None);
        assert_eq!(deviation_score(0.8, &[0.7, 0.7, 0.7]), None);
        assert_eq!(deviation_score(3.4, &[3.3; 5]), None);

        let stats = HistoryStats::from_values(&[0.1, 0.1, 0.1]).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.mean, 0.1);
    }

    #[test]
    fn test_rounding_noise_spread_is_undefined() {
        let stats = HistoryStats {
            mean: 0.7,
            std_dev: 1e-17,
            count: 3,
        };
        assert_eq!(stats.score(0.8), None);
    }

    #[test]
    fn test_negative_deviation() {
        // mean 2, population std 1
        let score = deviation_score(0.0, &[1.0, 3.0]).unwrap();
        assert!((score + 2.0).abs() < EPS);
    }

    #[test]
    fn test_scores_are_never_nan_or_infinite() {
        let histories: [&[f64]; 4] = [&[], &[1.0], &[5.0, 5.0], &[1e-300, 2e-300]];
        for history in histories {
            if let Some(score) = deviation_score(1e300, history) {
                assert!(score.is_finite());
            }
        }
    }
}
