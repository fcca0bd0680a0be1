//! Synthetic measurement generators for tests
//!
//! Produces a seasonal SST signal with bounded noise and a low, stable
//! chlorophyll baseline. Deterministic for a given seed.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::models::{ChannelHistory, Measurement};

/// Deterministic pseudo-random sequence in `[0, 1)`
pub struct Noise {
    state: u64,
}

impl Noise {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(6364136223846793005).wrapping_add(1),
        }
    }

    pub fn next_unit(&mut self) -> f64 {
        // Knuth MMIX LCG constants
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// `n` daily measurements, oldest first
///
/// SST stays within [26.4, 28.4] and chlorophyll within [0.3, 0.4], well
/// inside the default absolute bounds.
pub fn synthetic_measurements(n: usize, seed: u64) -> Vec<Measurement> {
    let mut noise = Noise::new(seed);
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    (0..n)
        .map(|i| {
            let seasonal = if (i / 30) % 2 == 1 { 0.8 } else { 0.0 };
            let sst = 27.0 + 1.2 * (noise.next_unit() - 0.5) + seasonal;
            let chl = 0.3 + 0.1 * noise.next_unit();
            Measurement::new(round_to(sst, 2), round_to(chl, 3))
                .with_timestamp(start + Duration::days(i as i64))
        })
        .collect()
}

/// Channel history built from synthetic measurements, most recent first
pub fn synthetic_history(n: usize, seed: u64) -> ChannelHistory {
    let measurements = synthetic_measurements(n, seed);
    ChannelHistory {
        sst: measurements.iter().rev().map(|m| m.sst).collect(),
        chl: measurements.iter().rev().map(|m| m.chl).collect(),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_values_stay_in_range() {
        for m in synthetic_measurements(120, 42) {
            assert!((26.4..=28.4).contains(&m.sst), "sst {}", m.sst);
            assert!((0.3..=0.4).contains(&m.chl), "chl {}", m.chl);
            assert!(m.timestamp.is_some());
        }
    }

    #[test]
    fn test_synthetic_is_deterministic() {
        assert_eq!(synthetic_measurements(10, 7), synthetic_measurements(10, 7));
        assert_ne!(synthetic_measurements(10, 7), synthetic_measurements(10, 8));
    }

    #[test]
    fn test_synthetic_history_is_newest_first() {
        let measurements = synthetic_measurements(5, 1);
        let history = synthetic_history(5, 1);
        assert_eq!(history.sst[0], measurements[4].sst);
        assert_eq!(history.chl.len(), 5);
    }
}
