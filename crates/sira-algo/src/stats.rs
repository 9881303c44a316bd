//! Distribution helpers and streaming moments.

use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Smallest spread used when evaluating a CDF; smaller values are clamped.
pub const MIN_SPREAD: f64 = 1e-9;

pub fn clamp_spread(spread: f64) -> f64 {
    if spread < MIN_SPREAD {
        MIN_SPREAD
    } else {
        spread
    }
}

pub fn is_degenerate(spread: f64) -> bool {
    spread < MIN_SPREAD
}

/// Normal CDF; infinite means/arguments resolve to 0 or 1.
pub fn normal_cdf(x: f64, mean: f64, std: f64) -> f64 {
    if mean == f64::NEG_INFINITY || x == f64::INFINITY {
        return 1.0;
    }
    if mean == f64::INFINITY || x == f64::NEG_INFINITY {
        return 0.0;
    }
    let z = (x - mean) / clamp_spread(std);
    (0.5 * erfc(-z / SQRT_2)).clamp(0.0, 1.0)
}

/// Lognormal CDF parameterised by median and log-standard-deviation.
pub fn lognormal_cdf(x: f64, median: f64, log_std: f64) -> f64 {
    if x <= 0.0 || median.is_infinite() || median <= 0.0 {
        return 0.0;
    }
    normal_cdf(x.ln(), median.ln(), log_std)
}

/// `num` evenly spaced values over `[start, stop]`, both ends included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num).map(|i| start + i as f64 * step).collect()
        }
    }
}

/// Median with the two middle values averaged for even lengths; `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    })
}

/// Running count/sum/sum-of-squares; merging is associative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    pub count: usize,
    pub sum: f64,
    pub sum_sq: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    pub fn merge(&mut self, other: &RunningStats) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Population standard deviation.
    pub fn std(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self.sum_sq / self.count as f64 - mean * mean;
        var.max(0.0).sqrt()
    }

    /// Standard error of the mean.
    pub fn std_error(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.std() / (self.count as f64).sqrt()
        }
    }
}
