//! Hazard sweep and restoration time axes.

use crate::stats::linspace;
use serde::{Deserialize, Serialize};
use sira_core::{SiraError, SiraResult};

/// Evenly spaced hazard intensities, `min` and `max` included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl HazardRange {
    pub fn new(min: f64, max: f64, step: f64) -> SiraResult<Self> {
        let range = Self { min, max, step };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> SiraResult<()> {
        if !(self.step > 0.0) {
            return Err(SiraError::Validation(format!(
                "hazard step must be positive, got {}",
                self.step
            )));
        }
        if !(self.min >= 0.0) || !(self.max >= self.min) {
            return Err(SiraError::Validation(format!(
                "hazard range [{}, {}] is invalid",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        ((self.max - self.min) / self.step).round() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn levels(&self) -> Vec<f64> {
        linspace(self.min, self.max, self.len())
    }
}

/// Restoration time axis `0, step, ..., upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestorationAxis {
    pub upper: f64,
    pub step: f64,
}

impl RestorationAxis {
    pub fn new(upper: f64, step: f64) -> SiraResult<Self> {
        if !(step > 0.0) || !(upper > 0.0) {
            return Err(SiraError::Validation(format!(
                "restoration axis needs positive upper bound and step, got ({upper}, {step})"
            )));
        }
        Ok(Self { upper, step })
    }

    pub fn times(&self) -> Vec<f64> {
        let num = (self.upper / self.step).round() as usize + 1;
        linspace(0.0, self.upper, num)
    }
}
