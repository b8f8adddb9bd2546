//! Tunable scheduler parameters.
//!
//! The weight vector follows the FSRS-4.5 layout (17 weights); `fsrs` converts
//! it to its current model when the scheduler is built. Every other knob
//! the scheduler uses lives here too so a caller can inject a complete,
//! validated parameter set.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// FSRS-4.5 default weights.
pub const DEFAULT_WEIGHTS: [f64; 17] = [
  0.4872, 1.4003, 3.7145, 13.8206, 5.1618, 1.2298, 0.8975, 0.031, 1.6474, 0.1367, 1.0461, 2.1072,
  0.0793, 0.3246, 1.587, 0.2272, 2.8755,
];

pub const DEFAULT_REQUEST_RETENTION: f64 = 0.9;
pub const DEFAULT_MAXIMUM_INTERVAL: u32 = 36500;

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lower bound for stability; keeps retrievability finite.
pub const MIN_STABILITY: f64 = 0.01;

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerParams {
  /// w[0..=3] initial stability per rating, w[4..=7] difficulty, w[8..=14]
  /// stability growth/forgetting, w[15] hard factor, w[16] easy factor.
  pub weights: [f64; 17],
  /// Target recall probability at the due date.
  pub request_retention: f64,
  /// Interval cap in days.
  pub maximum_interval: u32,
  /// Interval after "again", in days.
  pub again_interval: u32,
  /// Multiplier applied to stability for the "hard" interval.
  pub hard_interval: f64,
  /// Extra interval multiplier for "easy" on top of its stability gain.
  pub easy_bonus: f64,
  /// Relative jitter applied to good/easy intervals.
  pub fuzz_factor: f64,
}

impl Default for SchedulerParams {
  fn default() -> Self {
    Self {
      weights: DEFAULT_WEIGHTS,
      request_retention: DEFAULT_REQUEST_RETENTION,
      maximum_interval: DEFAULT_MAXIMUM_INTERVAL,
      again_interval: 1,
      hard_interval: 1.0,
      easy_bonus: 1.3,
      fuzz_factor: 0.05,
    }
  }
}

impl SchedulerParams {
  /// Stability a card is reset to after "again".
  pub fn initial_stability(&self) -> f64 {
    self.weights[0]
  }

  pub fn hard_factor(&self) -> f64 {
    self.weights[15]
  }

  pub fn easy_factor(&self) -> f64 {
    self.weights[16]
  }

  /// Reject parameter sets the scheduler cannot keep in range.
  pub fn validate(&self) -> Result<(), Error> {
    if let Some(i) = self.weights.iter().position(|w| !w.is_finite()) {
      return Err(invalid(&format!("weights[{}]", i), "must be finite"));
    }
    if let Some(i) = self.weights[..4].iter().position(|w| *w <= 0.0) {
      return Err(invalid(&format!("weights[{}]", i), "initial stability must be > 0"));
    }
    if !(0.0..=1.0).contains(&self.weights[7]) {
      return Err(invalid("weights[7]", "mean reversion must be within [0, 1]"));
    }
    if !(self.hard_factor() > 0.0 && self.hard_factor() <= 1.0) {
      return Err(invalid("weights[15]", "hard factor must be within (0, 1]"));
    }
    if self.easy_factor() < 1.0 {
      return Err(invalid("weights[16]", "easy factor must be >= 1"));
    }
    if !(self.request_retention > 0.0 && self.request_retention < 1.0) {
      return Err(invalid("request_retention", "must be within (0, 1)"));
    }
    if self.maximum_interval < 1 {
      return Err(invalid("maximum_interval", "must be >= 1"));
    }
    if self.again_interval < 1 || self.again_interval > self.maximum_interval {
      return Err(invalid("again_interval", "must be within [1, maximum_interval]"));
    }
    if !(self.hard_interval.is_finite() && self.hard_interval > 0.0) {
      return Err(invalid("hard_interval", "must be > 0"));
    }
    if !(self.easy_bonus.is_finite() && self.easy_bonus >= 1.0) {
      return Err(invalid("easy_bonus", "must be >= 1"));
    }
    if !(0.0..0.5).contains(&self.fuzz_factor) {
      return Err(invalid("fuzz_factor", "must be within [0, 0.5)"));
    }
    Ok(())
  }
}

fn invalid(name: &str, reason: &str) -> Error {
  Error::InvalidParams(name.to_string(), reason.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_are_valid() {
    assert!(SchedulerParams::default().validate().is_ok());
  }

  #[test]
  fn test_initial_stability_is_w0() {
    let params = SchedulerParams::default();
    assert!((params.initial_stability() - DEFAULT_WEIGHTS[0]).abs() < f64::EPSILON);
  }

  #[test]
  fn test_rejects_zero_maximum_interval() {
    let params = SchedulerParams { maximum_interval: 0, ..Default::default() };
    let err = params.validate().unwrap_err();
    assert!(matches!(err, Error::InvalidParams(ref name, _) if name == "maximum_interval"));
  }

  #[test]
  fn test_rejects_again_interval_above_cap() {
    let params = SchedulerParams {
      maximum_interval: 10,
      again_interval: 11,
      ..Default::default()
    };
    assert!(params.validate().is_err());
  }

  #[test]
  fn test_rejects_retention_bounds() {
    for retention in [0.0, 1.0, -0.5, f64::NAN] {
      let params = SchedulerParams { request_retention: retention, ..Default::default() };
      assert!(params.validate().is_err(), "retention {} accepted", retention);
    }
  }

  #[test]
  fn test_rejects_non_finite_weight() {
    let mut params = SchedulerParams::default();
    params.weights[9] = f64::INFINITY;
    let err = params.validate().unwrap_err();
    assert!(err.to_string().contains("weights[9]"));
  }

  #[test]
  fn test_rejects_inverted_rating_factors() {
    let mut params = SchedulerParams::default();
    params.weights[15] = 1.5;
    assert!(params.validate().is_err());

    let mut params = SchedulerParams::default();
    params.weights[16] = 0.5;
    assert!(params.validate().is_err());
  }

  #[test]
  fn test_rejects_large_fuzz() {
    let params = SchedulerParams { fuzz_factor: 0.5, ..Default::default() };
    assert!(params.validate().is_err());
  }

  #[test]
  fn test_toml_partial_override() {
    let params: SchedulerParams = toml::from_str("request_retention = 0.85\nmaximum_interval = 365").unwrap();
    assert!((params.request_retention - 0.85).abs() < f64::EPSILON);
    assert_eq!(params.maximum_interval, 365);
    assert_eq!(params.weights, DEFAULT_WEIGHTS);
  }
}
