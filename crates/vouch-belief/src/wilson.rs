//! Wilson score interval.

use vouch_core::constants::{Z_95, Z_99};
use vouch_core::error::EngineError;

/// Supported two-sided confidence levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    P95,
    P99,
}

impl ConfidenceLevel {
    /// Parse `0.95` / `0.99` (percent forms `95` / `99` are accepted too).
    pub fn from_level(level: f64) -> Result<Self, EngineError> {
        const EPS: f64 = 1e-9;
        let fraction = if level > 1.0 { level / 100.0 } else { level };
        if (fraction - 0.95).abs() < EPS {
            Ok(Self::P95)
        } else if (fraction - 0.99).abs() < EPS {
            Ok(Self::P99)
        } else {
            Err(EngineError::InvalidConfidence(level))
        }
    }

    pub fn z(self) -> f64 {
        match self {
            Self::P95 => Z_95,
            Self::P99 => Z_99,
        }
    }
}

/// Wilson interval on `n = α + β`, `p = α / n`, clamped to `[0, 1]`.
///
/// Always brackets the point estimate. With no evidence the interval is the
/// whole unit range.
pub fn wilson_interval(alpha: f64, beta: f64, level: ConfidenceLevel) -> (f64, f64) {
    let n = alpha + beta;
    if !(n > 0.0) {
        return (0.0, 1.0);
    }
    let p = alpha / n;
    let z = level.z();
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let spread = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).max(0.0).sqrt() / denom;

    let lower = (center - spread).clamp(0.0, 1.0).min(p);
    let upper = (center + spread).clamp(0.0, 1.0).max(p);
    (lower, upper)
}
