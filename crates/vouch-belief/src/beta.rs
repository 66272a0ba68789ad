//! Beta distribution moments and the adaptive decay curve.

use vouch_core::constants::MAX_BETA_VARIANCE;

/// Mean of Beta(α, β). Zero for a degenerate distribution.
pub fn mean(alpha: f64, beta: f64) -> f64 {
    let n = alpha + beta;
    if n <= 0.0 { 0.0 } else { alpha / n }
}

/// Variance of Beta(α, β): `αβ / ((α+β)² (α+β+1))`.
pub fn variance(alpha: f64, beta: f64) -> f64 {
    let n = alpha + beta;
    if n <= 0.0 {
        return 0.0;
    }
    alpha * beta / (n * n * (n + 1.0))
}

/// Variance relative to Beta(1, 1), clamped to `[0, 1]`.
pub fn normalized_variance(alpha: f64, beta: f64) -> f64 {
    (variance(alpha, beta) / MAX_BETA_VARIANCE).clamp(0.0, 1.0)
}

/// Per-period retention blended with uncertainty.
///
/// `1 - (1 - λ)(1 + v)` where `v` is the normalized variance: a settled
/// belief loses `1 - λ` per period, a maximally uncertain one twice that.
pub fn adaptive_rate(decay_rate: f64, alpha: f64, beta: f64) -> f64 {
    let loss = (1.0 - decay_rate) * (1.0 + normalized_variance(alpha, beta));
    (1.0 - loss).clamp(0.0, 1.0)
}

/// `rate ^ (elapsed / period)`. Negative elapsed time counts as zero.
pub fn decay_factor(rate: f64, elapsed_secs: i64, period_secs: i64) -> f64 {
    if elapsed_secs <= 0 || period_secs <= 0 {
        return 1.0;
    }
    let periods = elapsed_secs as f64 / period_secs as f64;
    rate.clamp(0.0, 1.0).powf(periods)
}

/// Scale both parameters by `factor`, never dropping below the prior.
pub fn scale_to_floor(alpha: f64, beta: f64, factor: f64, alpha0: f64, beta0: f64) -> (f64, f64) {
    ((alpha * factor).max(alpha0), (beta * factor).max(beta0))
}
