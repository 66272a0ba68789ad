//! Rater weight from meta reputation.

use vouch_core::constants::CONFIDENCE_EVIDENCE_SCALE;

/// `1 + sqrt(n / (n + 10))`: starts near 1, approaches 2 with evidence.
pub fn confidence_multiplier(evidence: f64) -> f64 {
    if !(evidence > 0.0) {
        return 1.0;
    }
    1.0 + (evidence / (evidence + CONFIDENCE_EVIDENCE_SCALE)).sqrt()
}

/// `meta_score · multiplier(n)`, clamped to `[min, max]`.
pub fn weight_from_meta(meta_score: f64, evidence: f64, min: f64, max: f64) -> f64 {
    let raw = meta_score * confidence_multiplier(evidence);
    if raw.is_nan() {
        return min;
    }
    raw.clamp(min, max)
}
