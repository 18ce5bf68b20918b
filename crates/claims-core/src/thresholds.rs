use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Policy constants ──────────────────────────────────────────────────────────

/// Providers whose denial rate (percent) is strictly above this are flagged.
pub const HIGH_DENIAL_RATE_PCT: f64 = 50.0;

/// Quantile of per-patient total billed above which a patient is flagged.
pub const HIGH_BILLED_QUANTILE: f64 = 0.99;

/// A procedure is unusual when its max billed exceeds this multiple of its
/// median billed.
pub const UNUSUAL_MAX_TO_MEDIAN: f64 = 1.5;

/// A claim is an overcharge when billed / procedure median exceeds this.
pub const OVERCHARGE_RATIO: f64 = 1.5;

/// A procedure has high cost variability when mean / median exceeds this.
pub const VARIABILITY_RATIO: f64 = 1.3;

// ── Thresholds ────────────────────────────────────────────────────────────────

/// Fixed, explainable thresholds applied by the anomaly rules.
///
/// None of these are derived from the data distribution except through the
/// quantile, whose *level* is fixed here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub high_denial_rate_pct: f64,
    pub high_billed_quantile: f64,
    pub unusual_max_to_median: f64,
    pub overcharge_ratio: f64,
    pub variability_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_denial_rate_pct: HIGH_DENIAL_RATE_PCT,
            high_billed_quantile: HIGH_BILLED_QUANTILE,
            unusual_max_to_median: UNUSUAL_MAX_TO_MEDIAN,
            overcharge_ratio: OVERCHARGE_RATIO,
            variability_ratio: VARIABILITY_RATIO,
        }
    }
}

impl Thresholds {
    /// Load thresholds from a JSON file. Keys that are absent keep their
    /// default value. The result is validated before it is returned.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AuditError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let thresholds: Thresholds = serde_json::from_str(&content)?;
        thresholds.validate()?;
        tracing::debug!("Loaded thresholds from {}: {:?}", path.display(), thresholds);
        Ok(thresholds)
    }

    /// Reject negative or non-finite multipliers and a quantile outside
    /// `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let multipliers = [
            ("high_denial_rate_pct", self.high_denial_rate_pct),
            ("unusual_max_to_median", self.unusual_max_to_median),
            ("overcharge_ratio", self.overcharge_ratio),
            ("variability_ratio", self.variability_ratio),
        ];
        for (name, value) in multipliers {
            if !value.is_finite() || value < 0.0 {
                return Err(AuditError::InvalidThreshold(format!("{name} = {value}")));
            }
        }
        let q = self.high_billed_quantile;
        if !(0.0..=1.0).contains(&q) {
            return Err(AuditError::InvalidThreshold(format!(
                "high_billed_quantile = {q} (expected 0..=1)"
            )));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
