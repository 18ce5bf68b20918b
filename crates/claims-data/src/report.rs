//! Report assembly: every flagged set and metric table under a stable name.

use std::collections::BTreeMap;

use claims_core::thresholds::Thresholds;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::{
    self, CostVariation, PatientBilling, ProcedureCost, ProcedureDenialRate, ProviderDenialRate,
    SpecialtyBilling,
};
use crate::rules::{self, OverchargingProvider};
use crate::store::RecordStore;

/// Section names in report order, matching the serialized field names.
pub const SECTION_NAMES: [&str; 9] = [
    "high_denial_providers",
    "high_billed_patients",
    "unusual_procedures",
    "overcharging_providers",
    "specialty_billing",
    "high_variation_procedures",
    "provider_denial_rates",
    "procedure_denial_rates",
    "scalars",
];

/// Run-wide numbers reported next to the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportScalars {
    /// Overall `paid / billed` percentage; `None` when nothing was billed.
    pub approval_rate: Option<f64>,
    /// Quantile of per-patient total billed used by the high-billed rule.
    pub high_billed_threshold: Option<f64>,
}

/// All result sets of one audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub high_denial_providers: Vec<ProviderDenialRate>,
    pub high_billed_patients: Vec<PatientBilling>,
    pub unusual_procedures: Vec<ProcedureCost>,
    pub overcharging_providers: Vec<OverchargingProvider>,
    pub specialty_billing: Vec<SpecialtyBilling>,
    pub high_variation_procedures: Vec<CostVariation>,
    pub provider_denial_rates: Vec<ProviderDenialRate>,
    /// Reported in full; no threshold is applied to procedures.
    pub procedure_denial_rates: Vec<ProcedureDenialRate>,
    pub scalars: ReportScalars,
}

impl AuditReport {
    /// Row count per table section, keyed by section name. `scalars` is
    /// not a table and is left out.
    pub fn row_counts(&self) -> BTreeMap<&'static str, usize> {
        let counts = [
            self.high_denial_providers.len(),
            self.high_billed_patients.len(),
            self.unusual_procedures.len(),
            self.overcharging_providers.len(),
            self.specialty_billing.len(),
            self.high_variation_procedures.len(),
            self.provider_denial_rates.len(),
            self.procedure_denial_rates.len(),
        ];
        SECTION_NAMES.iter().copied().zip(counts).collect()
    }
}

/// Compute every metric, apply every rule, and collect the results.
pub fn build_report(store: &RecordStore, thresholds: &Thresholds) -> AuditReport {
    let provider_denial_rates = metrics::provider_denial_rates(store);
    let procedure_denial_rates = metrics::procedure_denial_rates(store);
    let patient_billing = metrics::patient_billing(store);
    let procedure_costs = metrics::procedure_costs(store);
    let overcharges = metrics::claim_overcharges(store);
    let variation = metrics::cost_variation(store);

    let high_billed_threshold =
        metrics::high_billed_threshold(&patient_billing, thresholds.high_billed_quantile);
    debug!("High-billed threshold: {:?}", high_billed_threshold);

    AuditReport {
        high_denial_providers: rules::high_denial_providers(&provider_denial_rates, thresholds),
        high_billed_patients: rules::high_billed_patients(&patient_billing, high_billed_threshold),
        unusual_procedures: rules::unusual_procedures(&procedure_costs, thresholds),
        overcharging_providers: rules::overcharging_providers(store, &overcharges, thresholds),
        specialty_billing: metrics::specialty_billing(store),
        high_variation_procedures: rules::high_variation_procedures(&variation, thresholds),
        provider_denial_rates,
        procedure_denial_rates,
        scalars: ReportScalars {
            approval_rate: metrics::approval_rate(store.claims()),
            high_billed_threshold,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::*;

    #[test]
    fn test_build_report_small_store() {
        let store = small_store();
        let report = build_report(&store, &Thresholds::default());

        assert_eq!(report.high_denial_providers.len(), 1);
        assert_eq!(report.unusual_procedures.len(), 1);
        assert_eq!(report.overcharging_providers.len(), 1);
        assert_eq!(report.high_variation_procedures.len(), 1);
        assert_eq!(report.specialty_billing.len(), 2);
        assert_eq!(report.provider_denial_rates.len(), 2);
        assert_eq!(report.procedure_denial_rates.len(), 2);
        // Two patients: 240 and 660 → threshold 240 + 0.99 * 420.
        let threshold = report.scalars.high_billed_threshold.unwrap();
        assert!((threshold - 655.8).abs() < 1e-9);
        assert_eq!(report.high_billed_patients.len(), 1);
        assert_eq!(report.high_billed_patients[0].patient_id, 2);
    }

    #[test]
    fn test_procedure_denial_rates_are_unfiltered() {
        let store = small_store();
        let report = build_report(&store, &Thresholds::default());
        // Blood Panel is 50% denied, X-Ray 50%: neither exceeds 50 but both
        // are reported.
        assert!(report
            .procedure_denial_rates
            .iter()
            .all(|r| r.denial_rate == Some(50.0)));
    }

    #[test]
    fn test_empty_store_yields_empty_sections() {
        let report = build_report(&RecordStore::default(), &Thresholds::default());
        assert!(report.row_counts().values().all(|&n| n == 0));
        assert_eq!(report.scalars.approval_rate, None);
        assert_eq!(report.scalars.high_billed_threshold, None);
    }

    #[test]
    fn test_report_serializes_under_section_names() {
        let report = build_report(&small_store(), &Thresholds::default());
        let value = serde_json::to_value(&report).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), SECTION_NAMES.len());
        for name in SECTION_NAMES {
            assert!(object.contains_key(name), "missing section {name}");
        }
    }

    #[test]
    fn test_row_counts_cover_table_sections() {
        let report = build_report(&small_store(), &Thresholds::default());
        let counts = report.row_counts();
        assert_eq!(counts.len(), 8);
        assert!(!counts.contains_key("scalars"));
        assert_eq!(counts["provider_denial_rates"], 2);
    }

    #[test]
    fn test_custom_thresholds_change_flags() {
        let store = small_store();
        let strict = Thresholds {
            high_denial_rate_pct: 20.0,
            variability_ratio: 3.0,
            ..Thresholds::default()
        };
        let report = build_report(&store, &strict);
        assert_eq!(report.high_denial_providers.len(), 2);
        assert!(report.high_variation_procedures.is_empty());
    }
}
