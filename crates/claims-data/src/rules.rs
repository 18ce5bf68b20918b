//! Threshold rules over metric tables.
//!
//! Every rule is a pure filter; an empty input yields an empty flagged set.
//! All comparisons are strict.

use std::collections::HashSet;

use claims_core::models::ClaimId;
use claims_core::thresholds::Thresholds;
use serde::{Deserialize, Serialize};

use crate::aggregator::{aggregate_by, Reduction};
use crate::metrics::{
    ClaimOvercharge, CostVariation, PatientBilling, ProcedureCost, ProviderDenialRate,
};
use crate::store::RecordStore;

/// Billed total of flagged claims for one (provider name, specialty) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverchargingProvider {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub billed_amount: f64,
}

/// Providers whose denial rate exceeds `thresholds.high_denial_rate_pct`.
pub fn high_denial_providers(
    rates: &[ProviderDenialRate],
    thresholds: &Thresholds,
) -> Vec<ProviderDenialRate> {
    rates
        .iter()
        .filter(|r| {
            r.denial_rate
                .is_some_and(|rate| rate > thresholds.high_denial_rate_pct)
        })
        .cloned()
        .collect()
}

/// Patients whose total billed is strictly above `threshold`. Nothing is
/// flagged when the threshold is undefined.
pub fn high_billed_patients(
    patients: &[PatientBilling],
    threshold: Option<f64>,
) -> Vec<PatientBilling> {
    let Some(threshold) = threshold else {
        return Vec::new();
    };
    patients
        .iter()
        .filter(|p| p.total_billed > threshold)
        .cloned()
        .collect()
}

/// Procedures whose largest claim exceeds `unusual_max_to_median` times the
/// median claim.
pub fn unusual_procedures(costs: &[ProcedureCost], thresholds: &Thresholds) -> Vec<ProcedureCost> {
    costs
        .iter()
        .filter(|c| c.max_billed > thresholds.unusual_max_to_median * c.median_billed)
        .cloned()
        .collect()
}

/// Sum the billed amount of over-ratio claims per (provider name,
/// specialty).
///
/// Only the flagged claims contribute to each total. Claims with an
/// unresolved provider are grouped under an absent name and specialty.
pub fn overcharging_providers(
    store: &RecordStore,
    overcharges: &[ClaimOvercharge],
    thresholds: &Thresholds,
) -> Vec<OverchargingProvider> {
    let flagged: HashSet<ClaimId> = overcharges
        .iter()
        .filter(|o| o.overcharge_ratio > thresholds.overcharge_ratio)
        .map(|o| o.claim_id)
        .collect();

    aggregate_by(
        store
            .claims()
            .iter()
            .filter(|c| flagged.contains(&c.claim_id)),
        |c| {
            (
                store.provider_name(c.provider_id),
                store.specialty_of(c.provider_id),
            )
        },
        &[Reduction::Sum],
    )
    .into_iter()
    .filter_map(|row| {
        let (name, specialty) = row.key;
        Some(OverchargingProvider {
            name,
            specialty,
            billed_amount: row.sum?,
        })
    })
    .collect()
}

/// Procedure descriptions whose mean billed exceeds `variability_ratio`
/// times the median. Rows with an undefined ratio are never flagged.
pub fn high_variation_procedures(
    variation: &[CostVariation],
    thresholds: &Thresholds,
) -> Vec<CostVariation> {
    variation
        .iter()
        .filter(|v| {
            v.variability_ratio
                .is_some_and(|ratio| ratio > thresholds.variability_ratio)
        })
        .cloned()
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics;
    use crate::store::fixtures::*;

    fn defaults() -> Thresholds {
        Thresholds::default()
    }

    fn denial_row(id: u64, rate: Option<f64>) -> ProviderDenialRate {
        ProviderDenialRate {
            provider_id: id,
            name: None,
            total_claims: 2,
            denied_claims: 1,
            denial_rate: rate,
        }
    }

    fn billing_row(id: u64, total: f64) -> PatientBilling {
        PatientBilling {
            patient_id: id,
            name: None,
            total_billed: total,
            total_claims: 1,
        }
    }

    // ── high denial ──────────────────────────────────────────────────────────

    #[test]
    fn test_high_denial_provider_two_of_three_flagged() {
        let store = small_store();
        let rates = metrics::provider_denial_rates(&store);
        let flagged = high_denial_providers(&rates, &defaults());

        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].provider_id, 10);
    }

    #[test]
    fn test_high_denial_threshold_is_strict() {
        let rates = vec![
            denial_row(1, Some(50.0)),
            denial_row(2, Some(50.01)),
            denial_row(3, None),
        ];
        let flagged = high_denial_providers(&rates, &defaults());
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].provider_id, 2);
    }

    // ── high billed ──────────────────────────────────────────────────────────

    #[test]
    fn test_high_billed_single_outlier_among_hundred() {
        let rows: Vec<PatientBilling> = (0..100)
            .map(|i| billing_row(i, if i == 42 { 10_000.0 } else { 100.0 }))
            .collect();
        let threshold = metrics::high_billed_threshold(&rows, 0.99);
        let flagged = high_billed_patients(&rows, threshold);

        assert!((threshold.unwrap() - 199.0).abs() < 1e-9);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].patient_id, 42);
    }

    #[test]
    fn test_high_billed_excludes_value_equal_to_threshold() {
        let rows = vec![billing_row(1, 100.0), billing_row(2, 100.0)];
        let threshold = metrics::high_billed_threshold(&rows, 0.99);
        assert_eq!(threshold, Some(100.0));
        assert!(high_billed_patients(&rows, threshold).is_empty());
    }

    #[test]
    fn test_high_billed_undefined_threshold_flags_nothing() {
        assert!(high_billed_patients(&[billing_row(1, 5.0)], None).is_empty());
    }

    // ── unusual / variation ──────────────────────────────────────────────────

    #[test]
    fn test_xray_is_unusual_and_high_variation() {
        let store = small_store();
        let unusual = unusual_procedures(&metrics::procedure_costs(&store), &defaults());
        let variation = high_variation_procedures(&metrics::cost_variation(&store), &defaults());

        assert_eq!(unusual.len(), 1);
        assert_eq!(unusual[0].description.as_deref(), Some("X-Ray"));
        assert_eq!(variation.len(), 1);
        assert_eq!(variation[0].description.as_deref(), Some("X-Ray"));
    }

    #[test]
    fn test_unusual_boundary_not_flagged() {
        let cost = ProcedureCost {
            procedure_id: 1,
            description: None,
            median_billed: 100.0,
            mean_billed: 125.0,
            max_billed: 150.0,
        };
        assert!(unusual_procedures(&[cost], &defaults()).is_empty());
    }

    #[test]
    fn test_variation_without_ratio_not_flagged() {
        let row = CostVariation {
            description: Some("Consult".into()),
            mean: 10.0,
            median: 0.0,
            std: None,
            variability_ratio: None,
        };
        assert!(high_variation_procedures(&[row], &defaults()).is_empty());
    }

    // ── overcharging ─────────────────────────────────────────────────────────

    #[test]
    fn test_overcharging_sums_only_flagged_claims() {
        let store = small_store();
        let overcharges = metrics::claim_overcharges(&store);
        let flagged = overcharging_providers(&store, &overcharges, &defaults());

        // Only claim 4 (500 vs median 100) is above 1.5; Dr. Ng's other
        // claims (40, 60) are left out of the total.
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].name.as_deref(), Some("Dr. Ng"));
        assert_eq!(flagged[0].specialty.as_deref(), Some("Radiology"));
        assert_eq!(flagged[0].billed_amount, 500.0);
    }

    #[test]
    fn test_overcharging_groups_by_name_and_specialty() {
        let store = RecordStore::new(
            vec![],
            vec![
                provider(1, "Dr. Same", "Cardiology"),
                provider(2, "Dr. Same", "Cardiology"),
                provider(3, "Dr. Same", "Oncology"),
            ],
            vec![procedure(9, "MRI")],
            vec![
                claim(1, 1, 1, 9, 10.0, 1.0),
                claim(2, 1, 1, 9, 10.0, 1.0),
                claim(3, 1, 1, 9, 10.0, 1.0),
                claim(4, 1, 1, 9, 100.0, 1.0),
                claim(5, 1, 2, 9, 200.0, 1.0),
                claim(6, 1, 3, 9, 300.0, 1.0),
                claim(7, 1, 1, 9, 10.0, 1.0),
                claim(8, 1, 1, 9, 10.0, 1.0),
            ],
        );
        let overcharges = metrics::claim_overcharges(&store);
        let flagged = overcharging_providers(&store, &overcharges, &defaults());

        // Median is 10: claims 4, 5, 6 are flagged.
        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].specialty.as_deref(), Some("Cardiology"));
        assert_eq!(flagged[0].billed_amount, 300.0);
        assert_eq!(flagged[1].specialty.as_deref(), Some("Oncology"));
        assert_eq!(flagged[1].billed_amount, 300.0);
    }

    // ── empty input ──────────────────────────────────────────────────────────

    #[test]
    fn test_rules_on_empty_store_yield_empty_sets() {
        let store = RecordStore::default();
        let t = defaults();
        assert!(high_denial_providers(&metrics::provider_denial_rates(&store), &t).is_empty());
        let billing = metrics::patient_billing(&store);
        let threshold = metrics::high_billed_threshold(&billing, t.high_billed_quantile);
        assert!(high_billed_patients(&billing, threshold).is_empty());
        assert!(unusual_procedures(&metrics::procedure_costs(&store), &t).is_empty());
        let overcharges = metrics::claim_overcharges(&store);
        assert!(overcharging_providers(&store, &overcharges, &t).is_empty());
        assert!(high_variation_procedures(&metrics::cost_variation(&store), &t).is_empty());
    }
}
