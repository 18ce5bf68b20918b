//! Derived metrics computed from aggregate tables and reference data.
//!
//! Every ratio goes through [`stats::ratio`], so a zero denominator yields
//! `None` instead of infinity or NaN.

use std::collections::BTreeMap;

use claims_core::models::{AgeGroup, Claim, ClaimId, PatientId, ProcedureId, ProviderId};
use claims_core::stats;
use serde::{Deserialize, Serialize};

use crate::aggregator::{aggregate, AggregateRow, GroupBy, GroupKey, Reduction, DENIED};
use crate::store::RecordStore;

// ── Row types ─────────────────────────────────────────────────────────────────

/// Denial statistics for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDenialRate {
    pub provider_id: ProviderId,
    pub name: Option<String>,
    pub total_claims: usize,
    pub denied_claims: usize,
    /// Percentage in `[0, 100]`.
    pub denial_rate: Option<f64>,
}

/// Denial statistics for one procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureDenialRate {
    pub procedure_id: ProcedureId,
    pub description: Option<String>,
    pub total_claims: usize,
    pub denied_claims: usize,
    pub denial_rate: Option<f64>,
}

/// Billing totals for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientBilling {
    pub patient_id: PatientId,
    pub name: Option<String>,
    pub total_billed: f64,
    pub total_claims: usize,
}

/// Billed amount distribution for one procedure id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureCost {
    pub procedure_id: ProcedureId,
    pub description: Option<String>,
    pub median_billed: f64,
    pub mean_billed: f64,
    pub max_billed: f64,
}

/// A claim joined to the median billed amount of its procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimOvercharge {
    pub claim_id: ClaimId,
    pub provider_id: ProviderId,
    pub provider_name: Option<String>,
    pub specialty: Option<String>,
    pub procedure_id: ProcedureId,
    pub billed_amount: f64,
    pub median_cost: f64,
    pub overcharge_ratio: f64,
}

/// Spread of billed amounts for one procedure description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostVariation {
    pub description: Option<String>,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` for a single claim.
    pub std: Option<f64>,
    /// `mean / median`; `None` when the median is zero.
    pub variability_ratio: Option<f64>,
}

/// Total billed per provider specialty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialtyBilling {
    pub specialty: Option<String>,
    pub billed_amount: f64,
}

/// Average billed amount for one age bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGroupCost {
    pub age_group: AgeGroup,
    pub claims: usize,
    /// 0 when no claim falls in the bucket.
    pub mean_billed: f64,
}

// ── Denial rates ──────────────────────────────────────────────────────────────

/// Total and denied claim counts per group, shared by the provider and
/// procedure denial metrics.
fn denial_counts(store: &RecordStore, group_by: GroupBy) -> Vec<AggregateRow> {
    aggregate(store, group_by, &[Reduction::CountWhere(DENIED)])
}

fn denial_rate(row: &AggregateRow) -> Option<f64> {
    stats::rate_pct(row.count_where(DENIED.name) as f64, row.count as f64)
}

/// `denied_claims / total_claims * 100` for every provider with claims.
pub fn provider_denial_rates(store: &RecordStore) -> Vec<ProviderDenialRate> {
    denial_counts(store, GroupBy::Provider)
        .iter()
        .filter_map(|row| match row.key {
            GroupKey::Provider(id) => Some(ProviderDenialRate {
                provider_id: id,
                name: store.provider_name(id),
                total_claims: row.count,
                denied_claims: row.count_where(DENIED.name),
                denial_rate: denial_rate(row),
            }),
            _ => None,
        })
        .collect()
}

/// `denied_claims / total_claims * 100` for every procedure with claims.
pub fn procedure_denial_rates(store: &RecordStore) -> Vec<ProcedureDenialRate> {
    denial_counts(store, GroupBy::Procedure)
        .iter()
        .filter_map(|row| match row.key {
            GroupKey::Procedure(id) => Some(ProcedureDenialRate {
                procedure_id: id,
                description: store.description_of(id),
                total_claims: row.count,
                denied_claims: row.count_where(DENIED.name),
                denial_rate: denial_rate(row),
            }),
            _ => None,
        })
        .collect()
}

// ── Patient billing ───────────────────────────────────────────────────────────

pub fn patient_billing(store: &RecordStore) -> Vec<PatientBilling> {
    aggregate(store, GroupBy::Patient, &[Reduction::Sum])
        .iter()
        .filter_map(|row| match row.key {
            GroupKey::Patient(id) => Some(PatientBilling {
                patient_id: id,
                name: store.patient_name(id),
                total_billed: row.sum?,
                total_claims: row.count,
            }),
            _ => None,
        })
        .collect()
}

/// The `quantile` of per-patient total billed, by linear interpolation over
/// the full distribution. `None` when there are no patients with claims.
pub fn high_billed_threshold(patients: &[PatientBilling], quantile: f64) -> Option<f64> {
    let totals: Vec<f64> = patients.iter().map(|p| p.total_billed).collect();
    stats::quantile(&stats::sorted(&totals), quantile)
}

// ── Procedure costs ───────────────────────────────────────────────────────────

pub fn procedure_costs(store: &RecordStore) -> Vec<ProcedureCost> {
    aggregate(
        store,
        GroupBy::Procedure,
        &[Reduction::Median, Reduction::Mean, Reduction::Max],
    )
    .iter()
    .filter_map(|row| match row.key {
        GroupKey::Procedure(id) => Some(ProcedureCost {
            procedure_id: id,
            description: store.description_of(id),
            median_billed: row.median?,
            mean_billed: row.mean?,
            max_billed: row.max?,
        }),
        _ => None,
    })
    .collect()
}

/// Median billed amount per procedure id over all claims.
pub fn procedure_medians(store: &RecordStore) -> BTreeMap<ProcedureId, f64> {
    aggregate(store, GroupBy::Procedure, &[Reduction::Median])
        .into_iter()
        .filter_map(|row| match row.key {
            GroupKey::Procedure(id) => row.median.map(|m| (id, m)),
            _ => None,
        })
        .collect()
}

// ── Overcharge ratio ──────────────────────────────────────────────────────────

/// Join each claim to its procedure's median billed amount and compute
/// `billed / median`.
///
/// Claims whose procedure median is zero have no defined ratio and are left
/// out.
pub fn claim_overcharges(store: &RecordStore) -> Vec<ClaimOvercharge> {
    let medians = procedure_medians(store);
    store
        .claims()
        .iter()
        .filter_map(|claim| overcharge_for(store, &medians, claim))
        .collect()
}

fn overcharge_for(
    store: &RecordStore,
    medians: &BTreeMap<ProcedureId, f64>,
    claim: &Claim,
) -> Option<ClaimOvercharge> {
    let median_cost = *medians.get(&claim.procedure_id)?;
    let overcharge_ratio = stats::ratio(claim.billed_amount, median_cost)?;
    Some(ClaimOvercharge {
        claim_id: claim.claim_id,
        provider_id: claim.provider_id,
        provider_name: store.provider_name(claim.provider_id),
        specialty: store.specialty_of(claim.provider_id),
        procedure_id: claim.procedure_id,
        billed_amount: claim.billed_amount,
        median_cost,
        overcharge_ratio,
    })
}

// ── Cost variability ──────────────────────────────────────────────────────────

/// Mean, median, std and `mean / median` per procedure description.
pub fn cost_variation(store: &RecordStore) -> Vec<CostVariation> {
    aggregate(
        store,
        GroupBy::Description,
        &[Reduction::Mean, Reduction::Median, Reduction::Std],
    )
    .into_iter()
    .filter_map(|row| {
        let mean = row.mean?;
        let median = row.median?;
        match row.key {
            GroupKey::Description(description) => Some(CostVariation {
                description,
                mean,
                median,
                std: row.std,
                variability_ratio: stats::ratio(mean, median),
            }),
            _ => None,
        }
    })
    .collect()
}

// ── Specialty billing ─────────────────────────────────────────────────────────

pub fn specialty_billing(store: &RecordStore) -> Vec<SpecialtyBilling> {
    aggregate(store, GroupBy::Specialty, &[Reduction::Sum])
        .into_iter()
        .filter_map(|row| match row.key {
            GroupKey::Specialty(specialty) => Some(SpecialtyBilling {
                specialty,
                billed_amount: row.sum?,
            }),
            _ => None,
        })
        .collect()
}

// ── Overall approval rate ─────────────────────────────────────────────────────

/// `sum(paid) / sum(billed) * 100`; `None` when nothing was billed.
pub fn approval_rate(claims: &[Claim]) -> Option<f64> {
    let paid: f64 = claims.iter().map(|c| c.paid_amount).sum();
    let billed: f64 = claims.iter().map(|c| c.billed_amount).sum();
    stats::rate_pct(paid, billed)
}

// ── Age groups ────────────────────────────────────────────────────────────────

/// Average billed amount per age bucket, always one row per bucket in
/// ascending order. Claims whose patient is unknown or has no age are not
/// counted in any bucket.
pub fn age_group_costs(store: &RecordStore) -> Vec<AgeGroupCost> {
    let mut billed: BTreeMap<AgeGroup, Vec<f64>> = BTreeMap::new();
    for claim in store.claims() {
        let Some(age) = store.patient(claim.patient_id).and_then(|p| p.age) else {
            continue;
        };
        billed
            .entry(AgeGroup::for_age(age))
            .or_default()
            .push(claim.billed_amount);
    }

    AgeGroup::ALL
        .iter()
        .map(|&group| {
            let amounts = billed.get(&group).map(Vec::as_slice).unwrap_or_default();
            AgeGroupCost {
                age_group: group,
                claims: amounts.len(),
                mean_billed: stats::mean(amounts).unwrap_or(0.0),
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
