//! Descriptive statistics over the whole claim set.

use claims_core::models::{
    claim_statuses, Claim, ClaimStatus, PatientId, ProcedureId, ProviderId,
};
use claims_core::stats;
use serde::{Deserialize, Serialize};

use crate::aggregator::{aggregate, AggregateRow, GroupBy, GroupKey, Reduction};
use crate::metrics::{self, AgeGroupCost};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientClaims {
    pub patient_id: PatientId,
    pub name: Option<String>,
    pub claims: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderClaims {
    pub provider_id: ProviderId,
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub claims: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureClaims {
    pub procedure_id: ProcedureId,
    pub description: Option<String>,
    pub claims: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: ClaimStatus,
    pub claims: usize,
}

/// Percentage of all claims filed under one specialty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialtyShare {
    pub specialty: Option<String>,
    pub claims: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionBilling {
    pub description: Option<String>,
    pub total_billed: f64,
}

/// Overview figures printed ahead of the anomaly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimsSummary {
    pub total_claims: usize,
    pub total_billed: f64,
    pub total_paid: f64,
    pub mean_billed: Option<f64>,
    pub mean_paid: Option<f64>,
    pub approval_rate: Option<f64>,
    /// Approved then denied, both always present.
    pub status_counts: Vec<StatusCount>,
    pub top_patients: Vec<PatientClaims>,
    pub top_providers: Vec<ProviderClaims>,
    pub top_procedures: Vec<ProcedureClaims>,
    pub top_billed_procedures: Vec<DescriptionBilling>,
    pub specialty_share: Vec<SpecialtyShare>,
    pub age_group_costs: Vec<AgeGroupCost>,
}

/// Build the overview. Each top list holds at most `top_n` rows, ordered by
/// the ranked value descending and then by key ascending.
pub fn summarize(store: &RecordStore, top_n: usize) -> ClaimsSummary {
    let claims = store.claims();
    let billed: Vec<f64> = claims.iter().map(|c| c.billed_amount).collect();
    let paid: Vec<f64> = claims.iter().map(|c| c.paid_amount).collect();

    let top_patients = top_by_count(aggregate(store, GroupBy::Patient, &[]), top_n)
        .filter_map(|row| match row.key {
            GroupKey::Patient(id) => Some(PatientClaims {
                patient_id: id,
                name: store.patient_name(id),
                claims: row.count,
            }),
            _ => None,
        })
        .collect();

    let top_providers = top_by_count(aggregate(store, GroupBy::Provider, &[]), top_n)
        .filter_map(|row| match row.key {
            GroupKey::Provider(id) => Some(ProviderClaims {
                provider_id: id,
                name: store.provider_name(id),
                specialty: store.specialty_of(id),
                claims: row.count,
            }),
            _ => None,
        })
        .collect();

    let top_procedures = top_by_count(aggregate(store, GroupBy::Procedure, &[]), top_n)
        .filter_map(|row| match row.key {
            GroupKey::Procedure(id) => Some(ProcedureClaims {
                procedure_id: id,
                description: store.description_of(id),
                claims: row.count,
            }),
            _ => None,
        })
        .collect();

    ClaimsSummary {
        total_claims: claims.len(),
        total_billed: billed.iter().sum(),
        total_paid: paid.iter().sum(),
        mean_billed: stats::mean(&billed),
        mean_paid: stats::mean(&paid),
        approval_rate: metrics::approval_rate(claims),
        status_counts: status_counts(claims),
        top_patients,
        top_providers,
        top_procedures,
        top_billed_procedures: top_billed_descriptions(store, top_n),
        specialty_share: specialty_share(store),
        age_group_costs: metrics::age_group_costs(store),
    }
}

/// Rows ordered by count descending; aggregate output is already sorted by
/// key, and the stable sort keeps that order among equal counts.
fn top_by_count(mut rows: Vec<AggregateRow>, top_n: usize) -> impl Iterator<Item = AggregateRow> {
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.into_iter().take(top_n)
}

fn top_billed_descriptions(store: &RecordStore, top_n: usize) -> Vec<DescriptionBilling> {
    let totals = aggregate(store, GroupBy::Description, &[Reduction::Sum]);
    let mut rows: Vec<DescriptionBilling> = totals
        .into_iter()
        .filter_map(|row| match row.key {
            GroupKey::Description(description) => Some(DescriptionBilling {
                description,
                total_billed: row.sum?,
            }),
            _ => None,
        })
        .collect();
    rows.sort_by(|a, b| b.total_billed.total_cmp(&a.total_billed));
    rows.truncate(top_n);
    rows
}

fn status_counts(claims: &[Claim]) -> Vec<StatusCount> {
    let statuses = claim_statuses(claims);
    ClaimStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            claims: statuses.values().filter(|s| **s == status).count(),
        })
        .collect()
}

/// Share of claims per specialty. This counts claims, not providers, so a
/// specialty with one busy provider outweighs one with many idle ones.
fn specialty_share(store: &RecordStore) -> Vec<SpecialtyShare> {
    let total = store.claims().len() as f64;
    aggregate(store, GroupBy::Specialty, &[])
        .into_iter()
        .filter_map(|row| match row.key {
            GroupKey::Specialty(specialty) => Some(SpecialtyShare {
                specialty,
                claims: row.count,
                share_pct: stats::rate_pct(row.count as f64, total).unwrap_or(0.0),
            }),
            _ => None,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
