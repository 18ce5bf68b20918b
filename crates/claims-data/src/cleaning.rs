//! Data preparation applied between ingestion and the audit engine.
//!
//! Establishes the engine's preconditions: unique ids, non-null and
//! non-negative billed and paid amounts.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use claims_core::models::{Claim, Patient, Procedure, Provider};
use claims_core::stats;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::reader::{RawClaim, RawTables, TableRows, CLAIMS, PATIENTS, PROCEDURES, PROVIDERS};

// ── Public types ──────────────────────────────────────────────────────────────

/// The four cleaned tables. `None` still marks a table that was absent on
/// disk; the record store decides whether that is fatal.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub patients: Option<Vec<Patient>>,
    pub providers: Option<Vec<Provider>>,
    pub procedures: Option<Vec<Procedure>>,
    pub claims: Option<Vec<Claim>>,
}

/// What cleaning found and fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Claims whose billed amount was missing.
    pub missing_billed: usize,
    /// Value used to fill missing billed amounts, if any were missing.
    pub billed_fill_value: Option<f64>,
    /// Claims whose billed amount was negative and replaced by its absolute value.
    pub negative_billed_fixed: usize,
    /// Claims whose paid amount was missing and set to zero.
    pub missing_paid: usize,
    /// Claims whose paid amount was negative and replaced by its absolute value.
    pub negative_paid_fixed: usize,
    pub duplicate_patients: usize,
    pub duplicate_providers: usize,
    pub duplicate_procedures: usize,
    pub duplicate_claims: usize,
    /// Rows identical in every field to an earlier row of the same table.
    /// These are a subset of the duplicate ids above.
    pub exact_duplicate_rows: usize,
    /// Lines skipped because they could not be parsed, per table.
    pub malformed_lines: BTreeMap<String, usize>,
}

impl CleaningReport {
    /// Total number of values changed or rows dropped.
    pub fn total_fixes(&self) -> usize {
        self.missing_billed
            + self.negative_billed_fixed
            + self.missing_paid
            + self.negative_paid_fixed
            + self.duplicate_patients
            + self.duplicate_providers
            + self.duplicate_procedures
            + self.duplicate_claims
    }

    pub fn total_malformed(&self) -> usize {
        self.malformed_lines.values().sum()
    }

    fn note_malformed(&mut self, table: &str, lines: usize) {
        if lines > 0 {
            self.malformed_lines.insert(table.to_string(), lines);
        }
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Clean raw tables into the form the engine expects.
///
/// * Duplicate ids are dropped, keeping the first occurrence.
/// * A missing billed amount is filled with the mean of the present billed
///   amounts (before sign correction), or 0 when none are present.
/// * Negative billed and paid amounts are replaced by their absolute value.
/// * A missing paid amount becomes 0, i.e. a denial.
pub fn clean(raw: RawTables) -> (Tables, CleaningReport) {
    let mut report = CleaningReport::default();

    let patients = raw.patients.map(|t| {
        report.note_malformed(PATIENTS, t.malformed_lines);
        report.exact_duplicate_rows += count_exact_duplicates(&t.rows, |p| {
            (p.patient_id, p.name.clone(), p.age)
        });
        let (rows, dropped) = dedup_by_id(t.rows, |p| p.patient_id);
        report.duplicate_patients = dropped;
        rows
    });
    let providers = raw.providers.map(|t| {
        report.note_malformed(PROVIDERS, t.malformed_lines);
        report.exact_duplicate_rows += count_exact_duplicates(&t.rows, |p| {
            (p.provider_id, p.name.clone(), p.specialty.clone())
        });
        let (rows, dropped) = dedup_by_id(t.rows, |p| p.provider_id);
        report.duplicate_providers = dropped;
        rows
    });
    let procedures = raw.procedures.map(|t| {
        report.note_malformed(PROCEDURES, t.malformed_lines);
        report.exact_duplicate_rows += count_exact_duplicates(&t.rows, |p| {
            (p.procedure_id, p.description.clone())
        });
        let (rows, dropped) = dedup_by_id(t.rows, |p| p.procedure_id);
        report.duplicate_procedures = dropped;
        rows
    });
    let claims = raw.claims.map(|t| clean_claims(t, &mut report));

    if report.total_fixes() > 0 {
        info!(
            "Cleaning fixed {} values/rows ({} missing billed, {} negative billed, {} duplicate claims)",
            report.total_fixes(),
            report.missing_billed,
            report.negative_billed_fixed,
            report.duplicate_claims
        );
    }

    (
        Tables {
            patients,
            providers,
            procedures,
            claims,
        },
        report,
    )
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn clean_claims(table: TableRows<RawClaim>, report: &mut CleaningReport) -> Vec<Claim> {
    report.note_malformed(CLAIMS, table.malformed_lines);
    // Amounts compare by bit pattern so the row key is hashable.
    report.exact_duplicate_rows += count_exact_duplicates(&table.rows, |c| {
        (
            c.claim_id,
            c.patient_id,
            c.provider_id,
            c.procedure_id,
            c.billed_amount.map(f64::to_bits),
            c.paid_amount.map(f64::to_bits),
        )
    });
    let (rows, dropped) = dedup_by_id(table.rows, |c| c.claim_id);
    report.duplicate_claims = dropped;

    let present: Vec<f64> = rows.iter().filter_map(|c| c.billed_amount).collect();
    report.missing_billed = rows.len() - present.len();
    let fill = stats::mean(&present).unwrap_or(0.0);
    if report.missing_billed > 0 {
        report.billed_fill_value = Some(fill);
        debug!("Filling {} missing billed amounts with {fill}", report.missing_billed);
    }

    rows.into_iter()
        .map(|raw| {
            let billed = raw.billed_amount.unwrap_or(fill);
            if billed < 0.0 {
                report.negative_billed_fixed += 1;
            }
            let paid = match raw.paid_amount {
                Some(p) => {
                    if p < 0.0 {
                        report.negative_paid_fixed += 1;
                    }
                    p.abs()
                }
                // A claim with no recorded payment counts as denied.
                None => {
                    report.missing_paid += 1;
                    0.0
                }
            };
            Claim {
                claim_id: raw.claim_id,
                patient_id: raw.patient_id,
                provider_id: raw.provider_id,
                procedure_id: raw.procedure_id,
                billed_amount: billed.abs(),
                paid_amount: paid,
            }
        })
        .collect()
}

/// Number of rows whose full key already appeared earlier in `rows`.
fn count_exact_duplicates<T, K: Eq + Hash>(rows: &[T], key: impl Fn(&T) -> K) -> usize {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.iter().filter(|r| !seen.insert(key(r))).count()
}

/// Keep the first row for each id. Returns the kept rows (original order)
/// and how many were dropped.
fn dedup_by_id<T, K: Eq + Hash>(rows: Vec<T>, id: impl Fn(&T) -> K) -> (Vec<T>, usize) {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<T> = rows.into_iter().filter(|r| seen.insert(id(r))).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
