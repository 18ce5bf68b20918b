//! Top-level audit pipeline.
//!
//! Orchestrates loading, cleaning, summary statistics and anomaly rules,
//! returning an [`AuditOutcome`] ready for presentation.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use claims_core::error::Result;
use claims_core::thresholds::Thresholds;
use tracing::{debug, info};

use crate::cleaning::{clean, CleaningReport};
use crate::reader::load_tables;
use crate::report::{build_report, AuditReport};
use crate::store::RecordStore;
use crate::summary::{summarize, ClaimsSummary};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuditMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub claims_processed: usize,
    pub patients: usize,
    pub providers: usize,
    pub procedures: usize,
    /// Claims with at least one reference that did not resolve.
    pub unresolved_claims: usize,
    /// Row count of every table section in the report.
    pub section_rows: BTreeMap<String, usize>,
    pub thresholds: Thresholds,
    /// Wall-clock seconds spent on summary and rules.
    pub elapsed_seconds: f64,
}

/// The complete output of one audit run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuditOutcome {
    pub summary: ClaimsSummary,
    pub report: AuditReport,
    /// Present when the run started from files on disk.
    pub cleaning: Option<CleaningReport>,
    pub metadata: AuditMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the summary and every anomaly rule over an already built store.
pub fn run_audit(store: &RecordStore, thresholds: &Thresholds, top_n: usize) -> AuditOutcome {
    let start = std::time::Instant::now();

    let summary = summarize(store, top_n);
    let report = build_report(store, thresholds);

    let section_rows = report
        .row_counts()
        .into_iter()
        .map(|(name, rows)| (name.to_string(), rows))
        .collect();

    let metadata = AuditMetadata {
        generated_at: Utc::now().to_rfc3339(),
        claims_processed: store.claims().len(),
        patients: store.patients().len(),
        providers: store.providers().len(),
        procedures: store.procedures().len(),
        unresolved_claims: store.unresolved_claims(),
        section_rows,
        thresholds: *thresholds,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };

    for (name, rows) in &metadata.section_rows {
        debug!("Section {name}: {rows} rows");
    }
    info!(
        "Audited {} claims: {} high-denial providers, {} high-billed patients, {} overcharging providers",
        metadata.claims_processed,
        report.high_denial_providers.len(),
        report.high_billed_patients.len(),
        report.overcharging_providers.len()
    );

    AuditOutcome {
        summary,
        report,
        cleaning: None,
        metadata,
    }
}

/// Load the four tables from `data_path`, clean them, and run the audit.
///
/// Fails when the directory is missing or any table is absent.
pub fn audit_directory(
    data_path: &Path,
    thresholds: &Thresholds,
    top_n: usize,
) -> Result<AuditOutcome> {
    let raw = load_tables(data_path)?;
    let (tables, cleaning) = clean(raw);
    let store = RecordStore::from_tables(tables)?;

    let mut outcome = run_audit(&store, thresholds, top_n);
    outcome.cleaning = Some(cleaning);
    Ok(outcome)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::small_store;
    use claims_core::error::AuditError;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_jsonl(dir: &Path, name: &str, lines: &[String]) {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    fn claim_line(
        id: u64,
        patient: u64,
        provider: u64,
        procedure: u64,
        billed: &str,
        paid: &str,
    ) -> String {
        format!(
            r#"{{"claim_id": {id}, "patient_id": {patient}, "provider_id": {provider}, "procedure_id": {procedure}, "billed_amount": {billed}, "paid_amount": {paid}}}"#
        )
    }

    fn write_dataset(dir: &Path) {
        write_jsonl(
            dir,
            "patients.jsonl",
            &[
                r#"{"patient_id": 1, "name": "Ada", "age": 34}"#.to_string(),
                r#"{"patient_id": 2, "name": "Bo", "age": 72}"#.to_string(),
            ],
        );
        write_jsonl(
            dir,
            "providers.jsonl",
            &[
                r#"{"provider_id": 10, "name": "Dr. Hale", "specialty": "Cardiology"}"#.to_string(),
                r#"{"provider_id": 20, "name": "Dr. Ng", "specialty": "Radiology"}"#.to_string(),
            ],
        );
        write_jsonl(
            dir,
            "procedures.jsonl",
            &[
                r#"{"procedure_id": 100, "description": "X-Ray"}"#.to_string(),
                r#"{"procedure_id": 200, "description": "Blood Panel"}"#.to_string(),
            ],
        );
        write_jsonl(
            dir,
            "claims.jsonl",
            &[
                claim_line(1, 1, 10, 100, "100", "0"),
                claim_line(2, 1, 10, 100, "100", "null"),
                claim_line(3, 2, 10, 100, "100", "50"),
                claim_line(4, 2, 20, 100, "-500", "400"),
                claim_line(5, 1, 20, 200, "40", "40"),
                claim_line(6, 2, 20, 200, "60", "0"),
                claim_line(6, 2, 20, 200, "9999", "0"),
            ],
        );
    }

    // ── run_audit ─────────────────────────────────────────────────────────────

    #[test]
    fn test_run_audit_metadata_fields_populated() {
        let store = small_store();
        let outcome = run_audit(&store, &Thresholds::default(), 5);

        assert!(!outcome.metadata.generated_at.is_empty());
        assert!(outcome.metadata.elapsed_seconds >= 0.0);
        assert_eq!(outcome.metadata.claims_processed, 6);
        assert_eq!(outcome.metadata.patients, 2);
        assert_eq!(outcome.metadata.unresolved_claims, 0);
        assert_eq!(outcome.metadata.section_rows["high_denial_providers"], 1);
        assert!(outcome.cleaning.is_none());
    }

    #[test]
    fn test_run_audit_is_deterministic() {
        let store = small_store();
        let first = run_audit(&store, &Thresholds::default(), 10);
        let second = run_audit(&store, &Thresholds::default(), 10);
        assert_eq!(first.report, second.report);
        assert_eq!(first.summary, second.summary);
    }

    // ── audit_directory ───────────────────────────────────────────────────────

    #[test]
    fn test_audit_directory_cleans_then_audits() {
        let dir = TempDir::new().unwrap();
        write_dataset(dir.path());

        let outcome = audit_directory(dir.path(), &Thresholds::default(), 10).unwrap();
        let cleaning = outcome.cleaning.as_ref().unwrap();

        assert_eq!(cleaning.duplicate_claims, 1);
        assert_eq!(cleaning.negative_billed_fixed, 1);
        assert_eq!(cleaning.missing_paid, 1);
        // After cleaning the data matches the in-memory fixture.
        let expected = run_audit(&small_store(), &Thresholds::default(), 10);
        assert_eq!(outcome.report, expected.report);
        assert_eq!(outcome.summary.total_billed, 900.0);
    }

    #[test]
    fn test_audit_directory_missing_table_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_dataset(dir.path());
        std::fs::remove_file(dir.path().join("procedures.jsonl")).unwrap();

        let err = audit_directory(dir.path(), &Thresholds::default(), 10).unwrap_err();
        assert!(matches!(err, AuditError::MissingTable("procedures")));
    }

    #[test]
    fn test_audit_directory_empty_claims_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        for table in ["patients", "providers", "procedures", "claims"] {
            write_jsonl(dir.path(), &format!("{table}.jsonl"), &[]);
        }

        let outcome = audit_directory(dir.path(), &Thresholds::default(), 10).unwrap();
        assert_eq!(outcome.metadata.claims_processed, 0);
        assert!(outcome.report.high_denial_providers.is_empty());
        assert_eq!(outcome.report.scalars.approval_rate, None);
    }
}
