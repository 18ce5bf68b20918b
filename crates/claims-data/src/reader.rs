//! JSONL table discovery and loading.
//!
//! A data directory holds one table per entity. Each table is either a single
//! `<table>.jsonl` file or a `<table>/` directory of `*.jsonl` shards. Every
//! non-blank line is one JSON object.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use claims_core::error::{AuditError, Result};
use claims_core::models::{
    ClaimId, Patient, PatientId, Procedure, ProcedureId, Provider, ProviderId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PATIENTS: &str = "patients";
pub const PROVIDERS: &str = "providers";
pub const PROCEDURES: &str = "procedures";
pub const CLAIMS: &str = "claims";

// ── Raw rows ──────────────────────────────────────────────────────────────────

/// A claim row as it appears on disk, before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClaim {
    pub claim_id: ClaimId,
    pub patient_id: PatientId,
    pub provider_id: ProviderId,
    pub procedure_id: ProcedureId,
    #[serde(default)]
    pub billed_amount: Option<f64>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
}

/// Rows of one table plus how many lines could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRows<T> {
    pub rows: Vec<T>,
    pub malformed_lines: usize,
}

/// The four input tables as read from disk. `None` marks a table with no
/// file or directory at all.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub patients: Option<TableRows<Patient>>,
    pub providers: Option<TableRows<Provider>>,
    pub procedures: Option<TableRows<Procedure>>,
    pub claims: Option<TableRows<RawClaim>>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Locate the files backing `table` under `data_path`.
///
/// Returns `None` when neither `<table>.jsonl` nor a `<table>/` directory
/// exists. Shards are returned sorted by path.
pub fn find_table_files(data_path: &Path, table: &str) -> Option<Vec<PathBuf>> {
    let single = data_path.join(format!("{table}.jsonl"));
    if single.is_file() {
        return Some(vec![single]);
    }

    let dir = data_path.join(table);
    if !dir.is_dir() {
        return None;
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "jsonl")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Some(files)
}

/// Read every row of `table` under `data_path`.
///
/// Blank lines are ignored and lines that do not deserialize into `T` are
/// skipped and counted. A shard that cannot be opened is logged and skipped.
pub fn read_table<T: DeserializeOwned>(data_path: &Path, table: &str) -> Option<TableRows<T>> {
    let files = find_table_files(data_path, table)?;
    let mut out = TableRows {
        rows: Vec::new(),
        malformed_lines: 0,
    };

    for file_path in &files {
        match read_jsonl_file::<T>(file_path) {
            Ok(parsed) => {
                out.rows.extend(parsed.rows);
                out.malformed_lines += parsed.malformed_lines;
            }
            Err(e) => warn!("Skipping {table} shard: {e}"),
        }
    }

    debug!(
        "Table {}: {} rows from {} files, {} malformed lines",
        table,
        out.rows.len(),
        files.len(),
        out.malformed_lines
    );
    Some(out)
}

/// Load all four tables from `data_path`.
///
/// Fails only when the directory itself is missing; absent tables are
/// reported as `None` for the caller to judge.
pub fn load_tables(data_path: &Path) -> Result<RawTables> {
    if !data_path.is_dir() {
        return Err(AuditError::DataPathNotFound(data_path.to_path_buf()));
    }

    Ok(RawTables {
        patients: read_table(data_path, PATIENTS),
        providers: read_table(data_path, PROVIDERS),
        procedures: read_table(data_path, PROCEDURES),
        claims: read_table(data_path, CLAIMS),
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_jsonl_file<T: DeserializeOwned>(file_path: &Path) -> Result<TableRows<T>> {
    let file = std::fs::File::open(file_path).map_err(|source| AuditError::FileRead {
        path: file_path.to_path_buf(),
        source,
    })?;

    let reader = std::io::BufReader::new(file);
    let mut rows = Vec::new();
    let mut malformed_lines = 0usize;

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|source| AuditError::FileRead {
            path: file_path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(trimmed) {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!(
                    "Failed to parse line {} in {}: {}",
                    line_no + 1,
                    file_path.display(),
                    e
                );
                malformed_lines += 1;
            }
        }
    }

    Ok(TableRows {
        rows,
        malformed_lines,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
