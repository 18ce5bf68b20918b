//! In-memory record store: the four input tables plus id lookups.

use std::collections::HashMap;

use claims_core::error::{AuditError, Result};
use claims_core::models::{
    Claim, Patient, PatientId, Procedure, ProcedureId, Provider, ProviderId,
};

use crate::cleaning::Tables;
use crate::reader::{CLAIMS, PATIENTS, PROCEDURES, PROVIDERS};

/// Immutable input for one audit run.
///
/// Reference lookups return `Option`: a claim whose foreign key does not
/// resolve simply has no name/specialty/description attached downstream.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    patients: Vec<Patient>,
    providers: Vec<Provider>,
    procedures: Vec<Procedure>,
    claims: Vec<Claim>,
    patient_index: HashMap<PatientId, usize>,
    provider_index: HashMap<ProviderId, usize>,
    procedure_index: HashMap<ProcedureId, usize>,
}

impl RecordStore {
    /// Build a store from tables that are known to be present.
    ///
    /// When an id repeats, lookups resolve to its first row.
    pub fn new(
        patients: Vec<Patient>,
        providers: Vec<Provider>,
        procedures: Vec<Procedure>,
        claims: Vec<Claim>,
    ) -> Self {
        let patient_index = index_by(&patients, |p| p.patient_id);
        let provider_index = index_by(&providers, |p| p.provider_id);
        let procedure_index = index_by(&procedures, |p| p.procedure_id);
        Self {
            patients,
            providers,
            procedures,
            claims,
            patient_index,
            provider_index,
            procedure_index,
        }
    }

    /// Build a store from cleaned tables, failing fast when any table is
    /// entirely absent.
    pub fn from_tables(tables: Tables) -> Result<Self> {
        let claims = tables.claims.ok_or(AuditError::MissingTable(CLAIMS))?;
        let patients = tables.patients.ok_or(AuditError::MissingTable(PATIENTS))?;
        let providers = tables.providers.ok_or(AuditError::MissingTable(PROVIDERS))?;
        let procedures = tables
            .procedures
            .ok_or(AuditError::MissingTable(PROCEDURES))?;
        Ok(Self::new(patients, providers, procedures, claims))
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn patient(&self, id: PatientId) -> Option<&Patient> {
        self.patient_index.get(&id).map(|&i| &self.patients[i])
    }

    pub fn provider(&self, id: ProviderId) -> Option<&Provider> {
        self.provider_index.get(&id).map(|&i| &self.providers[i])
    }

    pub fn procedure(&self, id: ProcedureId) -> Option<&Procedure> {
        self.procedure_index.get(&id).map(|&i| &self.procedures[i])
    }

    pub fn patient_name(&self, id: PatientId) -> Option<String> {
        self.patient(id).map(|p| p.name.clone())
    }

    pub fn provider_name(&self, id: ProviderId) -> Option<String> {
        self.provider(id).map(|p| p.name.clone())
    }

    pub fn specialty_of(&self, id: ProviderId) -> Option<String> {
        self.provider(id).map(|p| p.specialty.clone())
    }

    pub fn description_of(&self, id: ProcedureId) -> Option<String> {
        self.procedure(id).map(|p| p.description.clone())
    }

    /// Claims whose patient, provider or procedure does not resolve.
    pub fn unresolved_claims(&self) -> usize {
        self.claims
            .iter()
            .filter(|c| {
                self.patient(c.patient_id).is_none()
                    || self.provider(c.provider_id).is_none()
                    || self.procedure(c.procedure_id).is_none()
            })
            .count()
    }
}

fn index_by<T, K: std::hash::Hash + Eq>(rows: &[T], key: impl Fn(&T) -> K) -> HashMap<K, usize> {
    let mut index = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        index.entry(key(row)).or_insert(i);
    }
    index
}

// ── Test fixtures ─────────────────────────────────────────────────────────────


// ── Tests ─────────────────────────────────────────────────────────────────────
