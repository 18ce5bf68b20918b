use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type PatientId = u64;
pub type ProviderId = u64;
pub type ProcedureId = u64;
pub type ClaimId = u64;

/// A person on whose behalf claims are filed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: PatientId,
    #[serde(default)]
    pub name: String,
    /// Age in whole years; absent when the source row had no usable age.
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
}

/// Accept an age written as an integer or an integral float (`34.0`).
/// Any other value becomes `None` so the patient row itself is kept.
fn lenient_age<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAge {
        Whole(u64),
        Real(f64),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<RawAge>::deserialize(deserializer)? {
        Some(RawAge::Whole(age)) => u32::try_from(age).ok(),
        Some(RawAge::Real(age))
            if age.is_finite() && age >= 0.0 && age.fract() == 0.0 && age <= u32::MAX as f64 =>
        {
            Some(age as u32)
        }
        Some(RawAge::Real(_)) | Some(RawAge::Other(_)) | None => None,
    })
}

/// A billing entity (physician, clinic, lab) and its specialty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: ProviderId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialty: String,
}

/// A billable procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub procedure_id: ProcedureId,
    #[serde(default)]
    pub description: String,
}

/// A single cleaned billing record. This is the fact table every
/// aggregation keys off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: ClaimId,
    pub patient_id: PatientId,
    pub provider_id: ProviderId,
    pub procedure_id: ProcedureId,
    /// Non-negative amount charged by the provider.
    pub billed_amount: f64,
    /// Non-negative amount actually paid; zero means the claim was denied.
    pub paid_amount: f64,
}

/// Outcome of a claim, derived from its paid amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    Approved,
    Denied,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 2] = [ClaimStatus::Approved, ClaimStatus::Denied];

    /// `Denied` iff nothing was paid, independent of the billed amount.
    pub fn of(claim: &Claim) -> Self {
        if claim.paid_amount == 0.0 {
            ClaimStatus::Denied
        } else {
            ClaimStatus::Approved
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Denied => "Denied",
        }
    }
}

/// Status of every claim keyed by claim id, leaving the claims themselves
/// untouched.
pub fn claim_statuses(claims: &[Claim]) -> BTreeMap<ClaimId, ClaimStatus> {
    claims
        .iter()
        .map(|c| (c.claim_id, ClaimStatus::of(c)))
        .collect()
}

// ── AgeGroup ──────────────────────────────────────────────────────────────────

/// Fixed patient age buckets. Each range is half-open `[lower, upper)`,
/// except the last which has no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "<18")]
    Under18,
    #[serde(rename = "18-26")]
    From18To26,
    #[serde(rename = "26-35")]
    From26To35,
    #[serde(rename = "35-50")]
    From35To50,
    #[serde(rename = "50-70")]
    From50To70,
    #[serde(rename = "70+")]
    Over70,
}

impl AgeGroup {
    /// All buckets in ascending age order.
    pub const ALL: [AgeGroup; 6] = [
        AgeGroup::Under18,
        AgeGroup::From18To26,
        AgeGroup::From26To35,
        AgeGroup::From35To50,
        AgeGroup::From50To70,
        AgeGroup::Over70,
    ];

    pub fn for_age(age: u32) -> Self {
        match age {
            0..=17 => AgeGroup::Under18,
            18..=25 => AgeGroup::From18To26,
            26..=34 => AgeGroup::From26To35,
            35..=49 => AgeGroup::From35To50,
            50..=69 => AgeGroup::From50To70,
            _ => AgeGroup::Over70,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Under18 => "<18",
            AgeGroup::From18To26 => "18-26",
            AgeGroup::From26To35 => "26-35",
            AgeGroup::From35To50 => "35-50",
            AgeGroup::From50To70 => "50-70",
            AgeGroup::Over70 => "70+",
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
