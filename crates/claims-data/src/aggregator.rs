//! Group-by-and-summarize over claims.
//!
//! Claims are partitioned by a grouping key and each group is reduced to an
//! [`AggregateRow`] holding only the reductions that were asked for.

use std::collections::BTreeMap;

use claims_core::models::{Claim, ClaimStatus, PatientId, ProcedureId, ProviderId};
use claims_core::stats;

use crate::store::RecordStore;

// ── Grouping ──────────────────────────────────────────────────────────────────

/// The dimension claims are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Patient,
    Provider,
    Procedure,
    /// Provider specialty, resolved through the provider table.
    Specialty,
    /// Procedure description, resolved through the procedure table.
    Description,
}

/// Concrete value of a grouping dimension. Attribute-based keys carry
/// `None` when the claim's reference did not resolve, so those claims still
/// land in exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Patient(PatientId),
    Provider(ProviderId),
    Procedure(ProcedureId),
    Specialty(Option<String>),
    Description(Option<String>),
}

impl GroupBy {
    pub fn key_for(&self, store: &RecordStore, claim: &Claim) -> GroupKey {
        match self {
            GroupBy::Patient => GroupKey::Patient(claim.patient_id),
            GroupBy::Provider => GroupKey::Provider(claim.provider_id),
            GroupBy::Procedure => GroupKey::Procedure(claim.procedure_id),
            GroupBy::Specialty => GroupKey::Specialty(store.specialty_of(claim.provider_id)),
            GroupBy::Description => {
                GroupKey::Description(store.description_of(claim.procedure_id))
            }
        }
    }
}

// ── Reductions ────────────────────────────────────────────────────────────────

/// A named row-level test used to count matching claims per group.
#[derive(Debug, Clone, Copy)]
pub struct ClaimPredicate {
    pub name: &'static str,
    pub test: fn(&Claim) -> bool,
}

fn is_denied(claim: &Claim) -> bool {
    ClaimStatus::of(claim) == ClaimStatus::Denied
}

/// Counts claims with [`ClaimStatus::Denied`].
pub const DENIED: ClaimPredicate = ClaimPredicate {
    name: "denied",
    test: is_denied,
};

/// One reduction over the billed amounts (or claims) of a group.
#[derive(Debug, Clone, Copy)]
pub enum Reduction {
    Sum,
    Mean,
    Median,
    /// Sample standard deviation; undefined for single-claim groups.
    Std,
    Max,
    CountWhere(ClaimPredicate),
}

/// Summary of one group. `count` is always present; the other reductions are
/// `Some` only when requested (and, for `std`, defined).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow<K = GroupKey> {
    pub key: K,
    pub count: usize,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub max: Option<f64>,
    pub counts: BTreeMap<&'static str, usize>,
}

impl<K> AggregateRow<K> {
    /// Number of claims in the group matching the named predicate.
    pub fn count_where(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    fn reduce(key: K, claims: &[&Claim], reductions: &[Reduction]) -> Self {
        let billed: Vec<f64> = claims.iter().map(|c| c.billed_amount).collect();
        let mut row = AggregateRow {
            key,
            count: claims.len(),
            sum: None,
            mean: None,
            median: None,
            std: None,
            max: None,
            counts: BTreeMap::new(),
        };

        for reduction in reductions {
            match reduction {
                Reduction::Sum => row.sum = Some(billed.iter().sum()),
                Reduction::Mean => row.mean = stats::mean(&billed),
                Reduction::Median => row.median = stats::median(&billed),
                Reduction::Std => row.std = stats::sample_std(&billed),
                Reduction::Max => row.max = stats::max(&billed),
                Reduction::CountWhere(p) => {
                    let n = claims.iter().filter(|&&c| (p.test)(c)).count();
                    row.counts.insert(p.name, n);
                }
            }
        }
        row
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Group every claim in `store` by `group_by` and reduce each group.
///
/// Rows are sorted by key; keys are unique. An empty claim table yields an
/// empty result.
pub fn aggregate(
    store: &RecordStore,
    group_by: GroupBy,
    reductions: &[Reduction],
) -> Vec<AggregateRow> {
    aggregate_by(store.claims(), |c| group_by.key_for(store, c), reductions)
}

/// Generic aggregation driver over any claim iterator and key function.
pub fn aggregate_by<'a, K: Ord>(
    claims: impl IntoIterator<Item = &'a Claim>,
    key_fn: impl Fn(&Claim) -> K,
    reductions: &[Reduction],
) -> Vec<AggregateRow<K>> {
    let mut groups: BTreeMap<K, Vec<&Claim>> = BTreeMap::new();
    for claim in claims {
        groups.entry(key_fn(claim)).or_default().push(claim);
    }

    groups
        .into_iter()
        .map(|(key, members)| AggregateRow::reduce(key, &members, reductions))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
