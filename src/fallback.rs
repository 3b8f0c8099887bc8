//! Distance-based fallback resolution.
//!
//! When no substitution rule decides a pair, the nearest viable branch is
//! picked through three ordered tiers, each tried only when the previous
//! one produced nothing.

use std::collections::HashMap;

use crate::types::{BranchRecord, DistanceRecord, Modality};

/// Branch table with an id lookup. Duplicate ids keep the first record,
/// matching the loader's first-wins invariant.
pub struct BranchIndex<'a> {
    all: &'a [BranchRecord],
    by_id: HashMap<&'a str, &'a BranchRecord>,
}

impl<'a> BranchIndex<'a> {
    pub fn new(all: &'a [BranchRecord]) -> Self {
        let mut by_id: HashMap<&str, &BranchRecord> = HashMap::new();
        for b in all {
            by_id.entry(b.branch.as_str()).or_insert(b);
        }
        BranchIndex { all, by_id }
    }

    pub fn get(&self, branch: &str) -> Option<&'a BranchRecord> {
        self.by_id.get(branch).copied()
    }

    /// The sole branch in `state`, or `None` when there are zero or several.
    pub fn sole_branch_in_state(&self, state: &str) -> Option<&'a BranchRecord> {
        let mut in_state = self.all.iter().filter(|b| b.state == state);
        match (in_state.next(), in_state.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// Which tier of the chain produced the assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTier {
    ModalityEligible,
    SoleBranchInState,
    NearestUnrestricted,
}

impl FallbackTier {
    pub fn reason(&self) -> &'static str {
        match self {
            FallbackTier::ModalityEligible => "branch eligible for modality",
            FallbackTier::SoleBranchInState => "only branch in state",
            FallbackTier::NearestUnrestricted => "nearest branch (unrestricted)",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackHit<'a> {
    pub branch: &'a str,
    pub distance_km: f64,
    pub tier: FallbackTier,
}

// Minimum-distance row among `rows`, restricted by `keep`. Rows without a
// distance are ignored; ties keep the first row encountered.
fn nearest<'a, F>(rows: &[&'a DistanceRecord], keep: F) -> Option<(&'a DistanceRecord, f64)>
where
    F: Fn(&DistanceRecord) -> bool,
{
    let mut best: Option<(&'a DistanceRecord, f64)> = None;
    for &row in rows {
        let Some(d) = row.distance_km else { continue };
        if !keep(row) {
            continue;
        }
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((row, d));
        }
    }
    best
}

/// Resolve the fallback assignment for one origin and modality.
///
/// `origin_rows` must be the distance rows of a single origin, in table
/// order. Tiers:
///   1. nearest branch flagged eligible for the modality,
///   2. the only branch in the origin's state (any eligibility),
///   3. nearest branch with no restriction at all.
pub fn resolve_fallback<'a>(
    origin_rows: &[&'a DistanceRecord],
    branches: &BranchIndex,
    origin_state: &str,
    modality: Modality,
) -> Option<FallbackHit<'a>> {
    if let Some((row, d)) = nearest(origin_rows, |r| {
        branches.get(&r.branch).map_or(false, |b| b.is_eligible(modality))
    }) {
        return Some(FallbackHit {
            branch: &row.branch,
            distance_km: d,
            tier: FallbackTier::ModalityEligible,
        });
    }

    if let Some(only) = branches.sole_branch_in_state(origin_state) {
        for row in origin_rows {
            if row.branch == only.branch {
                if let Some(d) = row.distance_km {
                    return Some(FallbackHit {
                        branch: &row.branch,
                        distance_km: d,
                        tier: FallbackTier::SoleBranchInState,
                    });
                }
            }
        }
    }

    nearest(origin_rows, |_| true).map(|(row, d)| FallbackHit {
        branch: &row.branch,
        distance_km: d,
        tier: FallbackTier::NearestUnrestricted,
    })
}
