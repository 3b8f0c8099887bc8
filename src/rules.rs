//! Substitution rule matching and selection.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::types::{Modality, SubstitutionRule};

/// How a match should be constrained by economic group.
///
/// `Unscoped` and `Group` mirror the two caller-facing cases (no group known
/// vs. a concrete group); `Any` ignores the group dimension entirely, which
/// is what the assignment engine wants when it emits one row per rule and
/// stamps each row with that rule's own group.
#[derive(Debug, Clone, Copy)]
pub enum GroupScope<'a> {
    /// Only rules not scoped to any group.
    Unscoped,
    /// Rules scoped to this group, plus unscoped rules.
    Group(&'a str),
    /// All rules regardless of group scope.
    Any,
}

/// Strategy for narrowing the matched rules down to the ones applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSelection {
    /// Keep only the first match in table order.
    FirstMatch,
    /// Apply every matching rule.
    AllMatches,
    /// Keep the single most specific rule (see `specificity`), with
    /// `updated_at` and table order breaking ties.
    BestBySpecificity,
}

fn rule_matches(rule: &SubstitutionRule, state: &str, modality: Modality) -> bool {
    rule.receives == "S"
        && rule.state == state
        && rule.incoterm.map_or(true, |i| i == modality.incoterm)
        && rule.load_type.map_or(true, |l| l == modality.load_type)
}

fn group_matches(rule: &SubstitutionRule, scope: GroupScope) -> bool {
    match scope {
        GroupScope::Unscoped => rule.economic_group.is_empty(),
        GroupScope::Group(g) if g.trim().is_empty() => rule.economic_group.is_empty(),
        GroupScope::Group(g) => rule.economic_group.is_empty() || rule.economic_group == g,
        GroupScope::Any => true,
    }
}

/// Return every eligible rule for the target, in table order.
///
/// Eligible means: `receives == "S"`, exact (case-sensitive) state match,
/// and incoterm/load type each blank on the rule or equal to the target's.
pub fn match_rules<'a>(
    rules: &'a [SubstitutionRule],
    state: &str,
    modality: Modality,
    scope: GroupScope,
) -> Vec<&'a SubstitutionRule> {
    rules
        .iter()
        .filter(|r| rule_matches(r, state, modality) && group_matches(r, scope))
        .collect()
}

/// Specificity score of a rule: more constrained fields rank higher.
/// Weights: economic group 4, load type 3, incoterm 2, source branch 1.
pub fn specificity(rule: &SubstitutionRule) -> u32 {
    let mut score = 0;
    if !rule.economic_group.is_empty() {
        score += 4;
    }
    if rule.load_type.is_some() {
        score += 3;
    }
    if rule.incoterm.is_some() {
        score += 2;
    }
    if !rule.source_branch.is_empty() {
        score += 1;
    }
    score
}

// Newest first; rules without a date sort after dated ones.
fn recency_rank(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Narrow `matched` (already in table order) per the selection strategy.
pub fn select_rules<'a>(
    matched: Vec<&'a SubstitutionRule>,
    selection: RuleSelection,
) -> Vec<&'a SubstitutionRule> {
    match selection {
        RuleSelection::AllMatches => matched,
        RuleSelection::FirstMatch => matched.into_iter().take(1).collect(),
        RuleSelection::BestBySpecificity => {
            let mut ranked: Vec<(usize, &SubstitutionRule)> =
                matched.into_iter().enumerate().collect();
            ranked.sort_by(|(ia, a), (ib, b)| {
                specificity(b)
                    .cmp(&specificity(a))
                    .then_with(|| recency_rank(a.updated_at, b.updated_at))
                    .then_with(|| ia.cmp(ib))
            });
            ranked.into_iter().take(1).map(|(_, r)| r).collect()
        }
    }
}
