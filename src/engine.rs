//! The assignment engine: walks every origin municipality against the four
//! fixed modalities, layering substitution rules over the distance-based
//! fallback chain, and collects result rows plus a structured run log.

use std::collections::HashMap;

use crate::error::AssignError;
use crate::fallback::{resolve_fallback, BranchIndex};
use crate::rules::{match_rules, select_rules, GroupScope, RuleSelection};
use crate::types::{
    DistanceRecord, LogEntry, LogLevel, Modality, ResultRow, RunSummary, SubstitutionRule, Tables,
};
use crate::util::{format_code, group_code, origin_state};

pub const NO_BRANCH_REASON: &str = "no branch available";
pub const PROCESSING_ERROR_REASON: &str = "processing error";

/// How rule-derived rows combine with the fallback assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleComposition {
    /// A matching rule replaces the fallback assignment for the pair.
    Override,
    /// The fallback row is always emitted; rule rows are appended to it.
    Additive,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub composition: RuleComposition,
    pub selection: RuleSelection,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            composition: RuleComposition::Additive,
            selection: RuleSelection::AllMatches,
        }
    }
}

/// Append-only per-run log. Returned with the results so callers decide
/// where the entries go; the engine never configures a global logger.
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn info(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry { level: LogLevel::Info, message: message.into() });
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry { level: LogLevel::Warning, message: message.into() });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.entries.push(LogEntry { level: LogLevel::Error, message: message.into() });
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub rows: Vec<ResultRow>,
    pub log: Vec<LogEntry>,
    pub summary: RunSummary,
}

#[derive(Default)]
struct RowCounts {
    fallback: usize,
    rule: usize,
    no_branch: usize,
    error: usize,
}

/// Run the full assignment: every unique origin of the distance table, in
/// first-appearance order, against all four modalities.
///
/// The distance and branch tables must be non-empty; the rule table may be
/// empty. `on_progress` receives a monotonic percentage of origins done.
/// Errors scoped to a single (origin, modality) pair become "processing
/// error" rows and never abort the run.
pub fn run<F>(
    tables: &Tables,
    opts: &EngineOptions,
    mut on_progress: F,
) -> Result<RunOutput, AssignError>
where
    F: FnMut(u8),
{
    if tables.distances.is_empty() {
        return Err(AssignError::MissingInput("distance table"));
    }
    if tables.branches.is_empty() {
        return Err(AssignError::MissingInput("branch table"));
    }

    let index = BranchIndex::new(&tables.branches);

    // Unique origins in first-appearance order, with their distance rows.
    let mut origins: Vec<&str> = Vec::new();
    let mut rows_by_origin: HashMap<&str, Vec<&DistanceRecord>> = HashMap::new();
    for rec in &tables.distances {
        let entry = rows_by_origin.entry(rec.origin.as_str()).or_default();
        if entry.is_empty() {
            origins.push(rec.origin.as_str());
        }
        entry.push(rec);
    }

    let mut log = RunLog::default();
    let mut rows: Vec<ResultRow> = Vec::new();
    let mut counts = RowCounts::default();
    let total = origins.len();
    let mut last_pct = 0u8;

    for (i, &origin) in origins.iter().enumerate() {
        let origin_rows = &rows_by_origin[origin];
        for modality in Modality::ALL {
            let pair = process_pair(
                origin,
                modality,
                origin_rows,
                &index,
                &tables.rules,
                opts,
                &mut log,
                &mut counts,
            );
            match pair {
                Ok(mut pair_rows) => rows.append(&mut pair_rows),
                Err(e) => {
                    log.error(format!("{} [{}]: {}", origin, modality, e));
                    counts.error += 1;
                    rows.push(unassigned_row(origin, modality, PROCESSING_ERROR_REASON));
                }
            }
        }
        let pct = (((i + 1) * 100) / total) as u8;
        if pct > last_pct {
            last_pct = pct;
            on_progress(pct);
        }
    }

    let summary = RunSummary {
        origins: total,
        pairs: total * Modality::ALL.len(),
        total_rows: rows.len(),
        fallback_rows: counts.fallback,
        rule_rows: counts.rule,
        no_branch_rows: counts.no_branch,
        error_rows: counts.error,
        warnings: log.count(LogLevel::Warning),
        errors: log.count(LogLevel::Error),
    };
    Ok(RunOutput { rows, log: log.into_entries(), summary })
}

#[allow(clippy::too_many_arguments)]
fn process_pair(
    origin: &str,
    modality: Modality,
    origin_rows: &[&DistanceRecord],
    index: &BranchIndex,
    rules: &[SubstitutionRule],
    opts: &EngineOptions,
    log: &mut RunLog,
    counts: &mut RowCounts,
) -> Result<Vec<ResultRow>, AssignError> {
    let state =
        origin_state(origin).ok_or_else(|| AssignError::OriginState(origin.to_string()))?;

    // The engine matches across every group scope and stamps each rule row
    // with that rule's own group code.
    let matched = match_rules(rules, state, modality, GroupScope::Any);
    let selected = select_rules(matched, opts.selection);

    let mut out = Vec::new();
    let use_fallback = opts.composition == RuleComposition::Additive || selected.is_empty();
    if use_fallback {
        match resolve_fallback(origin_rows, index, state, modality) {
            Some(hit) => {
                let code = resolve_branch_code(index, hit.branch, log);
                out.push(ResultRow {
                    origin: origin.to_string(),
                    incoterm: modality.incoterm,
                    load_type: modality.load_type,
                    branch: Some(hit.branch.to_string()),
                    branch_code: Some(code),
                    distance_km: Some(hit.distance_km),
                    reason: hit.tier.reason().to_string(),
                    economic_group_code: None,
                });
                counts.fallback += 1;
            }
            None => {
                log.info(format!("{} [{}]: no branch available", origin, modality));
                out.push(unassigned_row(origin, modality, NO_BRANCH_REASON));
                counts.no_branch += 1;
            }
        }
    }

    for rule in selected {
        let code = resolve_branch_code(index, &rule.substitute_branch, log);
        out.push(ResultRow {
            origin: origin.to_string(),
            incoterm: modality.incoterm,
            load_type: modality.load_type,
            branch: Some(rule.substitute_branch.clone()),
            branch_code: Some(code),
            distance_km: None,
            reason: rule_reason(rule),
            economic_group_code: group_code(&rule.economic_group),
        });
        counts.rule += 1;
    }

    Ok(out)
}

fn unassigned_row(origin: &str, modality: Modality, reason: &str) -> ResultRow {
    ResultRow {
        origin: origin.to_string(),
        incoterm: modality.incoterm,
        load_type: modality.load_type,
        branch: None,
        branch_code: None,
        distance_km: None,
        reason: reason.to_string(),
        economic_group_code: None,
    }
}

/// Four-digit code of `branch`, or the "0000" sentinel (plus a warning)
/// when the branch is not in the branch table.
fn resolve_branch_code(index: &BranchIndex, branch: &str, log: &mut RunLog) -> String {
    match index.get(branch) {
        Some(b) => format_code(b.code),
        None => {
            log.warning(format!("branch {:?} not in branch table, using code 0000", branch));
            format_code(0)
        }
    }
}

/// Human-readable trace of a rule-derived assignment, e.g.
/// `substitution rule: BRX receives group 0012 (FCA/Fractionated) instead of BRY`.
fn rule_reason(rule: &SubstitutionRule) -> String {
    let group = if rule.economic_group.is_empty() {
        "any group".to_string()
    } else {
        let code = group_code(&rule.economic_group)
            .unwrap_or_else(|| rule.economic_group.clone());
        format!("group {}", code)
    };
    let scope = match (rule.incoterm, rule.load_type) {
        (None, None) => "all modalities".to_string(),
        (Some(i), None) => format!("{}/all load types", i),
        (None, Some(l)) => format!("all incoterms/{}", l),
        (Some(i), Some(l)) => format!("{}/{}", i, l),
    };
    let mut reason =
        format!("substitution rule: {} receives {} ({})", rule.substitute_branch, group, scope);
    if !rule.source_branch.is_empty() {
        reason.push_str(&format!(" instead of {}", rule.source_branch));
    }
    reason
}
