//! CSV ingestion of the three input tables.
//!
//! All schema defaulting and validation happens here, once, so the engine
//! can assume clean typed records: (origin, branch) pairs are unique,
//! branch ids are unique with non-negative codes, and rule wildcards are
//! already parsed. Rows that cannot be repaired are skipped and counted.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;

use csv::ReaderBuilder;

use crate::error::AssignError;
use crate::types::{
    BranchRecord, DistanceRecord, Incoterm, LoadType, RawBranchRow, RawDistanceRow, RawRuleRow,
    SubstitutionRule,
};
use crate::util::{flag_is_set, parse_date_safe, parse_f64_safe, parse_i32_safe};

#[derive(Debug, Clone, Default)]
pub struct TableReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub skipped_rows: usize,
    pub duplicate_rows: usize,
}

fn clean_required(s: Option<String>) -> Option<String> {
    let s = s?;
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn clean_optional(s: Option<String>) -> String {
    s.map(|v| v.trim().to_string()).unwrap_or_default()
}

pub fn load_distances(path: &str) -> Result<(Vec<DistanceRecord>, TableReport), AssignError> {
    distances_from_reader(File::open(path)?)
}

pub fn distances_from_reader<R: Read>(
    reader: R,
) -> Result<(Vec<DistanceRecord>, TableReport), AssignError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut report = TableReport::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out: Vec<DistanceRecord> = Vec::new();

    for result in rdr.deserialize::<RawDistanceRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.skipped_rows += 1;
                continue;
            }
        };
        let (origin, branch) = match (clean_required(row.origin), clean_required(row.branch)) {
            (Some(o), Some(b)) => (o, b),
            _ => {
                report.skipped_rows += 1;
                continue;
            }
        };
        // At most one record per (origin, branch); first row wins.
        if !seen.insert((origin.clone(), branch.clone())) {
            report.duplicate_rows += 1;
            continue;
        }
        let distance_km = parse_f64_safe(row.distance_km.as_deref());
        out.push(DistanceRecord { origin, branch, distance_km });
    }

    report.kept_rows = out.len();
    Ok((out, report))
}

pub fn load_branches(path: &str) -> Result<(Vec<BranchRecord>, TableReport), AssignError> {
    branches_from_reader(File::open(path)?)
}

pub fn branches_from_reader<R: Read>(
    reader: R,
) -> Result<(Vec<BranchRecord>, TableReport), AssignError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut report = TableReport::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<BranchRecord> = Vec::new();

    for result in rdr.deserialize::<RawBranchRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.skipped_rows += 1;
                continue;
            }
        };
        let branch = match clean_required(row.branch) {
            Some(b) => b,
            None => {
                report.skipped_rows += 1;
                continue;
            }
        };
        let code = match parse_i32_safe(row.branch_code.as_deref()) {
            Some(c) if c >= 0 => c as u32,
            _ => {
                report.skipped_rows += 1;
                continue;
            }
        };
        if !seen.insert(branch.clone()) {
            report.duplicate_rows += 1;
            continue;
        }
        out.push(BranchRecord {
            branch,
            code,
            state: clean_optional(row.state),
            fca_fractionated: flag_is_set(row.fca_fractionated.as_deref()),
            fca_full_load: flag_is_set(row.fca_full_load.as_deref()),
            exw_fractionated: flag_is_set(row.exw_fractionated.as_deref()),
            exw_full_load: flag_is_set(row.exw_full_load.as_deref()),
        });
    }

    report.kept_rows = out.len();
    Ok((out, report))
}

pub fn load_rules(path: &str) -> Result<(Vec<SubstitutionRule>, TableReport), AssignError> {
    rules_from_reader(File::open(path)?)
}

pub fn rules_from_reader<R: Read>(
    reader: R,
) -> Result<(Vec<SubstitutionRule>, TableReport), AssignError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut report = TableReport::default();
    let mut out: Vec<SubstitutionRule> = Vec::new();

    for result in rdr.deserialize::<RawRuleRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.skipped_rows += 1;
                continue;
            }
        };
        let (substitute_branch, state) =
            match (clean_required(row.substitute_branch), clean_required(row.state)) {
                (Some(sub), Some(st)) => (sub, st),
                _ => {
                    report.skipped_rows += 1;
                    continue;
                }
            };
        let incoterm = match row.incoterm.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => match Incoterm::parse(s) {
                Some(i) => Some(i),
                None => {
                    report.skipped_rows += 1;
                    continue;
                }
            },
        };
        let load_type = match row.load_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => match LoadType::parse(s) {
                Some(l) => Some(l),
                None => {
                    report.skipped_rows += 1;
                    continue;
                }
            },
        };
        out.push(SubstitutionRule {
            substitute_branch,
            source_branch: clean_optional(row.source_branch),
            receives: clean_optional(row.receives),
            state,
            economic_group: clean_optional(row.economic_group),
            incoterm,
            load_type,
            updated_at: parse_date_safe(row.updated_at.as_deref()),
        });
    }

    report.kept_rows = out.len();
    Ok((out, report))
}
