/// End-to-end tests for the assignment engine: completeness, determinism,
/// rule/fallback composition, and failure isolation.
use branch_assign::engine::{
    run, EngineOptions, RuleComposition, NO_BRANCH_REASON, PROCESSING_ERROR_REASON,
};
use branch_assign::error::AssignError;
use branch_assign::rules::RuleSelection;
use branch_assign::types::{
    BranchRecord, DistanceRecord, Modality, SubstitutionRule, Tables,
};

fn branch(id: &str, code: u32, state: &str, eligible: bool) -> BranchRecord {
    BranchRecord {
        branch: id.to_string(),
        code,
        state: state.to_string(),
        fca_fractionated: eligible,
        fca_full_load: eligible,
        exw_fractionated: eligible,
        exw_full_load: eligible,
    }
}

fn dist(origin: &str, branch: &str, km: f64) -> DistanceRecord {
    DistanceRecord {
        origin: origin.to_string(),
        branch: branch.to_string(),
        distance_km: Some(km),
    }
}

fn wildcard_rule(substitute: &str, state: &str) -> SubstitutionRule {
    SubstitutionRule {
        substitute_branch: substitute.to_string(),
        source_branch: String::new(),
        receives: "S".to_string(),
        state: state.to_string(),
        economic_group: String::new(),
        incoterm: None,
        load_type: None,
        updated_at: None,
    }
}

fn two_state_tables() -> Tables {
    let branches = vec![
        branch("BR-MG", 7, "MG", true),
        branch("BR-SP", 23, "SP", true),
    ];
    let distances = vec![
        dist("Alfenas-MG", "BR-MG", 120.0),
        dist("Alfenas-MG", "BR-SP", 300.0),
        dist("Santos-SP", "BR-SP", 60.0),
    ];
    Tables::new(distances, branches, Vec::new())
}

#[test]
fn every_origin_modality_pair_yields_at_least_one_row() {
    let tables = two_state_tables();
    let out = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    for origin in ["Alfenas-MG", "Santos-SP"] {
        for m in Modality::ALL {
            let found = out.rows.iter().any(|r| {
                r.origin == origin && r.incoterm == m.incoterm && r.load_type == m.load_type
            });
            assert!(found, "missing row for {} {}", origin, m);
        }
    }
    assert_eq!(out.summary.origins, 2);
    assert_eq!(out.summary.pairs, 8);
    assert!(out.summary.total_rows >= 8);
}

#[test]
fn identical_inputs_yield_identical_output() {
    let mut tables = two_state_tables();
    tables.rules.push(wildcard_rule("BR-SP", "MG"));
    let a = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    let b = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    assert_eq!(a.rows, b.rows);
    assert_eq!(a.log, b.log);
    assert_eq!(a.summary, b.summary);
}

#[test]
fn wildcard_rule_adds_a_row_for_all_four_modalities() {
    // Rule with blank group/incoterm/load type covers every modality of
    // every MG origin, on top of the fallback assignment.
    let mut tables = two_state_tables();
    tables.branches.push(branch("BRX", 77, "RJ", false));
    tables.rules.push(wildcard_rule("BRX", "MG"));

    let out = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    let rule_rows: Vec<_> = out
        .rows
        .iter()
        .filter(|r| r.origin == "Alfenas-MG" && r.reason.starts_with("substitution rule"))
        .collect();
    assert_eq!(rule_rows.len(), 4);
    for row in &rule_rows {
        assert_eq!(row.branch.as_deref(), Some("BRX"));
        assert_eq!(row.branch_code.as_deref(), Some("0077"));
        assert_eq!(row.distance_km, None);
        assert_eq!(row.economic_group_code, None);
        assert_eq!(
            row.reason,
            "substitution rule: BRX receives any group (all modalities)"
        );
    }
    // The fallback rows are still there, before the rule rows.
    let fallback_rows = out
        .rows
        .iter()
        .filter(|r| r.origin == "Alfenas-MG" && r.reason == "branch eligible for modality")
        .count();
    assert_eq!(fallback_rows, 4);
    // No rule matches SP, so Santos only gets fallback rows.
    assert!(out
        .rows
        .iter()
        .filter(|r| r.origin == "Santos-SP")
        .all(|r| !r.reason.starts_with("substitution rule")));
}

#[test]
fn group_scoped_rules_are_emitted_with_their_group_code() {
    let mut tables = two_state_tables();
    let mut grouped = wildcard_rule("BR-SP", "MG");
    grouped.economic_group = "12".to_string();
    grouped.source_branch = "BR-MG".to_string();
    tables.rules.push(grouped);

    let out = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    let rule_rows: Vec<_> = out
        .rows
        .iter()
        .filter(|r| r.reason.starts_with("substitution rule"))
        .collect();
    assert_eq!(rule_rows.len(), 4);
    for row in rule_rows {
        assert_eq!(row.economic_group_code.as_deref(), Some("0012"));
        assert_eq!(
            row.reason,
            "substitution rule: BR-SP receives group 0012 (all modalities) instead of BR-MG"
        );
    }
}

#[test]
fn missing_substitute_branch_gets_sentinel_code_and_warning() {
    let mut tables = two_state_tables();
    tables.rules.push(wildcard_rule("GHOST", "MG"));

    let out = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    let rule_rows: Vec<_> = out
        .rows
        .iter()
        .filter(|r| r.reason.starts_with("substitution rule"))
        .collect();
    assert_eq!(rule_rows.len(), 4);
    for row in rule_rows {
        assert_eq!(row.branch.as_deref(), Some("GHOST"));
        assert_eq!(row.branch_code.as_deref(), Some("0000"));
    }
    assert!(out.summary.warnings >= 1);
    assert!(out
        .log
        .iter()
        .any(|e| e.message.contains("GHOST") && e.message.contains("0000")));
}

#[test]
fn override_policy_replaces_fallback_for_matching_pairs() {
    let mut tables = two_state_tables();
    tables.rules.push(wildcard_rule("BR-SP", "MG"));
    let opts = EngineOptions {
        composition: RuleComposition::Override,
        selection: RuleSelection::BestBySpecificity,
    };

    let out = run(&tables, &opts, |_| {}).unwrap();
    // MG pairs: exactly one rule row each, no fallback row.
    let mg_rows: Vec<_> = out.rows.iter().filter(|r| r.origin == "Alfenas-MG").collect();
    assert_eq!(mg_rows.len(), 4);
    assert!(mg_rows.iter().all(|r| r.reason.starts_with("substitution rule")));
    // SP pairs have no matching rule and still fall back.
    let sp_rows: Vec<_> = out.rows.iter().filter(|r| r.origin == "Santos-SP").collect();
    assert_eq!(sp_rows.len(), 4);
    assert!(sp_rows.iter().all(|r| r.reason == "branch eligible for modality"));
}

#[test]
fn first_match_selection_applies_a_single_rule() {
    let mut tables = two_state_tables();
    tables.rules.push(wildcard_rule("FIRST", "MG"));
    tables.rules.push(wildcard_rule("SECOND", "MG"));
    let opts = EngineOptions {
        composition: RuleComposition::Additive,
        selection: RuleSelection::FirstMatch,
    };

    let out = run(&tables, &opts, |_| {}).unwrap();
    let rule_rows: Vec<_> = out
        .rows
        .iter()
        .filter(|r| r.origin == "Alfenas-MG" && r.reason.starts_with("substitution rule"))
        .collect();
    assert_eq!(rule_rows.len(), 4);
    assert!(rule_rows.iter().all(|r| r.branch.as_deref() == Some("FIRST")));
}

#[test]
fn malformed_origin_is_isolated_to_its_own_pairs() {
    let mut tables = two_state_tables();
    // No "-UF" suffix: deriving the state fails for every modality of this
    // origin, and only for this origin.
    tables.distances.push(dist("Nowhere", "BR-MG", 10.0));

    let out = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    let error_rows: Vec<_> = out
        .rows
        .iter()
        .filter(|r| r.reason == PROCESSING_ERROR_REASON)
        .collect();
    assert_eq!(error_rows.len(), 4);
    assert!(error_rows.iter().all(|r| r.origin == "Nowhere" && r.branch.is_none()));
    assert_eq!(out.summary.error_rows, 4);
    assert_eq!(out.summary.errors, 4);
    // The well-formed origins are unaffected.
    assert!(out
        .rows
        .iter()
        .filter(|r| r.origin == "Alfenas-MG")
        .all(|r| r.reason == "branch eligible for modality"));
}

#[test]
fn origin_with_no_usable_distances_still_yields_a_row() {
    let branches = vec![branch("BR-A", 1, "SP", true), branch("BR-B", 2, "SP", true)];
    // Two in-state branches (tier 2 skipped) and a null distance only:
    // nothing can be assigned.
    let distances = vec![DistanceRecord {
        origin: "Lavras-MG".to_string(),
        branch: "BR-A".to_string(),
        distance_km: None,
    }];
    let tables = Tables::new(distances, branches, Vec::new());

    let out = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    assert_eq!(out.rows.len(), 4);
    assert!(out.rows.iter().all(|r| r.reason == NO_BRANCH_REASON && r.branch.is_none()));
    assert_eq!(out.summary.no_branch_rows, 4);
}

#[test]
fn empty_mandatory_tables_refuse_to_run() {
    let tables = Tables::new(Vec::new(), vec![branch("BR", 1, "MG", true)], Vec::new());
    assert!(matches!(
        run(&tables, &EngineOptions::default(), |_| {}),
        Err(AssignError::MissingInput("distance table"))
    ));

    let tables = Tables::new(vec![dist("Alfenas-MG", "BR", 1.0)], Vec::new(), Vec::new());
    assert!(matches!(
        run(&tables, &EngineOptions::default(), |_| {}),
        Err(AssignError::MissingInput("branch table"))
    ));
}

#[test]
fn empty_rule_table_produces_fallback_only_results() {
    let tables = two_state_tables();
    let out = run(&tables, &EngineOptions::default(), |_| {}).unwrap();
    assert_eq!(out.summary.rule_rows, 0);
    assert_eq!(out.summary.fallback_rows, 8);
    assert_eq!(out.rows.len(), 8);
}

#[test]
fn progress_is_monotonic_and_reaches_one_hundred() {
    let tables = two_state_tables();
    let mut seen: Vec<u8> = Vec::new();
    run(&tables, &EngineOptions::default(), |pct| seen.push(pct)).unwrap();
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(seen.last().copied(), Some(100));
}
