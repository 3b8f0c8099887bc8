// Entry point and high-level CLI flow.
//
// - Option [1] loads the three input tables, printing diagnostics.
// - Option [2] runs the assignment and exports the result table, the
//   decision log, and a JSON summary.
// - After a run, the user can choose to go back to the menu or exit.

use branch_assign::engine::{self, EngineOptions};
use branch_assign::loader::{self, TableReport};
use branch_assign::output;
use branch_assign::types::Tables;
use branch_assign::util::format_int;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

const DISTANCES_FILE: &str = "distances.csv";
const BRANCHES_FILE: &str = "branches.csv";
const RULES_FILE: &str = "substitution_rules.csv";

const ASSIGNMENTS_FILE: &str = "assignments.csv";
const LOG_FILE: &str = "assignment_log.csv";
const SUMMARY_FILE: &str = "run_summary.json";

// Simple in-memory app state so we only load the tables once but can run
// the assignment multiple times in a single session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { tables: None }));

struct AppState {
    tables: Option<Tables>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after a run.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn print_table_report(name: &str, report: &TableReport) {
    println!(
        "{}: {} rows read, {} kept ({} skipped, {} duplicates)",
        name,
        format_int(report.total_rows as i64),
        format_int(report.kept_rows as i64),
        format_int(report.skipped_rows as i64),
        format_int(report.duplicate_rows as i64)
    );
}

/// Handle option [1]: load distances, branches, and substitution rules.
///
/// The rule table is optional; a missing file just means an empty table.
fn handle_load() {
    let distances = match loader::load_distances(DISTANCES_FILE) {
        Ok((records, report)) => {
            print_table_report("Distances", &report);
            records
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", DISTANCES_FILE, e);
            return;
        }
    };
    let branches = match loader::load_branches(BRANCHES_FILE) {
        Ok((records, report)) => {
            print_table_report("Branches", &report);
            records
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", BRANCHES_FILE, e);
            return;
        }
    };
    let rules = if Path::new(RULES_FILE).exists() {
        match loader::load_rules(RULES_FILE) {
            Ok((records, report)) => {
                print_table_report("Rules", &report);
                records
            }
            Err(e) => {
                eprintln!("Failed to load {}: {}\n", RULES_FILE, e);
                return;
            }
        }
    } else {
        println!("Note: {} not found; running with an empty rule table.", RULES_FILE);
        Vec::new()
    };
    println!();

    let mut state = APP_STATE.lock().unwrap();
    state.tables = Some(Tables::new(distances, branches, rules));
}

/// Handle option [2]: run the assignment and export all outputs.
fn handle_run() {
    let tables = {
        let state = APP_STATE.lock().unwrap();
        state.tables.clone()
    };
    let Some(tables) = tables else {
        println!("Error: No data loaded. Please load the input tables first (option 1).\n");
        return;
    };

    println!("Running assignment...");
    let result = engine::run(&tables, &EngineOptions::default(), |pct| {
        print!("\rProgress: {}%", pct);
        let _ = io::stdout().flush();
    });
    println!();

    let run = match result {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Assignment failed: {}\n", e);
            return;
        }
    };

    if let Err(e) = output::write_csv(ASSIGNMENTS_FILE, &run.rows) {
        eprintln!("Write error: {}", e);
    }
    if let Err(e) = output::write_csv(LOG_FILE, &run.log) {
        eprintln!("Write error: {}", e);
    }
    if let Err(e) = output::write_json(SUMMARY_FILE, &run.summary) {
        eprintln!("Write error: {}", e);
    }

    println!("\nAssignment Results\n");
    output::preview_table_rows(&run.rows, 5);
    println!("(Full table exported to {})\n", ASSIGNMENTS_FILE);

    let s = &run.summary;
    println!(
        "Summary: {} origins, {} rows ({} fallback, {} rule, {} unassigned, {} errors).",
        format_int(s.origins as i64),
        format_int(s.total_rows as i64),
        format_int(s.fallback_rows as i64),
        format_int(s.rule_rows as i64),
        format_int(s.no_branch_rows as i64),
        format_int(s.error_rows as i64)
    );
    println!(
        "Log: {} entries ({} warnings, {} errors) exported to {}.\n",
        format_int(run.log.len() as i64),
        format_int(s.warnings as i64),
        format_int(s.errors as i64),
        LOG_FILE
    );
}

fn main() {
    loop {
        println!("Branch Assignment");
        println!("[1] Load input tables");
        println!("[2] Run assignment\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!();
                handle_run();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
