use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Raw CSV row of the distance table, exactly as exported upstream.
/// Everything is optional text; `loader` turns it into `DistanceRecord`s.
#[derive(Debug, Deserialize)]
pub struct RawDistanceRow {
    #[serde(rename = "Origin")]
    pub origin: Option<String>,
    #[serde(rename = "Branch")]
    pub branch: Option<String>,
    #[serde(rename = "DistanceKm")]
    pub distance_km: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawBranchRow {
    #[serde(rename = "Branch")]
    pub branch: Option<String>,
    #[serde(rename = "BranchCode")]
    pub branch_code: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "FcaFractionated")]
    pub fca_fractionated: Option<String>,
    #[serde(rename = "FcaFullLoad")]
    pub fca_full_load: Option<String>,
    #[serde(rename = "ExwFractionated")]
    pub exw_fractionated: Option<String>,
    #[serde(rename = "ExwFullLoad")]
    pub exw_full_load: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawRuleRow {
    #[serde(rename = "SubstituteBranch")]
    pub substitute_branch: Option<String>,
    #[serde(rename = "SourceBranch")]
    pub source_branch: Option<String>,
    #[serde(rename = "Receives")]
    pub receives: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "EconomicGroup")]
    pub economic_group: Option<String>,
    #[serde(rename = "Incoterm")]
    pub incoterm: Option<String>,
    #[serde(rename = "LoadType")]
    pub load_type: Option<String>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: Option<String>,
}

/// One origin-to-branch distance. At most one record per (origin, branch);
/// the origin carries its state as the suffix after the last '-'.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRecord {
    pub origin: String,
    pub branch: String,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchRecord {
    pub branch: String,
    pub code: u32,
    pub state: String,
    pub fca_fractionated: bool,
    pub fca_full_load: bool,
    pub exw_fractionated: bool,
    pub exw_full_load: bool,
}

impl BranchRecord {
    pub fn is_eligible(&self, modality: Modality) -> bool {
        match (modality.incoterm, modality.load_type) {
            (Incoterm::Fca, LoadType::Fractionated) => self.fca_fractionated,
            (Incoterm::Fca, LoadType::FullLoad) => self.fca_full_load,
            (Incoterm::Exw, LoadType::Fractionated) => self.exw_fractionated,
            (Incoterm::Exw, LoadType::FullLoad) => self.exw_full_load,
        }
    }
}

/// A substitution rule redirecting collection responsibility to
/// `substitute_branch` whenever the target state/modality matches.
/// Empty `economic_group` means any group; `None` incoterm/load_type
/// mean the rule covers all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionRule {
    pub substitute_branch: String,
    /// Branch being overridden. Informational only; shows up in the reason.
    pub source_branch: String,
    /// The rule is active only when this is exactly "S".
    pub receives: String,
    pub state: String,
    pub economic_group: String,
    pub incoterm: Option<Incoterm>,
    pub load_type: Option<LoadType>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Incoterm {
    #[serde(rename = "FCA")]
    Fca,
    #[serde(rename = "EXW")]
    Exw,
}

impl Incoterm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Incoterm::Fca => "FCA",
            Incoterm::Exw => "EXW",
        }
    }

    pub fn parse(s: &str) -> Option<Incoterm> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FCA" => Some(Incoterm::Fca),
            "EXW" => Some(Incoterm::Exw),
            _ => None,
        }
    }
}

impl std::fmt::Display for Incoterm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoadType {
    #[serde(rename = "Fractionated")]
    Fractionated,
    #[serde(rename = "Full Load")]
    FullLoad,
}

impl LoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::Fractionated => "Fractionated",
            LoadType::FullLoad => "Full Load",
        }
    }

    pub fn parse(s: &str) -> Option<LoadType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fractionated" => Some(LoadType::Fractionated),
            "full load" | "full-load" | "fullload" => Some(LoadType::FullLoad),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An (incoterm, load type) pair. The domain has exactly four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modality {
    pub incoterm: Incoterm,
    pub load_type: LoadType,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality { incoterm: Incoterm::Fca, load_type: LoadType::Fractionated },
        Modality { incoterm: Incoterm::Fca, load_type: LoadType::FullLoad },
        Modality { incoterm: Incoterm::Exw, load_type: LoadType::Fractionated },
        Modality { incoterm: Incoterm::Exw, load_type: LoadType::FullLoad },
    ];
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.incoterm, self.load_type)
    }
}

/// The three input tables, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub distances: Vec<DistanceRecord>,
    pub branches: Vec<BranchRecord>,
    pub rules: Vec<SubstitutionRule>,
}

impl Tables {
    pub fn new(
        distances: Vec<DistanceRecord>,
        branches: Vec<BranchRecord>,
        rules: Vec<SubstitutionRule>,
    ) -> Self {
        Tables { distances, branches, rules }
    }
}

/// One assignment decision. Every (origin, modality) pair produces at least
/// one of these, even when nothing could be assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ResultRow {
    #[serde(rename = "Origin")]
    #[tabled(rename = "Origin")]
    pub origin: String,
    #[serde(rename = "Incoterm")]
    #[tabled(rename = "Incoterm")]
    pub incoterm: Incoterm,
    #[serde(rename = "LoadType")]
    #[tabled(rename = "LoadType")]
    pub load_type: LoadType,
    #[serde(rename = "Branch")]
    #[tabled(rename = "Branch", display_with = "crate::util::display_opt")]
    pub branch: Option<String>,
    #[serde(rename = "BranchCode")]
    #[tabled(rename = "BranchCode", display_with = "crate::util::display_opt")]
    pub branch_code: Option<String>,
    #[serde(rename = "DistanceKm")]
    #[tabled(rename = "DistanceKm", display_with = "crate::util::display_opt_km")]
    pub distance_km: Option<f64>,
    #[serde(rename = "Reason")]
    #[tabled(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "EconomicGroup")]
    #[tabled(rename = "EconomicGroup", display_with = "crate::util::display_opt")]
    pub economic_group_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One structured log line. Collected per run and exported beside the
/// result table; the engine never touches a global logger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    #[serde(rename = "Level")]
    pub level: LogLevel,
    #[serde(rename = "Message")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub origins: usize,
    pub pairs: usize,
    pub total_rows: usize,
    pub fallback_rows: usize,
    pub rule_rows: usize,
    pub no_branch_rows: usize,
    pub error_rows: usize,
    pub warnings: usize,
    pub errors: usize,
}
