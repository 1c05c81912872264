//! Wire-faithful model of a completed contract analysis.
//!
//! Field names match the gateway's JSON exactly; everything here is plain
//! data the rest of the client treats as immutable once fetched.

use serde::{Deserialize, Serialize};

/// Remote lifecycle status of an analysis job, as reported by the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RemoteStatus {
    /// Whether the job has neither completed nor failed yet.
    pub fn is_still_processing(self) -> bool {
        matches!(self, RemoteStatus::Pending | RemoteStatus::Processing)
    }
}

/// Closed set of risk categories the analysis service detects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    MissingInsurance,
    UncappedLiability,
    VaguePaymentTerms,
    BroadIndemnification,
    MissingTermination,
    AmbiguousScope,
}

impl RiskCategory {
    /// Human-readable label for report rendering.
    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::MissingInsurance => "Missing insurance",
            RiskCategory::UncappedLiability => "Uncapped liability",
            RiskCategory::VaguePaymentTerms => "Vague payment terms",
            RiskCategory::BroadIndemnification => "Broad indemnification",
            RiskCategory::MissingTermination => "Missing termination",
            RiskCategory::AmbiguousScope => "Ambiguous scope",
        }
    }
}

/// Severity bucket derived from a 0-100 severity score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    /// Bucket a severity score: LOW <= 25 < MEDIUM <= 50 < HIGH <= 75 < CRITICAL.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=25 => SeverityLevel::Low,
            26..=50 => SeverityLevel::Medium,
            51..=75 => SeverityLevel::High,
            _ => SeverityLevel::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeverityLevel::Low => "LOW",
            SeverityLevel::Medium => "MEDIUM",
            SeverityLevel::High => "HIGH",
            SeverityLevel::Critical => "CRITICAL",
        }
    }
}

/// Suggested fix for a detected risk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Remediation {
    pub suggestion: String,
    pub priority: String,
    pub effort: String,
}

/// One detected risk with its severity and remediation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Risk {
    pub risk_id: String,
    pub category: RiskCategory,
    pub title: String,
    pub description: String,
    pub severity_score: u8,
    pub severity_level: SeverityLevel,
    pub affected_clause: String,
    pub explanation: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub remediation: Remediation,
}

/// Basic facts about the analyzed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractMetadata {
    pub filename: String,
    pub file_type: String,
    pub page_count: u32,
    pub word_count: u64,
}

/// Final artifact of a completed analysis, fetched exactly once per job.
///
/// `analyzed_at` is kept as the gateway's raw string: the service emits
/// naive ISO timestamps without a zone marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub status: String,
    pub contract_metadata: ContractMetadata,
    pub risks: Vec<Risk>,
    pub overall_risk_score: u8,
    pub summary: String,
    pub analyzed_at: String,
}
