//! Plain-text rendering of a finished analysis.

use std::fmt::Write as _;

use riskscan_client_core::analysis::{AnalysisResult, Risk, SeverityLevel};
use riskscan_client_engine::SessionPhase;

/// Label shown next to the progress bar for each phase.
pub fn phase_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Idle => "Waiting",
        SessionPhase::Submitting => "Uploading contract",
        SessionPhase::Polling => "Analyzing contract",
        SessionPhase::Completed => "Analysis complete",
        SessionPhase::Failed => "Analysis failed",
    }
}

/// Render the full report. Risks are listed from most to least severe.
pub fn format_report(result: &AnalysisResult) -> String {
    let meta = &result.contract_metadata;
    let overall = SeverityLevel::from_score(result.overall_risk_score);

    let mut out = String::new();
    let title = format!("Contract risk analysis: {}", meta.filename);
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
    let _ = writeln!(
        out,
        "Overall risk score: {}/100 ({})",
        result.overall_risk_score,
        overall.label()
    );
    let _ = writeln!(
        out,
        "{} pages, {} words | analyzed at {}",
        meta.page_count, meta.word_count, result.analyzed_at
    );

    if !result.summary.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", result.summary);
    }

    let _ = writeln!(out);
    if result.risks.is_empty() {
        let _ = writeln!(out, "No risks detected.");
        return out;
    }

    let mut risks: Vec<&Risk> = result.risks.iter().collect();
    risks.sort_by(|a, b| b.severity_score.cmp(&a.severity_score));

    let _ = writeln!(out, "Risks ({}):", risks.len());
    for (idx, risk) in risks.iter().enumerate() {
        let _ = writeln!(out);
        let _ = write!(out, "{}", format_risk(idx + 1, risk));
    }
    out
}

fn format_risk(ordinal: usize, risk: &Risk) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{ordinal}. [{} {}] {} ({})",
        risk.severity_level.label(),
        risk.severity_score,
        risk.title,
        risk.category.label()
    );
    let _ = writeln!(out, "   Clause: {}", risk.affected_clause);
    let _ = writeln!(out, "   {}", risk.description);
    if !risk.explanation.is_empty() {
        let _ = writeln!(out, "   Why it matters: {}", risk.explanation);
    }
    for line in &risk.evidence {
        let _ = writeln!(out, "     - {line}");
    }
    let _ = writeln!(
        out,
        "   Fix ({} priority, {} effort): {}",
        risk.remediation.priority, risk.remediation.effort, risk.remediation.suggestion
    );
    out
}
