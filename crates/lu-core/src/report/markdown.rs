//! Markdown report generation

use super::{risk_zone, ComplianceBand};
use crate::orchestrator::Stage;
use crate::{AnalysisError, AnalysisResult};
use std::fmt::Write;

pub fn generate(result: &AnalysisResult) -> String {
    let compliance = &result.compliance;
    let mut out = String::new();

    let _ = writeln!(out, "# Compliance Analysis\n");
    let _ = writeln!(out, "- Analysis: `{}`", result.id);
    let _ = writeln!(out, "- Fetched: {}", result.fetched_at.to_rfc3339());
    if let Some(bbox) = result.boundary.bounding_box() {
        let _ = writeln!(
            out,
            "- Extent: {:.5},{:.5} to {:.5},{:.5} ({} vertices)",
            bbox.min().x,
            bbox.min().y,
            bbox.max().x,
            bbox.max().y,
            result.boundary.vertex_count()
        );
    }

    let _ = writeln!(out, "\n## Score\n");
    let _ = writeln!(
        out,
        "**{}** ({})",
        compliance.compliance_score,
        ComplianceBand::from_score(compliance.compliance_score)
    );

    let _ = writeln!(out, "\n## Land Use\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Total area | {:.2} m² |", result.built_up.total_area_m2);
    let _ = writeln!(out, "| Built-up area | {:.2} m² |", result.built_up.built_up_area_m2);
    let _ = writeln!(out, "| Built-up % | {}% |", compliance.built_percentage);
    if let Some(unused) = compliance.unused_percentage {
        let _ = writeln!(out, "| Unused % | {}% |", unused);
    }
    let _ = writeln!(
        out,
        "| Encroachment | {} |",
        if result.encroachment.encroachment_detected {
            "detected"
        } else {
            "none"
        }
    );

    let _ = writeln!(out, "\n## Severity\n");
    let _ = writeln!(out, "- Level: {}", compliance.severity);
    let _ = writeln!(
        out,
        "- Risk score: {}/4 ({})",
        compliance.risk_score,
        risk_zone(compliance.risk_score)
    );

    let _ = writeln!(out, "\n## Recommended Action\n");
    let _ = writeln!(out, "{}", compliance.recommended_action);
    let _ = writeln!(out, "\nUrgency: {}", compliance.urgency);

    if result.encroachment.has_overlay() {
        let _ = writeln!(out, "\n_An encroachment overlay is available for the map._");
    }

    out
}

/// One-paragraph failure summary for terminals and logs
pub fn failure(stage: Stage, error: &AnalysisError) -> String {
    let hint = match error {
        AnalysisError::Validation { .. } => "Redraw the boundary as a closed polygon.",
        AnalysisError::Transport { .. } => "Check that the analysis service is reachable.",
        AnalysisError::Protocol { status, .. } if *status >= 500 => {
            "The analysis service failed; try again later."
        }
        AnalysisError::Protocol { .. } => "The analysis service rejected the request.",
        AnalysisError::Schema { .. } => "The analysis service returned an unexpected response.",
    };

    format!("# Analysis Failed\n\n- Stage: {}\n- Error: {}\n\n{}\n", stage, error, hint)
}
