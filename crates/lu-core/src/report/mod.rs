//! Report generation

pub mod json;
pub mod markdown;

use crate::{AnalysisResult, CoreResult};

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl std::str::FromStr for ReportFormat {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(crate::CoreError::Parse(format!("unknown report format: {}", other))),
        }
    }
}

/// Display band for a compliance score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceBand {
    Compliant,
    ModerateRisk,
    Violation,
}

impl ComplianceBand {
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            ComplianceBand::Compliant
        } else if score > 50.0 {
            ComplianceBand::ModerateRisk
        } else {
            ComplianceBand::Violation
        }
    }
}

impl std::fmt::Display for ComplianceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceBand::Compliant => write!(f, "Green Compliant"),
            ComplianceBand::ModerateRisk => write!(f, "Moderate Risk"),
            ComplianceBand::Violation => write!(f, "Violation"),
        }
    }
}

/// Zone label for a 0-4 risk score
pub fn risk_zone(risk_score: f64) -> &'static str {
    if risk_score >= 4.0 {
        "CRITICAL ZONE"
    } else if risk_score >= 3.0 {
        "HIGH RISK ZONE"
    } else if risk_score >= 2.0 {
        "MEDIUM RISK ZONE"
    } else {
        "LOW RISK ZONE"
    }
}

/// Generate report in specified format
pub fn generate_report(result: &AnalysisResult, format: ReportFormat) -> CoreResult<String> {
    match format {
        ReportFormat::Json => json::generate(result),
        ReportFormat::Markdown => Ok(markdown::generate(result)),
    }
}
