//! JSON report generation

use crate::{AnalysisResult, CoreResult};

pub fn generate(result: &AnalysisResult) -> CoreResult<String> {
    serde_json::to_string_pretty(result)
        .map_err(|e| crate::CoreError::Report(format!("JSON serialization failed: {}", e)))
}
