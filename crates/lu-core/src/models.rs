//! Stage results and the merged analysis record

use crate::boundary::Boundary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output of the built-up detection service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltUpResult {
    pub total_area_m2: f64,
    pub built_up_area_m2: f64,
}

/// Output of the encroachment detection service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncroachmentResult {
    pub encroachment_detected: bool,
    /// Overlay geometry; only ever set when `encroachment_detected` is true
    pub encroachment_geojson: Option<serde_json::Value>,
}

impl EncroachmentResult {
    pub fn none() -> Self {
        Self {
            encroachment_detected: false,
            encroachment_geojson: None,
        }
    }

    pub fn has_overlay(&self) -> bool {
        self.encroachment_geojson.is_some()
    }
}

/// Body of the scoring request, built only from earlier stage outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRequest {
    pub total_area_m2: f64,
    pub built_up_area_m2: f64,
    pub encroachment: bool,
}

impl ComplianceRequest {
    pub fn from_stages(built_up: &BuiltUpResult, encroachment: &EncroachmentResult) -> Self {
        Self {
            total_area_m2: built_up.total_area_m2,
            built_up_area_m2: built_up.built_up_area_m2,
            encroachment: encroachment.encroachment_detected,
        }
    }
}

/// Output of the compliance scoring service.
///
/// `severity` is the service's own label and is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub compliance_score: f64,
    pub severity: String,
    pub risk_score: f64,
    pub recommended_action: String,
    pub urgency: String,
    pub built_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unused_percentage: Option<f64>,
}

/// Everything one successful analysis produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub boundary: Boundary,
    pub built_up: BuiltUpResult,
    pub encroachment: EncroachmentResult,
    pub compliance: ComplianceResult,
    pub fetched_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(
        boundary: Boundary,
        built_up: BuiltUpResult,
        encroachment: EncroachmentResult,
        compliance: ComplianceResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            boundary,
            built_up,
            encroachment,
            compliance,
            fetched_at: Utc::now(),
        }
    }
}
