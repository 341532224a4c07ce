//! Reference-versus-current boundary comparison

use crate::schema::{boolean, geometry, number, object};
use lu_core::{AnalysisError, Boundary, ServiceResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tolerance the comparison service applies when the caller does not set one
pub const DEFAULT_TOLERANCE_M2: f64 = 25.0;

#[derive(Debug, Serialize)]
pub(crate) struct ComparisonRequest<'a> {
    pub reference: &'a Boundary,
    pub current: &'a Boundary,
    pub tolerance_m2: f64,
}

/// How a surveyed boundary differs from its allotted reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryComparison {
    /// Area built outside the reference boundary
    pub encroachment_geojson: Option<Value>,
    /// Area of the reference left unused
    pub unused_geojson: Option<Value>,
    pub overlap_geojson: Option<Value>,
    pub encroachment_area: f64,
    pub unused_area: f64,
    pub overlap_area: f64,
    pub total_reference_area: f64,
    pub unused_percentage: f64,
    pub tolerance_m2: f64,
    /// Whether a difference below the tolerance was rounded to zero
    pub tolerance_applied: bool,
}

impl BoundaryComparison {
    pub fn has_encroachment(&self) -> bool {
        self.encroachment_area > 0.0
    }
}

pub(crate) fn parse(body: &Value) -> ServiceResult<BoundaryComparison> {
    let body = object(body)?;

    let non_negative = |field: &str| -> ServiceResult<f64> {
        let value = number(body, field)?;
        if value < 0.0 {
            return Err(AnalysisError::schema(field));
        }
        Ok(value)
    };

    Ok(BoundaryComparison {
        encroachment_geojson: geometry(body, "encroachment_geojson")?,
        unused_geojson: geometry(body, "unused_geojson")?,
        overlap_geojson: geometry(body, "overlap_geojson")?,
        encroachment_area: non_negative("encroachment_area")?,
        unused_area: non_negative("unused_area")?,
        overlap_area: non_negative("overlap_area")?,
        total_reference_area: non_negative("total_reference_area")?,
        unused_percentage: non_negative("unused_percentage")?,
        tolerance_m2: non_negative("tolerance_m2")?,
        tolerance_applied: boolean(body, "tolerance_applied")?,
    })
}
