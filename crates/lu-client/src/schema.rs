//! Response decoding
//!
//! Bodies are read as loose JSON first so a missing or mistyped field can be
//! reported by name instead of as a generic decode failure.

use lu_core::{AnalysisError, BuiltUpResult, ComplianceResult, EncroachmentResult, ServiceResult};
use serde_json::{Map, Value};

pub(crate) fn object(body: &Value) -> ServiceResult<&Map<String, Value>> {
    body.as_object().ok_or_else(|| AnalysisError::schema("<body>"))
}

pub(crate) fn number(body: &Map<String, Value>, field: &str) -> ServiceResult<f64> {
    body.get(field)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .ok_or_else(|| AnalysisError::schema(field))
}

fn number_in(body: &Map<String, Value>, field: &str, min: f64, max: f64) -> ServiceResult<f64> {
    let value = number(body, field)?;
    if value < min || value > max {
        return Err(AnalysisError::schema(field));
    }
    Ok(value)
}

fn optional_number_in(
    body: &Map<String, Value>,
    field: &str,
    min: f64,
    max: f64,
) -> ServiceResult<Option<f64>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => number_in(body, field, min, max).map(Some),
    }
}

pub(crate) fn boolean(body: &Map<String, Value>, field: &str) -> ServiceResult<bool> {
    body.get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| AnalysisError::schema(field))
}

pub(crate) fn string(body: &Map<String, Value>, field: &str) -> ServiceResult<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AnalysisError::schema(field))
}

pub(crate) fn geometry(body: &Map<String, Value>, field: &str) -> ServiceResult<Option<Value>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Object(_)) => Ok(Some(value.clone())),
        Some(_) => Err(AnalysisError::schema(field)),
    }
}

pub fn built_up(body: &Value) -> ServiceResult<BuiltUpResult> {
    let body = object(body)?;
    let total_area_m2 = number_in(body, "total_area_m2", 0.0, f64::MAX)?;
    let built_up_area_m2 = number_in(body, "built_up_area_m2", 0.0, total_area_m2)?;

    Ok(BuiltUpResult {
        total_area_m2,
        built_up_area_m2,
    })
}

pub fn encroachment(body: &Value) -> ServiceResult<EncroachmentResult> {
    let body = object(body)?;
    let encroachment_detected = boolean(body, "encroachment_detected")?;
    let overlay = geometry(body, "encroachment_geojson")?;

    // The service may echo an empty geometry when nothing was found.
    Ok(EncroachmentResult {
        encroachment_detected,
        encroachment_geojson: if encroachment_detected { overlay } else { None },
    })
}

pub fn compliance(body: &Value) -> ServiceResult<ComplianceResult> {
    let body = object(body)?;

    Ok(ComplianceResult {
        compliance_score: number_in(body, "compliance_score", 0.0, 100.0)?,
        severity: string(body, "severity")?,
        risk_score: number_in(body, "risk_score", 0.0, 4.0)?,
        recommended_action: string(body, "recommended_action")?,
        urgency: string(body, "urgency")?,
        built_percentage: number_in(body, "built_percentage", 0.0, 100.0)?,
        unused_percentage: optional_number_in(body, "unused_percentage", 0.0, 100.0)?,
    })
}
