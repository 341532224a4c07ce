//! Failure taxonomy shared by every stage of an analysis

use crate::boundary::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a request never produced a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransportCause {
    Timeout,
    Connect(String),
    Other(String),
}

impl std::fmt::Display for TransportCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportCause::Timeout => write!(f, "request timed out"),
            TransportCause::Connect(detail) => write!(f, "connection failed: {}", detail),
            TransportCause::Other(detail) => write!(f, "{}", detail),
        }
    }
}

/// The one error channel of the pipeline.
///
/// Validation failures and all three kinds of remote failure travel through
/// the same type so the orchestrator reports them uniformly as
/// `FAILED{stage, error}`.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("Invalid boundary: {reason}")]
    Validation { reason: ValidationError },

    #[error("Transport error: {cause}")]
    Transport { cause: TransportCause },

    #[error("Service responded with HTTP {status}: {body}")]
    Protocol { status: u16, body: String },

    #[error("Unexpected response: field `{field}` missing or malformed")]
    Schema { field: String },
}

impl AnalysisError {
    pub fn timeout() -> Self {
        AnalysisError::Transport {
            cause: TransportCause::Timeout,
        }
    }

    pub fn schema(field: impl Into<String>) -> Self {
        AnalysisError::Schema {
            field: field.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AnalysisError::Transport {
                cause: TransportCause::Timeout
            }
        )
    }
}

impl From<ValidationError> for AnalysisError {
    fn from(reason: ValidationError) -> Self {
        AnalysisError::Validation { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_helper() {
        assert!(AnalysisError::timeout().is_timeout());
        assert!(!AnalysisError::schema("total_area_m2").is_timeout());
    }

    #[test]
    fn test_error_serializes_with_kind_tag() {
        let err = AnalysisError::Protocol {
            status: 500,
            body: "boom".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "protocol");
        assert_eq!(json["status"], 500);
    }

    #[test]
    fn test_display_mentions_field() {
        let err = AnalysisError::schema("risk_score");
        assert!(err.to_string().contains("risk_score"));
    }
}
