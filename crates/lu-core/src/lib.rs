//! Land-Use Compliance Core
//!
//! This crate turns a user-drawn boundary into a compliance assessment by
//! validating the geometry and driving the built-up, encroachment and
//! scoring services in order. The transport is abstracted behind
//! [`AnalysisBackend`] so the orchestrator never sees HTTP.

pub mod backend;
pub mod boundary;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod report;

use thiserror::Error;

pub use backend::{AnalysisBackend, ServiceResult};
pub use boundary::{validate, Boundary, ValidationError};
pub use config::ServiceConfig;
pub use error::{AnalysisError, TransportCause};
pub use models::{
    AnalysisResult, BuiltUpResult, ComplianceRequest, ComplianceResult, EncroachmentResult,
};
pub use orchestrator::{
    AnalysisOutcome, AnalysisState, Orchestrator, OrchestratorConfig, Stage, Submission,
};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
