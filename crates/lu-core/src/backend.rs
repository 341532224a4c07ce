//! Seam between the orchestrator and whatever talks to the remote services

use crate::boundary::Boundary;
use crate::error::AnalysisError;
use crate::models::{BuiltUpResult, ComplianceRequest, ComplianceResult, EncroachmentResult};
use async_trait::async_trait;

pub type ServiceResult<T> = Result<T, AnalysisError>;

/// The three remote computations an analysis depends on.
///
/// Implementations must not retry; a failed call is reported once and the
/// orchestrator decides what happens next.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Measure the boundary and the built-up area inside it
    async fn detect_built_up(&self, boundary: &Boundary) -> ServiceResult<BuiltUpResult>;

    /// Look for unauthorized construction in or around the boundary
    async fn detect_encroachment(&self, boundary: &Boundary) -> ServiceResult<EncroachmentResult>;

    /// Score the boundary from the two earlier results
    async fn compute_compliance_score(
        &self,
        request: &ComplianceRequest,
    ) -> ServiceResult<ComplianceResult>;
}
