//! Remote Analysis Client
//!
//! Thin HTTP/JSON wrapper over the built-up detection, encroachment
//! detection and compliance scoring services. Every failure comes back as an
//! [`AnalysisError`]; nothing is retried here.

pub mod comparison;
pub mod schema;

use async_trait::async_trait;
use lu_core::{
    AnalysisBackend, AnalysisError, Boundary, BuiltUpResult, ComplianceRequest, ComplianceResult,
    EncroachmentResult, ServiceConfig, ServiceResult, TransportCause,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub use comparison::{BoundaryComparison, DEFAULT_TOLERANCE_M2};

/// Longest error body kept in a protocol error
const MAX_ERROR_BODY: usize = 4096;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Config(#[from] lu_core::CoreError),
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone)]
struct Endpoints {
    built_up: Url,
    encroachment: Url,
    compliance: Url,
    comparison: Url,
}

impl Endpoints {
    fn resolve(base_url: &str) -> ClientResult<Self> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!(
                "{}: only http and https are supported",
                base_url
            )));
        }

        // Keep any path prefix when joining endpoint names.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |name: &str| {
            base.join(name)
                .map_err(|e| ClientError::InvalidUrl(format!("{}{}: {}", base, name, e)))
        };

        Ok(Self {
            built_up: join("detect-builtup")?,
            encroachment: join("detect-encroachment")?,
            compliance: join("compliance-score")?,
            comparison: join("compare-boundaries")?,
        })
    }
}

#[derive(Serialize)]
struct BoundaryRequest<'a> {
    boundary: &'a Boundary,
}

/// Client for the land-use analysis services
#[derive(Debug, Clone)]
pub struct RemoteAnalysisClient {
    endpoints: Endpoints,
    client: reqwest::Client,
}

impl RemoteAnalysisClient {
    pub fn new(config: ServiceConfig) -> ClientResult<Self> {
        let config = config.checked()?;
        let endpoints = Endpoints::resolve(&config.base_url)?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("lu-client/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            endpoints,
            client,
        })
    }

    /// Compare a surveyed boundary against its allotted reference
    pub async fn compare_boundaries(
        &self,
        reference: &Boundary,
        current: &Boundary,
        tolerance_m2: Option<f64>,
    ) -> ServiceResult<BoundaryComparison> {
        let request = comparison::ComparisonRequest {
            reference,
            current,
            tolerance_m2: tolerance_m2.unwrap_or(DEFAULT_TOLERANCE_M2),
        };

        let body = self.post(&self.endpoints.comparison, &request).await?;
        comparison::parse(&body)
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &Url, body: &B) -> ServiceResult<Value> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} responded with {}", url, status);
            let text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Protocol {
                status: status.as_u16(),
                body: truncate(text),
            });
        }

        let text = response.text().await.map_err(transport_error)?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("{} returned a body that is not JSON: {}", url, e);
            AnalysisError::schema("<body>")
        })
    }
}

#[async_trait]
impl AnalysisBackend for RemoteAnalysisClient {
    async fn detect_built_up(&self, boundary: &Boundary) -> ServiceResult<BuiltUpResult> {
        let body = self
            .post(&self.endpoints.built_up, &BoundaryRequest { boundary })
            .await?;
        schema::built_up(&body)
    }

    async fn detect_encroachment(&self, boundary: &Boundary) -> ServiceResult<EncroachmentResult> {
        let body = self
            .post(&self.endpoints.encroachment, &BoundaryRequest { boundary })
            .await?;
        schema::encroachment(&body)
    }

    async fn compute_compliance_score(
        &self,
        request: &ComplianceRequest,
    ) -> ServiceResult<ComplianceResult> {
        let body = self.post(&self.endpoints.compliance, request).await?;
        schema::compliance(&body)
    }
}

fn transport_error(error: reqwest::Error) -> AnalysisError {
    let cause = if error.is_timeout() {
        TransportCause::Timeout
    } else if error.is_connect() {
        TransportCause::Connect(error.to_string())
    } else {
        TransportCause::Other(error.to_string())
    };

    AnalysisError::Transport { cause }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
