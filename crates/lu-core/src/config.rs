//! Service configuration

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the analysis services live and how long each call may take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the analysis services
    pub base_url: String,

    /// Per-call timeout (milliseconds)
    pub timeout_ms: u64,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms,
        }
    }

    /// Read `LANDUSE_SERVICE_URL` and `LANDUSE_TIMEOUT_MS`, falling back to defaults
    pub fn from_env() -> CoreResult<Self> {
        let base_url = std::env::var("LANDUSE_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());

        let timeout_ms = match std::env::var("LANDUSE_TIMEOUT_MS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                CoreError::Config(format!("LANDUSE_TIMEOUT_MS must be milliseconds: {}", e))
            })?,
            Err(_) => 30_000,
        };

        Self::new(base_url, timeout_ms).checked()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject settings no call could succeed with
    pub fn checked(self) -> CoreResult<Self> {
        if self.base_url.trim().is_empty() {
            return Err(CoreError::Config("service base URL is empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(CoreError::Config("timeout must be greater than zero".to_string()));
        }
        Ok(self)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000", 30_000)
    }
}
