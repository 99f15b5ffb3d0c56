//! GCP platform implementations
//!
//! Implements core platform traits using native Rust libraries:
//! - Clock: std::time::SystemTime
//! - Environment: std::env + secrets mounted as files by Secret Manager

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use edge_sts_core::error::{ApiError, Result};
use edge_sts_core::platform::{Clock, Environment};

/// System clock using std::time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

/// GCP environment using env vars + Secret Manager volume mounts
pub struct GcpEnv {
    project_id: String,
}

impl GcpEnv {
    pub fn new(project_id: String) -> Self {
        Self { project_id }
    }

    /// Get project ID from the GCP_PROJECT family of env vars
    pub fn detect_project_id() -> std::result::Result<String, String> {
        std::env::var("GCP_PROJECT")
            .or_else(|_| std::env::var("GOOGLE_CLOUD_PROJECT"))
            .or_else(|_| std::env::var("GCLOUD_PROJECT"))
            .map_err(|_| "GCP_PROJECT environment variable not set".to_string())
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl Environment for GcpEnv {
    fn get_var(&self, name: &str) -> Result<String> {
        std::env::var(name)
            .map_err(|_| ApiError::internal(format!("environment variable '{}' not set", name)))
    }

    fn get_secret(&self, name: &str) -> Result<String> {
        // Cloud Run can inject the secret value directly...
        if let Ok(value) = std::env::var(name) {
            return Ok(value);
        }

        // ...or mount it as a file, in which case NAME_FILE holds the path
        if let Ok(path) = std::env::var(format!("{}_FILE", name)) {
            return std::fs::read_to_string(&path).map_err(|e| {
                ApiError::internal(format!("failed to read secret '{}' from {}: {}", name, path, e))
            });
        }

        Err(ApiError::internal(format!(
            "secret '{}' not found in environment (project: {})",
            name, self.project_id
        )))
    }
}
