use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tplcheck_domain::{InstanceTemplate, TemplateRef};
use tracing::{debug, info};

use crate::error::DriverError;

pub const COMPUTE_BASE_URL: &str = "https://compute.googleapis.com";

const CLOUD_PLATFORM: &str = "https://www.googleapis.com/auth/cloud-platform";

// ── Token provider ────────────────────────────────────────────────────────────

/// Abstraction over GCP token acquisition — enables test injection.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, DriverError>;
}

/// Production token provider backed by Application Default Credentials.
struct AdcTokenProvider {
    inner: Arc<dyn gcp_auth::TokenProvider>,
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn token(&self) -> Result<String, DriverError> {
        let token = self
            .inner
            .token(&[CLOUD_PLATFORM])
            .await
            .map_err(|e| DriverError::ClientInit(format!("GCP auth failed: {}", e)))?;
        Ok(token.as_str().to_string())
    }
}

/// Fixed bearer token — for tests and local emulators.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, DriverError> {
        Ok(self.0.clone())
    }
}

// ── TemplateReader ────────────────────────────────────────────────────────────

/// Read access to live instance templates.
#[async_trait]
pub trait TemplateReader: Send + Sync + 'static {
    /// Fetch one template. Never retried: a missing or inconsistent template
    /// right after apply is reported as-is.
    async fn get_instance_template(
        &self,
        template: &TemplateRef,
    ) -> Result<InstanceTemplate, DriverError>;
}

// ── ComputeClient ─────────────────────────────────────────────────────────────

/// Minimal Compute Engine REST client for instance templates.
pub struct ComputeClient {
    client: reqwest::Client,
    token: Box<dyn TokenProvider>,
    base: String,
    timeout: Duration,
}

impl ComputeClient {
    /// Create a client using Application Default Credentials.
    ///
    /// ADC resolution order:
    /// 1. `GOOGLE_APPLICATION_CREDENTIALS` env var (service account JSON key)
    /// 2. Workload Identity (when running on GCP)
    /// 3. `gcloud auth application-default login` for local dev
    pub async fn from_adc(timeout: Duration) -> Result<Self, DriverError> {
        let inner = gcp_auth::provider()
            .await
            .map_err(|e| DriverError::ClientInit(format!("Failed to initialise GCP ADC: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            token: Box::new(AdcTokenProvider { inner }),
            base: COMPUTE_BASE_URL.into(),
            timeout,
        })
    }

    /// Create a client with an explicit token provider and API root.
    pub fn with_token(
        token: impl TokenProvider + 'static,
        base: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: Box::new(token),
            base: base.into(),
            timeout,
        }
    }

    // ── GCP error parsing ─────────────────────────────────────────────────────

    /// Convert a GCP REST error envelope into a human-readable message:
    ///   `"PERMISSION_DENIED: Required 'compute.instanceTemplates.get' permission [IAM_PERMISSION_DENIED — compute.instanceTemplates.get]"`
    fn extract_gcp_error(body: &Value) -> String {
        let err = &body["error"];
        let status = err["status"].as_str().unwrap_or("UNKNOWN");
        let message = err["message"].as_str().unwrap_or("unknown error");

        let detail_suffix = err["details"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|d| {
                let reason = d["reason"].as_str()?;
                let meta_vals: Vec<&str> = d["metadata"]
                    .as_object()
                    .map(|m| m.values().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                Some(format!(" [{} — {}]", reason, meta_vals.join(", ")))
            })
            .unwrap_or_default();

        format!("{}: {}{}", status, message, detail_suffix)
    }

    async fn fetch(&self, template: &TemplateRef) -> Result<InstanceTemplate, DriverError> {
        let token = self.token.token().await?;
        let url = format!("{}/{}", self.base.trim_end_matches('/'), template.api_path());
        debug!(%url, "GET instance template");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| DriverError::Api(format!("GET {}: {}", url, e)))?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(DriverError::NotFound(template.to_string()));
        }
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or_default();
            let msg = if body.get("error").is_some() {
                Self::extract_gcp_error(&body)
            } else {
                format!("HTTP {}", status)
            };
            return Err(DriverError::Api(msg));
        }

        resp.json()
            .await
            .map_err(|e| DriverError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TemplateReader for ComputeClient {
    async fn get_instance_template(
        &self,
        template: &TemplateRef,
    ) -> Result<InstanceTemplate, DriverError> {
        let snapshot = tokio::time::timeout(self.timeout, self.fetch(template))
            .await
            .map_err(|_| DriverError::Timeout(self.timeout))??;
        info!(template = %template, "fetched instance template");
        Ok(snapshot)
    }
}
