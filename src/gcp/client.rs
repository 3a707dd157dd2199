//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication,
//! HTTP functionality and the base URLs of every API the inventory reads.

use super::auth::Credentials;
use super::http::GcpHttpClient;
use crate::error::ApiError;
use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Base URLs of the GCP APIs, without trailing slash
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub compute: String,
    pub storage: String,
    pub iam: String,
    pub resourcemanager: String,
    pub dns: String,
    pub pubsub: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compute: "https://compute.googleapis.com".to_string(),
            storage: "https://storage.googleapis.com".to_string(),
            iam: "https://iam.googleapis.com".to_string(),
            resourcemanager: "https://cloudresourcemanager.googleapis.com".to_string(),
            dns: "https://dns.googleapis.com".to_string(),
            pubsub: "https://pubsub.googleapis.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Route every API to the same base URL (emulators, mock servers)
    pub fn single(base: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(base)?;
        if url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        let base = url.as_str().trim_end_matches('/').to_string();
        Ok(Self {
            compute: base.clone(),
            storage: base.clone(),
            iam: base.clone(),
            resourcemanager: base.clone(),
            dns: base.clone(),
            pubsub: base,
        })
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base, path)
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: Credentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub region: String,
    endpoints: Arc<Endpoints>,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new(project_id: &str, region: &str, endpoints: Endpoints) -> anyhow::Result<Self> {
        let credentials = Credentials::adc()
            .await
            .context("Failed to initialize GCP credentials")?;
        Self::with_credentials(project_id, region, endpoints, credentials)
    }

    pub fn with_credentials(
        project_id: &str,
        region: &str,
        endpoints: Endpoints,
        credentials: Credentials,
    ) -> anyhow::Result<Self> {
        let http = GcpHttpClient::new().context("Failed to create HTTP client")?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            region: region.to_string(),
            endpoints: Arc::new(endpoints),
        })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let token = self.credentials.token().await?;
        self.http.get(url, query, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let token = self.credentials.token().await?;
        self.http.post(url, query, &token, body).await
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> String {
        join(
            &self.endpoints.compute,
            &format!("compute/v1/projects/{}/{}", self.project_id, path),
        )
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, zone: &str, resource: &str) -> String {
        self.compute_url(&format!("zones/{}/{}", zone, resource))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, resource: &str) -> String {
        self.compute_url(&format!("regions/{}/{}", self.region, resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, resource: &str) -> String {
        self.compute_url(&format!("global/{}", resource))
    }

    /// Build aggregated Compute Engine API URL (all zones)
    pub fn compute_aggregated_url(&self, resource: &str) -> String {
        self.compute_url(&format!("aggregated/{}", resource))
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        join(&self.endpoints.storage, &format!("storage/v1/{}", path))
    }

    /// Build Cloud Storage bucket URL
    pub fn storage_bucket_url(&self, bucket: &str, resource: &str) -> String {
        self.storage_url(&format!("b/{}/{}", urlencoding::encode(bucket), resource))
    }

    // =========================================================================
    // IAM and Resource Manager API helpers
    // =========================================================================

    /// Build IAM API URL for a project resource
    pub fn iam_url(&self, path: &str) -> String {
        join(
            &self.endpoints.iam,
            &format!("v1/projects/{}/{}", self.project_id, path),
        )
    }

    /// Build Resource Manager API URL for a project method (`:getIamPolicy`)
    pub fn resourcemanager_url(&self, method: &str) -> String {
        join(
            &self.endpoints.resourcemanager,
            &format!("v1/projects/{}:{}", self.project_id, method),
        )
    }

    // =========================================================================
    // Cloud DNS and Pub/Sub API helpers
    // =========================================================================

    /// Build Cloud DNS API URL
    pub fn dns_url(&self, path: &str) -> String {
        join(
            &self.endpoints.dns,
            &format!("dns/v1/projects/{}/{}", self.project_id, path),
        )
    }

    /// Build Pub/Sub API URL
    pub fn pubsub_url(&self, path: &str) -> String {
        join(
            &self.endpoints.pubsub,
            &format!("v1/projects/{}/{}", self.project_id, path),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GcpClient {
        let endpoints = Endpoints::single("http://127.0.0.1:8080/").unwrap();
        GcpClient::with_credentials(
            "demo-project",
            "us-central1",
            endpoints,
            Credentials::fixed("t"),
        )
            .unwrap()
    }

    #[test]
    fn test_compute_urls() {
        let client = client();
        assert_eq!(
            client.compute_regional_url("subnetworks"),
            "http://127.0.0.1:8080/compute/v1/projects/demo-project/regions/us-central1/subnetworks"
        );
        assert_eq!(
            client.compute_zonal_url("us-central1-a", "instanceGroups/web/listInstances"),
            "http://127.0.0.1:8080/compute/v1/projects/demo-project/zones/us-central1-a/instanceGroups/web/listInstances"
        );
        assert_eq!(
            client.compute_aggregated_url("disks"),
            "http://127.0.0.1:8080/compute/v1/projects/demo-project/aggregated/disks"
        );
    }

    #[test]
    fn test_storage_url_encodes_bucket() {
        let client = client();
        assert_eq!(
            client.storage_bucket_url("my bucket", "o"),
            "http://127.0.0.1:8080/storage/v1/b/my%20bucket/o"
        );
    }

    #[test]
    fn test_single_endpoint_validation() {
        assert!(Endpoints::single("not a url").is_err());
        assert!(Endpoints::single("mailto:ops@example.com").is_err());
        let endpoints = Endpoints::single("http://localhost:9000").unwrap();
        assert_eq!(endpoints.dns, "http://localhost:9000");
    }

    #[test]
    fn test_project_method_url() {
        assert_eq!(
            client().resourcemanager_url("getIamPolicy"),
            "http://127.0.0.1:8080/v1/projects/demo-project:getIamPolicy"
        );
    }
}
