//! GCP Authentication
//!
//! Handles authentication using Application Default Credentials (ADC), or a
//! fixed bearer token for emulators and tests, and reads the default project
//! and region from the environment and the gcloud configuration.

use crate::error::ApiError;
use anyhow::Context;
use gcp_auth::TokenProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Token TTL assumed for ADC tokens
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Where bearer tokens come from
#[derive(Clone)]
pub enum Credentials {
    /// Application Default Credentials, cached until close to expiry
    Adc {
        provider: Arc<dyn TokenProvider>,
        cache: Arc<RwLock<Option<CachedToken>>>,
    },
    /// A token supplied by the caller, used as is
    Static(String),
}

#[derive(Clone)]
pub struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl Credentials {
    /// Initialize Application Default Credentials
    pub async fn adc() -> anyhow::Result<Self> {
        let provider = gcp_auth::provider().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?;

        Ok(Credentials::Adc {
            provider,
            cache: Arc::new(RwLock::new(None)),
        })
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        Credentials::Static(token.into())
    }

    /// Get an access token for API calls
    /// Security: Checks token expiry before returning a cached token
    pub async fn token(&self) -> Result<String, ApiError> {
        let (provider, cache) = match self {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::Adc { provider, cache } => (provider, cache),
        };

        if let Some(cached) = cache.read().await.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
            tracing::debug!("Cached token expired, fetching new token");
        }

        let token = provider
            .token(DEFAULT_SCOPES)
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;
        let token = token.as_str().to_string();

        *cache.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER,
        });
        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token)
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
fn validate_project_id(project: &str) -> bool {
    (6..=30).contains(&project.len())
        && project.starts_with(|c: char| c.is_ascii_lowercase())
        && !project.ends_with('-')
        && project
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Contents of the active gcloud configuration file
fn read_active_config() -> Option<String> {
    let config_dir = get_gcloud_config_dir()?;
    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Security: Validate config name to prevent path traversal
    if !config_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));
    std::fs::read_to_string(path).ok()
}

/// Value of `key` in `[section]` of a gcloud ini file
fn ini_value(content: &str, section: &str, key: &str) -> Option<String> {
    let header = format!("[{}]", section);
    let mut in_section = false;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}

/// Read the default project from the environment or gcloud configuration
/// Security: Validates project ID format before returning
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    let legacy = get_gcloud_config_dir()
        .and_then(|dir| std::fs::read_to_string(dir.join("properties")).ok())
        .and_then(|content| ini_value(&content, "core", "project"));
    let active = read_active_config().and_then(|content| ini_value(&content, "core", "project"));

    legacy
        .into_iter()
        .chain(active)
        .find(|project| validate_project_id(project))
}

/// Get the default region from the environment or gcloud configuration
///
/// Falls back to the region of the default zone when only a zone is set.
pub fn get_default_region() -> Option<String> {
    if let Ok(region) = std::env::var("CLOUDSDK_COMPUTE_REGION") {
        return Some(region);
    }
    read_active_config().and_then(|content| compute_region_from_config(&content))
}

fn compute_region_from_config(content: &str) -> Option<String> {
    ini_value(content, "compute", "region").or_else(|| {
        ini_value(content, "compute", "zone")
            .and_then(|zone| region_of_zone(&zone).map(str::to_string))
    })
}

/// `us-central1-a` -> `us-central1`
pub fn region_of_zone(zone: &str) -> Option<&str> {
    zone.rsplit_once('-').map(|(region, _)| region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("my-project-123"));
        assert!(!validate_project_id("short"));
        assert!(!validate_project_id("1-starts-with-digit"));
        assert!(!validate_project_id("ends-with-hyphen-"));
        assert!(!validate_project_id("Upper-Case-Project"));
    }

    #[test]
    fn test_region_of_zone() {
        assert_eq!(region_of_zone("us-central1-a"), Some("us-central1"));
        assert_eq!(region_of_zone("europe-west4-b"), Some("europe-west4"));
        assert_eq!(region_of_zone("global"), None);
    }

    #[test]
    fn test_ini_value_respects_sections() {
        let content =
            "[core]\nproject = demo-project\n# zone = nope\n\n[compute]\nzone = europe-west1-b\n";
        assert_eq!(ini_value(content, "core", "project"), Some("demo-project".to_string()));
        assert_eq!(ini_value(content, "core", "zone"), None);
        assert_eq!(
            ini_value(content, "compute", "zone"),
            Some("europe-west1-b".to_string())
        );
    }

    #[test]
    fn test_compute_region_from_config() {
        let content = "[core]\nproject = demo-project\n\n[compute]\nzone = europe-west1-b\n";
        assert_eq!(
            compute_region_from_config(content),
            Some("europe-west1".to_string())
        );

        let content = "[compute]\nzone = europe-west1-b\nregion = us-east4\n";
        assert_eq!(compute_region_from_config(content), Some("us-east4".to_string()));
        assert_eq!(compute_region_from_config("[core]\nproject = x\n"), None);
    }

    #[tokio::test]
    async fn test_fixed_credentials_return_token() {
        let credentials = Credentials::fixed("test-token");
        assert_eq!(credentials.token().await.unwrap(), "test-token");
    }
}
