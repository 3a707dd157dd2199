//! Configuration Management
//!
//! Handles persistent configuration storage for tgcp-inventory: the default
//! project and region, and the sync toggles that switch services or single
//! resource kinds off.
//!
//! Toggles are keyed `<service>.sync` and `<service>.<kind>.sync`, e.g.
//! `storage.sync` or `compute.instance.sync`. A missing key means enabled.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Region used when neither the CLI, the config file nor gcloud names one
pub const DEFAULT_REGION: &str = "us-central1";

/// Boolean sync toggles, all enabled by default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncConfig(BTreeMap<String, bool>);

impl SyncConfig {
    pub fn service_key(service: &str) -> String {
        format!("{}.sync", service)
    }

    pub fn kind_key(service: &str, kind: &str) -> String {
        format!("{}.{}.sync", service, kind)
    }

    pub fn is_service_enabled(&self, service: &str) -> bool {
        self.get(&Self::service_key(service))
    }

    pub fn is_kind_enabled(&self, service: &str, kind: &str) -> bool {
        self.get(&Self::kind_key(service, kind))
    }

    fn get(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(true)
    }

    pub fn set(&mut self, key: impl Into<String>, enabled: bool) {
        self.0.insert(key.into(), enabled);
    }

    /// Builder form of [`SyncConfig::set`] for a resource kind
    pub fn with_kind(mut self, service: &str, kind: &str, enabled: bool) -> Self {
        self.set(Self::kind_key(service, kind), enabled);
        self
    }

    /// Builder form of [`SyncConfig::set`] for a whole service
    pub fn with_service(mut self, service: &str, enabled: bool) -> Self {
        self.set(Self::service_key(service), enabled);
        self
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Project to inventory
    #[serde(default)]
    pub project_id: Option<String>,
    /// Region to inventory
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tgcp-inventory").join("config.json"))
    }

    /// Load configuration from disk
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective project (config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective region (config > gcloud default > us-central1)
    pub fn effective_region(&self) -> String {
        self.region
            .clone()
            .or_else(crate::gcp::auth::get_default_region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_defaults_to_enabled() {
        let sync = SyncConfig::default();
        assert!(sync.is_service_enabled("compute"));
        assert!(sync.is_kind_enabled("compute", "instance"));
    }

    #[test]
    fn test_sync_toggles() {
        let sync = SyncConfig::default()
            .with_service("dns", false)
            .with_kind("compute", "disk", false);
        assert!(!sync.is_service_enabled("dns"));
        assert!(!sync.is_kind_enabled("compute", "disk"));
        assert!(sync.is_kind_enabled("compute", "instance"));
    }

    #[test]
    fn test_config_json_shape() {
        let config: Config = serde_json::from_str(
            r#"{"project_id":"demo-project","sync":{"compute.sync":false,"storage.object.sync":false}}"#,
        )
        .unwrap();
        assert_eq!(config.project_id.as_deref(), Some("demo-project"));
        assert!(config.region.is_none());
        assert!(!config.sync.is_service_enabled("compute"));
        assert!(!config.sync.is_kind_enabled("storage", "object"));
        assert!(config.sync.is_kind_enabled("storage", "bucket"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("tgcp-inventory-test-{}", std::process::id()));
        let path = dir.join("config.json");
        let config = Config {
            project_id: Some("demo-project".to_string()),
            region: Some("europe-west1".to_string()),
            sync: SyncConfig::default().with_service("messaging", false),
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path);
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(loaded.region.as_deref(), Some("europe-west1"));
        assert_eq!(loaded.sync, config.sync);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from(&PathBuf::from("/nonexistent/tgcp-inventory.json"));
        assert!(config.project_id.is_none());
        assert_eq!(config.sync, SyncConfig::default());
    }
}
