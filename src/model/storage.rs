//! Cloud Storage API shapes

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub kind: Option<String>,
    pub name: Option<String>,
    /// Upper-case location, a region (`US-CENTRAL1`) or a multi-region (`US`)
    pub location: Option<String>,
    pub location_type: Option<String>,
    pub storage_class: Option<String>,
    pub versioning: Option<Versioning>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub time_created: Option<String>,
    pub updated: Option<String>,
}

impl Bucket {
    /// Whether the bucket lives in `region`
    ///
    /// Multi-region and dual-region buckets belong to no single region.
    pub fn is_in_region(&self, region: &str) -> bool {
        self.location
            .as_deref()
            .is_some_and(|location| location.eq_ignore_ascii_case(region))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Versioning {
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub bucket: Option<String>,
    pub size: Option<String>,
    pub content_type: Option<String>,
    pub storage_class: Option<String>,
    pub md5_hash: Option<String>,
    pub time_created: Option<String>,
    pub updated: Option<String>,
}

impl Object {
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket.as_deref()
    }
}

/// `b/{bucket}/iam` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketPolicy {
    #[serde(default)]
    pub bindings: Vec<BucketBinding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketBinding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}
