//! Cloud DNS API shapes

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedZone {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub dns_name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<String>,
    #[serde(default)]
    pub name_servers: Vec<String>,
    pub dnssec_config: Option<DnssecConfig>,
    pub creation_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DnssecConfig {
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRecordSet {
    pub kind: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub ttl: Option<i64>,
    #[serde(default)]
    pub rrdatas: Vec<String>,
    /// Managed zone the record was listed from
    #[serde(skip)]
    pub zone: Option<String>,
}

impl ResourceRecordSet {
    pub fn zone_name(&self) -> Option<&str> {
        self.zone.as_deref()
    }
}
