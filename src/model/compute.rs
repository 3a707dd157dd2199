//! Compute Engine API shapes

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub region: Option<String>,
    #[serde(default)]
    pub available_cpu_platforms: Vec<String>,
    pub creation_timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub auto_create_subnetworks: Option<bool>,
    pub routing_config: Option<RoutingConfig>,
    pub mtu: Option<i64>,
    #[serde(default)]
    pub subnetworks: Vec<String>,
    #[serde(default)]
    pub peerings: Vec<NetworkPeering>,
    pub creation_timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    pub routing_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPeering {
    pub name: Option<String>,
    pub network: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnetwork {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub network: Option<String>,
    pub region: Option<String>,
    pub ip_cidr_range: Option<String>,
    pub gateway_address: Option<String>,
    pub private_ip_google_access: Option<bool>,
    pub purpose: Option<String>,
    pub stack_type: Option<String>,
    #[serde(default)]
    pub secondary_ip_ranges: Vec<SecondaryRange>,
    pub creation_timestamp: Option<String>,
}

impl Subnetwork {
    pub fn network_link(&self) -> Option<&str> {
        self.network.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryRange {
    pub range_name: Option<String>,
    pub ip_cidr_range: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub network: Option<String>,
    pub direction: Option<String>,
    pub priority: Option<i64>,
    pub disabled: Option<bool>,
    #[serde(default)]
    pub allowed: Vec<FirewallEntry>,
    #[serde(default)]
    pub denied: Vec<FirewallEntry>,
    #[serde(default)]
    pub source_ranges: Vec<String>,
    #[serde(default)]
    pub destination_ranges: Vec<String>,
    #[serde(default)]
    pub source_tags: Vec<String>,
    #[serde(default)]
    pub target_tags: Vec<String>,
    #[serde(default)]
    pub target_service_accounts: Vec<String>,
    pub creation_timestamp: Option<String>,
}

impl Firewall {
    pub fn network_link(&self) -> Option<&str> {
        self.network.as_deref()
    }

    pub fn is_egress(&self) -> bool {
        self.direction.as_deref() == Some("EGRESS")
    }

    /// Ranges the rule matches: sources for ingress, destinations for egress
    pub fn ranges(&self) -> &[String] {
        if self.is_egress() {
            &self.destination_ranges
        } else {
            &self.source_ranges
        }
    }
}

/// One `allowed`/`denied` entry of a firewall
#[derive(Debug, Clone, Deserialize)]
pub struct FirewallEntry {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub network: Option<String>,
    pub dest_range: Option<String>,
    pub priority: Option<i64>,
    pub next_hop_gateway: Option<String>,
    pub next_hop_ip: Option<String>,
    pub next_hop_instance: Option<String>,
    pub next_hop_network: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub creation_timestamp: Option<String>,
}

impl Route {
    pub fn network_link(&self) -> Option<&str> {
        self.network.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub machine_type: Option<String>,
    pub status: Option<String>,
    pub zone: Option<String>,
    pub can_ip_forward: Option<bool>,
    pub deletion_protection: Option<bool>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
    #[serde(default)]
    pub disks: Vec<AttachedDisk>,
    pub tags: Option<Tags>,
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub scheduling: Option<Scheduling>,
    #[serde(default)]
    pub service_accounts: Vec<InstanceServiceAccount>,
    pub creation_timestamp: Option<String>,
}

impl Instance {
    pub fn subnetwork_links(&self) -> Vec<Option<&str>> {
        self.network_interfaces
            .iter()
            .map(|nic| nic.subnetwork.as_deref())
            .collect()
    }

    pub fn metadata_items(&self) -> Option<&[MetadataItem]> {
        self.metadata.as_ref().map(|m| m.items.as_slice())
    }

    pub fn tag_items(&self) -> &[String] {
        self.tags.as_ref().map(|t| t.items.as_slice()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: Option<String>,
    pub network: Option<String>,
    pub subnetwork: Option<String>,
    #[serde(rename = "networkIP")]
    pub network_ip: Option<String>,
    #[serde(default)]
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    pub name: Option<String>,
    #[serde(rename = "natIP")]
    pub nat_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    pub device_name: Option<String>,
    pub source: Option<String>,
    pub boot: Option<bool>,
    pub auto_delete: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub items: Vec<MetadataItem>,
}

/// A `{key, value}` pair of instance metadata
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduling {
    pub preemptible: Option<bool>,
    pub automatic_restart: Option<bool>,
    pub on_host_maintenance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceServiceAccount {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub size_gb: Option<String>,
    pub status: Option<String>,
    pub zone: Option<String>,
    #[serde(rename = "type")]
    pub disk_type: Option<String>,
    pub source_image: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub creation_timestamp: Option<String>,
    pub last_attach_timestamp: Option<String>,
}

impl Disk {
    pub fn zone_link(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn user_links(&self) -> &[String] {
        &self.users
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub source_disk: Option<String>,
    pub disk_size_gb: Option<String>,
    pub storage_bytes: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub storage_locations: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub creation_timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub address_type: Option<String>,
    pub purpose: Option<String>,
    pub status: Option<String>,
    pub region: Option<String>,
    pub subnetwork: Option<String>,
    pub network_tier: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
    pub creation_timestamp: Option<String>,
}

impl Address {
    pub fn subnetwork_link(&self) -> Option<&str> {
        self.subnetwork.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroup {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Set on zonal groups
    pub zone: Option<String>,
    /// Set on regional (multi-zone) groups
    pub region: Option<String>,
    pub size: Option<i64>,
    pub network: Option<String>,
    pub subnetwork: Option<String>,
    #[serde(default)]
    pub named_ports: Vec<NamedPort>,
    pub creation_timestamp: Option<String>,
}

impl InstanceGroup {
    pub fn zone_link(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn region_link(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn is_regional(&self) -> bool {
        self.zone.is_none() && self.region.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedPort {
    pub name: Option<String>,
    pub port: Option<i64>,
}

/// Item of `instanceGroups.listInstances`
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceGroupMember {
    pub instance: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendService {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub protocol: Option<String>,
    pub load_balancing_scheme: Option<String>,
    pub timeout_sec: Option<i64>,
    pub port_name: Option<String>,
    #[serde(default)]
    pub health_checks: Vec<String>,
    #[serde(default)]
    pub backends: Vec<Backend>,
    pub region: Option<String>,
    pub creation_timestamp: Option<String>,
}

impl BackendService {
    /// Instance groups serving this backend service
    ///
    /// Backends pointing at network endpoint groups are left out.
    pub fn instance_group_links(&self) -> Vec<Option<&str>> {
        self.backends
            .iter()
            .map(|b| b.group.as_deref().filter(|g| g.contains("/instanceGroups/")))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub group: Option<String>,
    pub balancing_mode: Option<String>,
}
