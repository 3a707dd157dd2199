//! Resource model
//!
//! A [`Resource`] is a typed node with a string identity and a bag of
//! [`Value`] properties. Properties are always keyed by their display name
//! (`Name`, `CreateTime`, ...).

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Property every resource carries, holding its identity id
pub const ID_PROPERTY: &str = "Id";

/// Every kind of node the graph can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Region,
    Zone,
    Network,
    Subnetwork,
    Firewall,
    Route,
    Instance,
    Disk,
    Snapshot,
    Address,
    InstanceGroup,
    BackendService,
    ServiceAccount,
    ServiceAccountKey,
    Role,
    Bucket,
    Object,
    ManagedZone,
    Record,
    Topic,
    Subscription,
}

impl ResourceType {
    pub const ALL: [ResourceType; 21] = [
        ResourceType::Region,
        ResourceType::Zone,
        ResourceType::Network,
        ResourceType::Subnetwork,
        ResourceType::Firewall,
        ResourceType::Route,
        ResourceType::Instance,
        ResourceType::Disk,
        ResourceType::Snapshot,
        ResourceType::Address,
        ResourceType::InstanceGroup,
        ResourceType::BackendService,
        ResourceType::ServiceAccount,
        ResourceType::ServiceAccountKey,
        ResourceType::Role,
        ResourceType::Bucket,
        ResourceType::Object,
        ResourceType::ManagedZone,
        ResourceType::Record,
        ResourceType::Topic,
        ResourceType::Subscription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Region => "region",
            ResourceType::Zone => "zone",
            ResourceType::Network => "network",
            ResourceType::Subnetwork => "subnetwork",
            ResourceType::Firewall => "firewall",
            ResourceType::Route => "route",
            ResourceType::Instance => "instance",
            ResourceType::Disk => "disk",
            ResourceType::Snapshot => "snapshot",
            ResourceType::Address => "address",
            ResourceType::InstanceGroup => "instancegroup",
            ResourceType::BackendService => "backendservice",
            ResourceType::ServiceAccount => "serviceaccount",
            ResourceType::ServiceAccountKey => "serviceaccountkey",
            ResourceType::Role => "role",
            ResourceType::Bucket => "bucket",
            ResourceType::Object => "object",
            ResourceType::ManagedZone => "managedzone",
            ResourceType::Record => "record",
            ResourceType::Topic => "topic",
            ResourceType::Subscription => "subscription",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graph identity of a resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceKey {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub id: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.id)
    }
}

/// A typed node of the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub id: String,
    pub properties: BTreeMap<String, Value>,
}

impl Resource {
    /// Create a resource; the `Id` property is set to `id`
    pub fn new(kind: ResourceType, id: impl Into<String>) -> Self {
        let id = id.into();
        let mut properties = BTreeMap::new();
        properties.insert(ID_PROPERTY.to_string(), Value::String(id.clone()));
        Self {
            kind,
            id,
            properties,
        }
    }

    /// Region anchor of a collection
    pub fn region(name: &str) -> Self {
        let mut region = Self::new(ResourceType::Region, name);
        region.set("Name", name);
        region
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind, self.id.clone())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.properties.insert(name.to_string(), value.into());
    }
}

/// A property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    KeyValue(KeyValue),
    FirewallRule(FirewallRule),
    Grant(Grant),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    /// True when `self` equals `other`, or is a list holding it
    pub fn contains(&self, other: &Value) -> bool {
        match self {
            Value::List(values) => values.iter().any(|v| v == other),
            value => value == other,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

impl From<KeyValue> for Value {
    fn from(value: KeyValue) -> Self {
        Value::KeyValue(value)
    }
}

impl From<FirewallRule> for Value {
    fn from(value: FirewallRule) -> Self {
        Value::FirewallRule(value)
    }
}

impl From<Grant> for Value {
    fn from(value: Grant) -> Self {
        Value::Grant(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Inclusive port range; `any` covers every port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
    pub any: bool,
}

impl PortRange {
    pub fn any() -> Self {
        Self {
            from: 0,
            to: u16::MAX,
            any: true,
        }
    }

    pub fn new(from: u16, to: u16) -> Self {
        Self {
            from,
            to,
            any: false,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.any || (self.from..=self.to).contains(&port)
    }
}

/// One protocol/port entry of a firewall, with the ranges it matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallRule {
    /// Protocol name or number, `any` for every protocol
    pub protocol: String,
    pub port_range: PortRange,
    pub ip_ranges: Vec<IpNet>,
}

/// A role granted to a principal on a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub permission: String,
    pub grantee: String,
    pub grantee_type: String,
}

/// Deterministic id for resources without a provider-native one
pub fn hash_id(fields: &[&str]) -> String {
    let joined = fields.join("\u{1f}");
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, joined.as_bytes());
    format!("tgi-{}", uuid.simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_id_property() {
        let resource = Resource::new(ResourceType::Instance, "vm-1");
        assert_eq!(resource.get(ID_PROPERTY), Some(&Value::from("vm-1")));
        assert_eq!(resource.key().to_string(), "instance[vm-1]");
    }

    #[test]
    fn test_type_names_round_trip() {
        for kind in ResourceType::ALL {
            assert_eq!(ResourceType::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceType::from_name("vpc"), None);
    }

    #[test]
    fn test_hash_id_is_stable_and_field_sensitive() {
        let a = hash_id(&["zone-a", "www.example.com.", "A"]);
        assert_eq!(a, hash_id(&["zone-a", "www.example.com.", "A"]));
        assert_ne!(a, hash_id(&["zone-a", "www.example.com.", "AAAA"]));
        assert_ne!(hash_id(&["ab", "c"]), hash_id(&["a", "bc"]));
        assert!(a.starts_with("tgi-"));
    }

    #[test]
    fn test_value_contains() {
        let list = Value::from(vec!["web", "db"]);
        assert!(list.contains(&Value::from("db")));
        assert!(!list.contains(&Value::from("cache")));
        assert!(Value::from(3i64).contains(&Value::Int(3)));
    }

    #[test]
    fn test_port_range() {
        assert!(PortRange::any().contains(65535));
        assert!(PortRange::new(80, 90).contains(85));
        assert!(!PortRange::new(80, 90).contains(91));
    }
}
