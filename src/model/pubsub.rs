//! Pub/Sub API shapes

use serde::Deserialize;
use std::collections::BTreeMap;

/// Topic name Pub/Sub reports for subscriptions whose topic was deleted
pub const DELETED_TOPIC: &str = "_deleted-topic_";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// `projects/{project}/topics/{topic}`
    pub name: Option<String>,
    pub kms_key_name: Option<String>,
    pub message_retention_duration: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// `projects/{project}/subscriptions/{subscription}`
    pub name: Option<String>,
    pub topic: Option<String>,
    pub ack_deadline_seconds: Option<i64>,
    pub message_retention_duration: Option<String>,
    pub push_config: Option<PushConfig>,
    pub filter: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Subscription {
    /// Topic of the subscription, unless it was deleted or belongs to
    /// another project
    pub fn topic_name(&self) -> Option<&str> {
        let topic = self.topic.as_deref().filter(|t| *t != DELETED_TOPIC)?;
        match (self.name.as_deref().and_then(project_of), project_of(topic)) {
            (Some(own), Some(other)) if own != other => None,
            _ => Some(topic),
        }
    }

    /// Whether the subscription has no topic to hang off
    pub fn is_detached(&self) -> bool {
        self.topic_name().is_none()
    }
}

fn project_of(name: &str) -> Option<&str> {
    name.strip_prefix("projects/")?.split('/').next()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushConfig {
    pub push_endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subscription(topic: &str) -> Subscription {
        serde_json::from_value(json!({
            "name": "projects/demo/subscriptions/orders-worker",
            "topic": topic
        }))
        .unwrap()
    }

    #[test]
    fn test_topic_name() {
        assert_eq!(
            subscription("projects/demo/topics/orders").topic_name(),
            Some("projects/demo/topics/orders")
        );
        assert_eq!(subscription(DELETED_TOPIC).topic_name(), None);
        assert_eq!(subscription("projects/shared/topics/orders").topic_name(), None);
    }

    #[test]
    fn test_is_detached() {
        assert!(!subscription("projects/demo/topics/orders").is_detached());
        assert!(subscription(DELETED_TOPIC).is_detached());
        assert!(subscription("projects/shared/topics/orders").is_detached());
    }
}
