//! Pub/Sub kinds

use super::relation::{Builder, RelationKind};
use super::{kind, Cycle, Fetched, KindFetcher};
use crate::error::FetchError;
use crate::graph::ResourceType;
use crate::model::pubsub::{PushConfig, Subscription, Topic};
use crate::resource::extract::{labels, nested, short, value};
use crate::resource::{prop, short_name, Items, ListRequest, PropertyTable, Source, TableCell};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

pub(crate) fn kinds() -> Vec<Arc<dyn KindFetcher>> {
    vec![
        kind("topic", fetch_topics, vec![Builder::RegionParent]),
        kind(
            "subscription",
            fetch_subscriptions,
            vec![
                Builder::resolve_one(
                    ResourceType::Topic,
                    Subscription::topic_name,
                    RelationKind::ParentOf,
                ),
                Builder::RegionParentIf(Subscription::is_detached),
            ],
        ),
    ]
}

fn fetch_topics(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Topic>, FetchError>> {
    let request = ListRequest::get(cycle.client.pubsub_url("topics"), Items::Key("topics"));
    cycle.collect(request, Some).boxed()
}

fn fetch_subscriptions(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Subscription>, FetchError>> {
    let request = ListRequest::get(
        cycle.client.pubsub_url("subscriptions"),
        Items::Key("subscriptions"),
    );
    cycle.collect(request, Some).boxed()
}

impl Source for Topic {
    const TYPE: ResourceType = ResourceType::Topic;

    fn native_id(&self) -> Option<String> {
        self.name.as_deref().map(|name| short_name(name).to_string())
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Topic> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", short(|t: &Topic| t.name.as_deref())),
                prop("KMSKey", value(|t: &Topic| t.kms_key_name.clone())),
                prop("Retention", value(|t: &Topic| t.message_retention_duration.clone())),
                prop("Labels", labels(|t: &Topic| &t.labels)),
            ]
        })
    }
}

impl Source for Subscription {
    const TYPE: ResourceType = ResourceType::Subscription;

    fn native_id(&self) -> Option<String> {
        self.name.as_deref().map(|name| short_name(name).to_string())
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Subscription> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", short(|s: &Subscription| s.name.as_deref())),
                prop("Topic", short(|s: &Subscription| s.topic.as_deref())),
                prop("AckDeadline", value(|s: &Subscription| s.ack_deadline_seconds)),
                prop(
                    "Retention",
                    value(|s: &Subscription| s.message_retention_duration.clone()),
                ),
                prop(
                    "PushEndpoint",
                    nested(
                        |s: &Subscription| s.push_config.as_ref(),
                        |p: &PushConfig| p.push_endpoint.clone(),
                    ),
                ),
                prop("Filter", value(|s: &Subscription| s.filter.clone())),
                prop("State", value(|s: &Subscription| s.state.clone())),
                prop("Labels", labels(|s: &Subscription| &s.labels)),
            ]
        })
    }
}
