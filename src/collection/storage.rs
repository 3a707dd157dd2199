//! Cloud Storage kinds
//!
//! Buckets are listed project-wide, once per cycle, and kept when their
//! location is the configured region. Objects are listed for each of those
//! buckets.

use super::relation::{Builder, RelationKind};
use super::{kind, Cycle, Fetched, KindFetcher};
use crate::error::FetchError;
use crate::gcp::client::GcpClient;
use crate::graph::{Grant, ResourceType, Value};
use crate::model::storage::{Bucket, BucketPolicy, Object, Versioning};
use crate::resource::extract::{
    fetch, int_string, labels, nested, time, value, ExtractError, ExtractResult,
};
use crate::resource::{fetch_all, prop, Items, ListRequest, PropertyTable, Source, TableCell};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;

pub(crate) fn kinds() -> Vec<Arc<dyn KindFetcher>> {
    vec![
        kind("bucket", fetch_buckets, vec![Builder::RegionParent]),
        kind(
            "object",
            fetch_objects,
            vec![Builder::resolve_one(
                ResourceType::Bucket,
                Object::bucket_name,
                RelationKind::ParentOf,
            )],
        ),
    ]
}

/// Buckets located in the configured region
async fn buckets_in_region(cycle: &Cycle) -> Result<Vec<Bucket>, FetchError> {
    let all = cycle
        .caches
        .buckets
        .get_or_fetch(|| async {
            let request = ListRequest::get(cycle.client.storage_url("b"), Items::Key("items"))
                .query("project", cycle.client.project_id.clone());
            let buckets: Vec<Bucket> = fetch_all(&cycle.client, request).await?;
            Ok::<_, FetchError>(Arc::new(buckets))
        })
        .await?;

    Ok(all
        .iter()
        .filter(|b| b.is_in_region(cycle.region()))
        .cloned()
        .collect())
}

fn fetch_buckets(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Bucket>, FetchError>> {
    regional_buckets(cycle).boxed()
}

async fn regional_buckets(cycle: &Cycle) -> Result<Fetched<Bucket>, FetchError> {
    let buckets = buckets_in_region(cycle).await?;
    cycle.transform_all(buckets).await
}

fn fetch_objects(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Object>, FetchError>> {
    bucket_objects(cycle).boxed()
}

async fn bucket_objects(cycle: &Cycle) -> Result<Fetched<Object>, FetchError> {
    let buckets = buckets_in_region(cycle).await?;
    let per_bucket = try_join_all(buckets.iter().filter_map(|b| b.name.as_deref()).map(|name| {
        let url = cycle.client.storage_bucket_url(name, "o");
        cycle.collect(ListRequest::get(url, Items::Key("items")), Some)
    }))
    .await?;

    let mut fetched = Fetched::new();
    for objects in per_bucket {
        fetched.extend(objects);
    }
    Ok(fetched)
}

/// IAM grants of a bucket, read from its own policy
fn bucket_grants<'a>(client: &'a GcpClient, bucket: &'a Bucket) -> BoxFuture<'a, ExtractResult> {
    async move {
        let Some(name) = bucket.name.as_deref() else {
            return Ok(None);
        };
        let response = client
            .get(&client.storage_bucket_url(name, "iam"), &[])
            .await
            .map_err(ExtractError::Api)?;
        let policy: BucketPolicy = serde_json::from_value(response)
            .map_err(|e| ExtractError::Malformed(format!("bucket policy: {}", e)))?;

        let grants: Vec<Grant> = policy
            .bindings
            .iter()
            .flat_map(|b| b.members.iter().map(|member| grant(&b.role, member)))
            .collect();
        Ok((!grants.is_empty()).then(|| Value::from(grants)))
    }
    .boxed()
}

/// `user:alice@example.com` becomes grantee `alice@example.com` of type
/// `user`; special members such as `allUsers` are their own type
fn grant(role: &str, member: &str) -> Grant {
    let (grantee_type, grantee) = member.split_once(':').unwrap_or((member, member));
    Grant {
        permission: role.to_string(),
        grantee: grantee.to_string(),
        grantee_type: grantee_type.to_string(),
    }
}

impl Source for Bucket {
    const TYPE: ResourceType = ResourceType::Bucket;
    const KIND: Option<&'static str> = Some("storage#bucket");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Bucket> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|b: &Bucket| b.name.clone())),
                prop("Location", value(|b: &Bucket| b.location.clone())),
                prop("LocationType", value(|b: &Bucket| b.location_type.clone())),
                prop("StorageClass", value(|b: &Bucket| b.storage_class.clone())),
                prop(
                    "Versioning",
                    nested(|b: &Bucket| b.versioning.as_ref(), |v: &Versioning| v.enabled),
                ),
                prop("Labels", labels(|b: &Bucket| &b.labels)),
                prop("CreateTime", time(|b: &Bucket| b.time_created.as_deref())),
                prop("ModifiedTime", time(|b: &Bucket| b.updated.as_deref())),
                prop("Grants", fetch(bucket_grants)),
            ]
        })
    }
}

impl Source for Object {
    const TYPE: ResourceType = ResourceType::Object;
    const KIND: Option<&'static str> = Some("storage#object");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Object names are only unique within their bucket
    fn native_id(&self) -> Option<String> {
        Some(format!("{}/{}", self.bucket.as_deref()?, self.name.as_deref()?))
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Object> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|o: &Object| o.name.clone())),
                prop("Bucket", value(|o: &Object| o.bucket.clone())),
                prop("Size", int_string(|o: &Object| o.size.as_deref())),
                prop("ContentType", value(|o: &Object| o.content_type.clone())),
                prop("StorageClass", value(|o: &Object| o.storage_class.clone())),
                prop("MD5", value(|o: &Object| o.md5_hash.clone())),
                prop("CreateTime", time(|o: &Object| o.time_created.as_deref())),
                prop("ModifiedTime", time(|o: &Object| o.updated.as_deref())),
            ]
        })
    }
}
