//! Resource Transformer
//!
//! Turns a typed provider object into a graph [`Resource`]: checks the
//! object's shape, takes its native identifier and runs every extractor of
//! the type's property table concurrently.

use super::extract::ExtractError;
use super::registry::{PropertyDef, PropertyTable};
use crate::error::TransformError;
use crate::gcp::client::GcpClient;
use crate::graph::{Resource, ResourceType, Value};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;

/// A provider object shape that becomes one resource type
pub trait Source: DeserializeOwned + Send + Sync + 'static {
    const TYPE: ResourceType;

    /// `kind` the API stamps on objects of this shape, when it has one
    const KIND: Option<&'static str> = None;

    fn kind(&self) -> Option<&str> {
        None
    }

    /// Provider-native identifier; `None` or empty is an error
    fn native_id(&self) -> Option<String>;

    fn properties() -> &'static PropertyTable<Self>;
}

/// Builds resources from provider objects
#[derive(Clone)]
pub struct Transformer {
    client: GcpClient,
}

impl Transformer {
    /// `client` is handed to extractors that need their own API call
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }

    pub async fn transform<T: Source>(&self, source: &T) -> Result<Resource, TransformError> {
        if let (Some(expected), Some(found)) = (T::KIND, source.kind()) {
            if expected != found {
                return Err(TransformError::UnknownShape {
                    kind: T::TYPE,
                    found: found.to_string(),
                });
            }
        }

        let id = source
            .native_id()
            .filter(|id| !id.is_empty())
            .ok_or(TransformError::MissingId { kind: T::TYPE })?;
        let mut resource = Resource::new(T::TYPE, id);

        let extracted = try_join_all(
            T::properties()
                .iter()
                .map(|def| self.extract_property(def, source)),
        )
        .await?;

        for (name, value) in extracted.into_iter().flatten() {
            resource.set(name, value);
        }

        Ok(resource)
    }

    async fn extract_property<T: Source>(
        &self,
        def: &PropertyDef<T>,
        source: &T,
    ) -> Result<Option<(&'static str, Value)>, TransformError> {
        match def.extractor.extract(&self.client, source).await {
            Ok(value) => Ok(value.map(|v| (def.name, v))),
            Err(ExtractError::NotFound) => Ok(None),
            Err(ExtractError::Malformed(reason)) => Err(TransformError::Property {
                kind: T::TYPE,
                property: def.name,
                reason,
            }),
            Err(ExtractError::Api(source)) => Err(TransformError::Fetch {
                kind: T::TYPE,
                property: def.name,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::auth::Credentials;
    use crate::gcp::client::Endpoints;
    use crate::graph::ID_PROPERTY;
    use crate::model::compute::MetadataItem;
    use crate::resource::extract::{tag, time, value};
    use crate::resource::registry::{prop, TableCell};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        kind: Option<String>,
        name: Option<String>,
        status: Option<String>,
        created: Option<String>,
        #[serde(default)]
        items: Vec<MetadataItem>,
    }

    impl Source for Sample {
        const TYPE: ResourceType = ResourceType::Instance;
        const KIND: Option<&'static str> = Some("compute#instance");

        fn kind(&self) -> Option<&str> {
            self.kind.as_deref()
        }

        fn native_id(&self) -> Option<String> {
            self.name.clone()
        }

        fn properties() -> &'static PropertyTable<Self> {
            static TABLE: TableCell<Sample> = TableCell::new();
            TABLE.get_or_init(|| {
                vec![
                    prop("Name", value(|p: &Sample| p.name.clone())),
                    prop("State", value(|p: &Sample| p.status.clone())),
                    prop("CreateTime", time(|p: &Sample| p.created.as_deref())),
                    prop("Owner", tag(|p: &Sample| Some(p.items.as_slice()), "owner")),
                ]
            })
        }
    }

    fn transformer() -> Transformer {
        let client = GcpClient::with_credentials(
            "demo-project",
            "us-central1",
            Endpoints::default(),
            Credentials::fixed("t"),
        )
        .unwrap();
        Transformer::new(client)
    }

    fn sample(value: serde_json::Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_transform_sets_id_and_properties() {
        let source = sample(json!({
            "kind": "compute#instance",
            "name": "vm-1",
            "status": "RUNNING",
            "items": [{"key": "owner", "value": "team-a"}]
        }));
        let resource = transformer().transform(&source).await.unwrap();

        assert_eq!(resource.id, "vm-1");
        assert_eq!(resource.get(ID_PROPERTY), Some(&Value::from("vm-1")));
        assert_eq!(resource.get("State"), Some(&Value::from("RUNNING")));
        assert_eq!(resource.get("Owner"), Some(&Value::from("team-a")));
        assert!(resource.get("CreateTime").is_none());
    }

    #[tokio::test]
    async fn test_tag_miss_is_skipped() {
        let source = sample(json!({"name": "vm-1"}));
        let resource = transformer().transform(&source).await.unwrap();
        assert!(resource.get("Owner").is_none());
        assert!(resource.get("Name").is_some());
    }

    #[tokio::test]
    async fn test_malformed_property_aborts() {
        let source = sample(json!({"name": "vm-1", "created": "yesterday"}));
        let err = transformer().transform(&source).await.unwrap_err();
        assert!(matches!(
            err,
            TransformError::Property { property: "CreateTime", .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_shape_is_rejected() {
        let source = sample(json!({"kind": "compute#disk", "name": "disk-1"}));
        let err = transformer().transform(&source).await.unwrap_err();
        assert!(matches!(
            err,
            TransformError::UnknownShape { found, .. } if found == "compute#disk"
        ));
    }

    #[tokio::test]
    async fn test_missing_id_is_rejected() {
        for source in [sample(json!({})), sample(json!({"name": ""}))] {
            let err = transformer().transform(&source).await.unwrap_err();
            assert!(matches!(err, TransformError::MissingId { .. }));
        }
    }
}
