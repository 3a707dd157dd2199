//! Relation builders
//!
//! Each resource kind declares an ordered list of [`Builder`]s. During the
//! relation wave every builder runs against every raw object of the kind and
//! links the object's resource to the resources it references.
//!
//! References are normalised with [`short_name`], so a full resource URL and
//! a bare name resolve to the same target. Empty references are skipped. A
//! reference naming a resource that is not in the graph is an error: the
//! collection lists every kind it references, so a miss means the inventory
//! is inconsistent.

use crate::error::RelateError;
use crate::graph::{Graph, ResourceKey, ResourceType, Value};
use crate::resource::short_name;
use futures::future::BoxFuture;

/// Direction of a link between a subject and the resource it references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The target contains the subject
    ParentOf,
    /// The target applies on the subject
    AppliesOn,
    /// The subject applies on the target
    DependingOn,
}

pub type FieldFn<T> = for<'a> fn(&'a T) -> Option<&'a str>;
pub type StructListFn<T> = for<'a> fn(&'a T) -> Vec<Option<&'a str>>;
pub type StringListFn<T> = for<'a> fn(&'a T) -> &'a [String];
pub type AliasFn<T> = for<'a> fn(&'a T) -> Vec<&'a str>;
pub type PredicateFn<T> = fn(&T) -> bool;
pub type ScanFn<T> = fn(&Graph, &ResourceKey, &T) -> Result<(), RelateError>;
pub type LookupFn<T> = Box<
    dyn for<'a> Fn(&'a Graph, &'a ResourceKey, &'a T) -> BoxFuture<'a, Result<(), RelateError>>
        + Send
        + Sync,
>;

/// Declarative link from a field of the raw object to target resources
pub enum Rule<T> {
    ResolveOne {
        target: ResourceType,
        field: FieldFn<T>,
        relation: RelationKind,
    },
    /// Sub-structures that may or may not carry the reference
    ResolveManyFromStructList {
        target: ResourceType,
        list: StructListFn<T>,
        relation: RelationKind,
    },
    ResolveManyFromStringList {
        target: ResourceType,
        list: StringListFn<T>,
        relation: RelationKind,
    },
}

impl<T> Rule<T> {
    pub fn apply(
        &self,
        graph: &Graph,
        subject: &ResourceKey,
        source: &T,
    ) -> Result<(), RelateError> {
        match self {
            Rule::ResolveOne {
                target,
                field,
                relation,
            } => match field(source) {
                Some(reference) => link(graph, subject, *target, reference, *relation),
                None => Ok(()),
            },
            Rule::ResolveManyFromStructList {
                target,
                list,
                relation,
            } => list(source)
                .into_iter()
                .flatten()
                .try_for_each(|reference| link(graph, subject, *target, reference, *relation)),
            Rule::ResolveManyFromStringList {
                target,
                list,
                relation,
            } => list(source)
                .iter()
                .try_for_each(|reference| link(graph, subject, *target, reference, *relation)),
        }
    }
}

pub enum Builder<T> {
    Rule(Rule<T>),
    /// The region anchor contains the subject
    RegionParent,
    /// The region anchor contains the subject when the predicate holds
    RegionParentIf(PredicateFn<T>),
    /// Link to the resource whose `property` equals a name alias; a name
    /// matching no resource is logged and skipped
    Alias {
        target: ResourceType,
        property: &'static str,
        aliases: AliasFn<T>,
        relation: RelationKind,
    },
    /// Hand-written linking against the resources already in the graph
    Scan(ScanFn<T>),
    /// Hand-written linking that needs its own API call
    Lookup(LookupFn<T>),
}

impl<T> Builder<T> {
    pub fn resolve_one(target: ResourceType, field: FieldFn<T>, relation: RelationKind) -> Self {
        Builder::Rule(Rule::ResolveOne {
            target,
            field,
            relation,
        })
    }

    pub fn resolve_many(
        target: ResourceType,
        list: StructListFn<T>,
        relation: RelationKind,
    ) -> Self {
        Builder::Rule(Rule::ResolveManyFromStructList {
            target,
            list,
            relation,
        })
    }

    pub fn resolve_strings(
        target: ResourceType,
        list: StringListFn<T>,
        relation: RelationKind,
    ) -> Self {
        Builder::Rule(Rule::ResolveManyFromStringList {
            target,
            list,
            relation,
        })
    }

    pub fn lookup<F>(lookup: F) -> Self
    where
        F: for<'a> Fn(&'a Graph, &'a ResourceKey, &'a T) -> BoxFuture<'a, Result<(), RelateError>>
            + Send
            + Sync
            + 'static,
    {
        Builder::Lookup(Box::new(lookup))
    }

    pub async fn apply(
        &self,
        graph: &Graph,
        region: &ResourceKey,
        subject: &ResourceKey,
        source: &T,
    ) -> Result<(), RelateError> {
        match self {
            Builder::Rule(rule) => rule.apply(graph, subject, source),
            Builder::RegionParent => {
                graph.add_parent_relation(region, subject);
                Ok(())
            }
            Builder::RegionParentIf(applies) => {
                if applies(source) {
                    graph.add_parent_relation(region, subject);
                }
                Ok(())
            }
            Builder::Alias {
                target,
                property,
                aliases,
                relation,
            } => {
                for alias in aliases(source) {
                    resolve_alias(graph, subject, *target, property, alias, *relation);
                }
                Ok(())
            }
            Builder::Scan(scan) => scan(graph, subject, source),
            Builder::Lookup(lookup) => lookup(graph, subject, source).await,
        }
    }
}

/// Run every builder, in order, on every object
pub async fn relate_objects<T>(
    builders: &[Builder<T>],
    graph: &Graph,
    region: &ResourceKey,
    objects: &[(ResourceKey, T)],
) -> Result<(), RelateError> {
    for (subject, source) in objects {
        for builder in builders {
            builder.apply(graph, region, subject, source).await?;
        }
    }
    Ok(())
}

/// Link `subject` to the `target_kind` resource named by `reference`
pub fn link(
    graph: &Graph,
    subject: &ResourceKey,
    target_kind: ResourceType,
    reference: &str,
    relation: RelationKind,
) -> Result<(), RelateError> {
    let id = short_name(reference);
    if id.is_empty() {
        return Ok(());
    }
    let target = ResourceKey::new(target_kind, id);
    if !graph.contains(&target) {
        return Err(RelateError::MissingTarget {
            subject: subject.clone(),
            target,
        });
    }
    add_relation(graph, subject, &target, relation);
    Ok(())
}

fn add_relation(
    graph: &Graph,
    subject: &ResourceKey,
    target: &ResourceKey,
    relation: RelationKind,
) {
    match relation {
        RelationKind::ParentOf => graph.add_parent_relation(target, subject),
        RelationKind::AppliesOn => graph.add_applies_on_relation(target, subject),
        RelationKind::DependingOn => graph.add_applies_on_relation(subject, target),
    }
}

fn resolve_alias(
    graph: &Graph,
    subject: &ResourceKey,
    target: ResourceType,
    property: &str,
    alias: &str,
    relation: RelationKind,
) {
    let matches: Vec<ResourceKey> = graph
        .find_resources_by_property(property, &Value::from(alias))
        .into_iter()
        .filter(|r| r.kind == target)
        .map(|r| r.key())
        .collect();

    match matches.as_slice() {
        [found] => add_relation(graph, subject, found, relation),
        [] => tracing::warn!("{}: no {} named '{}'. Ignoring it.", subject, target, alias),
        _ => tracing::warn!(
            "{}: {} resources of type {} are named '{}'. Ignoring it.",
            subject,
            matches.len(),
            target,
            alias
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Relation, Resource};
    use crate::model::compute::{Disk, Subnetwork};
    use crate::model::iam::ServiceAccount;
    use serde_json::json;

    fn key(kind: ResourceType, id: &str) -> ResourceKey {
        ResourceKey::new(kind, id)
    }

    fn graph_with(resources: &[(ResourceType, &str)]) -> (Graph, ResourceKey) {
        let graph = Graph::new();
        let region = Resource::region("us-central1");
        let region_key = region.key();
        graph.add_resource(region);
        for (kind, id) in resources {
            graph.add_resource(Resource::new(*kind, *id));
        }
        (graph, region_key)
    }

    fn subnet(network: &str) -> Subnetwork {
        serde_json::from_value(json!({"name": "subnet-a", "network": network})).unwrap()
    }

    fn subnet_rule() -> Builder<Subnetwork> {
        Builder::resolve_one(
            ResourceType::Network,
            Subnetwork::network_link,
            RelationKind::ParentOf,
        )
    }

    #[tokio::test]
    async fn test_resolve_one_links_by_short_name() {
        let (graph, region) = graph_with(&[
            (ResourceType::Network, "vpc-1"),
            (ResourceType::Subnetwork, "subnet-a"),
        ]);
        let subject = key(ResourceType::Subnetwork, "subnet-a");
        let source = subnet("https://compute.test/projects/p/global/networks/vpc-1");

        subnet_rule()
            .apply(&graph, &region, &subject, &source)
            .await
            .unwrap();

        assert_eq!(graph.children(&key(ResourceType::Network, "vpc-1")), vec![subject]);
    }

    #[tokio::test]
    async fn test_empty_reference_is_skipped() {
        let (graph, region) = graph_with(&[(ResourceType::Subnetwork, "subnet-a")]);
        let subject = key(ResourceType::Subnetwork, "subnet-a");

        subnet_rule()
            .apply(&graph, &region, &subject, &subnet(""))
            .await
            .unwrap();

        assert!(graph.edges().is_empty());
    }

    #[tokio::test]
    async fn test_missing_target_is_an_error() {
        let (graph, region) = graph_with(&[(ResourceType::Subnetwork, "subnet-a")]);
        let subject = key(ResourceType::Subnetwork, "subnet-a");

        let err = subnet_rule()
            .apply(&graph, &region, &subject, &subnet("vpc-missing"))
            .await
            .unwrap_err();

        match err {
            RelateError::MissingTarget { target, .. } => {
                assert_eq!(target, key(ResourceType::Network, "vpc-missing"))
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_depending_on_swaps_direction() {
        let (graph, region) = graph_with(&[
            (ResourceType::Disk, "disk-1"),
            (ResourceType::Instance, "vm-1"),
            (ResourceType::Instance, "vm-2"),
        ]);
        let disk: Disk = serde_json::from_value(json!({
            "name": "disk-1",
            "users": [
                "https://compute.test/projects/p/zones/us-central1-a/instances/vm-1",
                "vm-2"
            ]
        }))
        .unwrap();
        let subject = key(ResourceType::Disk, "disk-1");
        let builder = Builder::resolve_strings(
            ResourceType::Instance,
            Disk::user_links,
            RelationKind::DependingOn,
        );

        builder.apply(&graph, &region, &subject, &disk).await.unwrap();

        assert_eq!(
            graph.applies_on(&subject),
            vec![
                key(ResourceType::Instance, "vm-1"),
                key(ResourceType::Instance, "vm-2")
            ]
        );
    }

    #[tokio::test]
    async fn test_relating_fresh_graphs_is_idempotent() {
        let resources = [
            (ResourceType::Network, "vpc-1"),
            (ResourceType::Subnetwork, "subnet-a"),
        ];
        let subject = key(ResourceType::Subnetwork, "subnet-a");
        let objects = vec![(subject.clone(), subnet("vpc-1"))];
        let builders = vec![Builder::RegionParent, subnet_rule()];

        let (first, region) = graph_with(&resources);
        relate_objects(&builders, &first, &region, &objects).await.unwrap();
        let (second, region) = graph_with(&resources);
        relate_objects(&builders, &second, &region, &objects).await.unwrap();

        let edges = first.edges();
        assert_eq!(edges, second.edges());
        assert_eq!(edges.len(), 2);
        assert!(edges
            .iter()
            .all(|e| e.relation == Relation::ParentOf && e.object == subject));
    }

    #[tokio::test]
    async fn test_region_parent_if_checks_the_object() {
        let (graph, region) = graph_with(&[
            (ResourceType::Subnetwork, "subnet-a"),
            (ResourceType::Subnetwork, "subnet-b"),
        ]);
        fn has_network(subnet: &Subnetwork) -> bool {
            subnet.network_link().is_some_and(|n| !n.is_empty())
        }
        let builder = Builder::RegionParentIf(has_network);

        let linked = key(ResourceType::Subnetwork, "subnet-a");
        let skipped = key(ResourceType::Subnetwork, "subnet-b");
        builder.apply(&graph, &region, &linked, &subnet("vpc-1")).await.unwrap();
        builder.apply(&graph, &region, &skipped, &subnet("")).await.unwrap();

        assert_eq!(graph.children(&region), vec![linked]);
    }

    #[tokio::test]
    async fn test_unknown_alias_is_skipped() {
        let (graph, region) = graph_with(&[(ResourceType::ServiceAccount, "sa@p.iam")]);
        let mut custom = Resource::new(ResourceType::Role, "auditor");
        custom.set("Name", "projects/p/roles/auditor");
        graph.add_resource(custom);

        let mut account: ServiceAccount =
            serde_json::from_value(json!({"email": "sa@p.iam"})).unwrap();
        account.bound_roles = vec![
            "roles/viewer".to_string(),
            "projects/p/roles/auditor".to_string(),
        ];
        let subject = key(ResourceType::ServiceAccount, "sa@p.iam");
        let builder = Builder::Alias {
            target: ResourceType::Role,
            property: "Name",
            aliases: ServiceAccount::bound_role_names,
            relation: RelationKind::AppliesOn,
        };

        builder
            .apply(&graph, &region, &subject, &account)
            .await
            .unwrap();

        assert_eq!(
            graph.resources_applying_on(&subject),
            vec![key(ResourceType::Role, "auditor")]
        );
    }
}
