//! In-memory resource graph
//!
//! A thread-safe store of [`Resource`] nodes and the relations between them.
//! Fetchers each build their own sub-graph, which the collection then merges
//! into a shared one with [`Graph::add_graph`]. Merging is a set union, so the
//! order in which sub-graphs arrive does not change the result.
//!
//! # Relations
//!
//! - `ParentOf` - containment (`network` is parent of `subnetwork`)
//! - `AppliesOn` - one resource acts on another (`firewall` applies on `instance`)

mod resource;

pub use resource::{
    hash_id, FirewallRule, Grant, KeyValue, PortRange, Resource, ResourceKey, ResourceType,
    Value, ID_PROPERTY,
};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Relation stored between two resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    ParentOf,
    AppliesOn,
}

/// `subject` --relation--> `object`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub subject: ResourceKey,
    pub relation: Relation,
    pub object: ResourceKey,
}

#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("resource {0} not found")]
    NotFound(ResourceKey),
}

/// Serializable view of a graph
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub resources: Vec<Resource>,
    pub relations: Vec<Edge>,
}

#[derive(Debug, Default)]
struct Inner {
    resources: BTreeMap<ResourceKey, Resource>,
    edges: BTreeSet<Edge>,
}

impl Inner {
    fn insert(&mut self, resource: Resource) {
        match self.resources.get_mut(&resource.key()) {
            Some(existing) => existing.properties.extend(resource.properties),
            None => {
                self.resources.insert(resource.key(), resource);
            }
        }
    }
}

/// Thread-safe resource graph
#[derive(Debug, Default)]
pub struct Graph {
    inner: RwLock<Inner>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a resource; properties of an already known resource are merged
    pub fn add_resource(&self, resource: Resource) {
        self.write().insert(resource);
    }

    pub fn add_parent_relation(&self, parent: &ResourceKey, child: &ResourceKey) {
        self.add_edge(parent, Relation::ParentOf, child);
    }

    pub fn add_applies_on_relation(&self, subject: &ResourceKey, object: &ResourceKey) {
        self.add_edge(subject, Relation::AppliesOn, object);
    }

    fn add_edge(&self, subject: &ResourceKey, relation: Relation, object: &ResourceKey) {
        self.write().edges.insert(Edge {
            subject: subject.clone(),
            relation,
            object: object.clone(),
        });
    }

    /// Move the content out of a shared graph, leaving it empty
    pub fn take(&self) -> Graph {
        Graph {
            inner: RwLock::new(std::mem::take(&mut *self.write())),
        }
    }

    /// Merge every resource and relation of `other` into this graph
    pub fn add_graph(&self, other: Graph) {
        let other = other.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut inner = self.write();
        for resource in other.resources.into_values() {
            inner.insert(resource);
        }
        inner.edges.extend(other.edges);
    }

    pub fn get_resource(&self, kind: ResourceType, id: &str) -> Result<Resource, GraphError> {
        let key = ResourceKey::new(kind, id);
        self.read()
            .resources
            .get(&key)
            .cloned()
            .ok_or(GraphError::NotFound(key))
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.read().resources.contains_key(key)
    }

    /// All resources of the given kinds, ordered by kind then id
    pub fn get_all_resources(&self, kinds: &[ResourceType]) -> Vec<Resource> {
        self.read()
            .resources
            .values()
            .filter(|r| kinds.contains(&r.kind))
            .cloned()
            .collect()
    }

    /// Resources whose property `name` equals `value` (or, for lists, holds it)
    pub fn find_resources_by_property(&self, name: &str, value: &Value) -> Vec<Resource> {
        self.read()
            .resources
            .values()
            .filter(|r| r.get(name).is_some_and(|v| v.contains(value)))
            .cloned()
            .collect()
    }

    /// Direct children of `parent`
    pub fn children(&self, parent: &ResourceKey) -> Vec<ResourceKey> {
        self.related(parent, Relation::ParentOf)
    }

    /// Resources that `subject` applies on
    pub fn applies_on(&self, subject: &ResourceKey) -> Vec<ResourceKey> {
        self.related(subject, Relation::AppliesOn)
    }

    fn related(&self, subject: &ResourceKey, relation: Relation) -> Vec<ResourceKey> {
        self.read()
            .edges
            .iter()
            .filter(|e| &e.subject == subject && e.relation == relation)
            .map(|e| e.object.clone())
            .collect()
    }

    /// Resources applying on `object` (reverse of [`Graph::applies_on`])
    pub fn resources_applying_on(&self, object: &ResourceKey) -> Vec<ResourceKey> {
        self.read()
            .edges
            .iter()
            .filter(|e| &e.object == object && e.relation == Relation::AppliesOn)
            .map(|e| e.subject.clone())
            .collect()
    }

    /// Depth-first walk of the containment tree below `root`
    ///
    /// `visit` is called once per descendant with its depth (children of
    /// `root` are at depth 1).
    pub fn visit_children(&self, root: &ResourceKey, visit: &mut impl FnMut(&ResourceKey, usize)) {
        let inner = self.read();
        let mut seen = HashSet::new();
        let mut stack = vec![(root.clone(), 0usize)];

        while let Some((key, depth)) = stack.pop() {
            let children: Vec<&ResourceKey> = inner
                .edges
                .iter()
                .filter(|e| e.subject == key && e.relation == Relation::ParentOf)
                .map(|e| &e.object)
                .collect();
            for child in children.into_iter().rev() {
                if seen.insert(child.clone()) {
                    visit(child, depth + 1);
                    stack.push((child.clone(), depth + 1));
                }
            }
        }
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.read().edges.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().resources.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.read();
        Snapshot {
            resources: inner.resources.values().cloned().collect(),
            relations: inner.edges.iter().cloned().collect(),
        }
    }
}
