//! Collections
//!
//! A [`Collection`] fetches every resource kind of one service into a
//! [`Graph`]. A fetch runs in two waves:
//!
//! 1. Fetch wave: every enabled kind is listed, page by page, concurrently.
//!    Each provider object is transformed into a resource and kept, with its
//!    key, for the second wave. The first kind to fail fails the call.
//! 2. Relate wave: once every resource is in the graph, each kind runs its
//!    relation builders over its raw objects, again concurrently.
//!
//! Every graph holds one region anchor: the configured region for regional
//! services, `global` for the others.
//!
//! # Module Structure
//!
//! - [`cache`] - Per-cycle deduplication of shared listings
//! - [`relation`] - Declarative relation rules
//! - `compute`, `access`, `storage`, `dns`, `messaging` - Kinds of each service

pub mod cache;
pub mod relation;

mod access;
mod compute;
mod dns;
mod messaging;
mod storage;

use self::cache::Caches;
use self::relation::{relate_objects, Builder};
use crate::config::SyncConfig;
use crate::error::{Error, FetchError, RelateError};
use crate::gcp::client::GcpClient;
use crate::graph::{Graph, Resource, ResourceKey, ResourceType};
use crate::resource::{ListRequest, Pager, Source, Transformer};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Anchor id of services that are not regional
pub const GLOBAL: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    Compute,
    Access,
    Storage,
    Dns,
    Messaging,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::Compute,
        Service::Access,
        Service::Storage,
        Service::Dns,
        Service::Messaging,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Service::Compute => "compute",
            Service::Access => "access",
            Service::Storage => "storage",
            Service::Dns => "dns",
            Service::Messaging => "messaging",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Whether the service's resources are anchored to the configured region
    pub fn is_regional(&self) -> bool {
        matches!(self, Service::Compute | Service::Storage)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resources of one kind, with the raw objects they were built from
pub(crate) struct Fetched<T> {
    graph: Graph,
    objects: Vec<(ResourceKey, T)>,
}

impl<T> Fetched<T> {
    fn new() -> Self {
        Self {
            graph: Graph::new(),
            objects: Vec::new(),
        }
    }

    fn add(&mut self, resource: Resource, object: T) {
        self.objects.push((resource.key(), object));
        self.graph.add_resource(resource);
    }

    fn extend(&mut self, other: Fetched<T>) {
        self.graph.add_graph(other.graph);
        self.objects.extend(other.objects);
    }
}

/// State shared by the kinds of one fetch call
pub(crate) struct Cycle {
    client: GcpClient,
    transformer: Transformer,
    caches: Caches,
}

impl Cycle {
    fn new(client: GcpClient) -> Self {
        Self {
            transformer: Transformer::new(client.clone()),
            client,
            caches: Caches::default(),
        }
    }

    fn region(&self) -> &str {
        &self.client.region
    }

    /// List every page of `request` and transform the items `prepare` keeps
    ///
    /// Each page is transformed as soon as it arrives; the first error stops
    /// the listing.
    async fn collect<T: Source>(
        &self,
        request: ListRequest,
        prepare: impl Fn(T) -> Option<T> + Send,
    ) -> Result<Fetched<T>, FetchError> {
        let mut fetched = Fetched::new();
        let mut pager = Pager::<T>::new(&self.client, request);
        while let Some(page) = pager.next_page().await? {
            let page: Vec<T> = page.into_iter().filter_map(&prepare).collect();
            fetched.extend(self.transform_all(page).await?);
        }
        Ok(fetched)
    }

    async fn transform_all<T: Source>(
        &self,
        objects: impl IntoIterator<Item = T>,
    ) -> Result<Fetched<T>, FetchError> {
        let objects: Vec<T> = objects.into_iter().collect();
        let resources = try_join_all(objects.iter().map(|o| self.transformer.transform(o))).await?;

        let mut fetched = Fetched::new();
        for (resource, object) in resources.into_iter().zip(objects) {
            fetched.add(resource, object);
        }
        Ok(fetched)
    }
}

type FetchFn<T> = for<'a> fn(&'a Cycle) -> BoxFuture<'a, Result<Fetched<T>, FetchError>>;

/// A fetched kind whose objects still have to be related
pub(crate) struct FetchedKind {
    graph: Graph,
    pending: Box<dyn Pending>,
}

pub(crate) trait Pending: Send {
    fn is_empty(&self) -> bool;

    fn relate<'a>(
        self: Box<Self>,
        graph: &'a Graph,
        region: &'a ResourceKey,
    ) -> BoxFuture<'a, Result<(), RelateError>>;
}

struct PendingObjects<T> {
    objects: Vec<(ResourceKey, T)>,
    builders: Arc<Vec<Builder<T>>>,
}

impl<T: Source> Pending for PendingObjects<T> {
    fn is_empty(&self) -> bool {
        self.objects.is_empty() || self.builders.is_empty()
    }

    fn relate<'a>(
        self: Box<Self>,
        graph: &'a Graph,
        region: &'a ResourceKey,
    ) -> BoxFuture<'a, Result<(), RelateError>> {
        async move { relate_objects(&self.builders, graph, region, &self.objects).await }.boxed()
    }
}

/// One resource kind of a service, type-erased
pub(crate) trait KindFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch<'a>(&'a self, cycle: &'a Cycle) -> BoxFuture<'a, Result<FetchedKind, FetchError>>;
}

struct Kind<T> {
    name: &'static str,
    fetch: FetchFn<T>,
    builders: Arc<Vec<Builder<T>>>,
}

impl<T: Source> KindFetcher for Kind<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn fetch<'a>(&'a self, cycle: &'a Cycle) -> BoxFuture<'a, Result<FetchedKind, FetchError>> {
        async move {
            let fetched = (self.fetch)(cycle).await?;
            Ok(FetchedKind {
                graph: fetched.graph,
                pending: Box::new(PendingObjects {
                    objects: fetched.objects,
                    builders: self.builders.clone(),
                }),
            })
        }
        .boxed()
    }
}

pub(crate) fn kind<T: Source>(
    name: &'static str,
    fetch: FetchFn<T>,
    builders: Vec<Builder<T>>,
) -> Arc<dyn KindFetcher> {
    Arc::new(Kind {
        name,
        fetch,
        builders: Arc::new(builders),
    })
}

/// All resource kinds of one service
pub struct Collection {
    service: Service,
    client: GcpClient,
    sync: SyncConfig,
    kinds: Vec<Arc<dyn KindFetcher>>,
}

impl Collection {
    pub fn new(service: Service, client: GcpClient, sync: SyncConfig) -> Self {
        let kinds = match service {
            Service::Compute => compute::kinds(&client),
            Service::Access => access::kinds(),
            Service::Storage => storage::kinds(),
            Service::Dns => dns::kinds(),
            Service::Messaging => messaging::kinds(),
        };
        Self {
            service,
            client,
            sync,
            kinds,
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    /// Resource kinds of the service, in fetch order
    pub fn kind_names(&self) -> Vec<&'static str> {
        self.kinds.iter().map(|k| k.name()).collect()
    }

    fn anchor_id(&self) -> &str {
        if self.service.is_regional() {
            &self.client.region
        } else {
            GLOBAL
        }
    }

    /// Fetch every enabled kind of the service and relate the resources
    pub async fn fetch_resources(&self) -> Result<Graph, Error> {
        let service = self.service;
        if !self.sync.is_service_enabled(service.name()) {
            tracing::debug!("sync: *disabled* for service {}", service);
            return Ok(Graph::new());
        }

        let graph = Arc::new(Graph::new());
        let region = Resource::region(self.anchor_id());
        let region_key = region.key();
        graph.add_resource(region);

        let pending = self.fetch_wave(&graph).await?;

        let anchors = graph.get_all_resources(&[ResourceType::Region]).len();
        if anchors != 1 {
            return Err(Error::RegionAnchor {
                service,
                found: anchors,
            });
        }

        self.relate_wave(&graph, &region_key, pending).await?;

        let graph = graph.take();
        tracing::info!(
            "{}: fetched {} resources and {} relations in {}",
            service,
            graph.len(),
            graph.edges().len(),
            region_key.id
        );
        Ok(graph)
    }

    async fn fetch_wave(
        &self,
        graph: &Arc<Graph>,
    ) -> Result<Vec<(&'static str, Box<dyn Pending>)>, Error> {
        let service = self.service;
        let cycle = Arc::new(Cycle::new(self.client.clone()));
        let mut tasks = JoinSet::new();

        for kind in &self.kinds {
            if !self.sync.is_kind_enabled(service.name(), kind.name()) {
                tracing::debug!("sync: *disabled* for resource {}[{}]", service, kind.name());
                continue;
            }
            let (kind, cycle, graph) = (kind.clone(), cycle.clone(), graph.clone());
            tasks.spawn(async move {
                let result = kind.fetch(&cycle).await.map(|fetched| {
                    graph.add_graph(fetched.graph);
                    fetched.pending
                });
                (kind.name(), result)
            });
        }

        // Siblings of a failed kind run to completion; the first failure wins.
        let mut first_error = None;
        let mut pending = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(objects))) => pending.push((name, objects)),
                Ok((name, Err(source))) => {
                    tracing::debug!("{}[{}]: fetch failed: {}", service, name, source);
                    first_error.get_or_insert(Error::from_fetch(service, name, source));
                }
                Err(join_error) => {
                    first_error.get_or_insert(Error::Task {
                        service,
                        reason: join_error.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(pending),
        }
    }

    async fn relate_wave(
        &self,
        graph: &Arc<Graph>,
        region: &ResourceKey,
        pending: Vec<(&'static str, Box<dyn Pending>)>,
    ) -> Result<(), Error> {
        let service = self.service;
        let mut tasks = JoinSet::new();

        for (name, objects) in pending.into_iter().filter(|(_, o)| !o.is_empty()) {
            let (graph, region) = (graph.clone(), region.clone());
            tasks.spawn(async move { (name, objects.relate(&graph, &region).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((_, Ok(()))) => continue,
                Ok((kind, Err(source))) => Error::Relate {
                    service,
                    kind,
                    source,
                },
                Err(join_error) => Error::Task {
                    service,
                    reason: join_error.to_string(),
                },
            };
            tasks.abort_all();
            return Err(failure);
        }
        Ok(())
    }

    /// Fetch a single kind, bypassing the sync toggles
    ///
    /// The graph holds the kind's resources only: no region anchor and no
    /// relations.
    pub async fn fetch_by_type(&self, kind: &str) -> Result<Graph, Error> {
        let fetcher = self
            .kinds
            .iter()
            .find(|k| k.name() == kind)
            .ok_or_else(|| Error::UnknownKind {
                service: self.service,
                kind: kind.to_string(),
            })?;

        let cycle = Cycle::new(self.client.clone());
        let fetched = fetcher
            .fetch(&cycle)
            .await
            .map_err(|source| Error::from_fetch(self.service, fetcher.name(), source))?;
        Ok(fetched.graph)
    }
}
