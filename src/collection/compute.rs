//! Compute Engine kinds
//!
//! Networks, firewalls, routes and snapshots are global; subnetworks,
//! addresses and backend services are listed for the configured region;
//! zonal kinds come from aggregated lists and are kept when their zone is in
//! the region.

use super::relation::{link, Builder, RelationKind};
use super::{kind, Cycle, Fetched, KindFetcher};
use crate::error::{FetchError, RelateError};
use crate::gcp::auth::region_of_zone;
use crate::gcp::client::GcpClient;
use crate::graph::{Graph, ResourceKey, ResourceType, Value};
use crate::model::compute::{
    Address, AttachedDisk, Backend, BackendService, Disk, Firewall, Instance, InstanceGroup,
    InstanceGroupMember, InstanceServiceAccount, NamedPort, Network, NetworkInterface,
    NetworkPeering, Route, RoutingConfig, Scheduling, SecondaryRange, Snapshot, Subnetwork, Zone,
};
use crate::resource::extract::{
    any_true, firewall_rules, int_string, labels, nested, project, short, short_names, strings,
    tag, time, value,
};
use crate::resource::{
    fetch_all, prop, short_name, Items, ListRequest, PropertyTable, Source, TableCell,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn kinds(client: &GcpClient) -> Vec<Arc<dyn KindFetcher>> {
    vec![
        kind("zone", fetch_zones, vec![Builder::RegionParent]),
        kind("network", fetch_networks, vec![Builder::RegionParent]),
        kind(
            "subnetwork",
            fetch_subnetworks,
            vec![Builder::resolve_one(
                ResourceType::Network,
                Subnetwork::network_link,
                RelationKind::ParentOf,
            )],
        ),
        kind(
            "firewall",
            fetch_firewalls,
            vec![
                Builder::resolve_one(
                    ResourceType::Network,
                    Firewall::network_link,
                    RelationKind::ParentOf,
                ),
                Builder::Scan(firewall_targets),
            ],
        ),
        kind(
            "route",
            fetch_routes,
            vec![Builder::resolve_one(
                ResourceType::Network,
                Route::network_link,
                RelationKind::ParentOf,
            )],
        ),
        kind(
            "instance",
            fetch_instances,
            vec![Builder::resolve_many(
                ResourceType::Subnetwork,
                Instance::subnetwork_links,
                RelationKind::ParentOf,
            )],
        ),
        kind(
            "disk",
            fetch_disks,
            vec![
                Builder::resolve_one(ResourceType::Zone, Disk::zone_link, RelationKind::ParentOf),
                Builder::resolve_strings(
                    ResourceType::Instance,
                    Disk::user_links,
                    RelationKind::DependingOn,
                ),
            ],
        ),
        kind("snapshot", fetch_snapshots, vec![Builder::RegionParent]),
        kind(
            "address",
            fetch_addresses,
            vec![
                Builder::RegionParent,
                Builder::resolve_one(
                    ResourceType::Subnetwork,
                    Address::subnetwork_link,
                    RelationKind::DependingOn,
                ),
            ],
        ),
        kind(
            "instancegroup",
            fetch_instance_groups,
            vec![
                Builder::resolve_one(
                    ResourceType::Zone,
                    InstanceGroup::zone_link,
                    RelationKind::ParentOf,
                ),
                Builder::RegionParentIf(InstanceGroup::is_regional),
                instance_group_members(client),
            ],
        ),
        kind(
            "backendservice",
            fetch_backend_services,
            vec![
                Builder::RegionParent,
                Builder::resolve_many(
                    ResourceType::InstanceGroup,
                    BackendService::instance_group_links,
                    RelationKind::DependingOn,
                ),
            ],
        ),
    ]
}

/// Whether a zone URL or name lies in `region`
fn in_region(zone: Option<&str>, region: &str) -> bool {
    zone.map(short_name).and_then(region_of_zone) == Some(region)
}

fn fetch_zones(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Zone>, FetchError>> {
    let region = cycle.region().to_string();
    let request = ListRequest::get(cycle.client.compute_url("zones"), Items::Key("items"));
    cycle
        .collect(request, move |z: Zone| {
            let keep = z.region.as_deref().map(short_name) == Some(region.as_str());
            keep.then_some(z)
        })
        .boxed()
}

fn fetch_networks(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Network>, FetchError>> {
    let request = ListRequest::get(
        cycle.client.compute_global_url("networks"),
        Items::Key("items"),
    );
    cycle.collect(request, Some).boxed()
}

fn fetch_subnetworks(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Subnetwork>, FetchError>> {
    let request = ListRequest::get(
        cycle.client.compute_regional_url("subnetworks"),
        Items::Key("items"),
    );
    cycle.collect(request, Some).boxed()
}

fn fetch_firewalls(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Firewall>, FetchError>> {
    let request = ListRequest::get(
        cycle.client.compute_global_url("firewalls"),
        Items::Key("items"),
    );
    cycle.collect(request, Some).boxed()
}

fn fetch_routes(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Route>, FetchError>> {
    let request = ListRequest::get(cycle.client.compute_global_url("routes"), Items::Key("items"));
    cycle.collect(request, Some).boxed()
}

fn fetch_instances(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Instance>, FetchError>> {
    let region = cycle.region().to_string();
    let request = ListRequest::get(
        cycle.client.compute_aggregated_url("instances"),
        Items::Aggregated("instances"),
    );
    cycle
        .collect(request, move |i: Instance| {
            in_region(i.zone.as_deref(), &region).then_some(i)
        })
        .boxed()
}

fn fetch_disks(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Disk>, FetchError>> {
    let region = cycle.region().to_string();
    let request = ListRequest::get(
        cycle.client.compute_aggregated_url("disks"),
        Items::Aggregated("disks"),
    );
    cycle
        .collect(request, move |d: Disk| {
            in_region(d.zone.as_deref(), &region).then_some(d)
        })
        .boxed()
}

fn fetch_snapshots(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Snapshot>, FetchError>> {
    let request = ListRequest::get(
        cycle.client.compute_global_url("snapshots"),
        Items::Key("items"),
    );
    cycle.collect(request, Some).boxed()
}

fn fetch_addresses(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<Address>, FetchError>> {
    let request = ListRequest::get(
        cycle.client.compute_regional_url("addresses"),
        Items::Key("items"),
    );
    cycle.collect(request, Some).boxed()
}

fn fetch_instance_groups(
    cycle: &Cycle,
) -> BoxFuture<'_, Result<Fetched<InstanceGroup>, FetchError>> {
    let region = cycle.region().to_string();
    let request = ListRequest::get(
        cycle.client.compute_aggregated_url("instanceGroups"),
        Items::Aggregated("instanceGroups"),
    );
    cycle
        .collect(request, move |g: InstanceGroup| {
            let regional = g.region_link().map(short_name) == Some(region.as_str());
            (regional || in_region(g.zone.as_deref(), &region)).then_some(g)
        })
        .boxed()
}

fn fetch_backend_services(
    cycle: &Cycle,
) -> BoxFuture<'_, Result<Fetched<BackendService>, FetchError>> {
    let request = ListRequest::get(
        cycle.client.compute_regional_url("backendServices"),
        Items::Key("items"),
    );
    cycle.collect(request, Some).boxed()
}

/// A firewall applies on the instances of its network it targets: those
/// running as one of its target service accounts, else those carrying one of
/// its target tags, else all of them
fn firewall_targets(
    graph: &Graph,
    subject: &ResourceKey,
    firewall: &Firewall,
) -> Result<(), RelateError> {
    let Some(network) = firewall.network_link().map(short_name) else {
        return Ok(());
    };

    let (property, targets) = if !firewall.target_service_accounts.is_empty() {
        ("ServiceAccounts", firewall.target_service_accounts.as_slice())
    } else {
        ("Tags", firewall.target_tags.as_slice())
    };

    for instance in graph.find_resources_by_property("Networks", &Value::from(network)) {
        if instance.kind != ResourceType::Instance {
            continue;
        }
        let targeted = targets.is_empty()
            || targets.iter().any(|target| {
                instance
                    .get(property)
                    .is_some_and(|values| values.contains(&Value::from(target.as_str())))
            });
        if targeted {
            graph.add_applies_on_relation(subject, &instance.key());
        }
    }
    Ok(())
}

/// An instance group applies on each of its member instances
fn instance_group_members(client: &GcpClient) -> Builder<InstanceGroup> {
    let client = client.clone();
    Builder::<InstanceGroup>::lookup(move |graph, subject, group| {
        let client = client.clone();
        async move {
            let Some(name) = group.name.as_deref() else {
                return Ok(());
            };
            let resource = format!("instanceGroups/{}/listInstances", name);
            let url = match (group.zone_link(), group.region_link()) {
                (Some(zone), _) => client.compute_zonal_url(short_name(zone), &resource),
                (None, Some(region)) => client.compute_url(&format!(
                    "regions/{}/{}",
                    short_name(region),
                    resource
                )),
                (None, None) => return Ok(()),
            };
            let body = json!({"instanceState": "ALL"});
            let request = ListRequest::post(url, Items::Key("items"), body);
            let members: Vec<InstanceGroupMember> = fetch_all(&client, request)
                .await
                .map_err(|source| RelateError::Lookup {
                    subject: subject.clone(),
                    source,
                })?;

            for instance in members.iter().filter_map(|m| m.instance.as_deref()) {
                link(graph, subject, ResourceType::Instance, instance, RelationKind::DependingOn)?;
            }
            Ok(())
        }
        .boxed()
    })
}

impl Source for Zone {
    const TYPE: ResourceType = ResourceType::Zone;
    const KIND: Option<&'static str> = Some("compute#zone");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Zone> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|z: &Zone| z.name.clone())),
                prop("Description", value(|z: &Zone| z.description.clone())),
                prop("State", value(|z: &Zone| z.status.clone())),
                prop("Region", short(|z: &Zone| z.region.as_deref())),
                prop("CpuPlatforms", strings(|z: &Zone| z.available_cpu_platforms.as_slice())),
                prop("CreateTime", time(|z: &Zone| z.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for Network {
    const TYPE: ResourceType = ResourceType::Network;
    const KIND: Option<&'static str> = Some("compute#network");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Network> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|n: &Network| n.name.clone())),
                prop("Description", value(|n: &Network| n.description.clone())),
                prop("AutoCreateSubnetworks", value(|n: &Network| n.auto_create_subnetworks)),
                prop(
                    "RoutingMode",
                    nested(
                        |n: &Network| n.routing_config.as_ref(),
                        |r: &RoutingConfig| r.routing_mode.clone(),
                    ),
                ),
                prop("MTU", value(|n: &Network| n.mtu)),
                prop("Subnetworks", short_names(|n: &Network| n.subnetworks.as_slice())),
                prop(
                    "Peerings",
                    project(
                        |n: &Network| n.peerings.as_slice(),
                        |p: &NetworkPeering| {
                            p.network.as_deref().map(|l| short_name(l).to_string())
                        },
                    ),
                ),
                prop("CreateTime", time(|n: &Network| n.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for Subnetwork {
    const TYPE: ResourceType = ResourceType::Subnetwork;
    const KIND: Option<&'static str> = Some("compute#subnetwork");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Subnetwork> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|s: &Subnetwork| s.name.clone())),
                prop("Description", value(|s: &Subnetwork| s.description.clone())),
                prop("Network", short(|s: &Subnetwork| s.network.as_deref())),
                prop("Region", short(|s: &Subnetwork| s.region.as_deref())),
                prop("CIDR", value(|s: &Subnetwork| s.ip_cidr_range.clone())),
                prop("Gateway", value(|s: &Subnetwork| s.gateway_address.clone())),
                prop(
                    "PrivateGoogleAccess",
                    value(|s: &Subnetwork| s.private_ip_google_access),
                ),
                prop("Purpose", value(|s: &Subnetwork| s.purpose.clone())),
                prop("StackType", value(|s: &Subnetwork| s.stack_type.clone())),
                prop(
                    "SecondaryRanges",
                    project(
                        |s: &Subnetwork| s.secondary_ip_ranges.as_slice(),
                        |r: &SecondaryRange| r.ip_cidr_range.clone(),
                    ),
                ),
                prop("CreateTime", time(|s: &Subnetwork| s.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for Firewall {
    const TYPE: ResourceType = ResourceType::Firewall;
    const KIND: Option<&'static str> = Some("compute#firewall");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Firewall> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|f: &Firewall| f.name.clone())),
                prop("Description", value(|f: &Firewall| f.description.clone())),
                prop("Network", short(|f: &Firewall| f.network.as_deref())),
                prop("Direction", value(|f: &Firewall| f.direction.clone())),
                prop("Priority", value(|f: &Firewall| f.priority)),
                prop("Disabled", value(|f: &Firewall| f.disabled)),
                prop(
                    "AllowRules",
                    firewall_rules(|f: &Firewall| f.allowed.as_slice(), |f: &Firewall| f.ranges()),
                ),
                prop(
                    "DenyRules",
                    firewall_rules(|f: &Firewall| f.denied.as_slice(), |f: &Firewall| f.ranges()),
                ),
                prop("SourceTags", strings(|f: &Firewall| f.source_tags.as_slice())),
                prop("TargetTags", strings(|f: &Firewall| f.target_tags.as_slice())),
                prop(
                    "TargetServiceAccounts",
                    strings(|f: &Firewall| f.target_service_accounts.as_slice()),
                ),
                prop("CreateTime", time(|f: &Firewall| f.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for Route {
    const TYPE: ResourceType = ResourceType::Route;
    const KIND: Option<&'static str> = Some("compute#route");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Route> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|r: &Route| r.name.clone())),
                prop("Description", value(|r: &Route| r.description.clone())),
                prop("Network", short(|r: &Route| r.network.as_deref())),
                prop("Destination", value(|r: &Route| r.dest_range.clone())),
                prop("Priority", value(|r: &Route| r.priority)),
                prop("NextHopGateway", short(|r: &Route| r.next_hop_gateway.as_deref())),
                prop("NextHopIP", value(|r: &Route| r.next_hop_ip.clone())),
                prop("NextHopInstance", short(|r: &Route| r.next_hop_instance.as_deref())),
                prop("NextHopNetwork", short(|r: &Route| r.next_hop_network.as_deref())),
                prop("Tags", strings(|r: &Route| r.tags.as_slice())),
                prop("CreateTime", time(|r: &Route| r.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for Instance {
    const TYPE: ResourceType = ResourceType::Instance;
    const KIND: Option<&'static str> = Some("compute#instance");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Instance> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|i: &Instance| i.name.clone())),
                prop("Description", value(|i: &Instance| i.description.clone())),
                prop("Type", short(|i: &Instance| i.machine_type.as_deref())),
                prop("State", value(|i: &Instance| i.status.clone())),
                prop("Zone", short(|i: &Instance| i.zone.as_deref())),
                prop(
                    "PrivateIPs",
                    project(
                        |i: &Instance| i.network_interfaces.as_slice(),
                        |n: &NetworkInterface| n.network_ip.clone(),
                    ),
                ),
                prop(
                    "PublicIPs",
                    value(|i: &Instance| {
                        let ips: Vec<String> = i
                            .network_interfaces
                            .iter()
                            .flat_map(|n| n.access_configs.iter())
                            .filter_map(|a| a.nat_ip.clone())
                            .collect();
                        (!ips.is_empty()).then_some(ips)
                    }),
                ),
                prop(
                    "Networks",
                    project(
                        |i: &Instance| i.network_interfaces.as_slice(),
                        |n: &NetworkInterface| {
                            n.network.as_deref().map(|l| short_name(l).to_string())
                        },
                    ),
                ),
                prop(
                    "Subnetworks",
                    project(
                        |i: &Instance| i.network_interfaces.as_slice(),
                        |n: &NetworkInterface| {
                            n.subnetwork.as_deref().map(|l| short_name(l).to_string())
                        },
                    ),
                ),
                prop("Tags", strings(|i: &Instance| i.tag_items())),
                prop("Labels", labels(|i: &Instance| &i.labels)),
                prop(
                    "ServiceAccounts",
                    project(
                        |i: &Instance| i.service_accounts.as_slice(),
                        |a: &InstanceServiceAccount| a.email.clone(),
                    ),
                ),
                prop(
                    "Preemptible",
                    nested(
                        |i: &Instance| i.scheduling.as_ref(),
                        |s: &Scheduling| s.preemptible,
                    ),
                ),
                prop("CanIPForward", value(|i: &Instance| i.can_ip_forward)),
                prop("DeletionProtection", value(|i: &Instance| i.deletion_protection)),
                prop(
                    "AutoDeleteDisks",
                    any_true(
                        |i: &Instance| i.disks.as_slice(),
                        |d: &AttachedDisk| d.auto_delete,
                    ),
                ),
                prop("OSLogin", tag(|i: &Instance| i.metadata_items(), "enable-oslogin")),
                prop("StartupScript", tag(|i: &Instance| i.metadata_items(), "startup-script")),
                prop("CreateTime", time(|i: &Instance| i.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for Disk {
    const TYPE: ResourceType = ResourceType::Disk;
    const KIND: Option<&'static str> = Some("compute#disk");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Disk> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|d: &Disk| d.name.clone())),
                prop("Description", value(|d: &Disk| d.description.clone())),
                prop("Size", int_string(|d: &Disk| d.size_gb.as_deref())),
                prop("State", value(|d: &Disk| d.status.clone())),
                prop("Zone", short(|d: &Disk| d.zone.as_deref())),
                prop("Type", short(|d: &Disk| d.disk_type.as_deref())),
                prop("SourceImage", short(|d: &Disk| d.source_image.as_deref())),
                prop("Labels", labels(|d: &Disk| &d.labels)),
                prop("CreateTime", time(|d: &Disk| d.creation_timestamp.as_deref())),
                prop("LastAttachTime", time(|d: &Disk| d.last_attach_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for Snapshot {
    const TYPE: ResourceType = ResourceType::Snapshot;
    const KIND: Option<&'static str> = Some("compute#snapshot");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Snapshot> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|s: &Snapshot| s.name.clone())),
                prop("Description", value(|s: &Snapshot| s.description.clone())),
                prop("SourceDisk", short(|s: &Snapshot| s.source_disk.as_deref())),
                prop("DiskSize", int_string(|s: &Snapshot| s.disk_size_gb.as_deref())),
                prop("StorageBytes", int_string(|s: &Snapshot| s.storage_bytes.as_deref())),
                prop("State", value(|s: &Snapshot| s.status.clone())),
                prop("StorageLocations", strings(|s: &Snapshot| s.storage_locations.as_slice())),
                prop("Labels", labels(|s: &Snapshot| &s.labels)),
                prop("CreateTime", time(|s: &Snapshot| s.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for Address {
    const TYPE: ResourceType = ResourceType::Address;
    const KIND: Option<&'static str> = Some("compute#address");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<Address> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|a: &Address| a.name.clone())),
                prop("Description", value(|a: &Address| a.description.clone())),
                prop("IP", value(|a: &Address| a.address.clone())),
                prop("Type", value(|a: &Address| a.address_type.clone())),
                prop("Purpose", value(|a: &Address| a.purpose.clone())),
                prop("State", value(|a: &Address| a.status.clone())),
                prop("Region", short(|a: &Address| a.region.as_deref())),
                prop("NetworkTier", value(|a: &Address| a.network_tier.clone())),
                prop("Users", short_names(|a: &Address| a.users.as_slice())),
                prop("CreateTime", time(|a: &Address| a.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for InstanceGroup {
    const TYPE: ResourceType = ResourceType::InstanceGroup;
    const KIND: Option<&'static str> = Some("compute#instanceGroup");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<InstanceGroup> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|g: &InstanceGroup| g.name.clone())),
                prop("Description", value(|g: &InstanceGroup| g.description.clone())),
                prop("Zone", short(|g: &InstanceGroup| g.zone.as_deref())),
                prop("Region", short(|g: &InstanceGroup| g.region.as_deref())),
                prop("Size", value(|g: &InstanceGroup| g.size)),
                prop("Network", short(|g: &InstanceGroup| g.network.as_deref())),
                prop("Subnetwork", short(|g: &InstanceGroup| g.subnetwork.as_deref())),
                prop(
                    "NamedPorts",
                    project(
                        |g: &InstanceGroup| g.named_ports.as_slice(),
                        |p: &NamedPort| match (&p.name, p.port) {
                            (Some(name), Some(port)) => Some(format!("{}:{}", name, port)),
                            _ => None,
                        },
                    ),
                ),
                prop("CreateTime", time(|g: &InstanceGroup| g.creation_timestamp.as_deref())),
            ]
        })
    }
}

impl Source for BackendService {
    const TYPE: ResourceType = ResourceType::BackendService;
    const KIND: Option<&'static str> = Some("compute#backendService");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<BackendService> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|b: &BackendService| b.name.clone())),
                prop("Description", value(|b: &BackendService| b.description.clone())),
                prop("Protocol", value(|b: &BackendService| b.protocol.clone())),
                prop("Scheme", value(|b: &BackendService| b.load_balancing_scheme.clone())),
                prop("Timeout", value(|b: &BackendService| b.timeout_sec)),
                prop("PortName", value(|b: &BackendService| b.port_name.clone())),
                prop("HealthChecks", short_names(|b: &BackendService| b.health_checks.as_slice())),
                prop(
                    "Backends",
                    project(
                        |b: &BackendService| b.backends.as_slice(),
                        |b: &Backend| b.group.as_deref().map(|g| short_name(g).to_string()),
                    ),
                ),
                prop("Region", short(|b: &BackendService| b.region.as_deref())),
                prop("CreateTime", time(|b: &BackendService| b.creation_timestamp.as_deref())),
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::relation::relate_objects;
    use crate::graph::{Relation, Resource};

    #[test]
    fn test_in_region() {
        let zone = "https://compute.test/compute/v1/projects/p/zones/us-central1-a";
        assert!(in_region(Some(zone), "us-central1"));
        assert!(in_region(Some("us-central1-f"), "us-central1"));
        assert!(!in_region(Some("us-east1-b"), "us-central1"));
        assert!(!in_region(None, "us-central1"));
    }

    fn instance(name: &str, network: &str, tags: &[&str], account: &str) -> Resource {
        let mut resource = Resource::new(ResourceType::Instance, name);
        resource.set("Networks", vec![network]);
        resource.set("Tags", tags.to_vec());
        resource.set("ServiceAccounts", vec![account]);
        resource
    }

    fn firewall(value: serde_json::Value) -> Firewall {
        serde_json::from_value(value).unwrap()
    }

    fn targets_of(graph: &Graph, firewall: &Firewall) -> Vec<ResourceKey> {
        let subject = ResourceKey::new(ResourceType::Firewall, "fw");
        firewall_targets(graph, &subject, firewall).unwrap();
        graph.applies_on(&subject)
    }

    fn network_graph() -> Graph {
        let graph = Graph::new();
        graph.add_resource(instance("web-1", "vpc-1", &["http"], "web@p.iam"));
        graph.add_resource(instance("db-1", "vpc-1", &["db"], "db@p.iam"));
        graph.add_resource(instance("web-2", "vpc-2", &["http"], "web@p.iam"));
        graph
    }

    fn key(id: &str) -> ResourceKey {
        ResourceKey::new(ResourceType::Instance, id)
    }

    #[test]
    fn test_firewall_applies_on_tagged_instances_of_its_network() {
        let graph = network_graph();
        let fw = firewall(json!({
            "name": "fw",
            "network": "global/networks/vpc-1",
            "targetTags": ["http"]
        }));
        assert_eq!(targets_of(&graph, &fw), vec![key("web-1")]);
    }

    #[test]
    fn test_untargeted_firewall_applies_on_whole_network() {
        let graph = network_graph();
        let fw = firewall(json!({"name": "fw", "network": "vpc-1"}));
        assert_eq!(targets_of(&graph, &fw), vec![key("db-1"), key("web-1")]);
    }

    #[test]
    fn test_firewall_targets_service_accounts() {
        let graph = network_graph();
        let fw = firewall(json!({
            "name": "fw",
            "network": "vpc-1",
            "targetTags": ["http"],
            "targetServiceAccounts": ["db@p.iam"]
        }));
        assert_eq!(targets_of(&graph, &fw), vec![key("db-1")]);
    }

    fn target_tag_names(firewall: &Firewall) -> Vec<&str> {
        firewall.target_tags.iter().map(String::as_str).collect()
    }

    /// Resources of a finished fetch wave, before any relation
    fn fetched_graph() -> (Graph, ResourceKey) {
        let graph = network_graph();
        let region = Resource::region("us-central1");
        let region_key = region.key();
        graph.add_resource(region);
        graph.add_resource(Resource::new(ResourceType::Network, "vpc-1"));
        graph.add_resource(Resource::new(ResourceType::Firewall, "fw"));
        (graph, region_key)
    }

    #[tokio::test]
    async fn test_relating_fresh_graphs_gives_the_same_edges() {
        let subject = ResourceKey::new(ResourceType::Firewall, "fw");
        let objects = vec![(
            subject.clone(),
            firewall(json!({
                "name": "fw",
                "network": "global/networks/vpc-1",
                "targetTags": ["http", "db"]
            })),
        )];
        let builders = vec![
            Builder::RegionParent,
            Builder::resolve_one(
                ResourceType::Network,
                Firewall::network_link,
                RelationKind::ParentOf,
            ),
            Builder::Scan(firewall_targets),
            // `http` names two instances and is skipped, `db` names one
            Builder::Alias {
                target: ResourceType::Instance,
                property: "Tags",
                aliases: target_tag_names,
                relation: RelationKind::DependingOn,
            },
        ];

        let (first, region) = fetched_graph();
        relate_objects(&builders, &first, &region, &objects).await.unwrap();
        let (second, region) = fetched_graph();
        relate_objects(&builders, &second, &region, &objects).await.unwrap();

        let edges = first.edges();
        assert_eq!(edges, second.edges());
        assert_eq!(edges.len(), 4);
        let parents = edges
            .iter()
            .filter(|e| e.relation == Relation::ParentOf && e.object == subject)
            .count();
        assert_eq!(parents, 2);
        assert_eq!(first.applies_on(&subject), vec![key("db-1"), key("web-1")]);
    }
}
