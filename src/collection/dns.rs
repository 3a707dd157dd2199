//! Cloud DNS kinds

use super::relation::{Builder, RelationKind};
use super::{kind, Cycle, Fetched, KindFetcher};
use crate::error::FetchError;
use crate::graph::{hash_id, ResourceType};
use crate::model::dns::{DnssecConfig, ManagedZone, ResourceRecordSet};
use crate::resource::extract::{nested, strings, time, value};
use crate::resource::{fetch_all, prop, Items, ListRequest, PropertyTable, Source, TableCell};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;

pub(crate) fn kinds() -> Vec<Arc<dyn KindFetcher>> {
    vec![
        kind("managedzone", fetch_managed_zones, vec![Builder::RegionParent]),
        kind(
            "record",
            fetch_records,
            vec![Builder::resolve_one(
                ResourceType::ManagedZone,
                ResourceRecordSet::zone_name,
                RelationKind::ParentOf,
            )],
        ),
    ]
}

async fn managed_zones(cycle: &Cycle) -> Result<Arc<Vec<ManagedZone>>, FetchError> {
    cycle
        .caches
        .managed_zones
        .get_or_fetch(|| async {
            let request = ListRequest::get(
                cycle.client.dns_url("managedZones"),
                Items::Key("managedZones"),
            );
            let zones: Vec<ManagedZone> = fetch_all(&cycle.client, request).await?;
            Ok::<_, FetchError>(Arc::new(zones))
        })
        .await
}

fn fetch_managed_zones(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<ManagedZone>, FetchError>> {
    all_zones(cycle).boxed()
}

async fn all_zones(cycle: &Cycle) -> Result<Fetched<ManagedZone>, FetchError> {
    let zones = managed_zones(cycle).await?;
    cycle.transform_all(zones.iter().cloned()).await
}

fn fetch_records(cycle: &Cycle) -> BoxFuture<'_, Result<Fetched<ResourceRecordSet>, FetchError>> {
    zone_records(cycle).boxed()
}

async fn zone_records(cycle: &Cycle) -> Result<Fetched<ResourceRecordSet>, FetchError> {
    let zones = managed_zones(cycle).await?;
    let per_zone = try_join_all(zones.iter().filter_map(|z| z.name.clone()).map(|zone| {
        let url = cycle.client.dns_url(&format!("managedZones/{}/rrsets", zone));
        cycle.collect(
            ListRequest::get(url, Items::Key("rrsets")),
            move |mut record: ResourceRecordSet| {
                record.zone = Some(zone.clone());
                Some(record)
            },
        )
    }))
    .await?;

    let mut fetched = Fetched::new();
    for records in per_zone {
        fetched.extend(records);
    }
    Ok(fetched)
}

impl Source for ManagedZone {
    const TYPE: ResourceType = ResourceType::ManagedZone;
    const KIND: Option<&'static str> = Some("dns#managedZone");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn native_id(&self) -> Option<String> {
        self.name.clone()
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<ManagedZone> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|z: &ManagedZone| z.name.clone())),
                prop("DNSName", value(|z: &ManagedZone| z.dns_name.clone())),
                prop("Description", value(|z: &ManagedZone| z.description.clone())),
                prop("Visibility", value(|z: &ManagedZone| z.visibility.clone())),
                prop("NameServers", strings(|z: &ManagedZone| z.name_servers.as_slice())),
                prop(
                    "DNSSEC",
                    nested(
                        |z: &ManagedZone| z.dnssec_config.as_ref(),
                        |d: &DnssecConfig| d.state.clone(),
                    ),
                ),
                prop("CreateTime", time(|z: &ManagedZone| z.creation_time.as_deref())),
            ]
        })
    }
}

impl Source for ResourceRecordSet {
    const TYPE: ResourceType = ResourceType::Record;
    const KIND: Option<&'static str> = Some("dns#resourceRecordSet");

    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Record sets have no identifier of their own
    fn native_id(&self) -> Option<String> {
        let zone = self.zone.as_deref()?;
        let name = self.name.as_deref()?;
        let record_type = self.record_type.as_deref()?;
        Some(hash_id(&[zone, name, record_type]))
    }

    fn properties() -> &'static PropertyTable<Self> {
        static TABLE: TableCell<ResourceRecordSet> = TableCell::new();
        TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|r: &ResourceRecordSet| r.name.clone())),
                prop("Type", value(|r: &ResourceRecordSet| r.record_type.clone())),
                prop("TTL", value(|r: &ResourceRecordSet| r.ttl)),
                prop("Records", strings(|r: &ResourceRecordSet| r.rrdatas.as_slice())),
                prop("Zone", value(|r: &ResourceRecordSet| r.zone.clone())),
            ]
        })
    }
}
