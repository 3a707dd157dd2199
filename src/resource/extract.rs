//! Property extractors
//!
//! An [`Extractor`] turns one aspect of a provider object into a [`Value`].
//! Extractors are built from small combinators over typed accessors and
//! stored in the per-type property tables of the registry.
//!
//! An extractor yields `Ok(None)` when the property is absent,
//! `Err(ExtractError::NotFound)` when a lookup missed (the property is skipped
//! as well), and any other error aborts the transformation.

use crate::error::ApiError;
use crate::gcp::client::GcpClient;
use crate::graph::{FirewallRule, KeyValue, PortRange, Value};
use crate::model::compute::{FirewallEntry, MetadataItem};
use crate::resource::fetcher::short_name;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use ipnet::IpNet;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub enum ExtractError {
    /// A keyed lookup found nothing; the property is skipped
    NotFound,
    Malformed(String),
    Api(ApiError),
}

pub type ExtractResult = Result<Option<Value>, ExtractError>;

type LocalFn<T> = Box<dyn Fn(&T) -> ExtractResult + Send + Sync>;

/// Extractor issuing its own API call
pub type FetchFn<T> = for<'a> fn(&'a GcpClient, &'a T) -> BoxFuture<'a, ExtractResult>;

pub enum Extractor<T> {
    Local(LocalFn<T>),
    Fetch(FetchFn<T>),
}

impl<T> Extractor<T> {
    pub async fn extract(&self, client: &GcpClient, source: &T) -> ExtractResult {
        match self {
            Extractor::Local(extract) => extract(source),
            Extractor::Fetch(fetch) => fetch(client, source).await,
        }
    }
}

fn local<T>(extract: impl Fn(&T) -> ExtractResult + Send + Sync + 'static) -> Extractor<T> {
    Extractor::Local(Box::new(extract))
}

/// An optional scalar field
pub fn value<T, V>(get: impl Fn(&T) -> Option<V> + Send + Sync + 'static) -> Extractor<T>
where
    V: Into<Value>,
{
    local(move |source: &T| Ok(get(source).map(Into::into)))
}

/// A field of an optional sub-structure
pub fn nested<T, S, V>(
    outer: impl Fn(&T) -> Option<&S> + Send + Sync + 'static,
    inner: impl Fn(&S) -> Option<V> + Send + Sync + 'static,
) -> Extractor<T>
where
    V: Into<Value>,
{
    local(move |source: &T| Ok(outer(source).and_then(&inner).map(Into::into)))
}

/// Last path segment of a resource URL
pub fn short<T>(get: impl Fn(&T) -> Option<&str> + Send + Sync + 'static) -> Extractor<T> {
    local(move |source: &T| Ok(get(source).map(|link| Value::from(short_name(link)))))
}

/// RFC 3339 timestamp
pub fn time<T>(get: impl Fn(&T) -> Option<&str> + Send + Sync + 'static) -> Extractor<T> {
    local(move |source: &T| get(source).map(parse_time).transpose())
}

/// int64 the API encodes as a JSON string
pub fn int_string<T>(get: impl Fn(&T) -> Option<&str> + Send + Sync + 'static) -> Extractor<T> {
    local(move |source: &T| {
        get(source)
            .map(|raw| {
                raw.parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| ExtractError::Malformed(format!("'{}' is not an integer", raw)))
            })
            .transpose()
    })
}

/// Value of `key` in a metadata item list
pub fn tag<T>(
    items: impl Fn(&T) -> Option<&[MetadataItem]> + Send + Sync + 'static,
    key: &'static str,
) -> Extractor<T> {
    local(move |source: &T| {
        items(source)
            .unwrap_or_default()
            .iter()
            .find(|item| item.key == key)
            .map(|item| Some(Value::from(item.value.clone().unwrap_or_default())))
            .ok_or(ExtractError::NotFound)
    })
}

/// A label map as a list of key/values
pub fn labels<T>(
    get: impl Fn(&T) -> &BTreeMap<String, String> + Send + Sync + 'static,
) -> Extractor<T> {
    local(move |source: &T| {
        let labels = get(source);
        if labels.is_empty() {
            return Ok(None);
        }
        let pairs: Vec<Value> = labels
            .iter()
            .map(|(key, value)| {
                Value::KeyValue(KeyValue {
                    key: key.clone(),
                    value: value.clone(),
                })
            })
            .collect();
        Ok(Some(Value::List(pairs)))
    })
}

/// A list of strings
pub fn strings<T>(get: impl Fn(&T) -> &[String] + Send + Sync + 'static) -> Extractor<T> {
    project(get, |item: &String| Some(item.clone()))
}

/// A list of resource URLs, as short names
pub fn short_names<T>(get: impl Fn(&T) -> &[String] + Send + Sync + 'static) -> Extractor<T> {
    project(get, |item: &String| Some(short_name(item).to_string()))
}

/// One field of every element of a list; elements without it are left out
pub fn project<T, E, V>(
    list: impl Fn(&T) -> &[E] + Send + Sync + 'static,
    field: impl Fn(&E) -> Option<V> + Send + Sync + 'static,
) -> Extractor<T>
where
    V: Into<Value>,
{
    local(move |source: &T| {
        let values: Vec<Value> = list(source)
            .iter()
            .filter_map(&field)
            .map(Into::into)
            .collect();
        Ok((!values.is_empty()).then_some(Value::List(values)))
    })
}

/// True when `flag` is set on any element of a list
pub fn any_true<T, E>(
    list: impl Fn(&T) -> &[E] + Send + Sync + 'static,
    flag: impl Fn(&E) -> Option<bool> + Send + Sync + 'static,
) -> Extractor<T> {
    local(move |source: &T| {
        let items = list(source);
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(Value::Bool(items.iter().any(|e| flag(e) == Some(true)))))
    })
}

/// Firewall entries combined with the ranges they match
pub fn firewall_rules<T>(
    entries: impl Fn(&T) -> &[FirewallEntry] + Send + Sync + 'static,
    ranges: impl Fn(&T) -> &[String] + Send + Sync + 'static,
) -> Extractor<T> {
    local(move |source: &T| {
        let entries = entries(source);
        if entries.is_empty() {
            return Ok(None);
        }
        let rules = parse_firewall_rules(entries, ranges(source))?;
        Ok(Some(Value::from(rules)))
    })
}

/// Property needing its own API call
pub fn fetch<T>(fetch: FetchFn<T>) -> Extractor<T> {
    Extractor::Fetch(fetch)
}

pub fn parse_time(raw: &str) -> Result<Value, ExtractError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| Value::Time(t.with_timezone(&Utc)))
        .map_err(|e| ExtractError::Malformed(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Expand firewall entries into one rule per protocol and port range
///
/// Protocol `all`, `-1` or no protocol means any protocol on any port, and an
/// entry without ports covers every port. Numeric protocols are kept as is.
pub fn parse_firewall_rules(
    entries: &[FirewallEntry],
    ranges: &[String],
) -> Result<Vec<FirewallRule>, ExtractError> {
    let ip_ranges = parse_ip_ranges(ranges)?;
    let mut rules = Vec::new();

    for entry in entries {
        let protocol = match entry.ip_protocol.as_deref() {
            None | Some("all") | Some("-1") => None,
            Some(protocol) => Some(protocol.to_lowercase()),
        };

        let Some(protocol) = protocol else {
            rules.push(FirewallRule {
                protocol: "any".to_string(),
                port_range: PortRange::any(),
                ip_ranges: ip_ranges.clone(),
            });
            continue;
        };

        if entry.ports.is_empty() {
            rules.push(FirewallRule {
                protocol,
                port_range: PortRange::any(),
                ip_ranges: ip_ranges.clone(),
            });
            continue;
        }

        for spec in &entry.ports {
            rules.push(FirewallRule {
                protocol: protocol.clone(),
                port_range: parse_port_range(spec)?,
                ip_ranges: ip_ranges.clone(),
            });
        }
    }

    Ok(rules)
}

/// `"22"` or `"8000-9000"`; `"-1"` is any port
pub fn parse_port_range(spec: &str) -> Result<PortRange, ExtractError> {
    let malformed = || ExtractError::Malformed(format!("invalid port range '{}'", spec));
    let port = |raw: &str| raw.trim().parse::<u16>().map_err(|_| malformed());

    if spec.trim() == "-1" {
        return Ok(PortRange::any());
    }

    match spec.split_once('-') {
        Some((from, to)) => {
            let (from, to) = (port(from)?, port(to)?);
            if from > to {
                return Err(malformed());
            }
            Ok(PortRange::new(from, to))
        }
        None => {
            let single = port(spec)?;
            Ok(PortRange::new(single, single))
        }
    }
}

/// Parse CIDR blocks, failing on the first malformed one
pub fn parse_ip_ranges(ranges: &[String]) -> Result<Vec<IpNet>, ExtractError> {
    ranges
        .iter()
        .map(|range| {
            range
                .parse::<IpNet>()
                .map_err(|e| ExtractError::Malformed(format!("invalid CIDR '{}': {}", range, e)))
        })
        .collect()
}
