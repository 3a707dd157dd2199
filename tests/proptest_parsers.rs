//! Property-based tests using proptest
//!
//! These tests verify the parsers the transformer relies on (port ranges,
//! CIDR blocks, resource names) and the graph's merge semantics using
//! randomized inputs.

use proptest::prelude::*;
use tgcp_inventory::graph::{hash_id, Graph, Resource, ResourceKey, ResourceType};
use tgcp_inventory::resource::extract::{parse_ip_ranges, parse_port_range};
use tgcp_inventory::resource::short_name;

/// Generate a GCP-style resource name
fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,30}"
}

/// Generate a full resource URL ending in a name
fn arb_link() -> impl Strategy<Value = (String, String)> {
    (
        prop_oneof!["zones", "regions", "global/networks", "subnetworks"],
        arb_name(),
    )
        .prop_map(|(collection, name)| {
            (
                format!(
                    "https://www.googleapis.com/compute/v1/projects/demo/{}/{}",
                    collection, name
                ),
                name,
            )
        })
}

/// Generate a list of (kind, id) pairs from a small pool so merges overlap
fn arb_resources() -> impl Strategy<Value = Vec<(ResourceType, String)>> {
    prop::collection::vec(
        (
            prop_oneof![
                Just(ResourceType::Network),
                Just(ResourceType::Subnetwork),
                Just(ResourceType::Instance)
            ],
            "[a-c]{1,2}",
        ),
        0..20,
    )
}

fn graph_of(resources: &[(ResourceType, String)]) -> Graph {
    let graph = Graph::new();
    for (kind, id) in resources {
        graph.add_resource(Resource::new(*kind, id.clone()));
    }
    graph
}

proptest! {
    #[test]
    fn single_port_parses_to_itself(port: u16) {
        let range = parse_port_range(&port.to_string()).unwrap();
        prop_assert_eq!(range.from, port);
        prop_assert_eq!(range.to, port);
        prop_assert!(!range.any);
        prop_assert!(range.contains(port));
    }

    #[test]
    fn ordered_port_range_contains_its_bounds(a: u16, b: u16) {
        let (from, to) = (a.min(b), a.max(b));
        let range = parse_port_range(&format!("{}-{}", from, to)).unwrap();
        prop_assert!(range.contains(from));
        prop_assert!(range.contains(to));
        if to < u16::MAX {
            prop_assert!(!range.contains(to + 1));
        }
    }

    #[test]
    fn reversed_port_range_is_rejected(a: u16, b: u16) {
        prop_assume!(a != b);
        let (from, to) = (a.max(b), a.min(b));
        let range = format!("{}-{}", from, to);
        prop_assert!(parse_port_range(&range).is_err());
    }

    #[test]
    fn non_numeric_ports_are_rejected(spec in "[a-z]{1,8}") {
        prop_assert!(parse_port_range(&spec).is_err());
    }

    #[test]
    fn ipv4_cidr_parses(a: u8, b: u8, c: u8, d: u8, prefix in 0u8..=32) {
        let cidr = format!("{}.{}.{}.{}/{}", a, b, c, d, prefix);
        let parsed = parse_ip_ranges(&[cidr]).unwrap();
        prop_assert_eq!(parsed.len(), 1);
        prop_assert_eq!(parsed[0].prefix_len(), prefix);
    }

    #[test]
    fn oversized_prefix_is_rejected(prefix in 33u8..=99) {
        let cidr = format!("10.0.0.0/{}", prefix);
        prop_assert!(parse_ip_ranges(&["0.0.0.0/0".to_string(), cidr]).is_err());
    }

    #[test]
    fn short_name_is_last_segment((link, name) in arb_link()) {
        prop_assert_eq!(short_name(&link), name.as_str());
        prop_assert_eq!(short_name(&name), name.as_str());
    }

    #[test]
    fn hash_id_is_deterministic(zone in arb_name(), name in arb_name(), kind in "[A-Z]{1,5}") {
        let id = hash_id(&[&zone, &name, &kind]);
        prop_assert_eq!(&id, &hash_id(&[&zone, &name, &kind]));
        prop_assert!(id.starts_with("tgi-"));
        prop_assert_eq!(id.len(), "tgi-".len() + 32);
    }

    #[test]
    fn hash_id_separates_fields(a in "[a-z]{1,6}", b in "[a-z]{1,6}") {
        // Moving a character across the field boundary must change the id
        let moved = format!("{}{}", a, &b[..1]);
        prop_assert_ne!(hash_id(&[&a, &b]), hash_id(&[&moved, &b[1..]]));
    }

    #[test]
    fn graph_merge_is_order_independent(left in arb_resources(), right in arb_resources()) {
        let forward = graph_of(&left);
        forward.add_graph(graph_of(&right));
        let backward = graph_of(&right);
        backward.add_graph(graph_of(&left));

        let keys = |g: &Graph| -> Vec<ResourceKey> {
            g.snapshot().resources.iter().map(|r| r.key()).collect()
        };
        prop_assert_eq!(keys(&forward), keys(&backward));
        prop_assert_eq!(forward.len(), backward.len());
    }
}
