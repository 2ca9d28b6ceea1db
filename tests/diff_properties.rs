//! Property-style coverage of `only_in_first` beyond what lives in
//! `src/diff.rs`'s unit tests: focuses on the universal properties listed
//! in SPEC_FULL.md §8 rather than single concrete scenarios.

use eureka_aws_sync::diff::only_in_first;
use eureka_aws_sync::{Health, Node, Service, ServiceMap};

fn service(nodes: &[(&str, u16)], healths: &[(&str, Health)]) -> Service {
    let mut s = Service::default();
    for (host, port) in nodes {
        s.nodes
            .entry(host.to_string())
            .or_default()
            .insert(*port, Node { host: host.to_string(), port: *port, ..Default::default() });
    }
    for (id, health) in healths {
        s.healths.insert(id.to_string(), *health);
    }
    s
}

fn map(entries: Vec<(&str, Service)>) -> ServiceMap {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[test]
fn diff_identity_holds_for_a_populated_map() {
    let m = map(vec![
        ("svc-a", service(&[("h1", 1), ("h2", 2)], &[("i1", Health::Up)])),
        ("svc-b", service(&[], &[("i2", Health::Unhealthy)])),
    ]);
    assert_eq!(only_in_first(&m, &m), ServiceMap::new());
}

#[test]
fn diff_subtraction_never_names_a_service_outside_a() {
    let a = map(vec![("shared", service(&[("h1", 1)], &[]))]);
    let b = map(vec![
        ("shared", service(&[("h2", 2)], &[])),
        ("b-only", service(&[("h3", 3)], &[])),
    ]);

    let result = only_in_first(&a, &b);
    for name in result.keys() {
        assert!(a.contains_key(name), "result named a service absent from A: {name}");
    }
}

#[test]
fn node_diff_is_exact_for_nodes_absent_on_every_axis() {
    let a = map(vec![(
        "svc",
        service(&[("h1", 1), ("h2", 2), ("h3", 3)], &[]),
    )]);
    let b = map(vec![("svc", service(&[("h2", 2)], &[]))]);

    let result = only_in_first(&a, &b);
    let svc = &result["svc"];
    assert!(svc.nodes["h1"].contains_key(&1));
    assert!(svc.nodes["h3"].contains_key(&3));
    assert!(!svc.nodes.contains_key("h2"));
}

#[test]
fn health_diff_omits_entries_equal_on_both_sides() {
    let a = map(vec![(
        "svc",
        service(&[], &[("i1", Health::Up), ("i2", Health::Unhealthy), ("i3", Health::OutOfService)]),
    )]);
    let b = map(vec![(
        "svc",
        service(&[], &[("i1", Health::Up), ("i2", Health::Healthy)]),
    )]);

    let result = only_in_first(&a, &b);
    let healths = &result["svc"].healths;
    assert!(!healths.contains_key("i1"), "equal health entries must be omitted");
    assert!(healths.contains_key("i2"), "differing health entries must be emitted");
    assert!(healths.contains_key("i3"), "health entries absent on B must be emitted");
}

#[test]
fn origin_flags_are_logical_or_across_both_sides() {
    let mut a_service = service(&[("h1", 1)], &[]);
    a_service.from_eureka = true;
    a_service.from_aws = false;
    let mut b_service = service(&[("h2", 2)], &[]);
    b_service.from_eureka = false;
    b_service.from_aws = true;

    let a = map(vec![("svc", a_service)]);
    let b = map(vec![("svc", b_service)]);

    let result = only_in_first(&a, &b);
    assert!(result["svc"].from_eureka);
    assert!(result["svc"].from_aws);
}

#[test]
fn catalog_atomicity_across_concurrent_snapshots_and_replace() {
    use eureka_aws_sync::Catalog;
    use std::sync::Arc;

    let catalog = Arc::new(Catalog::new());

    let mut first = ServiceMap::new();
    first.insert("svc".to_string(), service(&[("h1", 1)], &[]));
    futures::executor::block_on(catalog.set_services(first.clone()));

    let mut second = ServiceMap::new();
    second.insert("svc".to_string(), service(&[("h1", 1), ("h2", 2)], &[]));

    let reader_catalog = catalog.clone();
    let reader = std::thread::spawn(move || {
        futures::executor::block_on(reader_catalog.snapshot())
    });

    futures::executor::block_on(catalog.set_services(second.clone()));
    let observed = reader.join().unwrap();

    assert!(
        observed == first || observed == second,
        "snapshot observed a partially-replaced map"
    );
}
