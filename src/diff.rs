//! The `only_in_first` diff: what's present on one side's catalog and absent
//! (or different) on the other.
//!
//! Grounded in `catalog/service.go`'s `onlyInFirst`, carried over field-for-field.
//! This is the only place "present on A, absent on B" is defined, at service,
//! node and health granularity.

use crate::model::{Service, ServiceMap};
use std::collections::HashMap;

/// Compute what's in `a` but not in `b`, per the rules in SPEC_FULL.md §4.2.
pub fn only_in_first(a: &ServiceMap, b: &ServiceMap) -> ServiceMap {
    let mut result = ServiceMap::new();

    for (name, sa) in a {
        match b.get(name) {
            None => {
                result.insert(name.clone(), sa.clone());
            }
            Some(sb) => {
                if let Some(merged) = diff_service(sa, sb) {
                    result.insert(name.clone(), merged);
                }
            }
        }
    }

    result
}

fn diff_service(a: &Service, b: &Service) -> Option<Service> {
    let mut nodes = HashMap::new();
    for (host, ports_a) in &a.nodes {
        match b.nodes.get(host) {
            None => {
                nodes.insert(host.clone(), ports_a.clone());
            }
            Some(ports_b) => {
                let remaining: HashMap<_, _> = ports_a
                    .iter()
                    .filter(|(port, _)| !ports_b.contains_key(*port))
                    .map(|(port, node)| (*port, node.clone()))
                    .collect();
                if !remaining.is_empty() {
                    nodes.insert(host.clone(), remaining);
                }
            }
        }
    }

    let mut healths = HashMap::new();
    for (instance_id, ha) in &a.healths {
        match b.healths.get(instance_id) {
            None => {
                healths.insert(instance_id.clone(), *ha);
            }
            Some(hb) => {
                if ha != hb {
                    healths.insert(instance_id.clone(), *ha);
                }
            }
        }
    }

    if nodes.is_empty() && healths.is_empty() {
        return None;
    }

    Some(Service {
        id: prefer(&a.id, &b.id),
        name: prefer(&a.name, &b.name),
        aws_id: prefer(&a.aws_id, &b.aws_id),
        eureka_id: prefer(&a.eureka_id, &b.eureka_id),
        aws_namespace: prefer(&a.aws_namespace, &b.aws_namespace),
        from_eureka: a.from_eureka || b.from_eureka,
        from_aws: a.from_aws || b.from_aws,
        nodes,
        healths,
    })
}

fn prefer(a: &str, b: &str) -> String {
    if a.is_empty() { b.to_string() } else { a.to_string() }
}
