//! Eureka side of the reconciliation: fetch/normalize Eureka's catalog, and
//! apply AWS-origin create/remove diffs back onto it.
//!
//! Grounded in SPEC_FULL.md §4.1's Eureka-specific normalization rules and the
//! teacher's `eureka.rs` instance-shape handling.

use super::{run_poll_loop, SideAdapter};
use crate::error::RegistryError;
use crate::metrics::MetricsSink;
use crate::model::{encode_id, Catalog, Health, Node, Service, ServiceMap};
use crate::registry::{EurekaApplication, EurekaInstanceRegistration, EurekaWireClient};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub struct EurekaAdapter {
    catalog: Catalog,
    client: Arc<dyn EurekaWireClient>,
    allow_list: HashSet<String>,
    /// Prefix this daemon prepends when writing AWS-origin services into
    /// Eureka, and uses to recognize them on the way back out.
    aws_origin_prefix: String,
    metrics: Arc<dyn MetricsSink>,
}

impl EurekaAdapter {
    pub fn new(
        client: Arc<dyn EurekaWireClient>,
        allow_list: HashSet<String>,
        aws_origin_prefix: String,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self { catalog: Catalog::new(), client, allow_list, aws_origin_prefix, metrics }
    }

    fn normalize(&self, applications: Vec<EurekaApplication>, previous: &ServiceMap) -> ServiceMap {
        let mut services = ServiceMap::new();

        for app in applications {
            if !self.allow_list.contains(&app.name) {
                continue;
            }

            let (from_aws, stored_name) = match self.aws_origin_prefix.as_str() {
                "" => (false, app.name.clone()),
                prefix if app.name.starts_with(prefix) => {
                    (true, app.name[prefix.len()..].to_string())
                }
                _ => (false, app.name.clone()),
            };

            let mut service = Service {
                id: stored_name.clone(),
                name: stored_name.clone(),
                from_eureka: false,
                from_aws,
                ..Service::default()
            };

            for instance in &app.instance {
                let meta = &instance.data_center_metadata;
                let host = if !meta.local_ipv4.is_empty() {
                    meta.local_ipv4.clone()
                } else if !instance.host_name.is_empty() {
                    instance.host_name.clone()
                } else {
                    instance.ip_addr.clone()
                };
                if host.is_empty() {
                    warn!(app = %app.name, "skipping eureka instance with no resolvable host");
                    continue;
                }
                let port = match instance.port {
                    Some(port) => port,
                    None => {
                        warn!(app = %app.name, host = %host, "skipping eureka instance with no port");
                        continue;
                    }
                };

                let instance_id = if !meta.instance_id.is_empty() {
                    meta.instance_id.clone()
                } else {
                    instance.instance_id.clone()
                };

                let mut attributes = HashMap::new();
                attributes.insert("local-ipv4".to_string(), meta.local_ipv4.clone());
                attributes.insert("public-ipv4".to_string(), meta.public_ipv4.clone());
                attributes.insert("local-hostname".to_string(), meta.local_hostname.clone());
                attributes.insert("public-hostname".to_string(), meta.public_hostname.clone());
                attributes.insert("availability-zone".to_string(), meta.availability_zone.clone());
                attributes.insert("homePageUrl".to_string(), instance.home_page_url.clone());
                attributes.insert("statusPageUrl".to_string(), instance.status_page_url.clone());
                attributes.insert("healthCheckUrl".to_string(), instance.health_check_url.clone());

                let carried_aws_id = previous
                    .get(&stored_name)
                    .and_then(|s| s.nodes.get(&host))
                    .and_then(|ports| ports.get(&port))
                    .and_then(|node| node.aws_id.clone());

                let node = Node {
                    port,
                    host: host.clone(),
                    aws_id: carried_aws_id,
                    eureka_id: Some(instance_id.clone()),
                    instance_id: instance_id.clone(),
                    attributes,
                };

                service.healths.insert(instance_id, Health::from_eureka(&instance.status));
                service.nodes.entry(host).or_default().insert(port, node);
            }

            services.insert(stored_name, service);
        }

        services
    }
}

#[async_trait]
impl SideAdapter for EurekaAdapter {
    async fn fetch(&self) -> Result<(), RegistryError> {
        let applications = self.client.get_applications().await?;
        let previous = self.catalog.snapshot().await;
        let services = self.normalize(applications, &previous);
        debug!(count = services.len(), "normalized eureka applications");
        self.catalog.set_services(services).await;
        Ok(())
    }

    async fn rekeyed_snapshot(&self) -> ServiceMap {
        let mut services = self.catalog.snapshot().await;
        for service in services.values_mut() {
            let mut rekeyed = HashMap::new();
            for (instance_id, health) in &service.healths {
                let aws_id = service
                    .nodes
                    .values()
                    .flat_map(|ports| ports.values())
                    .find(|n| &n.instance_id == instance_id)
                    .and_then(|n| n.aws_id.clone());
                if let Some(aws_id) = aws_id {
                    rekeyed.insert(aws_id, *health);
                }
            }
            service.healths = rekeyed;
        }
        services
    }

    async fn snapshot(&self) -> ServiceMap {
        self.catalog.snapshot().await
    }

    async fn snapshot_service(&self, name: &str) -> Option<Service> {
        self.catalog.snapshot_service(name).await
    }

    async fn snapshot_node(&self, name: &str, host: &str, port: u16) -> Option<Node> {
        self.catalog.snapshot_node(name, host, port).await
    }

    async fn apply_create(&self, diff: &ServiceMap) {
        for (name, service) in diff {
            let app = format!("{}{}", self.aws_origin_prefix, name);
            let nodes: Vec<&Node> =
                service.nodes.values().flat_map(|ports| ports.values()).collect();

            let registrations = nodes.into_iter().map(|node| {
                let app = app.clone();
                let registration = EurekaInstanceRegistration {
                    instance_id: encode_id(
                        node.aws_id.as_deref().unwrap_or(&node.instance_id),
                        &node.host,
                        node.port,
                    ),
                    host_name: node.host.clone(),
                    ip_addr: node.host.clone(),
                    port: node.port,
                    status: service
                        .healths
                        .get(&node.instance_id)
                        .map(|h| if h.to_aws_custom_health() { "UP" } else { "DOWN" })
                        .unwrap_or("UP")
                        .to_string(),
                    home_page_url: node.attributes.get("homePageUrl").cloned(),
                    status_page_url: node.attributes.get("statusPageUrl").cloned(),
                    health_check_url: node.attributes.get("healthCheckUrl").cloned(),
                    metadata: node.attributes.clone(),
                };
                async move { self.client.register_instance(&app, registration).await }
            });

            let results = join_all(registrations).await;
            let failures = results.iter().filter(|r| r.is_err()).count();
            if failures > 0 {
                warn!(service = %name, failures, "some eureka instance registrations failed");
            } else {
                info!(service = %name, "registered all instances into eureka");
            }
        }
    }

    async fn apply_remove(&self, diff: &ServiceMap) {
        for (name, service) in diff {
            if !service.from_aws {
                continue;
            }
            let app = format!("{}{}", self.aws_origin_prefix, name);
            let nodes: Vec<&Node> =
                service.nodes.values().flat_map(|ports| ports.values()).collect();

            let removals = nodes.into_iter().map(|node| {
                let app = app.clone();
                let instance_id = node.instance_id.clone();
                async move { self.client.deregister_instance(&app, &instance_id).await }
            });

            let results = join_all(removals).await;
            let failures = results.iter().filter(|r| r.is_err()).count();
            if failures > 0 {
                warn!(service = %name, failures, "some eureka instance deregistrations failed");
                self.metrics.aws_instance_update_error();
            }
        }
    }

    async fn poll_loop(&self, stop: watch::Receiver<bool>, trigger: mpsc::Sender<()>, interval: Duration) {
        run_poll_loop(stop, trigger, interval, "eureka", || self.fetch()).await;
    }
}
