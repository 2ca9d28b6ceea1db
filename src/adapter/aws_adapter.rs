//! AWS Cloud Map side of the reconciliation: fetch/normalize the namespace's
//! services, and apply Eureka-origin create/remove diffs back onto it.
//!
//! Grounded in SPEC_FULL.md §4.1's AWS-specific normalization and write-path
//! rules (sentinel description, bounded-parallel registration, delete-safety
//! inequality).

use super::{run_poll_loop, SideAdapter};
use crate::error::RegistryError;
use crate::metrics::MetricsSink;
use crate::model::{decode_id, encode_id, Catalog, Health, Node, Service, ServiceMap};
use crate::registry::aws::IMPORTED_FROM_EUREKA_DESCRIPTION;
use crate::registry::{AwsWireClient, CreateServiceInput};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub struct AwsAdapter {
    catalog: Catalog,
    client: Arc<dyn AwsWireClient>,
    namespace_id: String,
    aws_service_prefix: String,
    dns_ttl: i64,
    metrics: Arc<dyn MetricsSink>,
}

/// Which half of a node's write failed, so `apply_create` can attribute the
/// failure to the right metric instead of a single undifferentiated counter.
enum NodeWriteFailure {
    Register(RegistryError),
    Health(RegistryError),
}

impl AwsAdapter {
    pub fn new(
        client: Arc<dyn AwsWireClient>,
        namespace_id: String,
        aws_service_prefix: String,
        dns_ttl: i64,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self { catalog: Catalog::new(), client, namespace_id, aws_service_prefix, dns_ttl, metrics }
    }

    /// Recover the eureka-origin node identity from an AWS instance id this
    /// daemon itself minted (`<eurekaID>_<host>_<port>`). Native AWS
    /// instances won't match and simply keep no eureka id.
    fn recovered_eureka_id(instance_id: &str, host: &str, port: u16) -> Option<String> {
        let suffix = format!("_{host}_{port}");
        instance_id.strip_suffix(&suffix).map(str::to_string)
    }
}

#[async_trait]
impl SideAdapter for AwsAdapter {
    async fn fetch(&self) -> Result<(), RegistryError> {
        let namespace = self.client.get_namespace(&self.namespace_id).await?;
        let summaries = self.client.list_services(&self.namespace_id).await?;
        self.metrics.aws_services_count(summaries.len() as i64);

        let mut services = ServiceMap::new();
        for summary in summaries {
            let from_eureka = summary.imported_from_eureka();
            let stored_name = if from_eureka {
                summary
                    .name
                    .strip_prefix(self.aws_service_prefix.as_str())
                    .unwrap_or(&summary.name)
                    .to_string()
            } else {
                summary.name.clone()
            };

            let instances = self
                .client
                .discover_instances(&namespace.name, &summary.name)
                .await?;
            let instance_ids: Vec<String> = instances.iter().map(|i| i.instance_id.clone()).collect();
            let health_status = self.client.get_instances_health(&summary.id, &instance_ids).await?;

            let mut service = Service {
                id: summary.id.clone(),
                name: stored_name.clone(),
                from_eureka,
                from_aws: false,
                aws_id: summary.id.clone(),
                aws_namespace: namespace.id.clone(),
                ..Service::default()
            };

            for instance in instances {
                let host = instance
                    .attributes
                    .get("AWS_INSTANCE_IPV4")
                    .cloned()
                    .unwrap_or_else(|| instance.ipv4.clone());
                let port = instance
                    .attributes
                    .get("AWS_INSTANCE_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(instance.port);
                if host.is_empty() {
                    warn!(service = %summary.name, "skipping aws instance with no resolvable host");
                    continue;
                }

                let eureka_id = Self::recovered_eureka_id(&instance.instance_id, &host, port);
                let composite = decode_id(&instance.instance_id)
                    .map(|(h, p)| encode_id(eureka_id.as_deref().unwrap_or(&instance.instance_id), &h, p))
                    .unwrap_or_else(|| instance.instance_id.clone());

                let node = Node {
                    port,
                    host: host.clone(),
                    aws_id: Some(instance.instance_id.clone()),
                    eureka_id: eureka_id.clone(),
                    instance_id: composite,
                    attributes: instance.attributes.clone(),
                };

                let health = health_status
                    .get(&instance.instance_id)
                    .map(|s| Health::from_aws(s))
                    .unwrap_or(Health::Unknown);
                service.healths.insert(instance.instance_id.clone(), health);
                service.nodes.entry(host).or_default().insert(port, node);
            }

            services.insert(stored_name, service);
        }

        debug!(count = services.len(), "normalized aws cloud map services");
        self.catalog.set_services(services).await;
        Ok(())
    }

    async fn rekeyed_snapshot(&self) -> ServiceMap {
        let mut services = self.catalog.snapshot().await;
        for service in services.values_mut() {
            let mut rekeyed = HashMap::new();
            for (aws_instance_id, health) in &service.healths {
                let node = service
                    .nodes
                    .values()
                    .flat_map(|ports| ports.values())
                    .find(|n| n.aws_id.as_deref() == Some(aws_instance_id.as_str()));
                if let Some(node) = node {
                    if let Some(eureka_id) = &node.eureka_id {
                        rekeyed.insert(encode_id(eureka_id, &node.host, node.port), *health);
                    }
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
            let aws_name = format!("{}{}", self.aws_service_prefix, name);

            let service_id = match self.catalog.snapshot_service(name).await.map(|s| s.aws_id) {
                Some(id) if !id.is_empty() => id,
                _ => {
                    let input = CreateServiceInput {
                        name: aws_name.clone(),
                        namespace_id: self.namespace_id.clone(),
                        description: IMPORTED_FROM_EUREKA_DESCRIPTION.to_string(),
                        dns_ttl: Some(self.dns_ttl),
                    };
                    match self.client.create_service(input).await {
                        Ok(outcome) => outcome.service_id,
                        Err(RegistryError::ServiceAlreadyExists { .. }) => {
                            // Collapsed to success per SPEC_FULL.md §7: no error
                            // metric, no warning. The next fetch will observe
                            // the existing service and pick up its real id.
                            info!(service = %name, "service already exists in aws, will pick it up next poll");
                            continue;
                        }
                        Err(error) => {
                            warn!(service = %name, %error, "create_service failed");
                            self.metrics.aws_instance_update_error();
                            continue;
                        }
                    }
                }
            };

            let nodes: Vec<&Node> =
                service.nodes.values().flat_map(|ports| ports.values()).collect();

            let writes = nodes.into_iter().map(|node| {
                let service_id = service_id.clone();
                let instance_id =
                    encode_id(node.eureka_id.as_deref().unwrap_or(&node.instance_id), &node.host, node.port);
                let mut attributes = node.attributes.clone();
                let ipv4 = node
                    .attributes
                    .get("local-ipv4")
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .unwrap_or_else(|| node.host.clone());
                attributes.insert("AWS_INSTANCE_IPV4".to_string(), ipv4);
                attributes.insert("AWS_INSTANCE_PORT".to_string(), node.port.to_string());
                // The diff's healths are keyed in the same composite identifier
                // space as instance_id above (see EurekaAdapter::rekeyed_snapshot),
                // not by the Eureka-native node.instance_id.
                let healthy = service
                    .healths
                    .get(&instance_id)
                    .map(|h| h.to_aws_custom_health())
                    .unwrap_or(true);

                async move {
                    if let Err(error) =
                        self.client.register_instance(&service_id, &instance_id, attributes).await
                    {
                        return Err(NodeWriteFailure::Register(error));
                    }
                    self.client
                        .update_instance_health(&service_id, &instance_id, healthy)
                        .await
                        .map_err(NodeWriteFailure::Health)
                }
            });

            let results = join_all(writes).await;
            let register_failures =
                results.iter().filter(|r| matches!(r, Err(NodeWriteFailure::Register(_)))).count();
            let health_failures =
                results.iter().filter(|r| matches!(r, Err(NodeWriteFailure::Health(_)))).count();

            if register_failures > 0 {
                warn!(service = %name, failures = register_failures, "some aws instance registrations failed");
                self.metrics.aws_instance_update_error();
            }
            if health_failures > 0 {
                warn!(service = %name, failures = health_failures, "some aws instance health updates failed");
                self.metrics.aws_instance_health_update_error();
            }
            if register_failures == 0 && health_failures == 0 {
                self.metrics.aws_instance_health_updated();
                self.metrics.aws_services_updated(1);
                info!(service = %name, "registered all instances into aws cloud map");
            }
        }
    }

    async fn apply_remove(&self, diff: &ServiceMap) {
        for (name, service) in diff {
            if !service.from_eureka || service.aws_id.is_empty() {
                continue;
            }

            let pre_remove_total = self
                .catalog
                .snapshot_service(name)
                .await
                .map(|s| s.node_count())
                .unwrap_or(0);

            let nodes: Vec<&Node> =
                service.nodes.values().flat_map(|ports| ports.values()).collect();
            let removals = nodes.iter().filter_map(|node| {
                node.aws_id.clone().map(|aws_id| {
                    let service_id = service.aws_id.clone();
                    async move { self.client.deregister_instance(&service_id, &aws_id).await }
                })
            });

            let results = join_all(removals).await;
            let succeeded = results.iter().filter(|r| r.is_ok()).count();
            let failures = results.len() - succeeded;
            if failures > 0 {
                warn!(service = %name, failures, "some aws instance deregistrations failed");
                self.metrics.aws_instance_update_error();
            }

            // Conservative delete-safety check (SPEC_FULL.md §9 Open Question,
            // adopted as-is): only delete the service if we just removed every
            // node the catalog believed it had; otherwise leave it for the
            // next cycle rather than risk deleting one with concurrently
            // added instances we don't know about.
            if succeeded == pre_remove_total {
                if let Err(error) = self.client.delete_service(&service.aws_id).await {
                    warn!(service = %name, %error, "delete_service failed, will retry next cycle");
                } else {
                    info!(service = %name, "deleted aws cloud map service");
                }
            } else {
                debug!(service = %name, succeeded, pre_remove_total, "skipping service delete, node count mismatch");
            }
        }
    }

    async fn poll_loop(&self, stop: watch::Receiver<bool>, trigger: mpsc::Sender<()>, interval: Duration) {
        run_poll_loop(stop, trigger, interval, "aws", || self.fetch()).await;
    }
}
