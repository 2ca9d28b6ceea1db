//! The catalog data model shared by both side adapters.
//!
//! Grounded in `catalog/service.go` of the original source: a `Service` owns a
//! `nodes[host][port]` index and a `healths[instance_id]` map, and carries
//! enough peer-id metadata to be written back to either registry.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a node, normalized across both registries.
///
/// `Unknown` doubles as the empty/absent value (the original source used the
/// empty string for this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Health {
    Up,
    Healthy,
    Unhealthy,
    OutOfService,
    Unknown,
}

impl Health {
    /// Collapse to AWS Cloud Map's two-valued custom health status.
    ///
    /// `Up` and `Healthy` map to healthy; everything else, including `Unknown`,
    /// maps to unhealthy.
    pub fn to_aws_custom_health(self) -> bool {
        matches!(self, Health::Up | Health::Healthy)
    }

    /// Normalize an AWS Cloud Map health status string (`HEALTHY`, `UNHEALTHY`,
    /// `UNKNOWN`) as read from `GetInstancesHealthStatus`.
    pub fn from_aws(status: &str) -> Health {
        match status {
            "HEALTHY" => Health::Up,
            "UNHEALTHY" => Health::OutOfService,
            _ => Health::Unknown,
        }
    }

    /// Normalize a Eureka instance status string.
    ///
    /// `DOWN` and `STARTING` are treated as `Unhealthy`. The original source
    /// left these two cases with no `healths` entry at all because of a
    /// missing `switch` branch; this is a deliberate fix, not a faithful port
    /// (see REDESIGN FLAGS in SPEC_FULL.md).
    pub fn from_eureka(status: &str) -> Health {
        match status {
            "UP" => Health::Healthy,
            "OUT_OF_SERVICE" => Health::Unhealthy,
            "DOWN" | "STARTING" => Health::Unhealthy,
            _ => Health::Unknown,
        }
    }
}

/// One running instance of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub port: u16,
    pub host: String,
    pub aws_id: Option<String>,
    pub eureka_id: Option<String>,
    pub instance_id: String,
    pub attributes: HashMap<String, String>,
}

/// One logical service, as observed from one side of the sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub from_eureka: bool,
    pub from_aws: bool,
    pub aws_id: String,
    pub eureka_id: String,
    pub aws_namespace: String,
    /// host -> port -> node
    pub nodes: HashMap<String, HashMap<u16, Node>>,
    /// instance id -> health
    pub healths: HashMap<String, Health>,
}

impl Service {
    pub fn node_count(&self) -> usize {
        self.nodes.values().map(|ports| ports.len()).sum()
    }
}

/// Services keyed by (unprefixed) service name.
pub type ServiceMap = HashMap<String, Service>;

/// Build the canonical composite instance-id string `<id>_<host>_<port>`.
pub fn encode_id(id: &str, host: &str, port: u16) -> String {
    format!("{id}_{host}_{port}")
}

/// Split a composite id produced by [`encode_id`] back into `(host, port)`.
///
/// Splits from the right: the last two underscore-separated tokens are host
/// and port, regardless of how many underscores `id` itself contains.
pub fn decode_id(composite: &str) -> Option<(String, u16)> {
    let parts: Vec<&str> = composite.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    let port: u16 = parts[parts.len() - 1].parse().ok()?;
    let host = parts[parts.len() - 2].to_string();
    Some((host, port))
}

/// A concurrently-readable snapshot of one side's service catalog.
///
/// Writes replace the whole map atomically; the lock is never held across I/O
/// (callers snapshot, do I/O against the snapshot, then replace).
#[derive(Clone)]
pub struct Catalog {
    services: Arc<RwLock<ServiceMap>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self { services: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn snapshot(&self) -> ServiceMap {
        self.services.read().await.clone()
    }

    pub async fn snapshot_service(&self, name: &str) -> Option<Service> {
        self.services.read().await.get(name).cloned()
    }

    pub async fn snapshot_node(&self, name: &str, host: &str, port: u16) -> Option<Node> {
        self.services
            .read()
            .await
            .get(name)
            .and_then(|s| s.nodes.get(host))
            .and_then(|ports| ports.get(&port))
            .cloned()
    }

    /// Look up a node on `name` whose `eureka_id` matches `id`.
    pub async fn node_for_eureka_id(&self, name: &str, id: &str) -> Option<Node> {
        let services = self.services.read().await;
        let service = services.get(name)?;
        service
            .nodes
            .values()
            .flat_map(|ports| ports.values())
            .find(|n| n.eureka_id.as_deref() == Some(id))
            .cloned()
    }

    /// Look up a node on `name` whose `aws_id` matches `id`.
    pub async fn node_for_aws_id(&self, name: &str, id: &str) -> Option<Node> {
        let services = self.services.read().await;
        let service = services.get(name)?;
        service
            .nodes
            .values()
            .flat_map(|ports| ports.values())
            .find(|n| n.aws_id.as_deref() == Some(id))
            .cloned()
    }

    /// Atomically replace the whole catalog.
    pub async fn set_services(&self, services: ServiceMap) {
        *self.services.write().await = services;
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
